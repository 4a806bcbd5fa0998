use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::trade::TradeSide;

/// One entry in a position's append-only trade history. Sells carry the
/// traded price and units just like buys; the side tag tells them apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasePoint {
    pub side: TradeSide,
    pub date: DateTime<Utc>,
    pub price: Decimal,
    pub units: Decimal,
}

/// Position per (user, symbol). Symbol is stored uppercase. A position whose
/// units drop to zero is kept around; repeated buy/sell cycles reuse the same
/// record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub user_id: Uuid,
    pub symbol: String,
    pub units_owned: Decimal,
    pub money_invested: Decimal,
    pub purchase_history: Vec<PurchasePoint>,
}

impl Position {
    /// A zero-valued position for a symbol the user has never held.
    pub fn flat(user_id: Uuid, symbol: String) -> Self {
        Self {
            user_id,
            symbol,
            units_owned: Decimal::ZERO,
            money_invested: Decimal::ZERO,
            purchase_history: Vec::new(),
        }
    }

    /// Derived: money invested divided by units owned, zero for a flat
    /// position.
    pub fn average_cost_basis(&self) -> Decimal {
        if self.units_owned.is_zero() {
            Decimal::ZERO
        } else {
            self.money_invested / self.units_owned
        }
    }
}
