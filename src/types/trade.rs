use serde::{Deserialize, Serialize};

/// Trade direction. The settlement rule for each variant lives in
/// `ledger::apply_trade`; anything other than these two values is rejected
/// at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}
