//! Position persistence: trade transaction and list for hydration.

use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::position::{Position, PurchasePoint};

#[derive(Debug, FromRow)]
pub struct PositionRow {
    pub user_id: Uuid,
    pub symbol: String,
    pub units_owned: Decimal,
    pub money_invested: Decimal,
    pub purchase_history: Json<Vec<PurchasePoint>>,
}

pub fn position_row_to_position(row: PositionRow) -> Position {
    Position {
        user_id: row.user_id,
        symbol: row.symbol,
        units_owned: row.units_owned,
        money_invested: row.money_invested,
        purchase_history: row.purchase_history.0,
    }
}

/// List all positions for hydration.
pub async fn list_positions(pool: &PgPool) -> Result<Vec<PositionRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PositionRow>(
        "SELECT user_id, symbol, units_owned, money_invested, purchase_history FROM positions",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Commit one settled trade: the new cash balance and the new position state
/// land together or not at all.
pub async fn persist_trade(
    pool: &PgPool,
    user_id: Uuid,
    cash_balance: Decimal,
    position: &Position,
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE users SET cash_balance = $2 WHERE id = $1")
        .bind(user_id)
        .bind(cash_balance)
        .execute(&mut *tx)
        .await?;
    sqlx::query(
        "INSERT INTO positions (user_id, symbol, units_owned, money_invested, purchase_history) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id, symbol) DO UPDATE \
         SET units_owned = $3, money_invested = $4, purchase_history = $5",
    )
    .bind(position.user_id)
    .bind(&position.symbol)
    .bind(position.units_owned)
    .bind(position.money_invested)
    .bind(Json(&position.purchase_history))
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(())
}
