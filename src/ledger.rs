//! Account ledger: cash balances and per-symbol positions.
//! Free functions over a shared store, testable without HTTP.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::persistence;
use crate::types::position::{Position, PurchasePoint};
use crate::types::trade::TradeSide;
use crate::types::user::User;

pub type SharedLedger = Arc<RwLock<Ledger>>;

/// In-memory source of truth. Positions are keyed by (user, uppercase symbol).
#[derive(Default)]
pub struct Ledger {
    pub users: HashMap<Uuid, User>,
    pub positions: HashMap<(Uuid, String), Position>,
}

pub fn new_shared() -> SharedLedger {
    Arc::new(RwLock::new(Ledger::default()))
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    InvalidRequest(&'static str),
    #[error("user not found")]
    UserNotFound,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("not enough units to sell")]
    InsufficientHoldings,
    #[error("already a user with that login")]
    DuplicateLogin,
    #[error("already a user with that email")]
    DuplicateEmail,
    #[error("persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Settle one buy or sell: the cash move and the position update happen as a
/// single unit under the ledger write guard. When a pool is present the new
/// state is committed to the store in one transaction before the in-memory
/// maps change, so a persistence failure leaves the ledger exactly as it was.
pub async fn apply_trade(
    store: &SharedLedger,
    db: Option<&PgPool>,
    user_id: Uuid,
    symbol: &str,
    side: TradeSide,
    units: Decimal,
    price: Decimal,
) -> Result<(Position, Decimal), LedgerError> {
    if units <= Decimal::ZERO || price <= Decimal::ZERO {
        return Err(LedgerError::InvalidRequest(
            "units and price must be positive",
        ));
    }

    let mut guard = store.write().await;
    let symbol = symbol.to_uppercase();
    let key = (user_id, symbol.clone());

    let user = guard.users.get(&user_id).ok_or(LedgerError::UserNotFound)?;
    let mut cash_balance = user.cash_balance;
    let total_amount = price * units;

    let mut position = guard
        .positions
        .get(&key)
        .cloned()
        .unwrap_or_else(|| Position::flat(user_id, symbol.clone()));

    match side {
        TradeSide::Buy => {
            if cash_balance < total_amount {
                return Err(LedgerError::InsufficientFunds);
            }
            position.money_invested += total_amount;
            position.units_owned += units;
            cash_balance -= total_amount;
        }
        TradeSide::Sell => {
            if position.units_owned < units {
                return Err(LedgerError::InsufficientHoldings);
            }
            // Remove cost basis at the average price, not the sale price, so
            // the basis of the remaining units stays put.
            let avg_price = position.average_cost_basis();
            position.units_owned -= units;
            position.money_invested -= avg_price * units;
            cash_balance += total_amount;
        }
    }
    position.purchase_history.push(PurchasePoint {
        side,
        date: Utc::now(),
        price,
        units,
    });

    if let Some(pool) = db {
        persistence::persist_trade(pool, user_id, cash_balance, &position).await?;
    }

    if let Some(user) = guard.users.get_mut(&user_id) {
        user.cash_balance = cash_balance;
    }
    guard.positions.insert(key, position.clone());

    Ok((position, cash_balance))
}

/// A user's holding in one symbol. Never having held it is not an error:
/// callers get a flat position with an empty history.
pub async fn get_position(
    store: &SharedLedger,
    user_id: Uuid,
    symbol: &str,
) -> Result<Position, LedgerError> {
    let guard = store.read().await;
    if !guard.users.contains_key(&user_id) {
        return Err(LedgerError::UserNotFound);
    }
    let symbol = symbol.to_uppercase();
    Ok(guard
        .positions
        .get(&(user_id, symbol.clone()))
        .cloned()
        .unwrap_or_else(|| Position::flat(user_id, symbol)))
}

/// All positions for a user, optionally filtered by a case-insensitive
/// substring match on symbol. Sorted by symbol for stable output.
pub async fn get_portfolio(
    store: &SharedLedger,
    user_id: Uuid,
    symbol_filter: Option<&str>,
) -> Result<Vec<Position>, LedgerError> {
    let guard = store.read().await;
    if !guard.users.contains_key(&user_id) {
        return Err(LedgerError::UserNotFound);
    }
    let needle = symbol_filter.map(|s| s.to_uppercase());
    let mut positions: Vec<Position> = guard
        .positions
        .iter()
        .filter(|((uid, sym), _)| {
            *uid == user_id && needle.as_ref().is_none_or(|n| sym.contains(n.as_str()))
        })
        .map(|(_, pos)| pos.clone())
        .collect();
    positions.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(positions)
}

/// Credit uninvested cash. Deposits only; the amount must be positive.
pub async fn deposit_funds(
    store: &SharedLedger,
    db: Option<&PgPool>,
    user_id: Uuid,
    amount: Decimal,
) -> Result<Decimal, LedgerError> {
    if amount <= Decimal::ZERO {
        return Err(LedgerError::InvalidRequest(
            "deposit amount must be positive",
        ));
    }
    let mut guard = store.write().await;
    let user = guard.users.get(&user_id).ok_or(LedgerError::UserNotFound)?;
    let new_balance = user.cash_balance + amount;

    if let Some(pool) = db {
        persistence::update_user_balance(pool, user_id, new_balance).await?;
    }
    if let Some(user) = guard.users.get_mut(&user_id) {
        user.cash_balance = new_balance;
    }
    Ok(new_balance)
}

/// Register a new account with a zero starting balance. Login and email are
/// normalized to lowercase for the uniqueness checks and for storage. The
/// password must already be hashed by the caller.
pub async fn add_user(
    store: &SharedLedger,
    db: Option<&PgPool>,
    login: &str,
    password_hash: &str,
    first_name: &str,
    last_name: &str,
    email: &str,
) -> Result<User, LedgerError> {
    let login = login.to_lowercase();
    let email = email.to_lowercase();

    let mut guard = store.write().await;
    if guard.users.values().any(|u| u.email == email) {
        return Err(LedgerError::DuplicateEmail);
    }
    if guard.users.values().any(|u| u.login == login) {
        return Err(LedgerError::DuplicateLogin);
    }

    let user = User {
        id: Uuid::new_v4(),
        login,
        password_hash: password_hash.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email,
        cash_balance: Decimal::ZERO,
    };

    if let Some(pool) = db {
        persistence::insert_user(pool, &user).await?;
    }
    guard.users.insert(user.id, user.clone());
    Ok(user)
}

/// Login lookup, case-insensitive via lowercase normalization.
pub async fn find_by_login(store: &SharedLedger, login: &str) -> Option<User> {
    let login = login.to_lowercase();
    let guard = store.read().await;
    guard.users.values().find(|u| u.login == login).cloned()
}

pub async fn get_user(store: &SharedLedger, user_id: Uuid) -> Option<User> {
    let guard = store.read().await;
    guard.users.get(&user_id).cloned()
}

/// Delete an account and every position it owns.
pub async fn remove_user(
    store: &SharedLedger,
    db: Option<&PgPool>,
    user_id: Uuid,
) -> Result<(), LedgerError> {
    let mut guard = store.write().await;
    if !guard.users.contains_key(&user_id) {
        return Err(LedgerError::UserNotFound);
    }
    if let Some(pool) = db {
        persistence::delete_user_cascade(pool, user_id).await?;
    }
    guard.users.remove(&user_id);
    guard.positions.retain(|(uid, _), _| *uid != user_id);
    Ok(())
}

/// Load both collections from the store at startup.
pub async fn hydrate(pool: &PgPool) -> Result<Ledger, sqlx::Error> {
    let mut ledger = Ledger::default();
    for row in persistence::list_users(pool).await? {
        let user = persistence::user_row_to_user(row);
        ledger.users.insert(user.id, user);
    }
    for row in persistence::list_positions(pool).await? {
        let position = persistence::position_row_to_position(row);
        let key = (position.user_id, position.symbol.clone());
        ledger.positions.insert(key, position);
    }
    Ok(ledger)
}
