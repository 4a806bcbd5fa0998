//! User persistence: insert, balance updates, cascade delete, list for
//! hydration.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::types::user::User;

/// Row returned from DB (login and email are stored lowercase).
#[derive(FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub login: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub cash_balance: Decimal,
}

pub fn user_row_to_user(row: UserRow) -> User {
    User {
        id: row.id,
        login: row.login,
        password_hash: row.password_hash,
        first_name: row.first_name,
        last_name: row.last_name,
        email: row.email,
        cash_balance: row.cash_balance,
    }
}

/// List all users for hydration.
pub async fn list_users(pool: &PgPool) -> Result<Vec<UserRow>, sqlx::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, login, password_hash, first_name, last_name, email, cash_balance FROM users",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Insert a user. Login and email must already be lowercase.
pub async fn insert_user(pool: &PgPool, user: &User) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, login, password_hash, first_name, last_name, email, cash_balance) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(user.id)
    .bind(&user.login)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.email)
    .bind(user.cash_balance)
    .execute(pool)
    .await?;
    Ok(())
}

/// Overwrite a user's cash balance (deposits).
pub async fn update_user_balance(
    pool: &PgPool,
    user_id: Uuid,
    cash_balance: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET cash_balance = $2 WHERE id = $1")
        .bind(user_id)
        .bind(cash_balance)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a user and every position they own, together.
pub async fn delete_user_cascade(pool: &PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM positions WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}
