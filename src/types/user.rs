use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Account record. Login and email are stored lowercase; the password hash
/// never appears in API responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub cash_balance: Decimal,
}
