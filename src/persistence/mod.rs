//! Database layer: pool, migrations, and access for users and positions.

mod pool;
mod positions;
mod users;

pub use pool::{create_pool_and_migrate, run_migrations};
pub use positions::{list_positions, persist_trade, position_row_to_position, PositionRow};
pub use sqlx::PgPool;
pub use users::{
    delete_user_cascade, insert_user, list_users, update_user_balance, user_row_to_user, UserRow,
};
