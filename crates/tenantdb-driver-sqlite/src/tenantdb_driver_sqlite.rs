//! SQLite database driver implementation

mod connection;
mod driver;
mod schema;

pub use connection::SqliteConnection;
pub use driver::SqliteDriver;
pub use schema::{add_column_sql, create_table_sql, drop_table_sql, quote_identifier};
