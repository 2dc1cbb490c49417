//! SQLite DDL for model synchronization

use tenantdb_core::{ColumnDefinition, ModelDefinition};

/// Quote an identifier with SQLite's double-quote style
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `CREATE TABLE IF NOT EXISTS` for a model
pub fn create_table_sql(model: &ModelDefinition) -> String {
    let columns: Vec<String> = model.columns.iter().map(column_sql).collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_identifier(model.table()),
        columns.join(", ")
    )
}

pub fn drop_table_sql(model: &ModelDefinition) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(model.table()))
}

/// `ALTER TABLE ... ADD COLUMN` for a column missing from an existing table.
///
/// SQLite cannot add PRIMARY KEY or UNIQUE columns, and a NOT NULL column
/// needs a default, so those constraints are left out here.
pub fn add_column_sql(table: &str, column: &ColumnDefinition) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD COLUMN {} {}",
        quote_identifier(table),
        quote_identifier(&column.name),
        column.column_type.sql_name()
    );
    if let Some(default) = &column.default {
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    sql
}

fn column_sql(column: &ColumnDefinition) -> String {
    let mut sql = format!(
        "{} {}",
        quote_identifier(&column.name),
        column.column_type.sql_name()
    );
    if column.primary_key {
        sql.push_str(" PRIMARY KEY");
        if column.auto_increment {
            sql.push_str(" AUTOINCREMENT");
        }
    }
    if !column.nullable && !column.primary_key {
        sql.push_str(" NOT NULL");
    }
    if column.unique && !column.primary_key {
        sql.push_str(" UNIQUE");
    }
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    sql
}
