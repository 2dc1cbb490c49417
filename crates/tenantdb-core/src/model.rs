//! Model definitions and the registry that maps connection names to them

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Column storage type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Integer,
    BigInt,
    Real,
    Text,
    Boolean,
    Blob,
    Timestamp,
}

impl ColumnType {
    /// SQL type name used in DDL
    pub fn sql_name(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::BigInt => "BIGINT",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Blob => "BLOB",
            ColumnType::Timestamp => "TIMESTAMP",
        }
    }
}

/// A single column of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub column_type: ColumnType,

    #[serde(default = "default_true")]
    pub nullable: bool,

    #[serde(default)]
    pub primary_key: bool,

    #[serde(default)]
    pub auto_increment: bool,

    #[serde(default)]
    pub unique: bool,

    /// Raw SQL default expression
    #[serde(default)]
    pub default: Option<String>,
}

fn default_true() -> bool {
    true
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            primary_key: false,
            auto_increment: false,
            unique: false,
            default: None,
        }
    }

    /// Integer primary key with auto increment
    pub fn id(name: impl Into<String>) -> Self {
        Self {
            nullable: false,
            primary_key: true,
            auto_increment: true,
            ..Self::new(name, ColumnType::Integer)
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_default(mut self, expr: impl Into<String>) -> Self {
        self.default = Some(expr.into());
        self
    }
}

/// A table definition attached to a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Model name, unique per connection
    pub name: String,

    /// Table name; defaults to the model name
    #[serde(default)]
    pub table_name: Option<String>,

    pub columns: Vec<ColumnDefinition>,
}

impl ModelDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: None,
            columns: Vec::new(),
        }
    }

    pub fn with_table_name(mut self, table: impl Into<String>) -> Self {
        self.table_name = Some(table.into());
        self
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn table(&self) -> &str {
        self.table_name.as_deref().unwrap_or(&self.name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Source of model definitions per connection name
pub trait ModelRegistry: Send + Sync {
    /// Models registered for `connection_name`, in registration order
    fn models_for(&self, connection_name: &str) -> Vec<ModelDefinition>;
}

/// Model registry backed by an in-process map
#[derive(Default)]
pub struct InMemoryModelRegistry {
    models: RwLock<HashMap<String, Vec<ModelDefinition>>>,
}

impl InMemoryModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model for a connection.
    ///
    /// Registering a model name twice for the same connection replaces the
    /// earlier definition in place, keeping its position.
    pub fn register(&self, connection_name: &str, model: ModelDefinition) {
        tracing::debug!(connection = %connection_name, model = %model.name, "registering model");
        let mut models = self.models.write();
        let entry = models.entry(connection_name.to_string()).or_default();
        match entry.iter_mut().find(|m| m.name == model.name) {
            Some(existing) => *existing = model,
            None => entry.push(model),
        }
    }

    pub fn register_all(
        &self,
        connection_name: &str,
        models: impl IntoIterator<Item = ModelDefinition>,
    ) {
        for model in models {
            self.register(connection_name, model);
        }
    }

    /// Connection names with at least one model
    pub fn connections(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl ModelRegistry for InMemoryModelRegistry {
    fn models_for(&self, connection_name: &str) -> Vec<ModelDefinition> {
        self.models
            .read()
            .get(connection_name)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn user_model() -> ModelDefinition {
        ModelDefinition::new("User")
            .with_table_name("users")
            .with_column(ColumnDefinition::id("id"))
            .with_column(ColumnDefinition::new("email", ColumnType::Text).not_null().unique())
    }

    #[test]
    fn test_table_defaults_to_model_name() {
        let model = ModelDefinition::new("Post");
        assert_eq!(model.table(), "Post");
        assert_eq!(user_model().table(), "users");
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let registry = InMemoryModelRegistry::new();
        registry.register("default", user_model());
        registry.register("default", ModelDefinition::new("Post"));
        registry.register("default", ModelDefinition::new("Comment"));

        let names: Vec<String> = registry
            .models_for("default")
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names, vec!["User", "Post", "Comment"]);
    }

    #[test]
    fn test_registry_replaces_same_name() {
        let registry = InMemoryModelRegistry::new();
        registry.register("default", ModelDefinition::new("User"));
        registry.register("default", ModelDefinition::new("Post"));
        registry.register("default", user_model());

        let models = registry.models_for("default");
        assert_eq!(models.len(), 2);
        assert_eq!(models[0], user_model());
    }

    #[test]
    fn test_registry_separates_connections() {
        let registry = InMemoryModelRegistry::new();
        registry.register("billing", ModelDefinition::new("Invoice"));

        assert!(registry.models_for("default").is_empty());
        assert_eq!(registry.models_for("billing").len(), 1);
        assert_eq!(registry.connections(), vec!["billing".to_string()]);
    }

    #[test]
    fn test_column_deserialization_defaults() {
        let column: ColumnDefinition =
            serde_json::from_str(r#"{"name": "title", "type": "text"}"#).unwrap();
        assert_eq!(column, ColumnDefinition::new("title", ColumnType::Text));
    }
}
