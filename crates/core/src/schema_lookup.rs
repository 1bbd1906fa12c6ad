use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

impl ForeignKeyRef {
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SchemaLookupError {
    message: String,
}

impl SchemaLookupError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait SchemaLookup {
    async fn primary_key_columns(&mut self, table: &str)
        -> Result<Vec<String>, SchemaLookupError>;

    async fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyRef>, SchemaLookupError>;
}
