use async_trait::async_trait;
use thiserror::Error;

use crate::value_codec::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Numeric,
    Text,
    Date,
    Time,
    DateTime,
    Json,
    Blob,
}

impl ColumnKind {
    #[must_use]
    pub fn is_large(self) -> bool {
        matches!(self, Self::Json | Self::Blob)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub kind: ColumnKind,
    pub table: Option<String>,
}

impl ColumnMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            table: None,
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Vec<CellValue>>,
    pub affected_rows: u64,
    pub last_insert_id: Option<u64>,
    pub warnings: u16,
}

impl QueryOutcome {
    #[must_use]
    pub fn result_set(columns: Vec<ColumnMeta>, rows: Vec<Vec<CellValue>>) -> Self {
        Self {
            columns,
            rows,
            affected_rows: 0,
            last_insert_id: None,
            warnings: 0,
        }
    }

    #[must_use]
    pub fn statement_result(affected_rows: u64, last_insert_id: Option<u64>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows,
            last_insert_id,
            warnings: 0,
        }
    }

    #[must_use]
    pub fn is_result_set(&self) -> bool {
        !self.columns.is_empty()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutorError {
    message: String,
}

impl ExecutorError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait SqlExecutor {
    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome, ExecutorError>;
}
