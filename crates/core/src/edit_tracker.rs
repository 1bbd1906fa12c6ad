use std::collections::BTreeMap;

use thiserror::Error;

use crate::executor::{ColumnMeta, ExecutorError};
use crate::value_codec::CellValue;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitError {
    #[error("result does not map to a single editable table")]
    NoTableDetected,
    #[error("no primary key resolved for table `{table}`")]
    NoPrimaryKey { table: String },
    #[error("update for row {row} failed: {source}")]
    Statement {
        row: usize,
        #[source]
        source: ExecutorError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowUpdate {
    pub row: usize,
    pub sql: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingEdits {
    edits: BTreeMap<(usize, usize), CellValue>,
}

impl PendingEdits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(
        &mut self,
        row: usize,
        column: usize,
        proposed: CellValue,
        original: &CellValue,
    ) -> bool {
        if values_equal(&proposed, original) {
            self.edits.remove(&(row, column));
            false
        } else {
            self.edits.insert((row, column), proposed);
            true
        }
    }

    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.edits.get(&(row, column))
    }

    #[must_use]
    pub fn contains(&self, row: usize, column: usize) -> bool {
        self.edits.contains_key(&(row, column))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(usize, usize), &CellValue)> {
        self.edits.iter()
    }
}

#[must_use]
pub fn values_equal(left: &CellValue, right: &CellValue) -> bool {
    match (left.is_null(), right.is_null()) {
        (true, true) => true,
        (false, false) => left.display_text() == right.display_text(),
        _ => false,
    }
}

pub fn build_update_statements(
    table: Option<&str>,
    columns: &[ColumnMeta],
    rows: &[Vec<CellValue>],
    primary_key: &[usize],
    pending: &PendingEdits,
) -> Result<Vec<RowUpdate>, CommitError> {
    let table = table.ok_or(CommitError::NoTableDetected)?;
    if primary_key.is_empty() {
        return Err(CommitError::NoPrimaryKey {
            table: table.to_string(),
        });
    }

    let mut by_row: BTreeMap<usize, Vec<(usize, &CellValue)>> = BTreeMap::new();
    for ((row, column), proposed) in pending.iter() {
        by_row.entry(*row).or_default().push((*column, proposed));
    }

    let mut updates = Vec::new();
    for (row_index, edits) in by_row {
        let Some(row) = rows.get(row_index) else {
            continue;
        };

        let mut assignments = Vec::new();
        for (column_index, proposed) in edits {
            if let Some(column) = columns.get(column_index) {
                assignments.push(format!("{} = {}", column.name, proposed.sql_literal()));
            }
        }
        if assignments.is_empty() {
            continue;
        }

        let mut constraints = Vec::new();
        for key_index in primary_key {
            let Some(column) = columns.get(*key_index) else {
                return Err(CommitError::NoPrimaryKey {
                    table: table.to_string(),
                });
            };
            let original = row.get(*key_index).unwrap_or(&CellValue::Null);
            if original.is_null() {
                constraints.push(format!("{} IS NULL", column.name));
            } else {
                constraints.push(format!("{} = {}", column.name, original.sql_literal()));
            }
        }

        updates.push(RowUpdate {
            row: row_index,
            sql: format!(
                "UPDATE {table} SET {} WHERE {}",
                assignments.join(", "),
                constraints.join(" AND ")
            ),
        });
    }
    Ok(updates)
}

#[cfg(test)]
mod tests {
    use super::{build_update_statements, values_equal, CommitError, PendingEdits};
    use crate::executor::{ColumnKind, ColumnMeta};
    use crate::value_codec::CellValue;

    fn user_columns() -> Vec<ColumnMeta> {
        vec![
            ColumnMeta::new("id", ColumnKind::Numeric).with_table("t"),
            ColumnMeta::new("name", ColumnKind::Text).with_table("t"),
            ColumnMeta::new("age", ColumnKind::Numeric).with_table("t"),
        ]
    }

    fn user_rows() -> Vec<Vec<CellValue>> {
        vec![
            vec![
                CellValue::Int(5),
                CellValue::Text("a".to_string()),
                CellValue::Int(30),
            ],
            vec![
                CellValue::Int(6),
                CellValue::Text("z".to_string()),
                CellValue::Null,
            ],
        ]
    }

    #[test]
    fn reverting_to_the_original_clears_the_pending_edit() {
        let original = CellValue::Text("a".to_string());
        let mut pending = PendingEdits::new();

        assert!(pending.apply(0, 1, CellValue::Text("b".to_string()), &original));
        assert_eq!(pending.len(), 1);

        assert!(!pending.apply(0, 1, CellValue::Text("a".to_string()), &original));
        assert!(pending.is_empty());
    }

    #[test]
    fn editing_the_same_cell_twice_keeps_one_entry() {
        let original = CellValue::Int(1);
        let mut pending = PendingEdits::new();
        pending.apply(2, 0, CellValue::Int(2), &original);
        pending.apply(2, 0, CellValue::Int(3), &original);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.get(2, 0), Some(&CellValue::Int(3)));
    }

    #[test]
    fn null_equals_null_but_not_its_spelling() {
        assert!(values_equal(&CellValue::Null, &CellValue::Null));
        assert!(!values_equal(
            &CellValue::Null,
            &CellValue::Text("NULL".to_string())
        ));
        assert!(!values_equal(
            &CellValue::Text("NULL".to_string()),
            &CellValue::Null
        ));
    }

    #[test]
    fn equality_compares_formatted_text_across_types() {
        assert!(values_equal(
            &CellValue::Text("5".to_string()),
            &CellValue::Int(5)
        ));
        assert!(values_equal(&CellValue::UInt(7), &CellValue::Int(7)));
        assert!(!values_equal(&CellValue::Int(5), &CellValue::Int(6)));
    }

    #[test]
    fn a_single_edit_becomes_one_update_statement() {
        let mut pending = PendingEdits::new();
        pending.apply(
            0,
            1,
            CellValue::Text("b".to_string()),
            &CellValue::Text("a".to_string()),
        );

        let updates = build_update_statements(
            Some("t"),
            &user_columns(),
            &user_rows(),
            &[0],
            &pending,
        )
        .expect("statement should build");
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].row, 0);
        assert_eq!(updates[0].sql, "UPDATE t SET name = 'b' WHERE id = 5");
    }

    #[test]
    fn edits_on_one_row_merge_into_one_statement() {
        let mut pending = PendingEdits::new();
        pending.apply(1, 1, CellValue::Text("y".to_string()), &CellValue::Null);
        pending.apply(1, 2, CellValue::Int(41), &CellValue::Null);

        let updates = build_update_statements(
            Some("t"),
            &user_columns(),
            &user_rows(),
            &[0],
            &pending,
        )
        .expect("statement should build");
        assert_eq!(updates.len(), 1);
        assert_eq!(
            updates[0].sql,
            "UPDATE t SET name = 'y', age = 41 WHERE id = 6"
        );
    }

    #[test]
    fn statements_come_out_in_ascending_row_order() {
        let mut pending = PendingEdits::new();
        pending.apply(1, 2, CellValue::Int(1), &CellValue::Null);
        pending.apply(0, 2, CellValue::Int(2), &CellValue::Int(30));

        let updates = build_update_statements(
            Some("t"),
            &user_columns(),
            &user_rows(),
            &[0],
            &pending,
        )
        .expect("statements should build");
        let rows: Vec<usize> = updates.iter().map(|update| update.row).collect();
        assert_eq!(rows, vec![0, 1]);
    }

    #[test]
    fn null_key_values_constrain_with_is_null() {
        let columns = vec![
            ColumnMeta::new("id", ColumnKind::Numeric),
            ColumnMeta::new("name", ColumnKind::Text),
        ];
        let rows = vec![vec![CellValue::Null, CellValue::Text("a".to_string())]];
        let mut pending = PendingEdits::new();
        pending.apply(
            0,
            1,
            CellValue::Text("b".to_string()),
            &CellValue::Text("a".to_string()),
        );

        let updates = build_update_statements(Some("t"), &columns, &rows, &[0], &pending)
            .expect("statement should build");
        assert_eq!(updates[0].sql, "UPDATE t SET name = 'b' WHERE id IS NULL");
    }

    #[test]
    fn composite_keys_constrain_every_key_column() {
        let columns = vec![
            ColumnMeta::new("a", ColumnKind::Numeric),
            ColumnMeta::new("b", ColumnKind::Text),
            ColumnMeta::new("v", ColumnKind::Text),
        ];
        let rows = vec![vec![
            CellValue::Int(1),
            CellValue::Text("k".to_string()),
            CellValue::Text("old".to_string()),
        ]];
        let mut pending = PendingEdits::new();
        pending.apply(
            0,
            2,
            CellValue::Text("new".to_string()),
            &CellValue::Text("old".to_string()),
        );

        let updates = build_update_statements(Some("t"), &columns, &rows, &[0, 1], &pending)
            .expect("statement should build");
        assert_eq!(
            updates[0].sql,
            "UPDATE t SET v = 'new' WHERE a = 1 AND b = 'k'"
        );
    }

    #[test]
    fn missing_table_and_key_are_rejected() {
        let pending = PendingEdits::new();
        let no_table =
            build_update_statements(None, &user_columns(), &user_rows(), &[0], &pending);
        assert_eq!(no_table, Err(CommitError::NoTableDetected));

        let no_key =
            build_update_statements(Some("t"), &user_columns(), &user_rows(), &[], &pending);
        assert_eq!(
            no_key,
            Err(CommitError::NoPrimaryKey {
                table: "t".to_string()
            })
        );
    }
}
