use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

use thiserror::Error;
use tracing::warn;

use crate::cell_address::AddressedCell;
use crate::config::GridSettings;
use crate::edit_tracker::{self, CommitError, PendingEdits};
use crate::executor::{ColumnMeta, QueryOutcome, SqlExecutor};
use crate::export;
use crate::layout_engine;
use crate::schema_lookup::{ForeignKeyRef, SchemaLookup};
use crate::sort_filter;
use crate::value_codec::CellValue;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResultModelError {
    #[error("no column named `{name}` in this result")]
    ColumnNotFound { name: String },
    #[error("no cell at row {row}, column {column}")]
    NoCellAtPosition { row: usize, column: usize },
    #[error("no row at position {row}")]
    NoRowAtPosition { row: usize },
    #[error("result does not map to a single table")]
    NoTableDetected,
    #[error("no foreign key on column {column}")]
    NoForeignKey { column: usize },
    #[error("cannot follow a NULL reference")]
    NullReference,
    #[error("fetch returned no further rows")]
    EmptyFetch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyTarget {
    pub referenced_table: String,
    pub referenced_column: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitSummary {
    pub statements_executed: usize,
    pub rows_affected: u64,
}

#[derive(Debug)]
pub struct ResultModel {
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<CellValue>>,
    detected_table: Option<String>,
    widths: Vec<usize>,
    pinned: BTreeSet<usize>,
    pages: Vec<Vec<usize>>,
    current_page: usize,
    row_offset: usize,
    pending: PendingEdits,
    primary_key: Vec<usize>,
    foreign_keys: HashMap<usize, ForeignKeyTarget>,
    viewport_width: usize,
    settings: GridSettings,
}

impl ResultModel {
    #[must_use]
    pub fn load(outcome: QueryOutcome, viewport_width: usize, settings: GridSettings) -> Self {
        let detected_table = detect_table(&outcome.columns);
        let widths = layout_engine::compute_widths(&outcome.columns, &outcome.rows, &settings);
        let pinned = BTreeSet::new();
        let pages =
            layout_engine::compute_pages(&widths, &pinned, viewport_width, settings.cell_padding);
        Self {
            columns: outcome.columns,
            rows: outcome.rows,
            detected_table,
            widths,
            pinned,
            pages,
            current_page: 0,
            row_offset: 0,
            pending: PendingEdits::new(),
            primary_key: Vec::new(),
            foreign_keys: HashMap::new(),
            viewport_width,
            settings,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn detected_table(&self) -> Option<&str> {
        self.detected_table.as_deref()
    }

    #[must_use]
    pub fn column_width(&self, column: usize) -> Option<usize> {
        self.widths.get(column).copied()
    }

    #[must_use]
    pub fn is_pinned(&self, column: usize) -> bool {
        self.pinned.contains(&column)
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[must_use]
    pub fn row_offset(&self) -> usize {
        self.row_offset
    }

    #[must_use]
    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    #[must_use]
    pub fn pending_edit_count(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn has_pending_edits(&self) -> bool {
        !self.pending.is_empty()
    }

    #[must_use]
    pub fn is_editable(&self) -> bool {
        self.detected_table.is_some() && !self.primary_key.is_empty()
    }

    #[must_use]
    pub fn primary_key(&self) -> &[usize] {
        &self.primary_key
    }

    pub fn column_index(&self, name: &str) -> Result<usize, ResultModelError> {
        self.columns
            .iter()
            .position(|column| column.name == name)
            .ok_or_else(|| ResultModelError::ColumnNotFound {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn visible_columns(&self) -> Vec<usize> {
        let mut visible: Vec<usize> = self.pinned.iter().copied().collect();
        if let Some(page) = self.pages.get(self.current_page) {
            visible.extend(page.iter().copied());
        }
        visible
    }

    #[must_use]
    pub fn original_cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|cells| cells.get(column))
    }

    #[must_use]
    pub fn effective_cell(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.pending
            .get(row, column)
            .or_else(|| self.original_cell(row, column))
    }

    #[must_use]
    pub fn has_pending_edit(&self, row: usize, column: usize) -> bool {
        self.pending.contains(row, column)
    }

    pub fn apply_edit(
        &mut self,
        row: usize,
        column: usize,
        proposed: CellValue,
    ) -> Result<bool, ResultModelError> {
        let original = self
            .original_cell(row, column)
            .ok_or(ResultModelError::NoCellAtPosition { row, column })?
            .clone();
        Ok(self.pending.apply(row, column, proposed, &original))
    }

    pub fn attach_primary_key<S: AsRef<str>>(&mut self, key_columns: &[S]) -> bool {
        let mut indices = Vec::with_capacity(key_columns.len());
        for key_column in key_columns {
            match self
                .columns
                .iter()
                .position(|column| column.name == key_column.as_ref())
            {
                Some(index) => indices.push(index),
                None => {
                    self.primary_key.clear();
                    return false;
                }
            }
        }
        if indices.is_empty() {
            self.primary_key.clear();
            return false;
        }
        self.primary_key = indices;
        true
    }

    pub fn attach_foreign_keys(&mut self, references: Vec<ForeignKeyRef>) {
        self.foreign_keys.clear();
        for reference in references {
            if let Some(index) = self
                .columns
                .iter()
                .position(|column| column.name == reference.column)
            {
                self.foreign_keys.insert(
                    index,
                    ForeignKeyTarget {
                        referenced_table: reference.referenced_table,
                        referenced_column: reference.referenced_column,
                    },
                );
            }
        }
    }

    pub async fn attach_schema<L: SchemaLookup>(&mut self, lookup: &mut L) {
        let Some(table) = self.detected_table.clone() else {
            return;
        };

        match lookup.primary_key_columns(&table).await {
            Ok(key_columns) => {
                if !self.attach_primary_key(&key_columns) {
                    warn!(table = %table, "primary key columns are missing from the projection; editing disabled");
                }
            }
            Err(error) => {
                warn!(table = %table, %error, "primary key lookup failed; editing disabled");
                self.primary_key.clear();
            }
        }

        match lookup.foreign_keys(&table).await {
            Ok(references) => self.attach_foreign_keys(references),
            Err(error) => {
                warn!(table = %table, %error, "foreign key lookup failed; reference navigation disabled");
                self.foreign_keys.clear();
            }
        }
    }

    #[must_use]
    pub fn foreign_key(&self, column: usize) -> Option<&ForeignKeyTarget> {
        self.foreign_keys.get(&column)
    }

    pub fn set_viewport_width(&mut self, viewport_width: usize) {
        if self.viewport_width == viewport_width {
            return;
        }
        self.viewport_width = viewport_width;
        self.recompute_pages();
    }

    pub fn toggle_pin(&mut self, column: usize) -> bool {
        if column >= self.columns.len() {
            return false;
        }
        if !self.pinned.remove(&column) {
            self.pinned.insert(column);
        }
        self.recompute_pages();
        true
    }

    pub fn widen_column(&mut self, column: usize) -> bool {
        let step = self.settings.widen_step;
        let Some(width) = self.widths.get_mut(column) else {
            return false;
        };
        *width += step;
        self.recompute_pages();
        true
    }

    pub fn narrow_column(&mut self, column: usize) -> bool {
        let step = self.settings.widen_step;
        let floor = self.settings.min_column_width;
        let Some(width) = self.widths.get_mut(column) else {
            return false;
        };
        *width = width.saturating_sub(step).max(floor);
        self.recompute_pages();
        true
    }

    pub fn next_page(&mut self) -> bool {
        if self.current_page + 1 < self.pages.len() {
            self.current_page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.current_page > 0 {
            self.current_page -= 1;
            true
        } else {
            false
        }
    }

    pub fn show_column(&mut self, column: usize) -> bool {
        if self.pinned.contains(&column) {
            return true;
        }
        for (page_index, page) in self.pages.iter().enumerate() {
            if page.contains(&column) {
                self.current_page = page_index;
                return true;
            }
        }
        false
    }

    pub fn set_row_offset(&mut self, offset: usize) {
        self.row_offset = offset.min(self.rows.len().saturating_sub(1));
    }

    pub fn sort_by_column(&mut self, column: usize, descending: bool) -> bool {
        if column >= self.columns.len() {
            return false;
        }
        self.pending.clear();
        sort_filter::sort_rows(&mut self.rows, column, descending);
        self.row_offset = 0;
        true
    }

    pub fn sort_by_name(&mut self, name: &str, descending: bool) -> Result<(), ResultModelError> {
        let column = self.column_index(name)?;
        self.sort_by_column(column, descending);
        Ok(())
    }

    pub fn append_rows(&mut self, chunk: Vec<Vec<CellValue>>) -> Result<usize, ResultModelError> {
        if chunk.is_empty() {
            return Err(ResultModelError::EmptyFetch);
        }
        let appended = chunk.len();
        self.rows.extend(chunk);
        Ok(appended)
    }

    pub fn load_more_sql(&self, chunk_size: usize) -> Result<String, ResultModelError> {
        let table = self
            .detected_table()
            .ok_or(ResultModelError::NoTableDetected)?;
        Ok(format!(
            "SELECT * FROM {table} LIMIT {chunk_size} OFFSET {}",
            self.rows.len()
        ))
    }

    pub fn foreign_key_sql(
        &self,
        row: usize,
        column: usize,
        preview_limit: usize,
    ) -> Result<String, ResultModelError> {
        let value = self
            .original_cell(row, column)
            .ok_or(ResultModelError::NoCellAtPosition { row, column })?;
        let target = self
            .foreign_keys
            .get(&column)
            .ok_or(ResultModelError::NoForeignKey { column })?;
        if value.is_null() {
            return Err(ResultModelError::NullReference);
        }
        Ok(format!(
            "SELECT * FROM {} WHERE {} = {} LIMIT {preview_limit}",
            target.referenced_table,
            target.referenced_column,
            value.sql_literal()
        ))
    }

    pub async fn commit_edits<E: SqlExecutor>(
        &mut self,
        executor: &mut E,
    ) -> Result<CommitSummary, CommitError> {
        if self.pending.is_empty() {
            return Ok(CommitSummary {
                statements_executed: 0,
                rows_affected: 0,
            });
        }

        let updates = edit_tracker::build_update_statements(
            self.detected_table(),
            &self.columns,
            &self.rows,
            &self.primary_key,
            &self.pending,
        )?;

        let mut rows_affected = 0;
        for update in &updates {
            let outcome = executor
                .execute(&update.sql)
                .await
                .map_err(|source| CommitError::Statement {
                    row: update.row,
                    source,
                })?;
            rows_affected += outcome.affected_rows;
        }

        // The server accepted every update, so the overlay becomes the stored value.
        for (&(row, column), value) in self.pending.iter() {
            if let Some(cell) = self
                .rows
                .get_mut(row)
                .and_then(|cells| cells.get_mut(column))
            {
                *cell = value.clone();
            }
        }
        self.pending.clear();
        Ok(CommitSummary {
            statements_executed: updates.len(),
            rows_affected,
        })
    }

    #[must_use]
    pub fn effective_rows(&self) -> Vec<Vec<CellValue>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| {
                row.iter()
                    .enumerate()
                    .map(|(column_index, value)| {
                        self.pending
                            .get(row_index, column_index)
                            .unwrap_or(value)
                            .clone()
                    })
                    .collect()
            })
            .collect()
    }

    #[must_use]
    pub fn csv_document(&self) -> String {
        export::csv_document(&self.columns, &self.effective_rows())
    }

    pub fn insert_dump(&self) -> Result<String, ResultModelError> {
        let table = self
            .detected_table()
            .ok_or(ResultModelError::NoTableDetected)?;
        Ok(export::insert_dump(
            table,
            &self.columns,
            &self.effective_rows(),
        ))
    }

    #[must_use]
    pub fn addressed_cells(&self, row_range: Range<usize>) -> Vec<AddressedCell> {
        let visible = self.visible_columns();
        let mut cells = Vec::new();
        for row in row_range {
            let Some(stored) = self.rows.get(row) else {
                break;
            };
            for column in &visible {
                if let Some(value) = stored.get(*column) {
                    cells.push(AddressedCell::new(row, *column, value.clone()));
                }
            }
        }
        cells
    }

    fn recompute_pages(&mut self) {
        self.pages = layout_engine::compute_pages(
            &self.widths,
            &self.pinned,
            self.viewport_width,
            self.settings.cell_padding,
        );
        if self.current_page >= self.pages.len() {
            self.current_page = self.pages.len() - 1;
        }
    }
}

fn detect_table(columns: &[ColumnMeta]) -> Option<String> {
    if columns.is_empty() {
        return None;
    }
    let mut detected: Option<&str> = None;
    for column in columns {
        let table = column.table.as_deref().filter(|name| !name.is_empty())?;
        match detected {
            None => detected = Some(table),
            Some(existing) if existing == table => {}
            Some(_) => return None,
        }
    }
    detected.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use super::{CommitSummary, ResultModel, ResultModelError};
    use crate::config::GridSettings;
    use crate::edit_tracker::CommitError;
    use crate::executor::{ColumnKind, ColumnMeta, ExecutorError, QueryOutcome, SqlExecutor};
    use crate::schema_lookup::{ForeignKeyRef, SchemaLookup, SchemaLookupError};
    use crate::value_codec::CellValue;

    struct FakeExecutor {
        responses: VecDeque<Result<QueryOutcome, ExecutorError>>,
        executed: Vec<String>,
    }

    impl FakeExecutor {
        fn new(responses: Vec<Result<QueryOutcome, ExecutorError>>) -> Self {
            Self {
                responses: responses.into(),
                executed: Vec::new(),
            }
        }

        fn affecting(rows: u64) -> Result<QueryOutcome, ExecutorError> {
            Ok(QueryOutcome::statement_result(rows, None))
        }
    }

    #[async_trait]
    impl SqlExecutor for FakeExecutor {
        async fn execute(&mut self, sql: &str) -> Result<QueryOutcome, ExecutorError> {
            self.executed.push(sql.to_string());
            self.responses
                .pop_front()
                .unwrap_or_else(|| Self::affecting(1))
        }
    }

    struct FakeLookup {
        primary_key: Result<Vec<String>, SchemaLookupError>,
        references: Result<Vec<ForeignKeyRef>, SchemaLookupError>,
        tables_asked: Vec<String>,
    }

    impl FakeLookup {
        fn new(primary_key: Vec<&str>, references: Vec<ForeignKeyRef>) -> Self {
            Self {
                primary_key: Ok(primary_key.into_iter().map(str::to_string).collect()),
                references: Ok(references),
                tables_asked: Vec::new(),
            }
        }

        fn failing() -> Self {
            Self {
                primary_key: Err(SchemaLookupError::new("schema unavailable")),
                references: Err(SchemaLookupError::new("schema unavailable")),
                tables_asked: Vec::new(),
            }
        }
    }

    #[async_trait]
    impl SchemaLookup for FakeLookup {
        async fn primary_key_columns(
            &mut self,
            table: &str,
        ) -> Result<Vec<String>, SchemaLookupError> {
            self.tables_asked.push(table.to_string());
            self.primary_key.clone()
        }

        async fn foreign_keys(
            &mut self,
            table: &str,
        ) -> Result<Vec<ForeignKeyRef>, SchemaLookupError> {
            self.tables_asked.push(table.to_string());
            self.references.clone()
        }
    }

    fn users_outcome() -> QueryOutcome {
        QueryOutcome::result_set(
            vec![
                ColumnMeta::new("id", ColumnKind::Numeric).with_table("users"),
                ColumnMeta::new("name", ColumnKind::Text).with_table("users"),
                ColumnMeta::new("age", ColumnKind::Numeric).with_table("users"),
            ],
            vec![
                vec![
                    CellValue::Int(1),
                    CellValue::Text("ann".to_string()),
                    CellValue::Int(34),
                ],
                vec![
                    CellValue::Int(2),
                    CellValue::Text("bob".to_string()),
                    CellValue::Null,
                ],
                vec![
                    CellValue::Int(3),
                    CellValue::Text("cyd".to_string()),
                    CellValue::Int(28),
                ],
            ],
        )
    }

    fn users_model() -> ResultModel {
        ResultModel::load(users_outcome(), 120, GridSettings::default())
    }

    #[test]
    fn loading_detects_the_single_source_table() {
        let model = users_model();
        assert_eq!(model.detected_table(), Some("users"));
        assert_eq!(model.row_count(), 3);
        assert_eq!(model.page_count(), 1);
        assert_eq!(model.visible_columns(), vec![0, 1, 2]);
    }

    #[test]
    fn mixed_source_tables_disable_detection() {
        let outcome = QueryOutcome::result_set(
            vec![
                ColumnMeta::new("id", ColumnKind::Numeric).with_table("users"),
                ColumnMeta::new("total", ColumnKind::Numeric).with_table("orders"),
            ],
            Vec::new(),
        );
        let model = ResultModel::load(outcome, 120, GridSettings::default());
        assert_eq!(model.detected_table(), None);
        assert!(model.load_more_sql(100).is_err());
    }

    #[test]
    fn computed_columns_disable_detection() {
        let outcome = QueryOutcome::result_set(
            vec![
                ColumnMeta::new("id", ColumnKind::Numeric).with_table("users"),
                ColumnMeta::new("expr", ColumnKind::Numeric),
            ],
            Vec::new(),
        );
        let model = ResultModel::load(outcome, 120, GridSettings::default());
        assert_eq!(model.detected_table(), None);
    }

    #[test]
    fn edits_overlay_without_touching_originals() {
        let mut model = users_model();
        let stored = model
            .apply_edit(0, 1, CellValue::Text("anne".to_string()))
            .expect("cell exists");
        assert!(stored);
        assert_eq!(
            model.effective_cell(0, 1),
            Some(&CellValue::Text("anne".to_string()))
        );
        assert_eq!(
            model.original_cell(0, 1),
            Some(&CellValue::Text("ann".to_string()))
        );
        assert!(model.has_pending_edit(0, 1));
        assert_eq!(model.pending_edit_count(), 1);
    }

    #[test]
    fn re_entering_the_original_value_reverts_the_edit() {
        let mut model = users_model();
        model
            .apply_edit(0, 1, CellValue::Text("anne".to_string()))
            .expect("cell exists");
        let stored = model
            .apply_edit(0, 1, CellValue::Text("ann".to_string()))
            .expect("cell exists");
        assert!(!stored);
        assert!(!model.has_pending_edits());
    }

    #[test]
    fn edits_outside_the_grid_are_rejected() {
        let mut model = users_model();
        let result = model.apply_edit(9, 0, CellValue::Null);
        assert_eq!(
            result,
            Err(ResultModelError::NoCellAtPosition { row: 9, column: 0 })
        );
    }

    #[test]
    fn unknown_column_names_are_reported() {
        let model = users_model();
        assert_eq!(
            model.column_index("nope"),
            Err(ResultModelError::ColumnNotFound {
                name: "nope".to_string()
            })
        );
        assert_eq!(model.column_index("age"), Ok(2));
    }

    #[test]
    fn pinned_columns_lead_the_visible_set() {
        let outcome = QueryOutcome::result_set(
            (0..6)
                .map(|index| {
                    ColumnMeta::new(format!("col_{index}"), ColumnKind::Text).with_table("t")
                })
                .collect(),
            vec![(0..6)
                .map(|index| CellValue::Text("x".repeat(30 + index)))
                .collect()],
        );
        let mut model = ResultModel::load(outcome, 60, GridSettings::default());
        assert!(model.page_count() > 1);

        assert!(model.toggle_pin(3));
        assert!(model.is_pinned(3));
        let visible = model.visible_columns();
        assert_eq!(visible.first(), Some(&3));
        assert!(!visible[1..].contains(&3));

        assert!(model.toggle_pin(3));
        assert!(!model.is_pinned(3));
    }

    #[test]
    fn widen_and_narrow_respect_the_floor() {
        let mut model = users_model();
        let start = model.column_width(0).expect("column exists");
        assert!(model.widen_column(0));
        assert_eq!(model.column_width(0), Some(start + 5));

        for _ in 0..10 {
            model.narrow_column(0);
        }
        assert_eq!(model.column_width(0), Some(5));
        assert!(!model.widen_column(9));
    }

    #[test]
    fn page_navigation_clamps_at_both_ends() {
        let mut model = users_model();
        assert!(!model.prev_page());
        assert!(!model.next_page());
        assert_eq!(model.current_page(), 0);
    }

    #[test]
    fn show_column_switches_to_its_page() {
        let outcome = QueryOutcome::result_set(
            (0..6)
                .map(|index| {
                    ColumnMeta::new(format!("col_{index}"), ColumnKind::Text).with_table("t")
                })
                .collect(),
            vec![(0..6).map(|_| CellValue::Text("x".repeat(30))).collect()],
        );
        let mut model = ResultModel::load(outcome, 60, GridSettings::default());
        assert!(model.page_count() > 1);

        assert!(model.show_column(5));
        assert!(model.visible_columns().contains(&5));
        assert!(model.show_column(0));
        assert!(model.visible_columns().contains(&0));
        assert!(!model.show_column(40));
    }

    #[test]
    fn sorting_clears_edits_and_resets_the_row_offset() {
        let mut model = users_model();
        model
            .apply_edit(0, 1, CellValue::Text("anne".to_string()))
            .expect("cell exists");
        model.set_row_offset(2);

        assert!(model.sort_by_column(2, false));
        assert!(!model.has_pending_edits());
        assert_eq!(model.row_offset(), 0);

        let ages: Vec<String> = (0..3)
            .map(|row| model.original_cell(row, 2).expect("cell exists").display_text())
            .collect();
        assert_eq!(ages, vec!["28", "34", "NULL"]);
    }

    #[test]
    fn sort_by_name_rejects_unknown_columns() {
        let mut model = users_model();
        assert!(model.sort_by_name("age", true).is_ok());
        assert!(matches!(
            model.sort_by_name("ghost", false),
            Err(ResultModelError::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn appending_an_empty_chunk_is_an_empty_fetch() {
        let mut model = users_model();
        assert_eq!(
            model.append_rows(Vec::new()),
            Err(ResultModelError::EmptyFetch)
        );

        let appended = model
            .append_rows(vec![vec![
                CellValue::Int(4),
                CellValue::Text("dee".to_string()),
                CellValue::Int(51),
            ]])
            .expect("rows should append");
        assert_eq!(appended, 1);
        assert_eq!(model.row_count(), 4);
    }

    #[test]
    fn load_more_sql_offsets_past_loaded_rows() {
        let model = users_model();
        assert_eq!(
            model.load_more_sql(200).expect("table detected"),
            "SELECT * FROM users LIMIT 200 OFFSET 3"
        );
    }

    #[tokio::test]
    async fn attach_schema_resolves_keys_and_references() {
        let mut model = users_model();
        let mut lookup = FakeLookup::new(vec!["id"], vec![ForeignKeyRef::new("age", "ages", "id")]);
        model.attach_schema(&mut lookup).await;

        assert!(model.is_editable());
        assert_eq!(model.primary_key(), &[0]);
        assert_eq!(
            model.foreign_key(2).map(|target| target.referenced_table.as_str()),
            Some("ages")
        );
        assert_eq!(lookup.tables_asked, vec!["users", "users"]);
    }

    #[tokio::test]
    async fn a_key_outside_the_projection_disables_editing() {
        let mut model = users_model();
        let mut lookup = FakeLookup::new(vec!["uuid"], Vec::new());
        model.attach_schema(&mut lookup).await;
        assert!(!model.is_editable());
    }

    #[tokio::test]
    async fn schema_lookup_failures_degrade_to_read_only() {
        let mut model = users_model();
        let mut lookup = FakeLookup::failing();
        model.attach_schema(&mut lookup).await;
        assert!(!model.is_editable());
        assert!(model.foreign_key(0).is_none());
    }

    #[tokio::test]
    async fn committing_executes_updates_and_clears_edits() {
        let mut model = users_model();
        model.attach_primary_key(&["id"]);
        model
            .apply_edit(0, 1, CellValue::Text("anne".to_string()))
            .expect("cell exists");
        model
            .apply_edit(2, 2, CellValue::Int(29))
            .expect("cell exists");

        let mut executor = FakeExecutor::new(vec![
            FakeExecutor::affecting(1),
            FakeExecutor::affecting(1),
        ]);
        let summary = model
            .commit_edits(&mut executor)
            .await
            .expect("commit should succeed");

        assert_eq!(
            summary,
            CommitSummary {
                statements_executed: 2,
                rows_affected: 2
            }
        );
        assert_eq!(
            executor.executed,
            vec![
                "UPDATE users SET name = 'anne' WHERE id = 1",
                "UPDATE users SET age = 29 WHERE id = 3",
            ]
        );
        assert!(!model.has_pending_edits());
        assert_eq!(
            model.original_cell(0, 1),
            Some(&CellValue::Text("anne".to_string()))
        );
        assert_eq!(model.original_cell(2, 2), Some(&CellValue::Int(29)));
    }

    #[tokio::test]
    async fn a_failed_statement_stops_the_batch_and_keeps_edits() {
        let mut model = users_model();
        model.attach_primary_key(&["id"]);
        model
            .apply_edit(0, 1, CellValue::Text("anne".to_string()))
            .expect("cell exists");
        model
            .apply_edit(2, 2, CellValue::Int(29))
            .expect("cell exists");

        let mut executor = FakeExecutor::new(vec![
            Err(ExecutorError::new("lock wait timeout")),
            FakeExecutor::affecting(1),
        ]);
        let error = model
            .commit_edits(&mut executor)
            .await
            .expect_err("commit should fail");

        assert!(matches!(error, CommitError::Statement { row: 0, .. }));
        assert_eq!(executor.executed.len(), 1);
        assert_eq!(model.pending_edit_count(), 2);
    }

    #[tokio::test]
    async fn committing_without_a_key_is_rejected() {
        let mut model = users_model();
        model
            .apply_edit(0, 1, CellValue::Text("anne".to_string()))
            .expect("cell exists");

        let mut executor = FakeExecutor::new(Vec::new());
        let error = model
            .commit_edits(&mut executor)
            .await
            .expect_err("commit should fail");
        assert!(matches!(error, CommitError::NoPrimaryKey { .. }));
        assert!(executor.executed.is_empty());
    }

    #[tokio::test]
    async fn committing_nothing_is_a_no_op() {
        let mut model = users_model();
        let mut executor = FakeExecutor::new(Vec::new());
        let summary = model
            .commit_edits(&mut executor)
            .await
            .expect("empty commit is fine");
        assert_eq!(summary.statements_executed, 0);
        assert!(executor.executed.is_empty());
    }

    #[test]
    fn foreign_key_sql_previews_the_referenced_rows() {
        let mut model = users_model();
        model.attach_foreign_keys(vec![ForeignKeyRef::new("age", "ages", "id")]);

        assert_eq!(
            model.foreign_key_sql(0, 2, 200).expect("reference exists"),
            "SELECT * FROM ages WHERE id = 34 LIMIT 200"
        );
        assert_eq!(
            model.foreign_key_sql(1, 2, 200),
            Err(ResultModelError::NullReference)
        );
        assert_eq!(
            model.foreign_key_sql(0, 1, 200),
            Err(ResultModelError::NoForeignKey { column: 1 })
        );
    }

    #[test]
    fn exports_see_the_edit_overlay() {
        let mut model = users_model();
        model.attach_primary_key(&["id"]);
        model
            .apply_edit(0, 1, CellValue::Text("anne".to_string()))
            .expect("cell exists");

        let csv = model.csv_document();
        assert!(csv.starts_with("id,name,age\n"));
        assert!(csv.contains("1,anne,34"));

        let dump = model.insert_dump().expect("table detected");
        assert!(dump.contains("INSERT INTO users (id, name, age) VALUES (1, 'anne', 34);"));
    }

    #[test]
    fn addressed_cells_cover_the_visible_window() {
        let model = users_model();
        let cells = model.addressed_cells(1..3);
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0].row, 1);
        assert_eq!(cells[0].column, 0);
        assert_eq!(cells[0].original, CellValue::Int(2));
    }

    #[test]
    fn viewport_changes_recompute_pages() {
        let outcome = QueryOutcome::result_set(
            (0..4)
                .map(|index| {
                    ColumnMeta::new(format!("col_{index}"), ColumnKind::Text).with_table("t")
                })
                .collect(),
            vec![(0..4).map(|_| CellValue::Text("x".repeat(30))).collect()],
        );
        let mut model = ResultModel::load(outcome, 200, GridSettings::default());
        assert_eq!(model.page_count(), 1);

        model.set_viewport_width(40);
        assert!(model.page_count() > 1);
    }
}
