use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::{Frame, Terminal};
use tabula_adapters::export as file_export;
use tabula_adapters::mysql::MysqlSession;
use tabula_core::cell_address::{self, CellRef};
use tabula_core::command::{CommandContext, GridCommand};
use tabula_core::config::{ConnectionProfile, GridSettings};
use tabula_core::edit_tracker::CommitError;
use tabula_core::executor::{ColumnKind, ColumnMeta, ExecutorError, QueryOutcome, SqlExecutor};
use tabula_core::layout_engine;
use tabula_core::result_model::{CommitSummary, ResultModel};
use tabula_core::sort_filter;
use tabula_core::value_codec::{self, CellValue};
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tracing::warn;

const TICK_RATE: Duration = Duration::from_millis(120);
const HEADER_ROWS: u16 = 3;
const FOOTER_ROWS: u16 = 4;
// Header block, footer block, grid borders, column header and separator line.
const GRID_CHROME_ROWS: u16 = HEADER_ROWS + FOOTER_ROWS + 4;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportKind {
    Csv,
    Json,
    Insert,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Grid,
    QueryInput,
    FilterInput,
    JumpInput,
    EditInput { set_null: bool },
    ExportInput(ExportKind),
    ConfirmCommit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    Move(DirectionKey),
    PageRows(DirectionKey),
    Invoke(GridCommand),
    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,
    ToggleNullInput,
    ConfirmYes,
    ConfirmNo,
}

#[derive(Debug)]
struct SessionBridge {
    runtime: Runtime,
    session: Option<MysqlSession>,
}

impl SessionBridge {
    fn new() -> Result<Self, TuiError> {
        let runtime = Builder::new_multi_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            session: None,
        })
    }

    fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn connect(&mut self, profile: &ConnectionProfile) -> Result<(), ExecutorError> {
        let session = self.runtime.block_on(MysqlSession::connect(profile))?;
        self.session = Some(session);
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<QueryOutcome, ExecutorError> {
        let Some(session) = self.session.as_mut() else {
            return Err(ExecutorError::new("no active database session"));
        };
        self.runtime.block_on(session.execute(sql))
    }

    fn attach_schema(&mut self, model: &mut ResultModel) {
        if let Some(session) = self.session.as_mut() {
            self.runtime.block_on(model.attach_schema(session));
        }
    }

    fn commit(&mut self, model: &mut ResultModel) -> Option<Result<CommitSummary, CommitError>> {
        let session = self.session.as_mut()?;
        Some(self.runtime.block_on(model.commit_edits(session)))
    }

    fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            if let Err(error) = self.runtime.block_on(session.disconnect()) {
                warn!(%error, "disconnect failed");
            }
        }
    }
}

#[derive(Debug)]
struct GridApp {
    session: SessionBridge,
    model: Option<ResultModel>,
    cursor: CellRef,
    mode: Mode,
    input: String,
    base_query: String,
    active_query: String,
    filter_active: bool,
    settings: GridSettings,
    read_only: bool,
    profile_name: Option<String>,
    database: Option<String>,
    status_line: String,
    show_help: bool,
    should_quit: bool,
    grid_rows: usize,
    viewport_width: usize,
}

impl GridApp {
    fn new(session: SessionBridge, settings: GridSettings) -> Self {
        Self {
            session,
            model: None,
            cursor: CellRef::new(0, 0),
            mode: Mode::Grid,
            input: String::new(),
            base_query: String::new(),
            active_query: String::new(),
            filter_active: false,
            settings,
            read_only: false,
            profile_name: None,
            database: None,
            status_line: "Press : to run a query, ? for the keymap".to_string(),
            show_help: false,
            should_quit: false,
            grid_rows: 20,
            viewport_width: 120,
        }
    }

    fn connect(&mut self, profile: &ConnectionProfile) {
        self.read_only = profile.read_only;
        self.profile_name = Some(profile.name.clone());
        self.database = profile.database.clone();
        match self.session.connect(profile) {
            Ok(()) => {
                self.status_line = format!(
                    "Connected to {}:{} as {}",
                    profile.host, profile.port, profile.user
                );
            }
            Err(error) => self.status_line = format!("Connection failed: {error}"),
        }
    }

    fn open_demo(&mut self) {
        let mut model = ResultModel::load(demo_outcome(), self.viewport_width, self.settings);
        model.attach_primary_key(&["id"]);
        self.base_query = "SELECT * FROM users".to_string();
        self.active_query = self.base_query.clone();
        self.model = Some(model);
        self.cursor = CellRef::new(0, 0);
        self.status_line = "Offline demo grid (no profile given)".to_string();
    }

    fn handle(&mut self, msg: Msg) {
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::ToggleHelp => self.show_help = !self.show_help,
            Msg::Move(direction) => self.move_cursor(direction),
            Msg::PageRows(direction) => self.page_rows(direction),
            Msg::Invoke(command) => self.invoke(command),
            Msg::InputChar(c) => self.input.push(c),
            Msg::InputBackspace => {
                self.input.pop();
            }
            Msg::InputCancel => {
                self.mode = Mode::Grid;
                self.input.clear();
                self.status_line = "Cancelled".to_string();
            }
            Msg::InputSubmit => self.submit_input(),
            Msg::ToggleNullInput => {
                if let Mode::EditInput { set_null } = self.mode {
                    self.mode = Mode::EditInput {
                        set_null: !set_null,
                    };
                }
            }
            Msg::ConfirmYes => self.confirm_commit(),
            Msg::ConfirmNo => {
                self.mode = Mode::Grid;
                self.status_line = "Commit cancelled".to_string();
            }
        }
    }

    fn invoke(&mut self, command: GridCommand) {
        if !command.is_enabled(&self.command_context()) {
            self.status_line = format!("Not available: {}", command.title());
            return;
        }

        match command {
            GridCommand::RunQuery => {
                let initial = self.active_query.clone();
                self.open_input(Mode::QueryInput, initial);
            }
            GridCommand::RerunQuery => {
                let sql = self.active_query.clone();
                self.run_statement(&sql, false);
            }
            GridCommand::PrevPage => self.turn_page(false),
            GridCommand::NextPage => self.turn_page(true),
            GridCommand::WidenColumn => self.resize_column(true),
            GridCommand::NarrowColumn => self.resize_column(false),
            GridCommand::TogglePin => self.toggle_pin(),
            GridCommand::SortAscending => self.sort_cursor_column(false),
            GridCommand::SortDescending => self.sort_cursor_column(true),
            GridCommand::JumpToColumn => self.open_input(Mode::JumpInput, String::new()),
            GridCommand::ApplyFilter => self.open_input(Mode::FilterInput, String::new()),
            GridCommand::ClearFilter => self.clear_filter(),
            GridCommand::EditCell => {
                let CellRef { row, column } = self.cursor;
                let initial = self
                    .model
                    .as_ref()
                    .and_then(|model| model.effective_cell(row, column))
                    .map_or_else(String::new, |cell| {
                        if cell.is_null() {
                            String::new()
                        } else {
                            cell.display_text()
                        }
                    });
                self.open_input(Mode::EditInput { set_null: false }, initial);
            }
            GridCommand::SetCellNull => self.apply_cell_edit("", true),
            GridCommand::CommitEdits => self.mode = Mode::ConfirmCommit,
            GridCommand::ExportCsv => {
                self.open_input(Mode::ExportInput(ExportKind::Csv), "export.csv".to_string());
            }
            GridCommand::ExportJson => {
                self.open_input(
                    Mode::ExportInput(ExportKind::Json),
                    "export.json".to_string(),
                );
            }
            GridCommand::CopyInsert => {
                self.open_input(Mode::ExportInput(ExportKind::Insert), "dump.sql".to_string());
            }
            GridCommand::FollowForeignKey => self.follow_reference(),
            GridCommand::LoadMoreRows => self.load_more(),
        }
    }

    fn open_input(&mut self, mode: Mode, initial: String) {
        self.mode = mode;
        self.input = initial;
        let hint = match mode {
            Mode::QueryInput => "Enter SQL, Esc to cancel",
            Mode::FilterInput => "Enter a WHERE predicate, Esc to cancel",
            Mode::JumpInput => "Enter a column name, Esc to cancel",
            Mode::EditInput { .. } => "Edit the cell, Ctrl+N toggles NULL, Esc to cancel",
            Mode::ExportInput(_) => "Enter an output path, Esc to cancel",
            Mode::Grid | Mode::ConfirmCommit => return,
        };
        self.status_line = hint.to_string();
    }

    fn submit_input(&mut self) {
        let input = std::mem::take(&mut self.input);
        let mode = self.mode;
        self.mode = Mode::Grid;

        match mode {
            Mode::QueryInput => {
                let sql = input.trim().to_string();
                if sql.is_empty() {
                    self.status_line = "Empty query".to_string();
                } else {
                    self.run_statement(&sql, true);
                }
            }
            Mode::FilterInput => self.apply_filter(input.trim()),
            Mode::JumpInput => self.jump_to_column(input.trim()),
            Mode::EditInput { set_null } => self.apply_cell_edit(&input, set_null),
            Mode::ExportInput(kind) => self.perform_export(kind, input.trim()),
            Mode::Grid | Mode::ConfirmCommit => {}
        }
    }

    fn run_statement(&mut self, sql: &str, track_base: bool) -> bool {
        match self.session.execute(sql) {
            Ok(outcome) if outcome.is_result_set() => {
                let mut model = ResultModel::load(outcome, self.viewport_width, self.settings);
                self.session.attach_schema(&mut model);
                let rows = model.row_count();
                let pages = model.page_count();
                self.model = Some(model);
                self.cursor = CellRef::new(0, 0);
                self.active_query = sql.to_string();
                if track_base {
                    self.base_query = sql.to_string();
                    self.filter_active = false;
                }
                self.status_line = format!("{rows} rows ({pages} column pages)");
                true
            }
            Ok(outcome) => {
                self.status_line = format!("{} rows affected", outcome.affected_rows);
                false
            }
            Err(error) => {
                self.status_line = format!("Query failed: {error}");
                false
            }
        }
    }

    fn apply_filter(&mut self, predicate: &str) {
        if predicate.is_empty() {
            self.clear_filter();
            return;
        }
        let filtered = sort_filter::inject_where(&self.base_query, predicate);
        if self.run_statement(&filtered, false) {
            self.filter_active = true;
            let rows = self.model.as_ref().map_or(0, ResultModel::row_count);
            self.status_line = format!("Filter applied ({rows} rows)");
        }
    }

    fn clear_filter(&mut self) {
        let sql = self.base_query.clone();
        if self.run_statement(&sql, false) {
            self.filter_active = false;
            self.status_line = "Filter cleared".to_string();
        }
    }

    fn jump_to_column(&mut self, name: &str) {
        let Some(model) = self.model.as_mut() else {
            return;
        };
        match model.column_index(name) {
            Ok(index) => {
                model.show_column(index);
                self.cursor.column = index;
                self.status_line = format!("Jumped to {name}");
            }
            Err(error) => self.status_line = format!("Jump failed: {error}"),
        }
    }

    fn apply_cell_edit(&mut self, input: &str, set_null: bool) {
        let CellRef { row, column } = self.cursor;
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let proposed = if set_null {
            CellValue::Null
        } else {
            let kind = model
                .columns()
                .get(column)
                .map_or(ColumnKind::Text, |meta| meta.kind);
            proposed_cell(input, kind)
        };
        match model.apply_edit(row, column, proposed) {
            Ok(true) => {
                self.status_line = format!("Edit staged ({} pending)", model.pending_edit_count());
            }
            Ok(false) => {
                self.status_line =
                    format!("Edit reverted ({} pending)", model.pending_edit_count());
            }
            Err(error) => self.status_line = format!("Edit failed: {error}"),
        }
    }

    fn confirm_commit(&mut self) {
        self.mode = Mode::Grid;
        let Some(model) = self.model.as_mut() else {
            return;
        };
        match self.session.commit(model) {
            None => self.status_line = "No session to commit against".to_string(),
            Some(Ok(summary)) => {
                self.status_line = format!(
                    "Committed {} statements ({} rows affected)",
                    summary.statements_executed, summary.rows_affected
                );
            }
            Some(Err(error)) => self.status_line = format!("Commit failed: {error}"),
        }
    }

    fn perform_export(&mut self, kind: ExportKind, raw_path: &str) {
        if raw_path.is_empty() {
            self.status_line = "Export path required".to_string();
            return;
        }
        let Some(model) = self.model.as_ref() else {
            return;
        };
        let path = PathBuf::from(raw_path);
        let result = match kind {
            ExportKind::Csv => {
                file_export::write_csv(&path, &model.csv_document()).map(|()| model.row_count())
            }
            ExportKind::Json => {
                file_export::write_json(&path, model.columns(), &model.effective_rows())
            }
            ExportKind::Insert => match model.insert_dump() {
                Ok(document) => {
                    file_export::write_text(&path, &document).map(|()| model.row_count())
                }
                Err(error) => {
                    self.status_line = format!("Export failed: {error}");
                    return;
                }
            },
        };
        match result {
            Ok(rows) => self.status_line = format!("Exported {rows} rows to {}", path.display()),
            Err(error) => self.status_line = format!("Export failed: {error}"),
        }
    }

    fn follow_reference(&mut self) {
        let sql = {
            let Some(model) = self.model.as_ref() else {
                return;
            };
            match model.foreign_key_sql(
                self.cursor.row,
                self.cursor.column,
                model.settings().preview_limit,
            ) {
                Ok(sql) => sql,
                Err(error) => {
                    self.status_line = format!("Follow failed: {error}");
                    return;
                }
            }
        };
        self.run_statement(&sql, true);
    }

    fn load_more(&mut self) {
        let sql = match self
            .model
            .as_ref()
            .map(|model| model.load_more_sql(model.settings().preview_limit))
        {
            Some(Ok(sql)) => sql,
            Some(Err(error)) => {
                self.status_line = format!("Load more failed: {error}");
                return;
            }
            None => return,
        };
        match self.session.execute(&sql) {
            Ok(outcome) => {
                if let Some(model) = self.model.as_mut() {
                    match model.append_rows(outcome.rows) {
                        Ok(appended) => {
                            self.status_line =
                                format!("Loaded {appended} more rows ({} total)", model.row_count());
                        }
                        Err(error) => self.status_line = format!("Load more failed: {error}"),
                    }
                }
            }
            Err(error) => self.status_line = format!("Load more failed: {error}"),
        }
    }

    fn sort_cursor_column(&mut self, descending: bool) {
        let column = self.cursor.column;
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let had_pending = model.has_pending_edits();
        if !model.sort_by_column(column, descending) {
            return;
        }
        let name = model
            .columns()
            .get(column)
            .map_or_else(String::new, |meta| meta.name.clone());
        self.cursor.row = 0;
        let order = if descending { "descending" } else { "ascending" };
        self.status_line = if had_pending {
            format!("Sorted by {name} {order}; pending edits discarded")
        } else {
            format!("Sorted by {name} {order}")
        };
    }

    fn turn_page(&mut self, forward: bool) {
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let moved = if forward {
            model.next_page()
        } else {
            model.prev_page()
        };
        let page = model.current_page() + 1;
        let pages = model.page_count();
        if moved {
            self.relocate_cursor();
            self.status_line = format!("Column page {page}/{pages}");
        }
    }

    fn resize_column(&mut self, widen: bool) {
        let column = self.cursor.column;
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let changed = if widen {
            model.widen_column(column)
        } else {
            model.narrow_column(column)
        };
        let width = model.column_width(column).unwrap_or_default();
        if changed {
            self.relocate_cursor();
            self.status_line = format!("Column width: {width}");
        }
    }

    fn toggle_pin(&mut self) {
        let column = self.cursor.column;
        let Some(model) = self.model.as_mut() else {
            return;
        };
        if !model.toggle_pin(column) {
            return;
        }
        let pinned = model.is_pinned(column);
        let name = model
            .columns()
            .get(column)
            .map_or_else(String::new, |meta| meta.name.clone());
        self.relocate_cursor();
        self.status_line = if pinned {
            format!("Pinned {name}")
        } else {
            format!("Unpinned {name}")
        };
    }

    fn move_cursor(&mut self, direction: DirectionKey) {
        let (visible, row_count) = {
            let Some(model) = self.model.as_ref() else {
                return;
            };
            (model.visible_columns(), model.row_count())
        };
        if visible.is_empty() || row_count == 0 {
            return;
        }
        let position = visible
            .iter()
            .position(|&column| column == self.cursor.column)
            .unwrap_or(0);
        match direction {
            DirectionKey::Up => self.cursor.row = self.cursor.row.saturating_sub(1),
            DirectionKey::Down => self.cursor.row = (self.cursor.row + 1).min(row_count - 1),
            DirectionKey::Left => {
                if position > 0 {
                    self.cursor.column = visible[position - 1];
                }
            }
            DirectionKey::Right => {
                if position + 1 < visible.len() {
                    self.cursor.column = visible[position + 1];
                }
            }
        }
        self.scroll_cursor_into_view();
    }

    fn page_rows(&mut self, direction: DirectionKey) {
        let Some(model) = self.model.as_ref() else {
            return;
        };
        if model.row_count() == 0 {
            return;
        }
        let step = self.grid_rows.max(1);
        let last = model.row_count() - 1;
        self.cursor.row = match direction {
            DirectionKey::Up | DirectionKey::Left => self.cursor.row.saturating_sub(step),
            DirectionKey::Down | DirectionKey::Right => (self.cursor.row + step).min(last),
        };
        self.scroll_cursor_into_view();
    }

    fn scroll_cursor_into_view(&mut self) {
        let visible_rows = self.grid_rows.max(1);
        let cursor_row = self.cursor.row;
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let offset = model.row_offset();
        if cursor_row < offset {
            model.set_row_offset(cursor_row);
        } else if cursor_row >= offset + visible_rows {
            model.set_row_offset(cursor_row + 1 - visible_rows);
        }
    }

    fn relocate_cursor(&mut self) {
        let Some(model) = self.model.as_ref() else {
            self.cursor = CellRef::new(0, 0);
            return;
        };
        if model.row_count() == 0 || model.column_count() == 0 {
            self.cursor = CellRef::new(0, 0);
            return;
        }
        let row = self.cursor.row.min(model.row_count() - 1);
        let target = CellRef::new(row, self.cursor.column);
        let cells = model.addressed_cells(row..row + 1);
        if let Some(cell) =
            cell_address::locate(&cells, target).and_then(|index| cells.get(index))
        {
            self.cursor = cell.position();
        }
    }

    fn set_viewport(&mut self, width: u16, height: u16) {
        self.viewport_width = usize::from(width.saturating_sub(2));
        self.grid_rows = usize::from(height.saturating_sub(GRID_CHROME_ROWS)).max(1);
        if let Some(model) = self.model.as_mut() {
            model.set_viewport_width(self.viewport_width);
        }
        self.relocate_cursor();
        self.scroll_cursor_into_view();
    }

    fn command_context(&self) -> CommandContext {
        let model = self.model.as_ref();
        CommandContext {
            has_result: model.is_some(),
            has_session: self.session.has_session(),
            read_only: self.read_only,
            editable: model.is_some_and(ResultModel::is_editable),
            has_pending_edits: model.is_some_and(ResultModel::has_pending_edits),
            fk_under_cursor: model
                .is_some_and(|model| model.foreign_key(self.cursor.column).is_some()),
            multiple_pages: model.is_some_and(|model| model.page_count() > 1),
            table_detected: model.is_some_and(|model| model.detected_table().is_some()),
            filter_active: self.filter_active,
        }
    }

    fn shutdown(&mut self) {
        self.session.disconnect();
    }
}

pub fn run(profile: Option<ConnectionProfile>, settings: GridSettings) -> Result<(), TuiError> {
    let session = SessionBridge::new()?;
    let mut app = GridApp::new(session, settings);
    match profile {
        Some(profile) => app.connect(&profile),
        None => app.open_demo(),
    }

    let mut terminal = setup_terminal()?;
    let size = terminal.size()?;
    app.set_viewport(size.width, size.height);

    let run_result = run_loop(&mut terminal, &mut app);
    app.shutdown();
    let restore_result = restore_terminal(&mut terminal);

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut GridApp,
) -> Result<(), TuiError> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        if event::poll(TICK_RATE)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(message) = map_key_event(key, app.mode) {
                        app.handle(message);
                    }
                }
                Event::Resize(width, height) => app.set_viewport(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render(frame: &mut Frame<'_>, app: &GridApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_ROWS),
            Constraint::Min(8),
            Constraint::Length(FOOTER_ROWS),
        ])
        .split(frame.area());

    frame.render_widget(header_widget(app), chunks[0]);
    frame.render_widget(body_widget(app), chunks[1]);
    frame.render_widget(footer_widget(app), chunks[2]);

    if app.show_help {
        render_help_popup(frame);
    }
}

fn header_widget(app: &GridApp) -> Paragraph<'static> {
    let mut spans = vec![Span::styled(
        " tabula ",
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw(format!(
        "| profile: {} ",
        app.profile_name.as_deref().unwrap_or("offline")
    )));
    spans.push(Span::raw(format!(
        "| db: {} ",
        app.database.as_deref().unwrap_or("-")
    )));
    if let Some(model) = app.model.as_ref() {
        spans.push(Span::raw(format!(
            "| table: {} ",
            model.detected_table().unwrap_or("-")
        )));
        spans.push(Span::raw(format!(
            "| cols {}/{} ",
            model.current_page() + 1,
            model.page_count()
        )));
        if model.has_pending_edits() {
            spans.push(Span::styled(
                format!("| {} pending ", model.pending_edit_count()),
                Style::default().fg(Color::Yellow),
            ));
        }
    }
    if app.filter_active {
        spans.push(Span::raw("| filtered "));
    }
    if app.read_only {
        spans.push(Span::raw("| read-only "));
    }

    Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL))
}

fn body_widget(app: &GridApp) -> Paragraph<'static> {
    let lines = match app.model.as_ref() {
        Some(model) => grid_lines(app, model),
        None => vec![
            Line::from("No result grid loaded."),
            Line::from("Press : to run a query, ? for the keymap."),
        ],
    };
    let title = if app.active_query.is_empty() {
        "grid".to_string()
    } else {
        app.active_query.clone()
    };
    Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title))
}

fn grid_lines(app: &GridApp, model: &ResultModel) -> Vec<Line<'static>> {
    let visible = model.visible_columns();
    let padding = model.settings().cell_padding;
    let pad = " ".repeat(padding);

    let mut header_spans = vec![Span::raw("|")];
    for &column in &visible {
        let width = model.column_width(column).unwrap_or_default();
        let meta = model.columns().get(column);
        let name = meta.map_or("", |meta| meta.name.as_str());
        let label = if model.is_pinned(column) {
            format!("*{name}")
        } else {
            name.to_string()
        };
        let text = pad_cell(&value_codec::truncate_for_cell(&label, width), width);
        header_spans.push(Span::styled(
            format!("{pad}{text}{pad}"),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        header_spans.push(Span::raw("|"));
    }

    let line_width = 1 + visible
        .iter()
        .map(|&column| {
            layout_engine::cell_span(model.column_width(column).unwrap_or_default(), padding)
        })
        .sum::<usize>();

    let mut lines = vec![Line::from(header_spans), Line::from("-".repeat(line_width))];

    let start = model.row_offset();
    let end = (start + app.grid_rows).min(model.row_count());
    for row in start..end {
        let mut spans = vec![Span::raw("|")];
        for &column in &visible {
            let width = model.column_width(column).unwrap_or_default();
            let raw = model
                .effective_cell(row, column)
                .map_or_else(String::new, CellValue::display_text);
            let text = pad_cell(&value_codec::truncate_for_cell(&raw, width), width);

            let mut style = Style::default();
            if model
                .effective_cell(row, column)
                .is_some_and(CellValue::is_null)
            {
                style = style.add_modifier(Modifier::DIM);
            }
            if model.has_pending_edit(row, column) {
                style = style.fg(Color::Yellow);
            }
            if row == app.cursor.row && column == app.cursor.column {
                style = style.add_modifier(Modifier::REVERSED);
            }

            spans.push(Span::styled(format!("{pad}{text}{pad}"), style));
            spans.push(Span::raw("|"));
        }
        lines.push(Line::from(spans));
    }

    lines
}

fn footer_widget(app: &GridApp) -> Paragraph<'static> {
    let context = app.command_context();
    let commands = GridCommand::enabled_commands(&context);
    let command_line = if commands.is_empty() {
        "No commands available".to_string()
    } else {
        commands
            .iter()
            .map(|command| format!("{}:{}", key_label(*command), command.title()))
            .collect::<Vec<_>>()
            .join("  ")
    };

    let prompt = match app.mode {
        Mode::Grid => format!("Status: {}", app.status_line),
        Mode::QueryInput => format!("query> {}_", app.input),
        Mode::FilterInput => format!("filter> {}_", app.input),
        Mode::JumpInput => format!("column> {}_", app.input),
        Mode::EditInput { set_null: false } => format!("edit> {}_", app.input),
        Mode::EditInput { set_null: true } => "edit> NULL (Ctrl+N to type a value)".to_string(),
        Mode::ExportInput(_) => format!("path> {}_", app.input),
        Mode::ConfirmCommit => {
            let pending = app
                .model
                .as_ref()
                .map_or(0, ResultModel::pending_edit_count);
            format!("Commit {pending} pending edits? (y/n)")
        }
    };

    Paragraph::new(vec![Line::from(command_line), Line::from(prompt)])
        .block(Block::default().borders(Borders::ALL))
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Grid keymap"),
        Line::from("q: quit    ?: toggle help"),
        Line::from("arrows / hjkl: move cursor    PgUp / PgDn: page rows"),
        Line::from("[ ]: column pages    < >: narrow / widen column"),
        Line::from("p: pin column    s / S: sort ascending / descending"),
        Line::from("/: go to column    f: filter    F: clear filter"),
        Line::from("e: edit cell    x: set NULL    c: commit edits"),
        Line::from("o: export csv    O: export json    i: insert dump"),
        Line::from("g: follow reference    m: load more rows"),
        Line::from(":: new query    r: rerun"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn map_key_event(key: KeyEvent, mode: Mode) -> Option<Msg> {
    match mode {
        Mode::Grid => map_grid_key(key),
        Mode::ConfirmCommit => match key.code {
            KeyCode::Char('y' | 'Y') | KeyCode::Enter => Some(Msg::ConfirmYes),
            KeyCode::Char('n' | 'N') | KeyCode::Esc => Some(Msg::ConfirmNo),
            _ => None,
        },
        Mode::EditInput { .. }
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('n') =>
        {
            Some(Msg::ToggleNullInput)
        }
        _ => map_input_key(key),
    }
}

fn map_input_key(key: KeyEvent) -> Option<Msg> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    match key.code {
        KeyCode::Enter => Some(Msg::InputSubmit),
        KeyCode::Esc => Some(Msg::InputCancel),
        KeyCode::Backspace => Some(Msg::InputBackspace),
        KeyCode::Char(c) => Some(Msg::InputChar(c)),
        _ => None,
    }
}

fn map_grid_key(key: KeyEvent) -> Option<Msg> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Msg::Quit),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') => Some(Msg::Quit),
        KeyCode::Char('?') => Some(Msg::ToggleHelp),
        KeyCode::Up | KeyCode::Char('k') => Some(Msg::Move(DirectionKey::Up)),
        KeyCode::Down | KeyCode::Char('j') => Some(Msg::Move(DirectionKey::Down)),
        KeyCode::Left | KeyCode::Char('h') => Some(Msg::Move(DirectionKey::Left)),
        KeyCode::Right | KeyCode::Char('l') => Some(Msg::Move(DirectionKey::Right)),
        KeyCode::PageUp => Some(Msg::PageRows(DirectionKey::Up)),
        KeyCode::PageDown => Some(Msg::PageRows(DirectionKey::Down)),
        KeyCode::Char(':') => Some(Msg::Invoke(GridCommand::RunQuery)),
        KeyCode::Char('r') => Some(Msg::Invoke(GridCommand::RerunQuery)),
        KeyCode::Char('[') => Some(Msg::Invoke(GridCommand::PrevPage)),
        KeyCode::Char(']') => Some(Msg::Invoke(GridCommand::NextPage)),
        KeyCode::Char('<') => Some(Msg::Invoke(GridCommand::NarrowColumn)),
        KeyCode::Char('>') => Some(Msg::Invoke(GridCommand::WidenColumn)),
        KeyCode::Char('p') => Some(Msg::Invoke(GridCommand::TogglePin)),
        KeyCode::Char('s') => Some(Msg::Invoke(GridCommand::SortAscending)),
        KeyCode::Char('S') => Some(Msg::Invoke(GridCommand::SortDescending)),
        KeyCode::Char('/') => Some(Msg::Invoke(GridCommand::JumpToColumn)),
        KeyCode::Char('f') => Some(Msg::Invoke(GridCommand::ApplyFilter)),
        KeyCode::Char('F') => Some(Msg::Invoke(GridCommand::ClearFilter)),
        KeyCode::Char('e') => Some(Msg::Invoke(GridCommand::EditCell)),
        KeyCode::Char('x') => Some(Msg::Invoke(GridCommand::SetCellNull)),
        KeyCode::Char('c') => Some(Msg::Invoke(GridCommand::CommitEdits)),
        KeyCode::Char('o') => Some(Msg::Invoke(GridCommand::ExportCsv)),
        KeyCode::Char('O') => Some(Msg::Invoke(GridCommand::ExportJson)),
        KeyCode::Char('i') => Some(Msg::Invoke(GridCommand::CopyInsert)),
        KeyCode::Char('g') => Some(Msg::Invoke(GridCommand::FollowForeignKey)),
        KeyCode::Char('m') => Some(Msg::Invoke(GridCommand::LoadMoreRows)),
        _ => None,
    }
}

fn key_label(command: GridCommand) -> &'static str {
    match command {
        GridCommand::RunQuery => ":",
        GridCommand::RerunQuery => "r",
        GridCommand::PrevPage => "[",
        GridCommand::NextPage => "]",
        GridCommand::WidenColumn => ">",
        GridCommand::NarrowColumn => "<",
        GridCommand::TogglePin => "p",
        GridCommand::SortAscending => "s",
        GridCommand::SortDescending => "S",
        GridCommand::JumpToColumn => "/",
        GridCommand::ApplyFilter => "f",
        GridCommand::ClearFilter => "F",
        GridCommand::EditCell => "e",
        GridCommand::SetCellNull => "x",
        GridCommand::CommitEdits => "c",
        GridCommand::ExportCsv => "o",
        GridCommand::ExportJson => "O",
        GridCommand::CopyInsert => "i",
        GridCommand::FollowForeignKey => "g",
        GridCommand::LoadMoreRows => "m",
    }
}

fn pad_cell(text: &str, width: usize) -> String {
    let used = value_codec::display_width(text);
    let mut padded = String::from(text);
    for _ in used..width {
        padded.push(' ');
    }
    padded
}

fn proposed_cell(input: &str, kind: ColumnKind) -> CellValue {
    if kind == ColumnKind::Numeric {
        let trimmed = input.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return CellValue::Int(value);
        }
        if let Ok(value) = trimmed.parse::<u64>() {
            return CellValue::UInt(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            return CellValue::Float(value);
        }
    }
    CellValue::Text(input.to_string())
}

fn demo_outcome() -> QueryOutcome {
    let columns = vec![
        ColumnMeta::new("id", ColumnKind::Numeric).with_table("users"),
        ColumnMeta::new("name", ColumnKind::Text).with_table("users"),
        ColumnMeta::new("email", ColumnKind::Text).with_table("users"),
        ColumnMeta::new("age", ColumnKind::Numeric).with_table("users"),
        ColumnMeta::new("joined_on", ColumnKind::Date).with_table("users"),
        ColumnMeta::new("bio", ColumnKind::Text).with_table("users"),
    ];
    let rows = (1..=60_i64)
        .map(|index| {
            let age = if index % 7 == 0 {
                CellValue::Null
            } else {
                CellValue::Int(20 + (index % 40))
            };
            vec![
                CellValue::Int(index),
                CellValue::Text(format!("user-{index}")),
                CellValue::Text(format!("user{index}@example.com")),
                age,
                CellValue::Date {
                    year: 2026,
                    month: u8::try_from((index - 1) % 12 + 1).unwrap_or(1),
                    day: u8::try_from((index - 1) % 28 + 1).unwrap_or(1),
                },
                CellValue::Text(
                    "Sample bio text long enough to need truncation in narrow columns".to_string(),
                ),
            ]
        })
        .collect();
    QueryOutcome::result_set(columns, rows)
}
