#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridCommand {
    RunQuery,
    RerunQuery,
    PrevPage,
    NextPage,
    WidenColumn,
    NarrowColumn,
    TogglePin,
    SortAscending,
    SortDescending,
    JumpToColumn,
    ApplyFilter,
    ClearFilter,
    EditCell,
    SetCellNull,
    CommitEdits,
    ExportCsv,
    ExportJson,
    CopyInsert,
    FollowForeignKey,
    LoadMoreRows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandContext {
    pub has_result: bool,
    pub has_session: bool,
    pub read_only: bool,
    pub editable: bool,
    pub has_pending_edits: bool,
    pub fk_under_cursor: bool,
    pub multiple_pages: bool,
    pub table_detected: bool,
    pub filter_active: bool,
}

impl GridCommand {
    pub const ALL: [GridCommand; 20] = [
        GridCommand::RunQuery,
        GridCommand::RerunQuery,
        GridCommand::PrevPage,
        GridCommand::NextPage,
        GridCommand::WidenColumn,
        GridCommand::NarrowColumn,
        GridCommand::TogglePin,
        GridCommand::SortAscending,
        GridCommand::SortDescending,
        GridCommand::JumpToColumn,
        GridCommand::ApplyFilter,
        GridCommand::ClearFilter,
        GridCommand::EditCell,
        GridCommand::SetCellNull,
        GridCommand::CommitEdits,
        GridCommand::ExportCsv,
        GridCommand::ExportJson,
        GridCommand::CopyInsert,
        GridCommand::FollowForeignKey,
        GridCommand::LoadMoreRows,
    ];

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::RunQuery => "query",
            Self::RerunQuery => "rerun",
            Self::PrevPage => "prev cols",
            Self::NextPage => "next cols",
            Self::WidenColumn => "widen",
            Self::NarrowColumn => "narrow",
            Self::TogglePin => "pin",
            Self::SortAscending => "sort asc",
            Self::SortDescending => "sort desc",
            Self::JumpToColumn => "goto col",
            Self::ApplyFilter => "filter",
            Self::ClearFilter => "clear filter",
            Self::EditCell => "edit",
            Self::SetCellNull => "set null",
            Self::CommitEdits => "commit",
            Self::ExportCsv => "csv",
            Self::ExportJson => "json",
            Self::CopyInsert => "insert dump",
            Self::FollowForeignKey => "follow ref",
            Self::LoadMoreRows => "more rows",
        }
    }

    #[must_use]
    pub fn is_enabled(self, context: &CommandContext) -> bool {
        match self {
            Self::RunQuery => context.has_session,
            Self::RerunQuery | Self::ApplyFilter => context.has_session && context.has_result,
            Self::PrevPage | Self::NextPage => context.has_result && context.multiple_pages,
            Self::WidenColumn
            | Self::NarrowColumn
            | Self::TogglePin
            | Self::SortAscending
            | Self::SortDescending
            | Self::JumpToColumn
            | Self::ExportCsv
            | Self::ExportJson => context.has_result,
            Self::ClearFilter => context.has_session && context.filter_active,
            Self::EditCell | Self::SetCellNull => {
                context.has_result && context.editable && !context.read_only
            }
            Self::CommitEdits => {
                context.has_session
                    && context.has_pending_edits
                    && context.editable
                    && !context.read_only
            }
            Self::CopyInsert => context.has_result && context.table_detected,
            Self::FollowForeignKey => context.has_session && context.fk_under_cursor,
            Self::LoadMoreRows => context.has_session && context.table_detected,
        }
    }

    #[must_use]
    pub fn enabled_commands(context: &CommandContext) -> Vec<GridCommand> {
        Self::ALL
            .iter()
            .copied()
            .filter(|command| command.is_enabled(context))
            .collect()
    }
}
