use async_trait::async_trait;
use mysql_async::consts::{ColumnFlags, ColumnType};
use mysql_async::prelude::Queryable;
use mysql_async::{Column, Conn, OptsBuilder, Row, Value};
use tabula_core::config::{ConnectionProfile, PasswordSource};
use tabula_core::executor::{ColumnKind, ColumnMeta, ExecutorError, QueryOutcome, SqlExecutor};
use tabula_core::schema_lookup::{ForeignKeyRef, SchemaLookup, SchemaLookupError};
use tabula_core::value_codec::CellValue;
use tracing::debug;

pub const PASSWORD_ENV: &str = "TABULA_DB_PASSWORD";

#[derive(Debug)]
pub struct MysqlSession {
    conn: Conn,
    profile: ConnectionProfile,
}

impl MysqlSession {
    pub async fn connect(profile: &ConnectionProfile) -> Result<Self, ExecutorError> {
        let conn = Conn::new(opts_from_profile(profile))
            .await
            .map_err(to_executor_error)?;
        debug!(host = %profile.host, port = profile.port, "session established");
        Ok(Self {
            conn,
            profile: profile.clone(),
        })
    }

    #[must_use]
    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    pub async fn ping(&mut self) -> Result<(), ExecutorError> {
        self.conn.ping().await.map_err(to_executor_error)
    }

    pub async fn disconnect(self) -> Result<(), ExecutorError> {
        self.conn.disconnect().await.map_err(to_executor_error)
    }
}

#[async_trait]
impl SqlExecutor for MysqlSession {
    async fn execute(&mut self, sql: &str) -> Result<QueryOutcome, ExecutorError> {
        let mut result = self.conn.query_iter(sql).await.map_err(to_executor_error)?;
        let columns: Vec<ColumnMeta> = result.columns().map_or_else(Vec::new, |columns| {
            columns
                .iter()
                .enumerate()
                .map(|(index, column)| column_meta_from_driver(index, column))
                .collect()
        });
        let driver_rows: Vec<Row> = result.collect().await.map_err(to_executor_error)?;
        let affected_rows = result.affected_rows();
        let last_insert_id = result.last_insert_id();
        let warnings = result.warnings();
        drop(result);

        debug!(
            columns = columns.len(),
            rows = driver_rows.len(),
            affected_rows,
            "statement completed"
        );
        let rows = driver_rows
            .into_iter()
            .map(|row| cells_from_row(row, &columns))
            .collect();
        Ok(QueryOutcome {
            columns,
            rows,
            affected_rows,
            last_insert_id,
            warnings,
        })
    }
}

#[async_trait]
impl SchemaLookup for MysqlSession {
    async fn primary_key_columns(
        &mut self,
        table: &str,
    ) -> Result<Vec<String>, SchemaLookupError> {
        self.conn
            .exec_map(
                "SELECT COLUMN_NAME \
                 FROM information_schema.KEY_COLUMN_USAGE \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   AND CONSTRAINT_NAME = 'PRIMARY' \
                 ORDER BY ORDINAL_POSITION",
                (table.to_string(),),
                |column_name: String| column_name,
            )
            .await
            .map_err(to_schema_error)
    }

    async fn foreign_keys(&mut self, table: &str) -> Result<Vec<ForeignKeyRef>, SchemaLookupError> {
        self.conn
            .exec_map(
                "SELECT COLUMN_NAME, REFERENCED_TABLE_NAME, REFERENCED_COLUMN_NAME \
                 FROM information_schema.KEY_COLUMN_USAGE \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? \
                   AND REFERENCED_TABLE_NAME IS NOT NULL \
                 ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION",
                (table.to_string(),),
                |(column, referenced_table, referenced_column): (String, String, String)| {
                    ForeignKeyRef {
                        column,
                        referenced_table,
                        referenced_column,
                    }
                },
            )
            .await
            .map_err(to_schema_error)
    }
}

fn opts_from_profile(profile: &ConnectionProfile) -> OptsBuilder {
    let mut builder = OptsBuilder::default()
        .ip_or_hostname(profile.host.clone())
        .tcp_port(profile.port)
        .user(Some(profile.user.clone()));

    if let Some(password) = resolve_password(profile) {
        builder = builder.pass(Some(password));
    }

    if let Some(database) = &profile.database {
        builder = builder.db_name(Some(database.clone()));
    }

    builder
}

fn resolve_password(profile: &ConnectionProfile) -> Option<String> {
    let env_password = std::env::var(PASSWORD_ENV).ok().filter(|pw| !pw.is_empty());

    match profile.password_source {
        PasswordSource::EnvVar => env_password,
        PasswordSource::Keyring => {
            if let Some(password) = load_keyring_password(profile) {
                return Some(password);
            }

            if let Some(password) = env_password {
                store_keyring_password(profile, &password);
                return Some(password);
            }

            None
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.and_then(|raw| {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    })
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn load_keyring_password(profile: &ConnectionProfile) -> Option<String> {
    let entry = keyring_entry(profile)?;
    entry.get_password().ok().filter(|pw| !pw.is_empty())
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn load_keyring_password(_profile: &ConnectionProfile) -> Option<String> {
    None
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn store_keyring_password(profile: &ConnectionProfile, password: &str) {
    if password.is_empty() {
        return;
    }
    if let Some(entry) = keyring_entry(profile) {
        let _ = entry.set_password(password);
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
fn store_keyring_password(_profile: &ConnectionProfile, _password: &str) {}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
fn keyring_entry(profile: &ConnectionProfile) -> Option<keyring::Entry> {
    let service = non_empty(profile.keyring_service.as_deref()).unwrap_or("tabula");
    let account = non_empty(profile.keyring_account.as_deref()).unwrap_or(profile.name.as_str());
    keyring::Entry::new(service, account).ok()
}

fn column_meta_from_driver(index: usize, column: &Column) -> ColumnMeta {
    let name = display_name(&column.name_str(), index);
    let table = column.table_str().into_owned();
    let mut meta = ColumnMeta::new(name, kind_from_column(column));
    if !table.is_empty() {
        meta = meta.with_table(table);
    }
    meta
}

fn display_name(raw: &str, index: usize) -> String {
    if raw.is_empty() {
        format!("col_{index}")
    } else {
        raw.to_string()
    }
}

fn kind_from_column(column: &Column) -> ColumnKind {
    match column.column_type() {
        ColumnType::MYSQL_TYPE_DECIMAL
        | ColumnType::MYSQL_TYPE_NEWDECIMAL
        | ColumnType::MYSQL_TYPE_TINY
        | ColumnType::MYSQL_TYPE_SHORT
        | ColumnType::MYSQL_TYPE_LONG
        | ColumnType::MYSQL_TYPE_FLOAT
        | ColumnType::MYSQL_TYPE_DOUBLE
        | ColumnType::MYSQL_TYPE_LONGLONG
        | ColumnType::MYSQL_TYPE_INT24
        | ColumnType::MYSQL_TYPE_YEAR => ColumnKind::Numeric,
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => ColumnKind::Date,
        ColumnType::MYSQL_TYPE_TIME | ColumnType::MYSQL_TYPE_TIME2 => ColumnKind::Time,
        ColumnType::MYSQL_TYPE_TIMESTAMP
        | ColumnType::MYSQL_TYPE_DATETIME
        | ColumnType::MYSQL_TYPE_TIMESTAMP2
        | ColumnType::MYSQL_TYPE_DATETIME2 => ColumnKind::DateTime,
        ColumnType::MYSQL_TYPE_JSON => ColumnKind::Json,
        ColumnType::MYSQL_TYPE_BIT
        | ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_LONG_BLOB
        | ColumnType::MYSQL_TYPE_BLOB
        | ColumnType::MYSQL_TYPE_GEOMETRY => ColumnKind::Blob,
        ColumnType::MYSQL_TYPE_VARCHAR
        | ColumnType::MYSQL_TYPE_VAR_STRING
        | ColumnType::MYSQL_TYPE_STRING
        | ColumnType::MYSQL_TYPE_ENUM
        | ColumnType::MYSQL_TYPE_SET => {
            if column.flags().contains(ColumnFlags::BINARY_FLAG) {
                ColumnKind::Blob
            } else {
                ColumnKind::Text
            }
        }
        _ => ColumnKind::Text,
    }
}

fn cells_from_row(row: Row, columns: &[ColumnMeta]) -> Vec<CellValue> {
    row.unwrap()
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let kind = columns
                .get(index)
                .map_or(ColumnKind::Text, |column| column.kind);
            cell_from_value(value, kind)
        })
        .collect()
}

fn cell_from_value(value: Value, kind: ColumnKind) -> CellValue {
    match value {
        Value::NULL => CellValue::Null,
        Value::Int(value) => CellValue::Int(value),
        Value::UInt(value) => CellValue::UInt(value),
        Value::Float(value) => CellValue::Float(f64::from(value)),
        Value::Double(value) => CellValue::Float(value),
        Value::Date(year, month, day, hours, minutes, seconds, _micros) => {
            if kind == ColumnKind::Date && hours == 0 && minutes == 0 && seconds == 0 {
                CellValue::Date { year, month, day }
            } else {
                CellValue::DateTime {
                    year,
                    month,
                    day,
                    hours,
                    minutes,
                    seconds,
                }
            }
        }
        Value::Time(negative, days, hours, minutes, seconds, _micros) => CellValue::Time {
            negative,
            hours: days * 24 + u32::from(hours),
            minutes,
            seconds,
        },
        Value::Bytes(bytes) => cell_from_bytes(bytes, kind),
    }
}

fn cell_from_bytes(bytes: Vec<u8>, kind: ColumnKind) -> CellValue {
    match kind {
        ColumnKind::Blob => CellValue::Blob(bytes),
        ColumnKind::Numeric => {
            let text = String::from_utf8_lossy(&bytes);
            parse_numeric_text(&text).unwrap_or_else(|| CellValue::Text(text.into_owned()))
        }
        ColumnKind::Date => {
            let text = String::from_utf8_lossy(&bytes);
            parse_date_text(&text).unwrap_or_else(|| CellValue::Text(text.into_owned()))
        }
        ColumnKind::Time => {
            let text = String::from_utf8_lossy(&bytes);
            parse_time_text(&text).unwrap_or_else(|| CellValue::Text(text.into_owned()))
        }
        ColumnKind::DateTime => {
            let text = String::from_utf8_lossy(&bytes);
            parse_datetime_text(&text).unwrap_or_else(|| CellValue::Text(text.into_owned()))
        }
        ColumnKind::Text | ColumnKind::Json => {
            CellValue::Text(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

fn parse_numeric_text(text: &str) -> Option<CellValue> {
    if let Ok(value) = text.parse::<i64>() {
        return Some(CellValue::Int(value));
    }
    if let Ok(value) = text.parse::<u64>() {
        return Some(CellValue::UInt(value));
    }
    text.parse::<f64>().ok().map(CellValue::Float)
}

fn parse_date_text(text: &str) -> Option<CellValue> {
    let mut parts = text.splitn(3, '-');
    let year = parts.next()?.parse::<u16>().ok()?;
    let month = parts.next()?.parse::<u8>().ok()?;
    let day = parts.next()?.parse::<u8>().ok()?;
    Some(CellValue::Date { year, month, day })
}

fn parse_datetime_text(text: &str) -> Option<CellValue> {
    let (date_part, clock_part) = text.split_once(' ')?;
    let CellValue::Date { year, month, day } = parse_date_text(date_part)? else {
        return None;
    };
    let (hours, minutes, seconds) = parse_clock(clock_part)?;
    let hours = u8::try_from(hours).ok()?;
    Some(CellValue::DateTime {
        year,
        month,
        day,
        hours,
        minutes,
        seconds,
    })
}

fn parse_time_text(text: &str) -> Option<CellValue> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (hours, minutes, seconds) = parse_clock(rest)?;
    Some(CellValue::Time {
        negative,
        hours,
        minutes,
        seconds,
    })
}

fn parse_clock(text: &str) -> Option<(u32, u8, u8)> {
    let clock = text.split_once('.').map_or(text, |(clock, _fraction)| clock);
    let mut parts = clock.splitn(3, ':');
    let hours = parts.next()?.parse::<u32>().ok()?;
    let minutes = parts.next()?.parse::<u8>().ok()?;
    let seconds = parts.next()?.parse::<u8>().ok()?;
    Some((hours, minutes, seconds))
}

fn to_executor_error(error: mysql_async::Error) -> ExecutorError {
    ExecutorError::new(error.to_string())
}

fn to_schema_error(error: mysql_async::Error) -> SchemaLookupError {
    SchemaLookupError::new(error.to_string())
}
