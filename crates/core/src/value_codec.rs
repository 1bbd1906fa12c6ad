use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const NULL_TEXT: &str = "NULL";

const NEWLINE_SUBSTITUTE: char = '¶';
const PIPE_SUBSTITUTE: char = '¦';
const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Date {
        year: u16,
        month: u8,
        day: u8,
    },
    Time {
        negative: bool,
        hours: u32,
        minutes: u8,
        seconds: u8,
    },
    DateTime {
        year: u16,
        month: u8,
        day: u8,
        hours: u8,
        minutes: u8,
        seconds: u8,
    },
    Blob(Vec<u8>),
}

impl CellValue {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::UInt(_) | Self::Float(_))
    }

    #[must_use]
    pub fn numeric_value(&self) -> Option<f64> {
        match self {
            Self::Int(value) => Some(*value as f64),
            Self::UInt(value) => Some(*value as f64),
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            Self::Null => NULL_TEXT.to_string(),
            Self::Int(value) => value.to_string(),
            Self::UInt(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::Date { year, month, day } => format!("{year:04}-{month:02}-{day:02}"),
            Self::Time {
                negative,
                hours,
                minutes,
                seconds,
            } => {
                let sign = if *negative { "-" } else { "" };
                format!("{sign}{hours:02}:{minutes:02}:{seconds:02}")
            }
            Self::DateTime {
                year,
                month,
                day,
                hours,
                minutes,
                seconds,
            } => {
                format!("{year:04}-{month:02}-{day:02} {hours:02}:{minutes:02}:{seconds:02}")
            }
            Self::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    #[must_use]
    pub fn sql_literal(&self) -> String {
        match self {
            Self::Null => NULL_TEXT.to_string(),
            Self::Int(value) => value.to_string(),
            Self::UInt(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            _ => quote_sql_string(&self.display_text()),
        }
    }
}

#[must_use]
pub fn quote_sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

#[must_use]
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

#[must_use]
pub fn truncate_for_cell(text: &str, max_width: usize) -> String {
    let sanitized: String = text
        .replace("\r\n", "\n")
        .chars()
        .map(|ch| match ch {
            '\n' | '\r' => NEWLINE_SUBSTITUTE,
            '|' => PIPE_SUBSTITUTE,
            other => other,
        })
        .collect();

    if display_width(&sanitized) <= max_width {
        return sanitized;
    }
    if max_width == 0 {
        return String::new();
    }

    let mut truncated = String::new();
    let mut used = 0;
    for ch in sanitized.chars() {
        let char_width = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + char_width > max_width - 1 {
            break;
        }
        truncated.push(ch);
        used += char_width;
    }
    truncated.push(ELLIPSIS);
    truncated
}
