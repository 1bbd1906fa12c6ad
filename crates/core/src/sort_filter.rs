use std::cmp::Ordering;

use crate::value_codec::CellValue;

#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Null,
    Numeric { value: f64, text: String },
    Textual(String),
}

impl SortKey {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    fn textual_form(&self) -> &str {
        match self {
            Self::Null => "",
            Self::Numeric { text, .. } => text,
            Self::Textual(text) => text,
        }
    }
}

#[must_use]
pub fn sort_key(value: &CellValue) -> SortKey {
    if value.is_null() {
        return SortKey::Null;
    }
    match value.numeric_value() {
        Some(numeric) => SortKey::Numeric {
            value: numeric,
            text: value.display_text(),
        },
        None => SortKey::Textual(value.display_text()),
    }
}

#[must_use]
pub fn compare_keys(left: &SortKey, right: &SortKey, descending: bool) -> Ordering {
    match (left, right) {
        (SortKey::Null, SortKey::Null) => Ordering::Equal,
        (SortKey::Null, _) => Ordering::Greater,
        (_, SortKey::Null) => Ordering::Less,
        (
            SortKey::Numeric { value: left, .. },
            SortKey::Numeric { value: right, .. },
        ) => directed(left.partial_cmp(right).unwrap_or(Ordering::Equal), descending),
        (left, right) => directed(left.textual_form().cmp(right.textual_form()), descending),
    }
}

fn directed(ordering: Ordering, descending: bool) -> Ordering {
    if descending {
        ordering.reverse()
    } else {
        ordering
    }
}

pub fn sort_rows(rows: &mut [Vec<CellValue>], column_index: usize, descending: bool) {
    rows.sort_by(|left, right| {
        let left_key = sort_key(left.get(column_index).unwrap_or(&CellValue::Null));
        let right_key = sort_key(right.get(column_index).unwrap_or(&CellValue::Null));
        compare_keys(&left_key, &right_key, descending)
    });
}

#[must_use]
pub fn inject_where(base_sql: &str, predicate: &str) -> String {
    let mut base = base_sql.trim();
    if let Some(stripped) = base.strip_suffix(';') {
        base = stripped.trim_end();
    }
    let predicate = predicate.trim();
    if predicate.is_empty() {
        return base.to_string();
    }

    let clause = if keyword_position(base, "WHERE").is_some() {
        format!("AND ({predicate})")
    } else {
        format!("WHERE {predicate}")
    };

    let insert_at = tail_clause_position(base).unwrap_or(base.len());
    let head = base[..insert_at].trim_end();
    let tail = &base[insert_at..];
    if tail.is_empty() {
        format!("{head} {clause}")
    } else {
        format!("{head} {clause} {tail}")
    }
}

fn bare_words(sql: &str) -> Vec<(usize, &str)> {
    let mut words = Vec::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut in_backtick = false;
    let mut word_start: Option<usize> = None;

    for (offset, ch) in sql.char_indices() {
        let toggles_quote = match ch {
            '\'' if !in_double_quote && !in_backtick => {
                in_single_quote = !in_single_quote;
                true
            }
            '"' if !in_single_quote && !in_backtick => {
                in_double_quote = !in_double_quote;
                true
            }
            '`' if !in_single_quote && !in_double_quote => {
                in_backtick = !in_backtick;
                true
            }
            _ => false,
        };
        let inside_quotes = in_single_quote || in_double_quote || in_backtick;
        let is_word_char =
            !toggles_quote && !inside_quotes && (ch.is_ascii_alphanumeric() || ch == '_');

        if is_word_char {
            if word_start.is_none() {
                word_start = Some(offset);
            }
        } else if let Some(start) = word_start.take() {
            words.push((start, &sql[start..offset]));
        }
    }
    if let Some(start) = word_start {
        words.push((start, &sql[start..]));
    }
    words
}

fn keyword_position(sql: &str, keyword: &str) -> Option<usize> {
    bare_words(sql)
        .iter()
        .find(|(_, word)| word.eq_ignore_ascii_case(keyword))
        .map(|(offset, _)| *offset)
}

fn tail_clause_position(sql: &str) -> Option<usize> {
    let words = bare_words(sql);
    for (index, (offset, word)) in words.iter().enumerate() {
        if word.eq_ignore_ascii_case("HAVING") || word.eq_ignore_ascii_case("LIMIT") {
            return Some(*offset);
        }
        let followed_by_by = words
            .get(index + 1)
            .is_some_and(|(_, next)| next.eq_ignore_ascii_case("BY"));
        if followed_by_by
            && (word.eq_ignore_ascii_case("ORDER") || word.eq_ignore_ascii_case("GROUP"))
        {
            return Some(*offset);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{compare_keys, inject_where, sort_key, sort_rows, SortKey};
    use crate::value_codec::CellValue;
    use std::cmp::Ordering;

    fn number_rows(values: &[Option<i64>]) -> Vec<Vec<CellValue>> {
        values
            .iter()
            .map(|value| {
                vec![value.map_or(CellValue::Null, CellValue::Int)]
            })
            .collect()
    }

    fn first_column(rows: &[Vec<CellValue>]) -> Vec<Option<i64>> {
        rows.iter()
            .map(|row| match row[0] {
                CellValue::Int(value) => Some(value),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn nulls_sort_last_in_both_directions() {
        let mut rows = number_rows(&[None, Some(3), Some(1), None, Some(2)]);
        sort_rows(&mut rows, 0, false);
        assert_eq!(first_column(&rows), vec![Some(1), Some(2), Some(3), None, None]);

        sort_rows(&mut rows, 0, true);
        assert_eq!(first_column(&rows), vec![Some(3), Some(2), Some(1), None, None]);
    }

    #[test]
    fn numeric_values_compare_numerically_not_textually() {
        let mut rows = number_rows(&[Some(10), Some(9), Some(100)]);
        sort_rows(&mut rows, 0, false);
        assert_eq!(first_column(&rows), vec![Some(9), Some(10), Some(100)]);
    }

    #[test]
    fn mixed_types_fall_back_to_textual_comparison() {
        let numeric = sort_key(&CellValue::Int(20));
        let textual = sort_key(&CellValue::Text("100x".to_string()));
        assert_eq!(compare_keys(&numeric, &textual, false), Ordering::Greater);
        assert_eq!(compare_keys(&textual, &numeric, false), Ordering::Less);
    }

    #[test]
    fn sorting_is_stable_for_equal_keys() {
        let mut rows = vec![
            vec![CellValue::Int(1), CellValue::Text("first".to_string())],
            vec![CellValue::Int(1), CellValue::Text("second".to_string())],
            vec![CellValue::Int(0), CellValue::Text("third".to_string())],
        ];
        sort_rows(&mut rows, 0, false);
        let tags: Vec<String> = rows.iter().map(|row| row[1].display_text()).collect();
        assert_eq!(tags, vec!["third", "first", "second"]);

        let once = rows.clone();
        sort_rows(&mut rows, 0, false);
        assert_eq!(rows, once);
    }

    #[test]
    fn missing_cells_sort_as_null() {
        let mut rows = vec![
            vec![CellValue::Int(1)],
            Vec::new(),
            vec![CellValue::Int(0)],
        ];
        sort_rows(&mut rows, 0, false);
        assert_eq!(rows[0], vec![CellValue::Int(0)]);
        assert_eq!(rows[1], vec![CellValue::Int(1)]);
        assert!(rows[2].is_empty());
    }

    #[test]
    fn null_keys_report_as_null() {
        assert!(sort_key(&CellValue::Null).is_null());
        assert!(!sort_key(&CellValue::Int(0)).is_null());
        assert!(matches!(
            sort_key(&CellValue::Text("a".to_string())),
            SortKey::Textual(_)
        ));
    }

    #[test]
    fn predicates_insert_before_trailing_clauses() {
        assert_eq!(
            inject_where("SELECT * FROM t ORDER BY id", "age > 18"),
            "SELECT * FROM t WHERE age > 18 ORDER BY id"
        );
        assert_eq!(
            inject_where("SELECT * FROM t GROUP BY city HAVING n > 1", "age > 18"),
            "SELECT * FROM t WHERE age > 18 GROUP BY city HAVING n > 1"
        );
        assert_eq!(
            inject_where("SELECT * FROM t LIMIT 10", "age > 18"),
            "SELECT * FROM t WHERE age > 18 LIMIT 10"
        );
    }

    #[test]
    fn predicates_append_when_no_trailing_clause_exists() {
        assert_eq!(
            inject_where("SELECT * FROM t", "age > 18"),
            "SELECT * FROM t WHERE age > 18"
        );
    }

    #[test]
    fn an_existing_where_gains_an_and_conjunct() {
        let injected = inject_where("SELECT * FROM t WHERE x = 1", "y = 2");
        assert_eq!(injected, "SELECT * FROM t WHERE x = 1 AND (y = 2)");

        let with_tail = inject_where("SELECT * FROM t WHERE x = 1 ORDER BY id", "y = 2");
        assert_eq!(
            with_tail,
            "SELECT * FROM t WHERE x = 1 AND (y = 2) ORDER BY id"
        );
    }

    #[test]
    fn where_detection_is_case_insensitive_and_word_bounded() {
        assert_eq!(
            inject_where("select * from t where x = 1", "y = 2"),
            "select * from t where x = 1 AND (y = 2)"
        );
        assert_eq!(
            inject_where("SELECT * FROM wherever", "y = 2"),
            "SELECT * FROM wherever WHERE y = 2"
        );
    }

    #[test]
    fn keywords_inside_string_literals_are_ignored() {
        assert_eq!(
            inject_where("SELECT * FROM t WHERE note = 'ORDER BY name'", "y = 2"),
            "SELECT * FROM t WHERE note = 'ORDER BY name' AND (y = 2)"
        );
        assert_eq!(
            inject_where("SELECT 'where' AS w FROM t", "y = 2"),
            "SELECT 'where' AS w FROM t WHERE y = 2"
        );
    }

    #[test]
    fn one_trailing_terminator_is_stripped() {
        assert_eq!(
            inject_where("SELECT * FROM t;", "x = 1"),
            "SELECT * FROM t WHERE x = 1"
        );
    }

    #[test]
    fn an_empty_predicate_returns_the_bare_statement() {
        assert_eq!(inject_where("SELECT * FROM t;", "  "), "SELECT * FROM t");
    }
}
