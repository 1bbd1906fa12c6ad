use crate::executor::ColumnMeta;
use crate::value_codec::CellValue;

#[must_use]
pub fn csv_document(columns: &[ColumnMeta], rows: &[Vec<CellValue>]) -> String {
    let mut document = String::new();
    let header: Vec<String> = columns
        .iter()
        .map(|column| csv_escape(&column.name))
        .collect();
    document.push_str(&header.join(","));
    document.push('\n');

    for row in rows {
        let line: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(index, _)| {
                let value = row.get(index).unwrap_or(&CellValue::Null);
                csv_escape(&value.display_text())
            })
            .collect();
        document.push_str(&line.join(","));
        document.push('\n');
    }
    document
}

#[must_use]
pub fn insert_dump(table: &str, columns: &[ColumnMeta], rows: &[Vec<CellValue>]) -> String {
    let column_list: Vec<&str> = columns.iter().map(|column| column.name.as_str()).collect();
    let column_list = column_list.join(", ");

    let mut document = String::new();
    for row in rows {
        let values: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(index, _)| row.get(index).unwrap_or(&CellValue::Null).sql_literal())
            .collect();
        document.push_str(&format!(
            "INSERT INTO {table} ({column_list}) VALUES ({});\n",
            values.join(", ")
        ));
    }
    document
}

fn csv_escape(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
