use std::collections::BTreeSet;

use crate::config::GridSettings;
use crate::executor::ColumnMeta;
use crate::value_codec::{display_width, CellValue};

pub const LARGE_FIELD_WIDTH: usize = 10;
const MIN_PAGE_BUDGET: usize = 10;

#[must_use]
pub fn compute_widths(
    columns: &[ColumnMeta],
    rows: &[Vec<CellValue>],
    settings: &GridSettings,
) -> Vec<usize> {
    let floor = settings.min_column_width;
    let ceiling = settings.max_column_width.max(floor);
    columns
        .iter()
        .enumerate()
        .map(|(index, column)| {
            if column.kind.is_large() {
                return LARGE_FIELD_WIDTH;
            }
            let mut widest = display_width(&column.name);
            for row in rows.iter().take(settings.sample_size) {
                if let Some(value) = row.get(index) {
                    widest = widest.max(display_width(&value.display_text()));
                }
            }
            widest.clamp(floor, ceiling)
        })
        .collect()
}

#[must_use]
pub fn cell_span(width: usize, padding: usize) -> usize {
    width + 2 * padding + 1
}

#[must_use]
pub fn compute_pages(
    widths: &[usize],
    pinned: &BTreeSet<usize>,
    viewport_width: usize,
    padding: usize,
) -> Vec<Vec<usize>> {
    let pinned_reservation = 1 + pinned
        .iter()
        .filter_map(|index| widths.get(*index))
        .map(|width| cell_span(*width, padding))
        .sum::<usize>();
    let budget = viewport_width
        .saturating_sub(pinned_reservation)
        .max(MIN_PAGE_BUDGET);

    let mut pages = Vec::new();
    let mut current = Vec::new();
    let mut used = 0;
    for (index, width) in widths.iter().enumerate() {
        if pinned.contains(&index) {
            continue;
        }
        let span = cell_span(*width, padding);
        if !current.is_empty() && used + span > budget {
            pages.push(std::mem::take(&mut current));
            used = 0;
        }
        current.push(index);
        used += span;
    }
    if !current.is_empty() || pages.is_empty() {
        pages.push(current);
    }
    pages
}
