use crate::value_codec::CellValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellRef {
    pub row: usize,
    pub column: usize,
}

impl CellRef {
    #[must_use]
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressedCell {
    pub row: usize,
    pub column: usize,
    pub original: CellValue,
}

impl AddressedCell {
    #[must_use]
    pub fn new(row: usize, column: usize, original: CellValue) -> Self {
        Self {
            row,
            column,
            original,
        }
    }

    #[must_use]
    pub fn position(&self) -> CellRef {
        CellRef::new(self.row, self.column)
    }
}

#[must_use]
pub fn locate(cells: &[AddressedCell], target: CellRef) -> Option<usize> {
    if let Some(position) = cells
        .iter()
        .position(|cell| cell.row == target.row && cell.column == target.column)
    {
        return Some(position);
    }
    if let Some((position, _)) = cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| cell.row == target.row)
        .min_by_key(|(_, cell)| cell.column.abs_diff(target.column))
    {
        return Some(position);
    }
    if cells.is_empty() {
        None
    } else {
        Some(0)
    }
}
