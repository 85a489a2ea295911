/// HTML table row lookup.
///
/// Turns a page into rows of trimmed cell strings, then finds rows by a label
/// in one column plus an optional co-label in another. Same-named stations in
/// different regions are told apart by the co-label; regions printed only on
/// the first row of their block are carried forward.

use crate::model::SourceError;
use scraper::{Html, Selector};

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A decoded table: each row is the text of its cells, in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Parses every element matching `row_selector` and collects the text of
    /// its descendants matching `cell_selector`.
    ///
    /// Cell text is the concatenation of the trimmed text fragments, so
    /// `<td> 1.5<sub>)</sub> </td>` becomes `"1.5)"`.
    pub fn parse(html: &str, row_selector: &str, cell_selector: &str) -> Result<Self, SourceError> {
        let rows_sel = Selector::parse(row_selector)
            .map_err(|e| SourceError::mismatch("table", format!("bad row selector: {}", e)))?;
        let cells_sel = Selector::parse(cell_selector)
            .map_err(|e| SourceError::mismatch("table", format!("bad cell selector: {}", e)))?;

        let document = Html::parse_document(html);
        let rows = document
            .select(&rows_sel)
            .map(|row| {
                row.select(&cells_sel)
                    .map(|cell| cell.text().map(str::trim).collect::<String>())
                    .collect()
            })
            .collect();
        Ok(Self { rows })
    }

    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows matching `query`, in document order.
    ///
    /// Rows shorter than `query.min_cells` are skipped, as are rows whose
    /// label cell is empty (headers, spacers).
    pub fn find_rows<'t>(&'t self, query: &RowQuery<'_>) -> Vec<&'t [String]> {
        let mut carried: Option<&str> = None;
        let mut matches = Vec::new();

        for row in &self.rows {
            let co_value = query.co_label.map(|co| {
                let cell = row.get(co.column).map(String::as_str).unwrap_or("");
                if !co.carry_forward {
                    return cell;
                }
                if !cell.is_empty() {
                    carried = Some(cell);
                }
                carried.unwrap_or("")
            });

            if row.len() < query.min_cells {
                continue;
            }
            let Some(label) = row.get(query.label_column) else {
                continue;
            };
            if label.is_empty() || label != query.label {
                continue;
            }
            if let (Some(co), Some(value)) = (query.co_label, co_value) {
                if !value.contains(co.contains) {
                    continue;
                }
            }
            matches.push(row.as_slice());
        }
        matches
    }

    /// First matching row, or `None`.
    pub fn find_row<'t>(&'t self, query: &RowQuery<'_>) -> Option<&'t [String]> {
        self.find_rows(query).into_iter().next()
    }

    /// Position of the first cell equal to `label`, with the index of the
    /// row it was found in.
    pub fn find_header_position(&self, label: &str) -> Option<(usize, usize)> {
        self.rows.iter().enumerate().find_map(|(row_idx, row)| {
            row.iter().position(|cell| cell == label).map(|pos| (row_idx, pos))
        })
    }
}

// ---------------------------------------------------------------------------
// Row queries
// ---------------------------------------------------------------------------

/// What a target row looks like.
#[derive(Debug, Clone, Copy)]
pub struct RowQuery<'a> {
    pub label_column: usize,
    pub label: &'a str,
    pub co_label: Option<CoLabel<'a>>,
    /// Rows with fewer cells are not candidates.
    pub min_cells: usize,
}

/// A second column that must contain `contains` for a row to match.
#[derive(Debug, Clone, Copy)]
pub struct CoLabel<'a> {
    pub column: usize,
    pub contains: &'a str,
    /// When set, an empty cell inherits the last non-empty value above it.
    pub carry_forward: bool,
}

impl<'a> RowQuery<'a> {
    pub fn new(label_column: usize, label: &'a str) -> Self {
        Self {
            label_column,
            label,
            co_label: None,
            min_cells: label_column + 1,
        }
    }

    pub fn with_co_label(mut self, column: usize, contains: &'a str, carry_forward: bool) -> Self {
        self.co_label = Some(CoLabel {
            column,
            contains,
            carry_forward,
        });
        self
    }

    pub fn with_min_cells(mut self, min_cells: usize) -> Self {
        self.min_cells = min_cells;
        self
    }
}

// ---------------------------------------------------------------------------
// Cell decoding
// ---------------------------------------------------------------------------

/// A decoded numeric cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Amount(f64),
    /// A "no observation" token such as `--` or `///`.
    Placeholder,
    /// Nothing numeric was left after stripping decoration.
    Malformed(SourceError),
}

impl CellValue {
    /// 0.0 for placeholders and malformed cells.
    pub fn mm(&self) -> f64 {
        match self {
            CellValue::Amount(v) => *v,
            CellValue::Placeholder | CellValue::Malformed(_) => 0.0,
        }
    }
}

/// Decodes a rainfall cell.
///
/// Quality marks wrapped around the number (`0.5)`, `[12.0]`, `3.5 ]`) are
/// removed by keeping only ASCII digits and the decimal point.
pub fn parse_cell(text: &str, placeholders: &[&str]) -> CellValue {
    let text = text.trim();
    if text.is_empty() || placeholders.iter().any(|p| p.eq_ignore_ascii_case(text)) {
        return CellValue::Placeholder;
    }

    let clean: String = text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();
    match clean.parse::<f64>() {
        Ok(v) if v.is_finite() => CellValue::Amount(v),
        _ => CellValue::Malformed(SourceError::MalformedValue {
            text: text.to_string(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
