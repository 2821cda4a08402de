//! Worksheet cells as text.
//!
//! Cell values are rendered the way they read in a spreadsheet UI, with one
//! exception: numbers are not run through the cell's number format. Integral
//! numbers come back without a fractional part (`1`, not `1.0`), so a numeric
//! choice code written in a sheet compares equal to the same code in XML.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::{attr_value, xml_error, XlsxError};

/// One worksheet: rows in sheet order, each a dense vector of cells indexed by
/// column (`A` = 0). Empty or whitespace-only cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Option<String>>>,
}

/// A sheet viewed as a table: the first non-empty row is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub records: Vec<Vec<Option<String>>>,
}

impl Sheet {
    pub fn into_table(self) -> SheetTable {
        let mut rows = self
            .rows
            .into_iter()
            .skip_while(|row| row.iter().all(Option::is_none));
        let headers = rows
            .next()
            .map(|row| {
                row.into_iter()
                    .map(|cell| cell.map(|h| h.trim().to_string()).unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        let records = rows.filter(|row| row.iter().any(Option::is_some)).collect();
        SheetTable {
            name: self.name,
            headers,
            records,
        }
    }
}

impl SheetTable {
    /// Index of the first header equal to `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell text at `(record, column)`; out-of-range reads are `None`.
    pub fn cell(&self, record: usize, column: usize) -> Option<&str> {
        self.records
            .get(record)
            .and_then(|row| row.get(column))
            .and_then(|cell| cell.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Number,
    SharedString,
    InlineString,
    FormulaString,
    Boolean,
    Error,
}

impl CellKind {
    fn from_attr(t: Option<&str>) -> Self {
        match t {
            Some("s") => CellKind::SharedString,
            Some("inlineStr") => CellKind::InlineString,
            Some("str") => CellKind::FormulaString,
            Some("b") => CellKind::Boolean,
            Some("e") => CellKind::Error,
            _ => CellKind::Number,
        }
    }
}

struct PendingCell {
    reference: String,
    column: usize,
    kind: CellKind,
    value: String,
    inline: String,
}

/// Last column of a worksheet (`XFD`), one-based.
pub const MAX_COLUMNS: usize = 16_384;
/// Last row of a worksheet, one-based.
pub const MAX_ROWS: usize = 1_048_576;

/// Column index from an A1-style reference (`"AB12"` → 27). References past
/// column `XFD` are `None`.
pub fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() {
        return None;
    }
    let mut index = 0usize;
    for b in letters {
        index = index * 26 + usize::from(b.to_ascii_uppercase() - b'A') + 1;
        if index > MAX_COLUMNS {
            return None;
        }
    }
    Some(index - 1)
}

fn format_number(raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", n as i64),
        _ => trimmed.to_string(),
    }
}

pub(crate) fn parse_worksheet(
    name: &str,
    part: &str,
    xml: &str,
    shared_strings: &[String],
) -> Result<Sheet, XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut rows: Vec<Vec<Option<String>>> = Vec::new();
    let mut row: Option<Vec<Option<String>>> = None;
    let mut row_number = 0usize;
    let mut next_column = 0usize;
    let mut cell: Option<PendingCell> = None;

    let mut in_value = false;
    let mut in_inline = false;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader.read_event().map_err(|err| xml_error(part, err))? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_number = row_attr(part, &e, row_number)?;
                    row = Some(Vec::new());
                    next_column = 0;
                }
                b"c" => {
                    cell = Some(start_cell(part, &e, row_number, next_column)?);
                }
                b"v" => in_value = true,
                b"is" => in_inline = true,
                b"t" => in_text = true,
                b"rPh" => phonetic_depth += 1,
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"row" => {
                    row_number = row_attr(part, &e, row_number)?;
                    place_row(&mut rows, row_number, Vec::new());
                }
                b"c" => {
                    let empty = start_cell(part, &e, row_number, next_column)?;
                    next_column = empty.column + 1;
                }
                _ => {}
            },
            Event::Text(t) => {
                if let Some(pending) = cell.as_mut() {
                    if in_value {
                        let text = t.unescape().map_err(|err| xml_error(part, err))?;
                        pending.value.push_str(&text);
                    } else if in_inline && in_text && phonetic_depth == 0 {
                        let text = t.unescape().map_err(|err| xml_error(part, err))?;
                        pending.inline.push_str(&text);
                    }
                }
            }
            Event::CData(c) => {
                if let Some(pending) = cell.as_mut() {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    if in_value {
                        pending.value.push_str(&text);
                    } else if in_inline && in_text && phonetic_depth == 0 {
                        pending.inline.push_str(&text);
                    }
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"c" => {
                    if let Some(pending) = cell.take() {
                        next_column = pending.column + 1;
                        let column = pending.column;
                        let value = finish_cell(pending, shared_strings)?;
                        if let Some(current) = row.as_mut() {
                            if current.len() <= column {
                                current.resize(column + 1, None);
                            }
                            current[column] = value;
                        }
                    }
                }
                b"row" => {
                    if let Some(done) = row.take() {
                        place_row(&mut rows, row_number, done);
                    }
                }
                b"v" => in_value = false,
                b"is" => in_inline = false,
                b"t" => in_text = false,
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(Sheet {
        name: name.to_string(),
        rows,
    })
}

fn start_cell(
    part: &str,
    e: &quick_xml::events::BytesStart<'_>,
    row_number: usize,
    next_column: usize,
) -> Result<PendingCell, XlsxError> {
    let reference = attr_value(e, b"r").map_err(|err| xml_error(part, err))?;
    let kind = attr_value(e, b"t").map_err(|err| xml_error(part, err))?;
    let column = match reference.as_deref() {
        Some(r) if r.starts_with(|c: char| c.is_ascii_alphabetic()) => column_index(r)
            .ok_or_else(|| xml_error(part, format!("cell reference `{r}` is past the last column")))?,
        _ => next_column,
    };
    if column >= MAX_COLUMNS {
        return Err(xml_error(part, format!("row {row_number} has more than {MAX_COLUMNS} cells")));
    }
    Ok(PendingCell {
        reference: reference.unwrap_or_else(|| format!("R{row_number}C{}", column + 1)),
        column,
        kind: CellKind::from_attr(kind.as_deref()),
        value: String::new(),
        inline: String::new(),
    })
}

fn finish_cell(cell: PendingCell, shared_strings: &[String]) -> Result<Option<String>, XlsxError> {
    let text = match cell.kind {
        CellKind::SharedString => {
            let Ok(index) = cell.value.trim().parse::<usize>() else {
                return Ok(None);
            };
            shared_strings
                .get(index)
                .cloned()
                .ok_or_else(|| XlsxError::SharedStringOutOfRange {
                    cell: cell.reference.clone(),
                    index,
                    len: shared_strings.len(),
                })?
        }
        CellKind::InlineString => cell.inline,
        CellKind::FormulaString | CellKind::Error => cell.value,
        CellKind::Boolean => match cell.value.trim() {
            "1" => "TRUE".to_string(),
            "0" => "FALSE".to_string(),
            other => other.to_string(),
        },
        CellKind::Number => format_number(&cell.value),
    };
    if text.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(text))
    }
}

/// Rows are stored densely by their 1-based sheet row number.
/// Row number from `<row r="..">`, or the one after `previous`.
fn row_attr(
    part: &str,
    e: &quick_xml::events::BytesStart<'_>,
    previous: usize,
) -> Result<usize, XlsxError> {
    let number = attr_value(e, b"r")
        .map_err(|err| xml_error(part, err))?
        .and_then(|r| r.trim().parse::<usize>().ok())
        .unwrap_or(previous + 1);
    if number > MAX_ROWS {
        return Err(xml_error(part, format!("row {number} is past the last row")));
    }
    Ok(number)
}

fn place_row(rows: &mut Vec<Vec<Option<String>>>, row_number: usize, row: Vec<Option<String>>) {
    let index = row_number.saturating_sub(1).max(rows.len());
    while rows.len() < index {
        rows.push(Vec::new());
    }
    rows.push(row);
}
