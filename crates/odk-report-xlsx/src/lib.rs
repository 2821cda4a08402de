//! Minimal `.xlsx` reader for odk-report
//!
//! An Office Open XML workbook is a zip archive of XML parts:
//! - `xl/workbook.xml` lists sheets by name and relationship id
//! - `xl/_rels/workbook.xml.rels` maps relationship ids to worksheet parts
//! - `xl/sharedStrings.xml` (optional) holds the shared string table
//! - `xl/worksheets/sheetN.xml` holds the cells
//!
//! Only cell *values* are read. Styles, number formats, merged cells and
//! formulas are ignored; every cell comes back as text (see [`sheet`]).

use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

pub mod sheet;

pub use sheet::{Sheet, SheetTable};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum XlsxError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a readable workbook archive: {0}")]
    Zip(#[source] ZipError),

    #[error("workbook part `{0}` is missing")]
    MissingPart(String),

    #[error("malformed XML in `{part}`: {message}")]
    Xml { part: String, message: String },

    #[error("workbook has no sheet named `{0}`")]
    MissingSheet(String),

    #[error("sheet `{sheet}` has no worksheet part (relationship `{rel_id}`)")]
    UnresolvedSheet { sheet: String, rel_id: String },

    #[error("cell {cell} refers to shared string {index}, but the table has {len}")]
    SharedStringOutOfRange {
        cell: String,
        index: usize,
        len: usize,
    },
}

pub(crate) fn xml_error(part: &str, err: impl std::fmt::Display) -> XlsxError {
    XlsxError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    }
}

// ============================================================================
// Workbook
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
struct SheetEntry {
    name: String,
    part: String,
}

/// An opened workbook: the sheet directory and shared strings are parsed
/// up front, worksheets are parsed on demand by [`Workbook::read_sheet`].
pub struct Workbook<R: Read + Seek> {
    archive: ZipArchive<R>,
    entries: Vec<SheetEntry>,
    shared_strings: Vec<String>,
}

impl Workbook<BufReader<File>> {
    /// Open a workbook from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, XlsxError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }
}

impl Workbook<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, XlsxError> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> Workbook<R> {
    pub fn from_reader(reader: R) -> Result<Self, XlsxError> {
        let mut archive = ZipArchive::new(reader).map_err(XlsxError::Zip)?;

        let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?;
        let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART)?;
        let shared_strings = match read_optional_part(&mut archive, SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let rels = parse_relationships(&rels_xml)?;
        let mut entries = Vec::new();
        for (name, rel_id) in parse_sheet_list(&workbook_xml)? {
            let Some((_, target)) = rels.iter().find(|(id, _)| *id == rel_id) else {
                return Err(XlsxError::UnresolvedSheet {
                    sheet: name,
                    rel_id,
                });
            };
            entries.push(SheetEntry {
                name,
                part: resolve_part("xl", target),
            });
        }

        Ok(Self {
            archive,
            entries,
            shared_strings,
        })
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn has_sheet(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Parse the named worksheet. Names match exactly (case-sensitive).
    pub fn read_sheet(&mut self, name: &str) -> Result<Sheet, XlsxError> {
        let part = self
            .entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.part.clone())
            .ok_or_else(|| XlsxError::MissingSheet(name.to_string()))?;
        let xml = read_part(&mut self.archive, &part)?;
        let sheet = sheet::parse_worksheet(name, &part, &xml, &self.shared_strings)?;
        tracing::debug!(sheet = name, part = %part, rows = sheet.rows.len(), "parsed worksheet");
        Ok(sheet)
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, part: &str) -> Result<String, XlsxError> {
    read_optional_part(archive, part)?.ok_or_else(|| XlsxError::MissingPart(part.to_string()))
}

fn read_optional_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
) -> Result<Option<String>, XlsxError> {
    let mut file = match archive.by_name(part) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(err) => return Err(XlsxError::Zip(err)),
    };
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(Some(text))
}

/// Resolve a relationship target against the directory of its source part.
/// Absolute targets (`/xl/worksheets/sheet1.xml`) are package-rooted.
fn resolve_part(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{base_dir}/{target}"),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

// ============================================================================
// Part parsers
// ============================================================================

/// Value of the first attribute whose local name is `local`, unescaped.
pub(crate) fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == local {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// `(sheet name, relationship id)` pairs in workbook order.
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader
            .read_event()
            .map_err(|err| xml_error(WORKBOOK_PART, err))?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_value(&e, b"name").map_err(|err| xml_error(WORKBOOK_PART, err))?;
                let rel_id = attr_value(&e, b"id").map_err(|err| xml_error(WORKBOOK_PART, err))?;
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// `(relationship id, target)` pairs.
fn parse_relationships(xml: &str) -> Result<Vec<(String, String)>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();
    loop {
        match reader
            .read_event()
            .map_err(|err| xml_error(WORKBOOK_RELS_PART, err))?
        {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let id = attr_value(&e, b"Id").map_err(|err| xml_error(WORKBOOK_RELS_PART, err))?;
                let target =
                    attr_value(&e, b"Target").map_err(|err| xml_error(WORKBOOK_RELS_PART, err))?;
                if let (Some(id), Some(target)) = (id, target) {
                    rels.push((id, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

/// Shared strings, one per `<si>`. Rich-text runs are concatenated; phonetic
/// hints (`<rPh>`) are skipped.
fn parse_shared_strings(xml: &str) -> Result<Vec<String>, XlsxError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut phonetic_depth = 0usize;

    loop {
        match reader
            .read_event()
            .map_err(|err| xml_error(SHARED_STRINGS_PART, err))?
        {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => phonetic_depth += 1,
                b"t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text && phonetic_depth == 0 => {
                if let Some(buf) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|err| xml_error(SHARED_STRINGS_PART, err))?;
                    buf.push_str(&text);
                }
            }
            Event::CData(c) if in_text && phonetic_depth == 0 => {
                if let Some(buf) = current.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => phonetic_depth = phonetic_depth.saturating_sub(1),
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}
