//! Minimal xlsx reader
//!
//! Reads the first worksheet of an Office Open XML workbook into rows keyed
//! by the header row. Only cell values are read; styles, formulas and
//! merged ranges are ignored.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::io::{Cursor, Read};

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;
use zip::ZipArchive;

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";
const FALLBACK_SHEET: &str = "xl/worksheets/sheet1.xml";

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("Failed to parse uploaded Excel file.")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to parse uploaded Excel file.")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse uploaded Excel file.")]
    Xml(String),

    #[error("Uploaded Excel has no sheets.")]
    NoSheets,

    #[error("The Excel file is empty or could not be processed.")]
    Empty,
}

impl SheetError {
    /// Underlying parser detail, for logs.
    pub fn detail(&self) -> String {
        match self {
            Self::Archive(e) => e.to_string(),
            Self::Io(e) => e.to_string(),
            Self::Xml(e) => e.clone(),
            other => other.to_string(),
        }
    }
}

fn xml_err(err: impl Display) -> SheetError {
    SheetError::Xml(err.to_string())
}

/// One data row of the sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetRow {
    /// 1-based row number as shown in the spreadsheet (header is row 1).
    pub line: u32,
    cells: BTreeMap<String, String>,
}

impl SheetRow {
    pub fn new(line: u32, cells: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            line,
            cells: cells.into_iter().collect(),
        }
    }

    /// Raw cell text.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Trimmed, non-empty text.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    }

    /// Numeric value; thousands separators are tolerated.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.text(column)?
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
    }

    pub fn flag(&self, column: &str) -> Option<bool> {
        match self.text(column)?.to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        }
    }

    /// Comma-separated list, trimmed, empties dropped.
    pub fn list(&self, column: &str) -> Vec<String> {
        self.get(column)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// RFC 3339, `YYYY-MM-DD`, or an Excel serial day number.
    pub fn date(&self, column: &str) -> Option<DateTime<Utc>> {
        let raw = self.text(column)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(day) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            return day.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
        }
        let serial = raw.parse::<f64>().ok().filter(|n| *n > 0.0 && *n < 2_958_466.0)?;
        let epoch = Utc.with_ymd_and_hms(1899, 12, 30, 0, 0, 0).single()?;
        let millis = (serial * 86_400_000.0).round() as i64;
        Some(epoch + Duration::milliseconds(millis))
    }

    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in &self.cells {
            map.insert(key.clone(), Value::String(value.clone()));
        }
        Value::Object(map)
    }
}

/// First worksheet of a workbook
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

/// Parse the first worksheet of an xlsx file.
///
/// Returns [`SheetError::Empty`] when the sheet has no data rows.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Sheet, SheetError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let workbook = read_entry(&mut archive, WORKBOOK)?;
    let (name, rel_id) = first_sheet(&workbook)?.ok_or(SheetError::NoSheets)?;

    let path = match read_entry(&mut archive, WORKBOOK_RELS) {
        Ok(rels) => sheet_target(&rels, &rel_id)?.unwrap_or_else(|| FALLBACK_SHEET.to_owned()),
        Err(SheetError::Archive(zip::result::ZipError::FileNotFound)) => FALLBACK_SHEET.to_owned(),
        Err(e) => return Err(e),
    };

    let shared = match read_entry(&mut archive, SHARED_STRINGS) {
        Ok(xml) => shared_strings(&xml)?,
        Err(SheetError::Archive(zip::result::ZipError::FileNotFound)) => Vec::new(),
        Err(e) => return Err(e),
    };

    let xml = read_entry(&mut archive, &path)?;
    let grid = sheet_cells(&xml, &shared)?;
    debug!(sheet = %name, path = %path, rows = grid.len(), "read worksheet");

    let mut grid = grid.into_iter();
    let (_, header_cells) = grid.next().ok_or(SheetError::Empty)?;
    let width = header_cells.iter().map(|(col, _)| col + 1).max().unwrap_or(0);
    let mut headers = vec![String::new(); width];
    for (col, value) in header_cells {
        headers[col] = value.trim().to_owned();
    }

    let rows: Vec<SheetRow> = grid
        .map(|(line, cells)| {
            let cells = cells.into_iter().filter_map(|(col, value)| {
                headers
                    .get(col)
                    .filter(|h| !h.is_empty())
                    .map(|h| (h.clone(), value))
            });
            SheetRow::new(line, cells)
        })
        .filter(|row| !row.is_blank())
        .collect();

    if rows.is_empty() {
        return Err(SheetError::Empty);
    }

    Ok(Sheet {
        name,
        headers: headers.into_iter().filter(|h| !h.is_empty()).collect(),
        rows,
    })
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<String, SheetError> {
    let mut file = archive.by_name(name)?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(xml)
}

fn attr(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, SheetError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(xml_err)?;
        if attribute.key.as_ref() == key {
            return Ok(Some(attribute.unescape_value().map_err(xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

/// `(name, relationship id)` of the first `<sheet>` in the workbook.
fn first_sheet(xml: &str) -> Result<Option<(String, String)>, SheetError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let name = attr(&e, b"name")?.unwrap_or_default();
                let rel_id = attr(&e, b"r:id")?.unwrap_or_default();
                return Ok(Some((name, rel_id)));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Archive path of the worksheet behind relationship `rel_id`.
fn sheet_target(xml: &str, rel_id: &str) -> Result<Option<String>, SheetError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if attr(&e, b"Id")?.as_deref() != Some(rel_id) {
                    continue;
                }
                return Ok(attr(&e, b"Target")?.map(|target| match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_owned(),
                    None => format!("xl/{target}"),
                }));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Shared string table; rich-text runs are concatenated, phonetic hints
/// dropped.
fn shared_strings(xml: &str) -> Result<Vec<String>, SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Text(t) if in_text && !in_phonetic => {
                current.push_str(&t.unescape().map_err(xml_err)?);
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Last column Excel allows (`XFD`).
const MAX_COLUMN: usize = 16_383;

/// Zero-based column index from a cell reference such as `AB12`; `None`
/// when there are no letters or the column is past `XFD`.
fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(u8::is_ascii_alphabetic)
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let n = letters
        .iter()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1));
    Some(n - 1).filter(|col| *col <= MAX_COLUMN)
}

type Grid = Vec<(u32, Vec<(usize, String)>)>;

#[derive(Default)]
struct CellState {
    column: usize,
    kind: Option<String>,
    value: String,
}

impl CellState {
    fn resolve(self, shared: &[String]) -> (usize, String) {
        let value = match self.kind.as_deref() {
            Some("s") => self
                .value
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|i| shared.get(i).cloned())
                .unwrap_or_default(),
            Some("b") => match self.value.trim() {
                "1" => "true".to_owned(),
                "0" => "false".to_owned(),
                other => other.to_owned(),
            },
            Some("e") => String::new(),
            _ => self.value,
        };
        (self.column, value)
    }
}

/// Every non-empty row as `(sheet row number, [(column, value)])`.
fn sheet_cells(xml: &str, shared: &[String]) -> Result<Grid, SheetError> {
    let mut reader = Reader::from_str(xml);
    let mut grid: Grid = Vec::new();
    let mut row: Option<(u32, Vec<(usize, String)>)> = None;
    let mut cell: Option<CellState> = None;
    let mut capture = false;
    let mut next_line = 1u32;

    loop {
        match reader.read_event().map_err(xml_err)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => {
                    let line = attr(&e, b"r")?
                        .and_then(|r| r.parse::<u32>().ok())
                        .unwrap_or(next_line);
                    next_line = line.saturating_add(1);
                    row = Some((line, Vec::new()));
                }
                b"c" => {
                    let position = row.as_ref().map(|(_, cells)| cells.len()).unwrap_or(0);
                    let column = match attr(&e, b"r")? {
                        Some(reference) => column_index(&reference).ok_or_else(|| {
                            SheetError::Xml(format!("invalid cell reference '{reference}'"))
                        })?,
                        None => position,
                    };
                    cell = Some(CellState {
                        column,
                        kind: attr(&e, b"t")?,
                        value: String::new(),
                    });
                }
                b"v" | b"t" => capture = cell.is_some(),
                _ => {}
            },
            Event::Text(t) if capture => {
                if let Some(cell) = cell.as_mut() {
                    cell.value.push_str(&t.unescape().map_err(xml_err)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => capture = false,
                b"c" => {
                    if let (Some(state), Some((_, cells))) = (cell.take(), row.as_mut()) {
                        let (column, value) = state.resolve(shared);
                        if !value.is_empty() {
                            cells.push((column, value));
                        }
                    }
                }
                b"row" => {
                    if let Some((line, cells)) = row.take() {
                        if !cells.is_empty() {
                            grid.push((line, cells));
                        }
                    }
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                next_line = attr(&e, b"r")?
                    .and_then(|r| r.parse::<u32>().ok())
                    .map(|r| r.saturating_add(1))
                    .unwrap_or(next_line.saturating_add(1));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(grid)
}

/// Build a small xlsx in memory; used by tests across the crate.
#[cfg(test)]
pub(crate) fn workbook_fixture(rows: &[&[&str]]) -> Vec<u8> {
    let mut shared: Vec<String> = Vec::new();
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    for (r, cells) in rows.iter().enumerate() {
        sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, value) in cells.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            let reference = format!("{}{}", (b'A' + c as u8) as char, r + 1);
            if value.parse::<f64>().is_ok() {
                sheet.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            } else {
                shared.push(value.replace('&', "&amp;"));
                sheet.push_str(&format!(
                    r#"<c r="{reference}" t="s"><v>{}</v></c>"#,
                    shared.len() - 1
                ));
            }
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");
    package_fixture(&sheet, &shared)
}

/// Zip a worksheet body and its shared strings into a one-sheet workbook.
#[cfg(test)]
pub(crate) fn package_fixture(sheet: &str, shared: &[String]) -> Vec<u8> {
    use std::io::Write;
    use zip::write::FileOptions;

    let strings: String = shared.iter().map(|s| format!("<si><t>{s}</t></si>")).collect();
    let files = [
        (
            WORKBOOK,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Listings" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_owned(),
        ),
        (
            WORKBOOK_RELS,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_owned(),
        ),
        (SHARED_STRINGS, format!("<sst>{strings}</sst>")),
        (FALLBACK_SHEET, sheet.to_owned()),
    ];

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in files {
        writer.start_file(name, FileOptions::default()).unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}
