//! Cell fill colours read straight from the xlsx package.
//!
//! calamine exposes values only, so "vendor to be paid" markers (cells
//! shaded cyan by hand) are recovered from `xl/styles.xml` and the sheet XML.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::Result;
use crate::receivables::CellFlags;

/// Solid fill colour (`RRGGBB`) of every shaded cell on one sheet, matched
/// against a set of flag colours.
#[derive(Debug, Default)]
pub struct FillFlags {
    fills: HashMap<(u32, u32), String>,
    colors: HashSet<String>,
}

impl FillFlags {
    /// Read fills for `sheet`, or the first sheet when no sheet has that name.
    pub fn open(path: &Path, sheet: &str, flag_colors: &[String]) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let styles = read_zip_file(&mut archive, "xl/styles.xml").unwrap_or_default();
        let fill_colors = parse_fills(&styles);
        let xf_fills = parse_cell_xfs(&styles);

        let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml").unwrap_or_default();
        let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
        let fills = match resolve_worksheet_path(&workbook_xml, &rels_xml, sheet) {
            Some(ws_path) => {
                let xml = read_zip_file(&mut archive, &ws_path)?;
                parse_sheet_fills(&xml, &xf_fills, &fill_colors)
            }
            None => HashMap::new(),
        };
        tracing::debug!(sheet, shaded = fills.len(), "read cell fills");

        Ok(Self {
            fills,
            colors: flag_colors.iter().filter_map(|c| normalize_rgb(c)).collect(),
        })
    }

    /// Fill colour of a zero-based cell as `RRGGBB`.
    pub fn fill_at(&self, row: u32, col: u32) -> Option<&str> {
        self.fills.get(&(row, col)).map(String::as_str)
    }
}

impl CellFlags for FillFlags {
    fn is_flagged(&self, row: u32, col: u32) -> bool {
        self.fill_at(row, col)
            .map(|rgb| self.colors.contains(rgb))
            .unwrap_or(false)
    }
}

/// `03FFFF`, `ff03ffff` -> `03FFFF`. Only opaque ARGB values are accepted.
pub fn normalize_rgb(raw: &str) -> Option<String> {
    let upper = raw.trim().to_ascii_uppercase();
    let rgb = match upper.len() {
        6 => upper.as_str(),
        8 => upper.strip_prefix("FF")?,
        _ => return None,
    };
    rgb.bytes()
        .all(|b| b.is_ascii_hexdigit())
        .then(|| rgb.to_string())
}

// ---------------------------------------------------------------------------
// styles.xml
// ---------------------------------------------------------------------------

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).to_string())
}

/// `<fills>`: the pattern foreground colour of each fill, by fill id.
fn parse_fills(xml: &str) -> Vec<Option<String>> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_fills = false;
    let mut in_pattern = false;
    let mut current: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"fills" => in_fills = true,
                b"fill" if in_fills => current = None,
                b"patternFill" if in_fills => in_pattern = true,
                b"fgColor" if in_pattern => current = attr(e, b"rgb"),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"fill" if in_fills => fills.push(None),
                b"fgColor" if in_pattern => current = attr(e, b"rgb"),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"patternFill" => in_pattern = false,
                b"fill" if in_fills => fills.push(current.take()),
                b"fills" => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    fills
}

/// `<cellXfs>`: the fill id of each cell style, by style index.
fn parse_cell_xfs(xml: &str) -> Vec<usize> {
    let mut xfs = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => {
                    let fill_id = attr(e, b"fillId")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(0);
                    xfs.push(fill_id);
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"cellXfs" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    xfs
}

// ---------------------------------------------------------------------------
// Worksheet
// ---------------------------------------------------------------------------

fn parse_sheet_fills(
    xml: &str,
    xf_fills: &[usize],
    fill_colors: &[Option<String>],
) -> HashMap<(u32, u32), String> {
    let mut out = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"c" => {
                let cell = attr(e, b"r").and_then(|r| parse_cell_ref(&r));
                let style: Option<usize> = attr(e, b"s").and_then(|s| s.parse().ok());
                let color = style
                    .and_then(|s| xf_fills.get(s))
                    .and_then(|&fill| fill_colors.get(fill))
                    .and_then(|c| c.as_deref())
                    .and_then(normalize_rgb);
                if let (Some(cell), Some(color)) = (cell, color) {
                    out.insert(cell, color);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

/// `W12` -> zero-based `(11, 22)`.
fn parse_cell_ref(r: &str) -> Option<(u32, u32)> {
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = r.split_at(split);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let col = letters
        .bytes()
        .fold(0u32, |acc, b| acc * 26 + (b.to_ascii_uppercase() - b'A' + 1) as u32);
    let row: u32 = digits.parse().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

// ---------------------------------------------------------------------------
// Package helpers
// ---------------------------------------------------------------------------

fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive.by_name(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Package path of the named sheet, falling back to the first sheet.
fn resolve_worksheet_path(workbook_xml: &str, rels_xml: &str, sheet: &str) -> Option<String> {
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) if e.name().as_ref() == b"sheet" => {
                if let (Some(name), Some(rid)) = (attr(e, b"name"), attr(e, b"r:id")) {
                    sheets.push((name, rid));
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let mut targets: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(rels_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                    targets.insert(id, target);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let rid = sheets
        .iter()
        .find(|(name, _)| name == sheet)
        .or_else(|| sheets.first())
        .map(|(_, rid)| rid)?;
    let target = targets.get(rid)?;
    Some(match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    })
}
