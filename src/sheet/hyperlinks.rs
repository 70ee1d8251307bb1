//! Hyperlink targets stored in xlsx relationship parts.
//!
//! calamine exposes cell values only, so the link targets are read straight
//! from the package: `xl/workbook.xml` names the sheet part, the sheet's
//! `<hyperlink ref r:id>` elements point into its `_rels` part, and the
//! relationship `Target` holds the URL.

use crate::error::{Result, XaurumError};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;
use zip::result::ZipError;

const ZIP_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xltx", "xltm", "xlam"];

/// Whether the workbook is an Office Open XML package
pub fn is_zip_container(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ZIP_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// External hyperlink targets of one worksheet, keyed by 1-based (row, column)
///
/// Ranged anchors are expanded only within `extent`, the sheet's last used
/// (row, column).
pub fn read_sheet_hyperlinks(
    path: &Path,
    sheet_name: &str,
    extent: (u32, u32),
) -> Result<HashMap<(u32, u32), String>> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    let mut links = HashMap::new();

    let workbook_xml = read_entry(&mut archive, "xl/workbook.xml")?;
    let Some(relationship_id) = sheet_relationship_id(&workbook_xml, sheet_name)? else {
        return Ok(links);
    };

    let workbook_rels = read_entry(&mut archive, "xl/_rels/workbook.xml.rels")?;
    let Some(target) = parse_relationships(&workbook_rels)?.remove(&relationship_id) else {
        return Ok(links);
    };
    let sheet_part = resolve_part("xl", &target);

    let sheet_xml = read_entry(&mut archive, &sheet_part)?;
    let anchors = parse_hyperlink_anchors(&sheet_xml)?;
    if anchors.is_empty() {
        return Ok(links);
    }

    let sheet_rels = match read_optional_entry(&mut archive, &rels_part(&sheet_part))? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };

    for (reference, id) in anchors {
        let Some(target) = sheet_rels.get(&id) else {
            continue;
        };
        for cell in expand_reference(&reference, extent) {
            links.entry(cell).or_insert_with(|| target.clone());
        }
    }
    Ok(links)
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut entry = archive.by_name(name)?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

fn read_optional_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    match read_entry(archive, name) {
        Ok(content) => Ok(Some(content)),
        Err(XaurumError::Archive(ZipError::FileNotFound)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn attribute(element: &BytesStart, local_name: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == local_name)
        .map(|attr| {
            let raw = String::from_utf8_lossy(&attr.value).into_owned();
            quick_xml::escape::unescape(&raw)
                .map(|value| value.into_owned())
                .unwrap_or(raw)
        })
}

/// `r:id` of the `<sheet>` element with the given name
fn sheet_relationship_id(workbook_xml: &str, sheet_name: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(workbook_xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"sheet" =>
            {
                if attribute(&element, b"name").as_deref() == Some(sheet_name) {
                    return Ok(attribute(&element, b"id"));
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Relationship Id to Target
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let mut relationships = HashMap::new();
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"Relationship" =>
            {
                if let (Some(id), Some(target)) =
                    (attribute(&element, b"Id"), attribute(&element, b"Target"))
                {
                    relationships.insert(id, target);
                }
            }
            Event::Eof => return Ok(relationships),
            _ => {}
        }
    }
}

/// `(ref, r:id)` of every `<hyperlink>` carrying a relationship
fn parse_hyperlink_anchors(sheet_xml: &str) -> Result<Vec<(String, String)>> {
    let mut anchors = Vec::new();
    let mut reader = Reader::from_str(sheet_xml);
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"hyperlink" =>
            {
                if let (Some(reference), Some(id)) =
                    (attribute(&element, b"ref"), attribute(&element, b"id"))
                {
                    anchors.push((reference, id));
                }
            }
            Event::Eof => return Ok(anchors),
            _ => {}
        }
    }
}

/// Package path of a relationship target
fn resolve_part(base: &str, target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{}/{}", base, target),
    }
}

/// `xl/worksheets/sheet1.xml` -> `xl/worksheets/_rels/sheet1.xml.rels`
fn rels_part(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// `H2` -> (2, 8)
pub fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
    let reference = reference.replace('$', "");
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let column = letters
        .chars()
        .try_fold(0u32, |acc, c| {
            let value = c.to_ascii_uppercase() as u32 - 'A' as u32 + 1;
            acc.checked_mul(26)?.checked_add(value)
        })?;
    let row: u32 = digits.parse().ok()?;
    (row > 0).then_some((row, column))
}

/// Every cell of `A1` or `A1:B3` that lies inside `extent`
fn expand_reference(reference: &str, extent: (u32, u32)) -> Vec<(u32, u32)> {
    let (start, end) = match reference.split_once(':') {
        Some((start, end)) => (parse_cell_reference(start), parse_cell_reference(end)),
        None => {
            let cell = parse_cell_reference(reference);
            (cell, cell)
        }
    };
    match (start, end) {
        (Some((r1, c1)), Some((r2, c2))) => {
            let (max_row, max_col) = extent;
            let rows = r1.min(r2)..=r1.max(r2).min(max_row);
            let cols = c1.min(c2)..=c1.max(c2).min(max_col);
            rows.flat_map(|row| cols.clone().map(move |col| (row, col)))
                .collect()
        }
        _ => Vec::new(),
    }
}
