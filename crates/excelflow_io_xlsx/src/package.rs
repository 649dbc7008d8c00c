//! Append one worksheet to an existing workbook package.
//!
//! Only three existing parts are rewritten: the workbook part (one new
//! `<sheet>` entry), its relationships part (one new `Relationship`) and
//! `[Content_Types].xml` (one new `Override`). Every other zip entry,
//! existing worksheets included, is copied without recompression. The new
//! worksheet stores text as inline strings so the shared-string table and
//! the style table stay untouched.

use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use polars::prelude::DataFrame;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::conf::{
    C_CONTENT_TYPE_WORKSHEET, C_NS_RELATIONSHIPS, C_NS_SPREADSHEETML, C_REL_TYPE_OFFICE_DOCUMENT,
    C_REL_TYPE_WORKSHEET,
};
use crate::error::XlsxWriteError;
use crate::spec::{EnumCellValue, EnumOutputMode, SpecSheetWriteReport};
use crate::util::{
    derive_cell_ref, derive_column_names, read_cell, validate_sheet_name, validate_table_limits,
};

const C_PART_CONTENT_TYPES: &str = "[Content_Types].xml";
const C_PART_PACKAGE_RELS: &str = "_rels/.rels";
const C_PART_WORKBOOK_DEFAULT: &str = "xl/workbook.xml";

////////////////////////////////////////////////////////////////////////////////
// #region PackageModels

/// One `<sheet>` entry of the workbook part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecWorkbookSheet {
    /// Display name.
    pub name: String,
    /// Numeric `sheetId`.
    pub sheet_id: u32,
}

/// One `Relationship` entry of a relationships part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRelationship {
    /// `Id` attribute (`rId3`).
    pub id: String,
    /// `Type` URI.
    pub rel_type: String,
    /// `Target` as written.
    pub target: String,
}

/// Everything decided before any byte is written.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SpecAppendPlan {
    part_workbook: String,
    part_workbook_rels: String,
    part_worksheet_new: String,
    target_worksheet_new: String,
    rel_id_new: String,
    sheet_id_new: u32,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region AppendEntry

/// Add `df` as a new sheet named `sheet_name` to the workbook at `path`.
///
/// Existing sheets keep their names, order and content. The rewritten
/// package goes to a temporary sibling file that then replaces `path`.
pub fn append_sheet_to_workbook<P: AsRef<Path>>(
    path: P,
    sheet_name: &str,
    df: &DataFrame,
) -> Result<SpecSheetWriteReport, XlsxWriteError> {
    let path = path.as_ref();
    validate_sheet_name(sheet_name)?;
    validate_table_limits(df)?;

    let v_worksheet_xml = render_worksheet_xml(df)?;
    let path_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut file_tmp = NamedTempFile::new_in(path_dir)?;

    {
        let mut archive = ZipArchive::new(File::open(path)?)?;
        let plan = plan_append(&mut archive, sheet_name)?;

        let v_workbook = read_part(&mut archive, &plan.part_workbook)?;
        let v_workbook_rels = read_part(&mut archive, &plan.part_workbook_rels)?;
        let v_content_types = read_part(&mut archive, C_PART_CONTENT_TYPES)?;

        let v_workbook_new = insert_workbook_sheet(&v_workbook, sheet_name, &plan)?;
        let v_workbook_rels_new = insert_relationship(
            &v_workbook_rels,
            &plan.rel_id_new,
            C_REL_TYPE_WORKSHEET,
            &plan.target_worksheet_new,
        )?;
        let v_content_types_new =
            insert_content_type_override(&v_content_types, &plan.part_worksheet_new)?;

        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip_writer = ZipWriter::new(file_tmp.as_file_mut());
        for n_idx in 0..archive.len() {
            let entry = archive.by_index_raw(n_idx)?;
            let name = entry.name().to_string();
            let v_replacement = if name == plan.part_workbook {
                Some(&v_workbook_new)
            } else if name == plan.part_workbook_rels {
                Some(&v_workbook_rels_new)
            } else if name == C_PART_CONTENT_TYPES {
                Some(&v_content_types_new)
            } else {
                None
            };

            match v_replacement {
                Some(v_bytes) => {
                    drop(entry);
                    zip_writer.start_file(name, opts)?;
                    zip_writer.write_all(v_bytes)?;
                }
                None => zip_writer.raw_copy_file(entry)?,
            }
        }
        zip_writer.start_file(plan.part_worksheet_new.clone(), opts)?;
        zip_writer.write_all(&v_worksheet_xml)?;
        zip_writer.finish()?;

        log::debug!(
            "Appending sheet {sheet_name:?} as {} ({}, sheetId={})",
            plan.part_worksheet_new,
            plan.rel_id_new,
            plan.sheet_id_new
        );
    }

    std::fs::set_permissions(file_tmp.path(), std::fs::metadata(path)?.permissions())?;
    file_tmp.persist(path).map_err(|err| err.error)?;

    Ok(SpecSheetWriteReport {
        sheet_name: sheet_name.to_string(),
        mode_applied: EnumOutputMode::Append,
        n_rows: df.height(),
        n_cols: df.width(),
    })
}

fn plan_append<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_name: &str,
) -> Result<SpecAppendPlan, XlsxWriteError> {
    let part_workbook = match read_part_optional(archive, C_PART_PACKAGE_RELS)? {
        Some(v_rels) => parse_relationships(&v_rels)?
            .into_iter()
            .find(|rel| rel.rel_type == C_REL_TYPE_OFFICE_DOCUMENT)
            .map(|rel| rel.target.trim_start_matches('/').to_string())
            .unwrap_or_else(|| C_PART_WORKBOOK_DEFAULT.to_string()),
        None => C_PART_WORKBOOK_DEFAULT.to_string(),
    };
    let part_workbook_rels = derive_rels_part_name(&part_workbook);

    let l_sheets = parse_workbook_sheets(&read_part(archive, &part_workbook)?)?;
    let c_name_folded = sheet_name.to_lowercase();
    if l_sheets
        .iter()
        .any(|sheet| sheet.name.to_lowercase() == c_name_folded)
    {
        return Err(XlsxWriteError::SheetExists(sheet_name.to_string()));
    }
    let l_rels = parse_relationships(&read_part(archive, &part_workbook_rels)?)?;

    let set_part_names: HashSet<String> = archive.file_names().map(str::to_string).collect();
    let c_dir_workbook = derive_part_dir(&part_workbook);
    let mut n_part_idx = l_sheets.len() + 1;
    let (part_worksheet_new, target_worksheet_new) = loop {
        let target = format!("worksheets/sheet{n_part_idx}.xml");
        let part = format!("{c_dir_workbook}{target}");
        if !set_part_names.contains(&part) {
            break (part, target);
        }
        n_part_idx += 1;
    };

    let set_rel_ids: HashSet<&str> = l_rels.iter().map(|rel| rel.id.as_str()).collect();
    let mut n_rel_idx = l_rels
        .iter()
        .filter_map(|rel| rel.id.strip_prefix("rId")?.parse::<usize>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    while set_rel_ids.contains(format!("rId{n_rel_idx}").as_str()) {
        n_rel_idx += 1;
    }

    let sheet_id_new = l_sheets
        .iter()
        .map(|sheet| sheet.sheet_id)
        .max()
        .unwrap_or(0)
        + 1;

    Ok(SpecAppendPlan {
        part_workbook,
        part_workbook_rels,
        part_worksheet_new,
        target_worksheet_new,
        rel_id_new: format!("rId{n_rel_idx}"),
        sheet_id_new,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PartAccess

fn read_part_optional<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
) -> Result<Option<Vec<u8>>, XlsxWriteError> {
    match archive.by_name(part) {
        Ok(mut entry) => {
            let mut v_bytes = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut v_bytes)?;
            Ok(Some(v_bytes))
        }
        Err(zip::result::ZipError::FileNotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    part: &str,
) -> Result<Vec<u8>, XlsxWriteError> {
    read_part_optional(archive, part)?.ok_or_else(|| XlsxWriteError::InvalidPackage {
        part: part.to_string(),
        message: "required part is missing".to_string(),
    })
}

/// `xl/workbook.xml` -> `xl/_rels/workbook.xml.rels`.
fn derive_rels_part_name(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// `xl/workbook.xml` -> `xl/`.
fn derive_part_dir(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/"),
        None => String::new(),
    }
}

fn derive_attr_value(attr: &Attribute<'_>) -> Result<String, XlsxWriteError> {
    let raw = std::str::from_utf8(&attr.value).map_err(|err| XlsxWriteError::InvalidPackage {
        part: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
        message: err.to_string(),
    })?;
    let value = quick_xml::escape::unescape(raw).map_err(quick_xml::Error::from)?;
    Ok(value.into_owned())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PartParsing

/// Read the `<sheet>` entries of a workbook part, in order.
pub fn parse_workbook_sheets(v_xml: &[u8]) -> Result<Vec<SpecWorkbookSheet>, XlsxWriteError> {
    let mut reader = Reader::from_reader(v_xml);
    let mut l_sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut sheet_id = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    match attr.key.as_ref() {
                        b"name" => name = Some(derive_attr_value(&attr)?),
                        b"sheetId" => sheet_id = derive_attr_value(&attr)?.parse::<u32>().ok(),
                        _ => {}
                    }
                }
                let name = name.ok_or_else(|| XlsxWriteError::InvalidPackage {
                    part: "workbook".to_string(),
                    message: "<sheet> without a name".to_string(),
                })?;
                l_sheets.push(SpecWorkbookSheet {
                    name,
                    sheet_id: sheet_id.unwrap_or(0),
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(l_sheets)
}

/// Read the `Relationship` entries of a relationships part.
pub fn parse_relationships(v_xml: &[u8]) -> Result<Vec<SpecRelationship>, XlsxWriteError> {
    let mut reader = Reader::from_reader(v_xml);
    let mut l_rels = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut rel = SpecRelationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                };
                for attr in e.attributes() {
                    let attr = attr.map_err(quick_xml::Error::from)?;
                    match attr.key.as_ref() {
                        b"Id" => rel.id = derive_attr_value(&attr)?,
                        b"Type" => rel.rel_type = derive_attr_value(&attr)?,
                        b"Target" => rel.target = derive_attr_value(&attr)?,
                        _ => {}
                    }
                }
                l_rels.push(rel);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(l_rels)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PartRewriting

/// Copy every event of `v_xml`, calling `on_close` when the element whose
/// local name is `container` closes (an empty `<container/>` is expanded).
fn rewrite_before_close<F>(
    v_xml: &[u8],
    part: &str,
    container: &[u8],
    mut on_close: F,
) -> Result<Vec<u8>, XlsxWriteError>
where
    F: FnMut(&mut Writer<Vec<u8>>, &RewriteContext) -> Result<(), XlsxWriteError>,
{
    let mut reader = Reader::from_reader(v_xml);
    let mut writer = Writer::new(Vec::with_capacity(v_xml.len() + 256));
    let mut ctx = RewriteContext::default();
    let mut if_inserted = false;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if !ctx.if_root_seen => {
                ctx.observe_root(e)?;
            }
            _ => {}
        }

        match event {
            Event::End(e) if !if_inserted && e.local_name().as_ref() == container => {
                ctx.prefix = derive_prefix(e.name().as_ref());
                on_close(&mut writer, &ctx)?;
                if_inserted = true;
                writer.write_event(Event::End(e))?;
            }
            Event::Empty(e) if !if_inserted && e.local_name().as_ref() == container => {
                ctx.prefix = derive_prefix(e.name().as_ref());
                let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                writer.write_event(Event::Start(e))?;
                on_close(&mut writer, &ctx)?;
                if_inserted = true;
                writer.write_event(Event::End(BytesEnd::new(tag)))?;
            }
            other => writer.write_event(other)?,
        }
    }

    if !if_inserted {
        return Err(XlsxWriteError::InvalidPackage {
            part: part.to_string(),
            message: format!(
                "element <{}> not found",
                String::from_utf8_lossy(container)
            ),
        });
    }
    Ok(writer.into_inner())
}

/// Namespace facts collected while rewriting a part.
#[derive(Debug, Default)]
struct RewriteContext {
    if_root_seen: bool,
    /// Prefix bound to the relationships namespace on the root element.
    prefix_relationships: Option<String>,
    /// Prefix of the container element being closed (`x` in `</x:sheets>`).
    prefix: Option<String>,
}

impl RewriteContext {
    fn observe_root(&mut self, e: &BytesStart<'_>) -> Result<(), XlsxWriteError> {
        self.if_root_seen = true;
        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = attr.key.as_ref();
            if let Some(prefix) = key.strip_prefix(b"xmlns:")
                && derive_attr_value(&attr)? == C_NS_RELATIONSHIPS
            {
                self.prefix_relationships = Some(String::from_utf8_lossy(prefix).into_owned());
            }
        }
        Ok(())
    }

    fn qualify(&self, local: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }
}

fn derive_prefix(name: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(name);
    text.split_once(':').map(|(prefix, _)| prefix.to_string())
}

fn insert_workbook_sheet(
    v_xml: &[u8],
    sheet_name: &str,
    plan: &SpecAppendPlan,
) -> Result<Vec<u8>, XlsxWriteError> {
    let c_sheet_id = plan.sheet_id_new.to_string();
    rewrite_before_close(v_xml, &plan.part_workbook, b"sheets", |writer, ctx| {
        let mut elem = BytesStart::new(ctx.qualify("sheet"));
        elem.push_attribute(("name", sheet_name));
        elem.push_attribute(("sheetId", c_sheet_id.as_str()));
        match &ctx.prefix_relationships {
            Some(prefix) => {
                elem.push_attribute((format!("{prefix}:id").as_str(), plan.rel_id_new.as_str()));
            }
            None => {
                elem.push_attribute(("xmlns:r", C_NS_RELATIONSHIPS));
                elem.push_attribute(("r:id", plan.rel_id_new.as_str()));
            }
        }
        writer.write_event(Event::Empty(elem))?;
        Ok(())
    })
}

fn insert_relationship(
    v_xml: &[u8],
    rel_id: &str,
    rel_type: &str,
    target: &str,
) -> Result<Vec<u8>, XlsxWriteError> {
    rewrite_before_close(v_xml, "workbook relationships", b"Relationships", |writer, ctx| {
        let mut elem = BytesStart::new(ctx.qualify("Relationship"));
        elem.push_attribute(("Id", rel_id));
        elem.push_attribute(("Type", rel_type));
        elem.push_attribute(("Target", target));
        writer.write_event(Event::Empty(elem))?;
        Ok(())
    })
}

fn insert_content_type_override(
    v_xml: &[u8],
    part_worksheet: &str,
) -> Result<Vec<u8>, XlsxWriteError> {
    let c_part_name = format!("/{part_worksheet}");
    rewrite_before_close(v_xml, C_PART_CONTENT_TYPES, b"Types", |writer, ctx| {
        let mut elem = BytesStart::new(ctx.qualify("Override"));
        elem.push_attribute(("PartName", c_part_name.as_str()));
        elem.push_attribute(("ContentType", C_CONTENT_TYPE_WORKSHEET));
        writer.write_event(Event::Empty(elem))?;
        Ok(())
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorksheetRendering

/// Render `df` as a standalone worksheet part (header row + body rows).
pub fn render_worksheet_xml(df: &DataFrame) -> Result<Vec<u8>, XlsxWriteError> {
    let l_colnames = derive_column_names(df);
    let n_height = df.height();
    let n_width = l_colnames.len();

    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;

    let mut elem_root = BytesStart::new("worksheet");
    elem_root.push_attribute(("xmlns", C_NS_SPREADSHEETML));
    elem_root.push_attribute(("xmlns:r", C_NS_RELATIONSHIPS));
    writer.write_event(Event::Start(elem_root))?;

    let c_dimension = if n_width == 0 {
        "A1".to_string()
    } else {
        format!("A1:{}", derive_cell_ref(n_height, n_width - 1))
    };
    let mut elem_dimension = BytesStart::new("dimension");
    elem_dimension.push_attribute(("ref", c_dimension.as_str()));
    writer.write_event(Event::Empty(elem_dimension))?;

    writer.write_event(Event::Start(BytesStart::new("sheetData")))?;

    let l_header: Vec<EnumCellValue> = l_colnames
        .iter()
        .map(|c_name| EnumCellValue::String(c_name.clone()))
        .collect();
    write_row(&mut writer, 0, &l_header)?;

    let mut l_row = Vec::with_capacity(n_width);
    for n_idx_row in 0..n_height {
        l_row.clear();
        for n_idx_col in 0..n_width {
            l_row.push(read_cell(df, n_idx_row, n_idx_col)?);
        }
        write_row(&mut writer, n_idx_row + 1, &l_row)?;
    }

    writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
    writer.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(writer.into_inner())
}

fn write_row(
    writer: &mut Writer<Vec<u8>>,
    row_idx: usize,
    l_values: &[EnumCellValue],
) -> Result<(), XlsxWriteError> {
    let c_row_num = (row_idx + 1).to_string();
    let mut elem_row = BytesStart::new("row");
    elem_row.push_attribute(("r", c_row_num.as_str()));
    writer.write_event(Event::Start(elem_row))?;

    for (n_idx_col, value) in l_values.iter().enumerate() {
        let c_ref = derive_cell_ref(row_idx, n_idx_col);
        let mut elem_cell = BytesStart::new("c");
        elem_cell.push_attribute(("r", c_ref.as_str()));
        match value {
            EnumCellValue::None => continue,
            EnumCellValue::String(val) => {
                elem_cell.push_attribute(("t", "inlineStr"));
                writer.write_event(Event::Start(elem_cell))?;
                writer.write_event(Event::Start(BytesStart::new("is")))?;
                let mut elem_text = BytesStart::new("t");
                if val.trim() != val {
                    elem_text.push_attribute(("xml:space", "preserve"));
                }
                writer.write_event(Event::Start(elem_text))?;
                writer.write_event(Event::Text(BytesText::new(&escape_ooxml_control_chars(
                    val,
                ))))?;
                writer.write_event(Event::End(BytesEnd::new("t")))?;
                writer.write_event(Event::End(BytesEnd::new("is")))?;
            }
            EnumCellValue::Number(val) => {
                writer.write_event(Event::Start(elem_cell))?;
                write_value(writer, &val.to_string())?;
            }
            EnumCellValue::Boolean(val) => {
                elem_cell.push_attribute(("t", "b"));
                writer.write_event(Event::Start(elem_cell))?;
                write_value(writer, if *val { "1" } else { "0" })?;
            }
        }
        writer.write_event(Event::End(BytesEnd::new("c")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn write_value(writer: &mut Writer<Vec<u8>>, text: &str) -> Result<(), XlsxWriteError> {
    writer.write_event(Event::Start(BytesStart::new("v")))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new("v")))?;
    Ok(())
}

/// XML 1.0 cannot carry most C0 controls; OOXML spells them `_xHHHH_`.
fn escape_ooxml_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for chr in text.chars() {
        if (chr as u32) < 0x20 && !matches!(chr, '\t' | '\n' | '\r') {
            out.push_str(&format!("_x{:04X}_", chr as u32));
        } else {
            out.push(chr);
        }
    }
    out
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
