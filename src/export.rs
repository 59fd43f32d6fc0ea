use crate::models::TicketRow;
use std::io::{Cursor, Write};
use zip::{result::ZipError, write::SimpleFileOptions, ZipWriter};

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

const HEADER: [&str; 7] = [
    "id",
    "title",
    "description",
    "status",
    "created_at",
    "created_by",
    "assigned_to",
];

fn fields<'a>(row: &'a TicketRow, id: &'a str) -> [&'a str; 7] {
    [
        id,
        row.title.as_str(),
        row.description.as_str(),
        row.status.label(),
        row.created_at.as_str(),
        row.created_by.as_deref().unwrap_or(""),
        row.assigned_to.as_deref().unwrap_or(""),
    ]
}

pub fn export_csv(rows: &[TicketRow]) -> String {
    let mut out = String::new();
    push_record(&mut out, HEADER.iter().copied());
    for row in rows {
        let id = row.id.to_string();
        push_record(&mut out, fields(row, &id).into_iter());
    }
    out
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (index, field) in fields.enumerate() {
        if index > 0 {
            out.push(',');
        }
        push_field(out, field);
    }
    out.push('\n');
}

fn push_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// Builds a single-sheet workbook ("Tickets") with the same columns as the
/// CSV export. Ids are numeric cells, everything else inline strings.
pub fn export_xlsx(rows: &[TicketRow]) -> Result<Vec<u8>, ZipError> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options)?;
        zip.write_all(CONTENT_TYPES_XML.as_bytes())?;

        zip.start_file("_rels/.rels", options)?;
        zip.write_all(RELS_XML.as_bytes())?;

        zip.start_file("xl/workbook.xml", options)?;
        zip.write_all(WORKBOOK_XML.as_bytes())?;

        zip.start_file("xl/_rels/workbook.xml.rels", options)?;
        zip.write_all(WORKBOOK_RELS_XML.as_bytes())?;

        zip.start_file("xl/worksheets/sheet1.xml", options)?;
        zip.write_all(sheet_xml(rows).as_bytes())?;

        zip.finish()?;
    }
    Ok(buf)
}

fn sheet_xml(rows: &[TicketRow]) -> String {
    let mut data = String::new();
    push_sheet_row(&mut data, 1, None, &HEADER);
    for (index, row) in rows.iter().enumerate() {
        let id = row.id.to_string();
        let cells = fields(row, &id);
        push_sheet_row(&mut data, index + 2, Some(row.id), &cells[1..]);
    }
    SHEET_XML.replace("{{ROWS}}", &data)
}

/// Writes one `<row>`. A numeric id, when given, fills column A and the text
/// cells follow it.
fn push_sheet_row(out: &mut String, number: usize, id: Option<u64>, text: &[&str]) {
    out.push_str(&format!(r#"<row r="{number}">"#));
    let mut column = 0;
    if let Some(id) = id {
        out.push_str(&format!(r#"<c r="{}{number}"><v>{id}</v></c>"#, column_name(column)));
        column += 1;
    }
    for value in text {
        out.push_str(&format!(
            r#"<c r="{}{number}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
            column_name(column),
            escape_xml(value)
        ));
        column += 1;
    }
    out.push_str("</row>");
}

fn column_name(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' | '\n' | '\r' => out.push(ch),
            // not representable in XML 1.0
            c if c < ' ' => {}
            _ => out.push(ch),
        }
    }
    out
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Tickets" sheetId="1" r:id="rId1"/>
  </sheets>
</workbook>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

const SHEET_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <sheetData>{{ROWS}}</sheetData>
</worksheet>"#;
