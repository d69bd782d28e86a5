// Test utilities available to both unit and integration tests
// Only compiled when testing

use crate::referential_validator::REFERENCE_SHEET_NAME;
use crate::workbook_reader::{CellValue, SheetMatrix, SheetSource, WorkbookError};

/// Workbook held entirely in memory, standing in for an XLSB document.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkbook {
    sheets: Vec<(String, SheetMatrix)>,
    /// When set, reading any sheet fails with this message
    read_failure: Option<String>,
    reads: usize,
}

impl InMemoryWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: &str, matrix: SheetMatrix) -> Self {
        self.sheets.push((name.to_string(), matrix));
        self
    }

    pub fn failing_reads(mut self, message: &str) -> Self {
        self.read_failure = Some(message.to_string());
        self
    }

    /// Number of successful or failed `read_sheet` calls so far
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl SheetSource for InMemoryWorkbook {
    fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.clone()).collect()
    }

    fn read_sheet(&mut self, name: &str) -> Result<SheetMatrix, WorkbookError> {
        self.reads += 1;

        if let Some(message) = &self.read_failure {
            return Err(WorkbookError::Sheet {
                name: name.to_string(),
                message: message.clone(),
            });
        }

        self.sheets
            .iter()
            .find(|(sheet, _)| sheet == name)
            .map(|(_, matrix)| matrix.clone())
            .ok_or_else(|| WorkbookError::SheetNotFound(name.to_string()))
    }
}

/// Text cell, or `Empty` for the empty string
pub fn text(value: &str) -> CellValue {
    if value.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(value.to_string())
    }
}

/// Build a matrix from rows of strings; `""` stands for an empty cell
pub fn matrix(rows: &[&[&str]]) -> SheetMatrix {
    SheetMatrix::from_rows(
        rows.iter()
            .map(|row| row.iter().map(|cell| text(cell)).collect())
            .collect(),
    )
}

/// Workbook whose only sheet is the reference sheet
pub fn reference_workbook(rows: &[&[&str]]) -> InMemoryWorkbook {
    InMemoryWorkbook::new().with_sheet(REFERENCE_SHEET_NAME, matrix(rows))
}

/// Minimal XLSB writer for fixtures.
///
/// Emits only the parts calamine needs: `xl/workbook.bin` with one
/// BrtBundleSh per sheet, the workbook relationships, and one
/// `xl/worksheets/sheetN.bin` per sheet.
#[cfg(feature = "test")]
#[derive(Debug, Clone, Default)]
pub struct XlsbBuilder {
    /// (sheet name, worksheet part)
    sheets: Vec<(String, Vec<u8>)>,
}

#[cfg(feature = "test")]
impl XlsbBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet from rows of strings; `""` leaves the cell unwritten
    pub fn sheet(self, name: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| text(cell)).collect())
            .collect();
        self.sheet_cells(name, rows)
    }

    /// Add a sheet from typed cells; `Empty` leaves the cell unwritten
    pub fn sheet_cells(self, name: &str, rows: Vec<Vec<CellValue>>) -> Self {
        self.raw_sheet(name, worksheet_part(&rows))
    }

    /// Add a sheet whose worksheet part is given as raw records
    pub fn raw_sheet(mut self, name: &str, part: Vec<u8>) -> Self {
        self.sheets.push((name.to_string(), part));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut workbook = Vec::new();
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        let mut worksheets = Vec::new();

        for (index, (name, part)) in self.sheets.iter().enumerate() {
            let number = index + 1;
            let rel_id = format!("rId{number}");

            // BrtBundleSh: hsState, iTabID, strRelID, strName
            let mut body = Vec::new();
            body.extend_from_slice(&0u32.to_le_bytes());
            body.extend_from_slice(&(number as u32).to_le_bytes());
            body.extend(wide_string(&rel_id));
            body.extend(wide_string(name));
            workbook.extend(xlsb_record(0x009C, &body));

            rels.push_str(&format!(
                r#"<Relationship Id="{rel_id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{number}.bin"/>"#
            ));
            worksheets.push((format!("xl/worksheets/sheet{number}.bin"), part));
        }

        workbook.extend(xlsb_record(0x0090, &[])); // BrtEndBundleShs
        workbook.extend(xlsb_record(0x009D, &[])); // BrtCalcProp
        rels.push_str("</Relationships>");

        let mut parts: Vec<(&str, &[u8])> = vec![
            ("xl/workbook.bin", workbook.as_slice()),
            ("xl/_rels/workbook.bin.rels", rels.as_bytes()),
        ];
        parts.extend(
            worksheets
                .iter()
                .map(|(path, part)| (path.as_str(), part.as_slice())),
        );
        zip_package(&parts)
    }
}

/// Encode one BIFF12 record: varint type, varint length, body
#[cfg(feature = "test")]
pub fn xlsb_record(record_type: u16, body: &[u8]) -> Vec<u8> {
    let mut record = Vec::with_capacity(body.len() + 6);

    if record_type < 0x80 {
        record.push(record_type as u8);
    } else {
        record.push((record_type & 0x7F) as u8 | 0x80);
        record.push((record_type >> 7) as u8 & 0x7F);
    }

    let mut len = body.len();
    loop {
        let mut byte = (len & 0x7F) as u8;
        len >>= 7;
        if len > 0 {
            byte |= 0x80;
        }
        record.push(byte);
        if len == 0 {
            break;
        }
    }

    record.extend_from_slice(body);
    record
}

/// Zip the given `(path, content)` parts, uncompressed
#[cfg(feature = "test")]
pub fn zip_package(parts: &[(&str, &[u8])]) -> Vec<u8> {
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (path, content) in parts {
        writer.start_file(*path, options).expect("start zip entry");
        writer.write_all(content).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

#[cfg(feature = "test")]
fn wide_string(value: &str) -> Vec<u8> {
    let units: Vec<u16> = value.encode_utf16().collect();
    let mut bytes = (units.len() as u32).to_le_bytes().to_vec();
    for unit in units {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Worksheet part with inline strings (BrtCellSt), numbers (BrtCellReal),
/// booleans (BrtCellBool) and `#N/A` errors (BrtCellError)
#[cfg(feature = "test")]
fn worksheet_part(rows: &[Vec<CellValue>]) -> Vec<u8> {
    let last_row = rows.len().saturating_sub(1) as u32;
    let last_col = rows.iter().map(Vec::len).max().unwrap_or(1).saturating_sub(1) as u32;

    let mut sheet = Vec::new();
    // BrtWsDim: rwFirst, rwLast, colFirst, colLast
    let mut dimension = Vec::new();
    for bound in [0, last_row, 0, last_col] {
        dimension.extend_from_slice(&bound.to_le_bytes());
    }
    sheet.extend(xlsb_record(0x0094, &dimension));
    sheet.extend(xlsb_record(0x0091, &[])); // BrtBeginSheetData

    for (row_index, row) in rows.iter().enumerate() {
        if row.iter().all(|cell| *cell == CellValue::Empty) {
            continue;
        }
        sheet.extend(xlsb_record(0x0000, &(row_index as u32).to_le_bytes())); // BrtRowHdr

        for (col_index, cell) in row.iter().enumerate() {
            // Cell header: column, then iStyleRef 0
            let mut body = (col_index as u32).to_le_bytes().to_vec();
            body.extend_from_slice(&0u32.to_le_bytes());

            let record_type = match cell {
                CellValue::Empty => continue,
                CellValue::Text(value) => {
                    body.extend(wide_string(value));
                    0x0006
                }
                CellValue::Number(value) => {
                    body.extend_from_slice(&value.to_le_bytes());
                    0x0005
                }
                CellValue::Bool(value) => {
                    body.push(u8::from(*value));
                    0x0004
                }
                CellValue::Error(_) => {
                    body.push(0x2A); // #N/A
                    0x0003
                }
            };
            sheet.extend(xlsb_record(record_type, &body));
        }
    }

    sheet.extend(xlsb_record(0x0092, &[])); // BrtEndSheetData
    sheet
}
