use calamine::{Data, Range, Reader, Xlsb, XlsbError, open_workbook_from_rs};
use std::any::Any;
use std::fmt;
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Invalid XLSB workbook: {0}")]
    Open(String),

    #[error("Unable to read workbook file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Sheet '{0}' not found in workbook")]
    SheetNotFound(String),

    #[error("Error reading sheet '{name}': {message}")]
    Sheet { name: String, message: String },

    #[error("Sheet '{0}' is empty")]
    EmptySheet(String),
}

/// Raw value of a single cell, as read from the workbook.
///
/// Integers, floats and date-times all end up as `Number`: XLSB stores dates
/// as serial numbers and none of the checks care about the distinction.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Error(String),
    Empty,
}

impl CellValue {
    /// A cell is blank when it holds nothing, or only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(_) | CellValue::Bool(_) | CellValue::Error(_) => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            // 12.0 reads as "12", the way a user typed it
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Error(e) => write!(f, "{e}"),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::Error(e) => CellValue::Error(e.to_string()),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::Text(s.clone()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
        }
    }
}

/// Cell grid of one sheet, anchored at A1.
///
/// `rows[0]` is spreadsheet row 1 and `rows[r][c]` is the cell at row `r + 1`,
/// column `c + 1`. Every row has the same width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetMatrix {
    rows: Vec<Vec<CellValue>>,
}

impl SheetMatrix {
    /// Build a matrix from ragged rows, padding short rows with `Empty`.
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        SheetMatrix { rows }
    }

    /// Materialise a calamine range from A1 to its last used cell.
    ///
    /// calamine trims leading empty rows and columns off a range; positions are
    /// looked up absolutely so that column and row numbers stay spreadsheet
    /// numbers.
    fn from_range(range: &Range<Data>) -> Self {
        let Some((last_row, last_col)) = range.end() else {
            return SheetMatrix::default();
        };

        let rows = (0..=last_row)
            .map(|row| {
                (0..=last_col)
                    .map(|col| {
                        range
                            .get_value((row, col))
                            .map(CellValue::from)
                            .unwrap_or(CellValue::Empty)
                    })
                    .collect()
            })
            .collect();
        SheetMatrix { rows }
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn header(&self) -> Option<&[CellValue]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn data_rows(&self) -> &[Vec<CellValue>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Anything the validator can pull sheets out of.
pub trait SheetSource {
    /// Sheet names, in workbook order.
    fn sheet_names(&self) -> Vec<String>;

    /// Read the named sheet into a matrix.
    fn read_sheet(&mut self, name: &str) -> Result<SheetMatrix, WorkbookError>;
}

/// An opened XLSB workbook.
///
/// The workbook owns its byte buffer; dropping it releases everything.
pub struct Workbook {
    reader: Xlsb<Cursor<Vec<u8>>>,
}

impl Workbook {
    /// Open an XLSB document from its raw bytes.
    pub fn open(bytes: Vec<u8>) -> Result<Self, WorkbookError> {
        let size = bytes.len();
        // calamine indexes record buffers directly and panics on some corrupt input
        let opened = panic::catch_unwind(AssertUnwindSafe(|| {
            open_workbook_from_rs::<Xlsb<Cursor<Vec<u8>>>, _>(Cursor::new(bytes))
        }));
        let reader = match opened {
            Ok(result) => result.map_err(|e: XlsbError| WorkbookError::Open(e.to_string()))?,
            Err(payload) => {
                return Err(WorkbookError::Open(format!(
                    "corrupt document ({})",
                    panic_message(payload)
                )));
            }
        };
        log::debug!(
            "Opened XLSB workbook ({} bytes, {} sheet(s))",
            size,
            reader.sheet_names().len()
        );
        Ok(Workbook { reader })
    }

    /// Read a file from disk and open it as an XLSB document.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, WorkbookError> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::open(bytes)
    }
}

impl SheetSource for Workbook {
    fn sheet_names(&self) -> Vec<String> {
        self.reader.sheet_names()
    }

    fn read_sheet(&mut self, name: &str) -> Result<SheetMatrix, WorkbookError> {
        if !self.sheet_names().iter().any(|sheet| sheet == name) {
            return Err(WorkbookError::SheetNotFound(name.to_string()));
        }

        let reader = &mut self.reader;
        let range = match panic::catch_unwind(AssertUnwindSafe(|| reader.worksheet_range(name))) {
            Ok(result) => result.map_err(|e| WorkbookError::Sheet {
                name: name.to_string(),
                message: e.to_string(),
            })?,
            Err(payload) => {
                return Err(WorkbookError::Sheet {
                    name: name.to_string(),
                    message: format!("corrupt sheet data ({})", panic_message(payload)),
                });
            }
        };

        let matrix = SheetMatrix::from_range(&range);
        log::debug!(
            "Read sheet '{}': {} row(s) x {} column(s)",
            name,
            matrix.rows().len(),
            matrix.width()
        );
        Ok(matrix)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown parser failure".to_string()
    }
}
