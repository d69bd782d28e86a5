use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::utils::normalize_string;
use crate::workbook_reader::{CellValue, SheetMatrix, SheetSource, Workbook, WorkbookError};

/// Name of the sheet holding the line plan reference data
pub const REFERENCE_SHEET_NAME: &str = "Référentiel";

/// Columns every line plan must carry, in reporting order
pub const DEFAULT_REQUIRED_COLUMNS: [&str; 2] = ["CODEPSS", "CODECLIENT"];

/// One validation error, displayed verbatim to the user.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Finding {
    #[error("❌ L'onglet '{sheet}' est manquant.")]
    SheetMissing { sheet: String },

    #[error("❌ Ligne 1 (entêtes) : la colonne {position} est vide.")]
    EmptyHeader { position: usize },

    #[error("❌ Ligne 1 (entêtes) contient des colonnes vides aux positions : {positions:?}")]
    EmptyHeaders { positions: Vec<usize> },

    #[error("❌ Colonne '{column}' manquante ou mal orthographiée.")]
    MissingColumn { column: String },

    #[error("❌ {count} cellule(s) vide(s) dans la colonne '{column}' aux lignes : {rows:?}")]
    EmptyValues {
        column: String,
        count: usize,
        rows: Vec<usize>,
    },

    #[error("Erreur lors de l'analyse : {message}")]
    Analysis { message: String },
}

/// How blank header cells are reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderPolicy {
    /// One finding per blank header cell
    #[default]
    PerColumn,
    /// A single finding listing every blank position
    Aggregate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub sheet_name: String,
    pub required_columns: Vec<String>,
    pub header_policy: HeaderPolicy,
    pub skip_blank_rows: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            sheet_name: REFERENCE_SHEET_NAME.to_string(),
            required_columns: DEFAULT_REQUIRED_COLUMNS
                .iter()
                .map(|column| column.to_string())
                .collect(),
            header_policy: HeaderPolicy::default(),
            skip_blank_rows: false,
        }
    }
}

impl ValidatorConfig {
    pub fn with_sheet_name(mut self, sheet_name: &str) -> Self {
        self.sheet_name = sheet_name.to_string();
        self
    }

    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = dedup_columns(columns.into_iter().map(Into::into));
        self
    }

    pub fn with_header_policy(mut self, header_policy: HeaderPolicy) -> Self {
        self.header_policy = header_policy;
        self
    }

    pub fn with_skip_blank_rows(mut self, skip_blank_rows: bool) -> Self {
        self.skip_blank_rows = skip_blank_rows;
        self
    }
}

/// Keep the first spelling of each column name, in order.
///
/// Names are compared the way headers are matched, so `"CODEPSS "` repeats `"CODEPSS"`.
fn dedup_columns<I: IntoIterator<Item = String>>(columns: I) -> Vec<String> {
    let mut seen = HashSet::new();
    columns
        .into_iter()
        .filter(|column| seen.insert(normalize_string(column)))
        .collect()
}

/// Header row plus data rows, as seen by the checks.
///
/// Column `i` is named by the normalized text of header cell `i`, or `None`
/// when that cell is blank. Every data row is exactly as wide as the header.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalTable {
    columns: Vec<Option<String>>,
    /// (spreadsheet row number, cells)
    rows: Vec<(usize, Vec<CellValue>)>,
}

impl LogicalTable {
    pub fn from_matrix(matrix: &SheetMatrix) -> Self {
        Self::build(matrix, false)
    }

    /// Same as `from_matrix`, dropping data rows whose cells are all blank.
    pub fn from_matrix_skipping_blank_rows(matrix: &SheetMatrix) -> Self {
        Self::build(matrix, true)
    }

    fn build(matrix: &SheetMatrix, skip_blank_rows: bool) -> Self {
        let columns: Vec<Option<String>> = matrix
            .header()
            .unwrap_or(&[])
            .iter()
            .map(|cell| {
                if cell.is_blank() {
                    None
                } else {
                    Some(normalize_string(&cell.to_string()))
                }
            })
            .collect();

        let width = columns.len();
        let rows = matrix
            .data_rows()
            .iter()
            .enumerate()
            // Row 1 is the header, so table index 0 is spreadsheet row 2
            .map(|(index, row)| (index + 2, row))
            .filter(|(_, row)| !(skip_blank_rows && row.iter().all(CellValue::is_blank)))
            .map(|(row_number, row)| {
                let mut cells: Vec<CellValue> = row.iter().take(width).cloned().collect();
                cells.resize(width, CellValue::Empty);
                (row_number, cells)
            })
            .collect();

        LogicalTable { columns, rows }
    }

    pub fn columns(&self) -> &[Option<String>] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of the first column carrying `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = normalize_string(name);
        self.columns
            .iter()
            .position(|column| column.as_deref() == Some(name.as_str()))
    }

    /// 1-based positions of blank header cells.
    pub fn blank_header_positions(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, column)| column.is_none())
            .map(|(index, _)| index + 1)
            .collect()
    }

    /// Spreadsheet row numbers where the given column is blank.
    pub fn blank_rows_in_column(&self, column_index: usize) -> Vec<usize> {
        self.rows
            .iter()
            .filter(|(_, cells)| cells.get(column_index).is_none_or(CellValue::is_blank))
            .map(|(row_number, _)| *row_number)
            .collect()
    }
}

/// Checks the reference sheet of a line plan workbook.
#[derive(Debug, Clone, Default)]
pub struct ReferentialValidator {
    config: ValidatorConfig,
}

impl ReferentialValidator {
    //////////////////////////////////////////////////////////////
    ///  Public API
    //////////////////////////////////////////////////////////////

    pub fn new(mut config: ValidatorConfig) -> Self {
        // Deserialized configs bypass `with_required_columns`
        config.required_columns = dedup_columns(config.required_columns);
        ReferentialValidator { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a workbook and render every finding as a message.
    ///
    /// An empty vector means the reference sheet passed every check.
    pub fn validate<S: SheetSource>(&self, source: &mut S) -> Vec<String> {
        self.check(source).iter().map(ToString::to_string).collect()
    }

    /// Open XLSB bytes and validate them.
    ///
    /// The workbook lives only for the duration of the call. A document that
    /// cannot be opened yields a single `Finding::Analysis`.
    pub fn validate_bytes(&self, bytes: Vec<u8>) -> Vec<String> {
        match Workbook::open(bytes) {
            Ok(mut workbook) => self.validate(&mut workbook),
            Err(e) => vec![Self::analysis_failure(e).to_string()],
        }
    }

    /// Read an XLSB file from disk and validate it.
    pub fn validate_path<P: AsRef<Path>>(&self, path: P) -> Vec<String> {
        match Workbook::from_path(path) {
            Ok(mut workbook) => self.validate(&mut workbook),
            Err(e) => vec![Self::analysis_failure(e).to_string()],
        }
    }

    /// Run every check against a workbook, in reporting order.
    pub fn check<S: SheetSource>(&self, source: &mut S) -> Vec<Finding> {
        let sheet_name = &self.config.sheet_name;

        if !source.sheet_names().iter().any(|name| name == sheet_name) {
            log::info!("Sheet '{}' not found in workbook", sheet_name);
            return vec![Finding::SheetMissing {
                sheet: sheet_name.clone(),
            }];
        }

        let matrix = match source.read_sheet(sheet_name) {
            Ok(matrix) if matrix.is_empty() => {
                return vec![Self::analysis_failure(WorkbookError::EmptySheet(
                    sheet_name.clone(),
                ))];
            }
            Ok(matrix) => matrix,
            Err(WorkbookError::SheetNotFound(sheet)) => {
                return vec![Finding::SheetMissing { sheet }];
            }
            Err(e) => return vec![Self::analysis_failure(e)],
        };

        let table = if self.config.skip_blank_rows {
            LogicalTable::from_matrix_skipping_blank_rows(&matrix)
        } else {
            LogicalTable::from_matrix(&matrix)
        };

        let findings = self.check_table(&table);
        log::info!(
            "Checked sheet '{}' ({} data row(s)): {} finding(s)",
            sheet_name,
            table.row_count(),
            findings.len()
        );
        findings
    }

    /// Structural and content checks on an already extracted table.
    pub fn check_table(&self, table: &LogicalTable) -> Vec<Finding> {
        let mut findings = self.check_header(table);
        findings.extend(self.check_missing_columns(table));
        findings.extend(self.check_required_values(table));
        findings
    }

    //////////////////////////////////////////////////////////////
    ///  Private methods
    //////////////////////////////////////////////////////////////
    fn check_header(&self, table: &LogicalTable) -> Vec<Finding> {
        let positions = table.blank_header_positions();
        if positions.is_empty() {
            return Vec::new();
        }

        match self.config.header_policy {
            HeaderPolicy::PerColumn => positions
                .into_iter()
                .map(|position| Finding::EmptyHeader { position })
                .collect(),
            HeaderPolicy::Aggregate => vec![Finding::EmptyHeaders { positions }],
        }
    }

    fn check_missing_columns(&self, table: &LogicalTable) -> Vec<Finding> {
        self.config
            .required_columns
            .iter()
            .filter(|column| table.column_index(column).is_none())
            .map(|column| Finding::MissingColumn {
                column: column.clone(),
            })
            .collect()
    }

    fn check_required_values(&self, table: &LogicalTable) -> Vec<Finding> {
        let mut findings = Vec::new();

        for column in &self.config.required_columns {
            // Absent columns were already reported
            let Some(index) = table.column_index(column) else {
                continue;
            };

            let rows = table.blank_rows_in_column(index);
            if !rows.is_empty() {
                findings.push(Finding::EmptyValues {
                    column: column.clone(),
                    count: rows.len(),
                    rows,
                });
            }
        }

        findings
    }

    fn analysis_failure(error: WorkbookError) -> Finding {
        log::warn!("Workbook analysis failed: {}", error);
        Finding::Analysis {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_table_columns_from_header() {
        let matrix = matrix(&[&["CODEPSS", "", " CODE\nCLIENT "], &["A", "B", "C"]]);
        let table = LogicalTable::from_matrix(&matrix);

        assert_eq!(
            table.columns(),
            &[Some("CODEPSS".to_string()), None, Some("CODE CLIENT".to_string())]
        );
        assert_eq!(table.column_index("CODEPSS"), Some(0));
        assert_eq!(table.column_index("CODE CLIENT"), Some(2));
        assert_eq!(table.column_index("CODECLIENT"), None);
        assert_eq!(table.blank_header_positions(), vec![2]);
    }

    #[test]
    fn test_wider_data_rows_extend_header() {
        let matrix = SheetMatrix::from_rows(vec![
            vec![text("CODEPSS")],
            vec![text("P1"), text("extra")],
        ]);
        let table = LogicalTable::from_matrix(&matrix);

        // The matrix is rectangular, so the unnamed second column survives as a blank header
        assert_eq!(table.columns().len(), 2);
        assert_eq!(table.blank_header_positions(), vec![2]);
    }

    #[test]
    fn test_duplicate_column_uses_first_position() {
        let matrix = matrix(&[&["CODEPSS", "CODEPSS"], &["", "P1"]]);
        let table = LogicalTable::from_matrix(&matrix);

        assert_eq!(table.column_index("CODEPSS"), Some(0));
        assert_eq!(table.blank_rows_in_column(0), vec![2]);
    }

    #[test]
    fn test_row_numbers_follow_spreadsheet_rows() {
        let matrix = matrix(&[&["CODEPSS"], &[""], &["P2"], &[" "], &["P4"]]);
        let table = LogicalTable::from_matrix(&matrix);

        assert_eq!(table.row_count(), 4);
        assert_eq!(table.blank_rows_in_column(0), vec![2, 4]);
    }

    #[test]
    fn test_skipping_blank_rows_keeps_row_numbers() {
        let matrix = matrix(&[
            &["CODEPSS", "CODECLIENT"],
            &["P1", "C1"],
            &["", ""],
            &["", "C3"],
        ]);
        let table = LogicalTable::from_matrix_skipping_blank_rows(&matrix);

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.blank_rows_in_column(0), vec![4]);
    }

    #[test]
    fn test_numeric_header_is_named() {
        let matrix = SheetMatrix::from_rows(vec![vec![CellValue::Number(2024.0)]]);
        let table = LogicalTable::from_matrix(&matrix);

        assert_eq!(table.column_index("2024"), Some(0));
    }

    #[test]
    fn test_finding_messages() {
        assert_eq!(
            Finding::SheetMissing {
                sheet: REFERENCE_SHEET_NAME.to_string()
            }
            .to_string(),
            "❌ L'onglet 'Référentiel' est manquant."
        );
        assert_eq!(
            Finding::EmptyHeader { position: 3 }.to_string(),
            "❌ Ligne 1 (entêtes) : la colonne 3 est vide."
        );
        assert_eq!(
            Finding::EmptyHeaders {
                positions: vec![1, 3]
            }
            .to_string(),
            "❌ Ligne 1 (entêtes) contient des colonnes vides aux positions : [1, 3]"
        );
        assert_eq!(
            Finding::MissingColumn {
                column: "CODECLIENT".to_string()
            }
            .to_string(),
            "❌ Colonne 'CODECLIENT' manquante ou mal orthographiée."
        );
        assert_eq!(
            Finding::EmptyValues {
                column: "CODEPSS".to_string(),
                count: 2,
                rows: vec![2, 4]
            }
            .to_string(),
            "❌ 2 cellule(s) vide(s) dans la colonne 'CODEPSS' aux lignes : [2, 4]"
        );
    }

    #[test]
    fn test_default_config() {
        let config = ValidatorConfig::default();

        assert_eq!(config.sheet_name, "Référentiel");
        assert_eq!(config.required_columns, vec!["CODEPSS", "CODECLIENT"]);
        assert_eq!(config.header_policy, HeaderPolicy::PerColumn);
        assert!(!config.skip_blank_rows);
    }

    #[test]
    fn test_required_columns_are_deduplicated_in_order() {
        let config = ValidatorConfig::default().with_required_columns([
            "CODEPSS",
            "CODECLIENT",
            "CODEPSS",
            " CODECLIENT",
            "SAISON",
        ]);

        assert_eq!(config.required_columns, vec!["CODEPSS", "CODECLIENT", "SAISON"]);
    }

    #[test]
    fn test_validator_deduplicates_deserialized_columns() {
        let config: ValidatorConfig =
            serde_json::from_str(r#"{ "required_columns": ["CODEPSS", "CODEPSS"] }"#).unwrap();
        let validator = ReferentialValidator::new(config);

        assert_eq!(validator.config().required_columns, vec!["CODEPSS"]);
    }

    #[test]
    fn test_config_from_json_fills_defaults() {
        let config: ValidatorConfig = serde_json::from_str(
            r#"{ "required_columns": ["CODEPSS", "CODECLIENT", "SAISON"], "header_policy": "aggregate" }"#,
        )
        .unwrap();

        assert_eq!(config.sheet_name, REFERENCE_SHEET_NAME);
        assert_eq!(config.required_columns, vec!["CODEPSS", "CODECLIENT", "SAISON"]);
        assert_eq!(config.header_policy, HeaderPolicy::Aggregate);
    }
}
