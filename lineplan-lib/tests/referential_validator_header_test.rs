//! Tests for blank header cell detection on line 1

use lineplan_lib::{CellValue, Finding, SheetMatrix};

mod common;

#[test]
fn test_blank_header_at_position_three() {
    let findings = common::validate_rows(&[
        &["CODEPSS", "CODECLIENT", "", "LIBELLE"],
        &["P1", "C1", "x", "Pull"],
    ]);

    assert_eq!(findings, vec!["❌ Ligne 1 (entêtes) : la colonne 3 est vide."]);
}

#[test]
fn test_blank_header_does_not_hide_present_columns() {
    let findings = common::validate_rows(&[&["", "CODEPSS", "", "CODECLIENT"], &["", "P1", "", "C1"]]);

    assert!(
        !findings.iter().any(|f| f.contains("manquante")),
        "Present columns reported missing: {:?}",
        findings
    );
    assert_eq!(
        findings,
        vec![
            "❌ Ligne 1 (entêtes) : la colonne 1 est vide.",
            "❌ Ligne 1 (entêtes) : la colonne 3 est vide.",
        ]
    );
}

#[test]
fn test_whitespace_only_header_is_blank() {
    let matrix = SheetMatrix::from_rows(vec![
        vec![
            CellValue::Text("CODEPSS".to_string()),
            CellValue::Text("   ".to_string()),
            CellValue::Text("CODECLIENT".to_string()),
        ],
        vec![
            CellValue::Text("P1".to_string()),
            CellValue::Empty,
            CellValue::Text("C1".to_string()),
        ],
    ]);
    let mut workbook = common::InMemoryWorkbook::new().with_sheet("Référentiel", matrix);

    let findings = common::default_validator().check(&mut workbook);

    assert_eq!(findings, vec![Finding::EmptyHeader { position: 2 }]);
}

#[test]
fn test_aggregate_header_policy() {
    let mut workbook = common::reference_workbook(&[
        &["", "CODEPSS", "", "CODECLIENT", ""],
        &["a", "P1", "b", "C1", "c"],
    ]);

    let findings = common::aggregate_header_validator().validate(&mut workbook);

    assert_eq!(
        findings,
        vec!["❌ Ligne 1 (entêtes) contient des colonnes vides aux positions : [1, 3, 5]"]
    );
}

#[test]
fn test_aggregate_header_policy_without_blank_headers() {
    let mut workbook = common::reference_workbook(&[&["CODEPSS", "CODECLIENT"], &["P1", "C1"]]);

    let findings = common::aggregate_header_validator().validate(&mut workbook);

    assert!(findings.is_empty());
}

#[test]
fn test_numeric_header_is_not_blank() {
    let matrix = SheetMatrix::from_rows(vec![
        vec![
            CellValue::Text("CODEPSS".to_string()),
            CellValue::Text("CODECLIENT".to_string()),
            CellValue::Number(2025.0),
        ],
        vec![
            CellValue::Text("P1".to_string()),
            CellValue::Text("C1".to_string()),
            CellValue::Number(12.5),
        ],
    ]);
    let mut workbook = common::InMemoryWorkbook::new().with_sheet("Référentiel", matrix);

    let findings = common::default_validator().validate(&mut workbook);

    assert!(findings.is_empty(), "Unexpected findings: {:?}", findings);
}

#[test]
fn test_data_beyond_header_creates_unnamed_column() {
    // A value in D2 under an empty D1 stretches the header to column 4
    let findings = common::validate_rows(&[&["CODEPSS", "CODECLIENT"], &["P1", "C1", "", "stray"]]);

    assert_eq!(
        findings,
        vec![
            "❌ Ligne 1 (entêtes) : la colonne 3 est vide.",
            "❌ Ligne 1 (entêtes) : la colonne 4 est vide.",
        ]
    );
}
