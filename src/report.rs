use serde::Serialize;
use std::path::Path;

/// Outcome of one check, in the shape the user sees it.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    pub file: String,
    pub sheet: String,
    pub valid: bool,
    pub findings: Vec<String>,
}

impl ValidationReport {
    pub fn new(excel_file: &str, sheet: &str, findings: Vec<String>) -> Self {
        // Only the file name is shown, like the upload page did
        let file = Path::new(excel_file)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(excel_file)
            .to_string();

        ValidationReport {
            file,
            sheet: sheet.to_string(),
            valid: findings.is_empty(),
            findings,
        }
    }

    pub fn to_text(&self) -> String {
        let mut text = format!("📂 Fichier sélectionné : {}\n", self.file);

        if self.valid {
            text.push_str(&format!(
                "✅ Aucune erreur détectée dans l’onglet '{}'.\n",
                self.sheet
            ));
        } else {
            text.push_str("🛑 Problèmes détectés :\n");
            for finding in &self.findings {
                text.push_str(&format!("• {}\n", finding));
            }
        }

        text
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_log_entry(&self) -> String {
        let mut entry = format!(
            "File: {}\nSheet: {}\nTotal findings: {}\n",
            self.file,
            self.sheet,
            self.findings.len()
        );
        for finding in &self.findings {
            entry.push_str(&format!("  - {}\n", finding));
        }
        entry
    }
}
