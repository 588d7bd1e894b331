use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// One curated instruction/response pair. The position of an entry in the
/// loaded corpus is stable for the process lifetime and serves as the
/// tie-break key during matching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CorpusEntry {
    pub instruction: String,
    #[serde(default)]
    pub input: Option<String>,
    pub output: String,
}

impl CorpusEntry {
    /// Searchable text representing user intent: `instruction + " " + input`
    /// trimmed, falling back to whichever side is non-empty.
    pub fn search_text(&self) -> String {
        let input = self.input.as_deref().unwrap_or("");
        let joined = format!("{} {}", self.instruction, input).trim().to_string();
        if !joined.is_empty() {
            return joined;
        }
        if !input.is_empty() {
            input.to_string()
        } else {
            self.instruction.clone()
        }
    }
}

/// Load the corpus from a JSON document: an array of entries, or a single
/// entry object which is treated as a one-element corpus.
pub fn load_corpus(path: &Path) -> Result<Vec<CorpusEntry>, AppError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        let code = if e.kind() == std::io::ErrorKind::NotFound {
            "DATASET_NOT_FOUND"
        } else {
            "DATASET_INVALID"
        };
        AppError::new(code, "Failed to read corpus file")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;

    let value: Value = serde_json::from_str(&raw).map_err(|e| {
        AppError::new("DATASET_INVALID", "Corpus file is not valid JSON")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;

    let decode_err = |e: serde_json::Error| {
        AppError::new("DATASET_INVALID", "Corpus entries are malformed")
            .with_details(format!("path={}; err={}", path.display(), e))
    };

    match value {
        Value::Array(_) => serde_json::from_value(value).map_err(decode_err),
        other => {
            let entry: CorpusEntry = serde_json::from_value(other).map_err(decode_err)?;
            Ok(vec![entry])
        }
    }
}
