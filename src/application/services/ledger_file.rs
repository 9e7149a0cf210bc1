//! Ledger document service
//!
//! Loads ledger documents and edit scripts from TOML or JSON files.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult, IoResultExt};
use crate::domain::{EditRequest, Ledger, Node};
use crate::infrastructure::traits::FileSystem;

/// Document encodings, picked by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> ApplicationResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Ok(Self::Toml),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            _ => Err(ApplicationError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Toml => write!(f, "toml"),
            DocumentFormat::Json => write!(f, "json"),
        }
    }
}

/// JSON ledgers may be a bare array or wrapped like the TOML layout.
#[derive(Deserialize)]
#[serde(untagged)]
enum JsonLedger {
    List(Vec<Node>),
    Table(Ledger),
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EditScript {
    #[serde(rename = "edit")]
    edits: Vec<EditRequest>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonEditScript {
    List(Vec<EditRequest>),
    Table(EditScript),
}

/// Parse ledger document text.
pub fn parse_ledger(content: &str, format: DocumentFormat, path: &Path) -> ApplicationResult<Ledger> {
    let ledger = match format {
        DocumentFormat::Toml => toml::from_str::<Ledger>(content).map_err(|e| parse_err(path, e))?,
        DocumentFormat::Json => match serde_json::from_str::<JsonLedger>(content)
            .map_err(|e| parse_err(path, e))?
        {
            JsonLedger::List(nodes) => Ledger::new(nodes),
            JsonLedger::Table(ledger) => ledger,
        },
    };
    ledger.validate()?;
    Ok(ledger)
}

/// Parse edit script text.
pub fn parse_script(
    content: &str,
    format: DocumentFormat,
    path: &Path,
) -> ApplicationResult<Vec<EditRequest>> {
    match format {
        DocumentFormat::Toml => toml::from_str::<EditScript>(content)
            .map(|s| s.edits)
            .map_err(|e| parse_err(path, e)),
        DocumentFormat::Json => serde_json::from_str::<JsonEditScript>(content)
            .map(|s| match s {
                JsonEditScript::List(edits) => edits,
                JsonEditScript::Table(script) => script.edits,
            })
            .map_err(|e| parse_err(path, e)),
    }
}

fn parse_err(path: &Path, e: impl fmt::Display) -> ApplicationError {
    ApplicationError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Service for reading ledger documents and edit scripts.
pub struct LedgerFileService {
    fs: Arc<dyn FileSystem>,
}

impl LedgerFileService {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Load and validate a ledger document.
    #[instrument(level = "debug", skip(self))]
    pub fn load_ledger(&self, path: &Path) -> ApplicationResult<Ledger> {
        let format = DocumentFormat::from_path(path)?;
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read ledger", path)?;
        let ledger = parse_ledger(&content, format, path)?;
        debug!("loaded {} nodes from {}", ledger.len(), path.display());
        Ok(ledger)
    }

    /// Load a ledger document, or the built-in sample when `path` is None.
    pub fn load_or_sample(&self, path: Option<&Path>) -> ApplicationResult<Ledger> {
        match path {
            Some(path) => self.load_ledger(path),
            None => {
                debug!("no ledger given, using sample");
                Ok(Ledger::sample())
            }
        }
    }

    /// Load an ordered list of edit requests.
    #[instrument(level = "debug", skip(self))]
    pub fn load_script(&self, path: &Path) -> ApplicationResult<Vec<EditRequest>> {
        let format = DocumentFormat::from_path(path)?;
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read edit script", path)?;
        let edits = parse_script(&content, format, path)?;
        debug!("loaded {} edits from {}", edits.len(), path.display());
        Ok(edits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, EditMode};
    use std::path::PathBuf;

    #[test]
    fn given_toml_ledger_when_parsing_then_builds_nested_nodes() {
        let content = r#"
[[node]]
id = "electronics"
label = "Electronics"
value = 1500

[[node.children]]
id = "phones"
label = "Phones"
value = 800

[[node.children]]
id = "laptops"
label = "Laptops"
value = 700
"#;
        let ledger =
            parse_ledger(content, DocumentFormat::Toml, &PathBuf::from("l.toml")).unwrap();
        assert_eq!(ledger.nodes().len(), 1);
        assert_eq!(ledger.find("laptops").map(|n| n.value), Some(700.0));
        assert!(ledger.find("phones").unwrap().is_leaf());
    }

    #[test]
    fn given_json_array_when_parsing_then_builds_ledger() {
        let content = r#"[
            {"id": "a", "label": "A", "value": 1, "children": [{"id": "b", "label": "B", "value": 1}]},
            {"id": "c", "label": "C", "value": 2}
        ]"#;
        let ledger =
            parse_ledger(content, DocumentFormat::Json, &PathBuf::from("l.json")).unwrap();
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn given_duplicate_ids_when_parsing_then_domain_error() {
        let content = r#"[{"id": "a", "label": "A", "value": 1}, {"id": "a", "label": "B", "value": 2}]"#;
        let err =
            parse_ledger(content, DocumentFormat::Json, &PathBuf::from("l.json")).unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::DuplicateId(ref id)) if id == "a"
        ));
    }

    #[test]
    fn given_toml_script_when_parsing_then_keeps_order_and_optional_amounts() {
        let content = r#"
[[edit]]
id = "phones"
mode = "direct"
amount = 1000

[[edit]]
id = "electronics"
mode = "percentage"
"#;
        let edits =
            parse_script(content, DocumentFormat::Toml, &PathBuf::from("e.toml")).unwrap();
        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0], EditRequest::direct("phones", 1000.0));
        assert_eq!(edits[1].mode, EditMode::Percentage);
        assert_eq!(edits[1].amount, None);
    }

    #[test]
    fn given_unknown_extension_when_detecting_format_then_errors() {
        assert!(matches!(
            DocumentFormat::from_path(Path::new("ledger.yaml")),
            Err(ApplicationError::UnsupportedFormat(_))
        ));
        assert_eq!(
            DocumentFormat::from_path(Path::new("LEDGER.JSON")).unwrap(),
            DocumentFormat::Json
        );
    }
}
