//! Workflow document parsing.
//!
//! A document maps workflow names to step lists:
//!
//! ```json
//! {
//!   "release": [
//!     { "Util": "esbuild", "EsbuildOptions": { "Bundle": true } },
//!     { "Util": "terser", "Options": ["--compress"] },
//!     { "Util": "qjsc" }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::SourceError;
use crate::step::Step;
use crate::Workflow;

type Document = BTreeMap<String, Vec<Step>>;

/// Document syntax, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// `.yaml` and `.yml` are YAML; everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

/// Parse a workflow document from a JSON string.
///
/// # Example
///
/// ```rust
/// use frida_builder::source::parse_json;
///
/// let workflows = parse_json(r#"{"qjsc-only": [{"Util": "qjsc"}]}"#).unwrap();
/// assert_eq!(workflows.len(), 1);
/// assert_eq!(workflows[0].name, "qjsc-only");
/// ```
pub fn parse_json(json: &str) -> Result<Vec<Workflow>, serde_json::Error> {
    let document: Document = serde_json::from_str(json)?;
    Ok(into_workflows(document))
}

/// Parse a workflow document from a YAML string.
pub fn parse_yaml(yaml: &str) -> Result<Vec<Workflow>, serde_yaml::Error> {
    let document: Document = serde_yaml::from_str(yaml)?;
    Ok(into_workflows(document))
}

/// Load and parse a workflow document from a file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<Workflow>, SourceError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let parsed = match Format::from_path(path) {
        Format::Json => parse_json(&content).map_err(|e| e.to_string()),
        Format::Yaml => parse_yaml(&content).map_err(|e| e.to_string()),
    };

    parsed.map_err(|message| SourceError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

fn into_workflows(document: Document) -> Vec<Workflow> {
    document
        .into_iter()
        .map(|(name, steps)| Workflow { name, steps })
        .collect()
}
