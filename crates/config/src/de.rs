//! Document deserialization with field paths
//!
//! Type errors deep inside a document are reported as
//! [`Error::MalformedConfig`] naming the offending field, e.g.
//! `repos[0].hooks[1].args[1]`. Syntax errors have no field and are
//! reported against the document itself.

use pinhook_core::{Error, Result};
use serde::de::DeserializeOwned;

/// Field name used for errors that concern the document as a whole
pub const DOCUMENT: &str = "<document>";

/// Where a document came from, used to prefix field paths
#[derive(Debug, Clone, Copy)]
pub enum Origin<'a> {
    /// Field paths are written bare: `repos[0].rev`
    Bare,
    /// Field paths are prefixed: `<name>:hooks[0].entry`
    Named(&'a str),
}

impl Origin<'_> {
    fn document(self) -> String {
        match self {
            Self::Bare => DOCUMENT.to_string(),
            Self::Named(name) => name.to_string(),
        }
    }

    fn field(self, path: &serde_path_to_error::Path) -> String {
        if path.iter().next().is_none() {
            return self.document();
        }
        match self {
            Self::Bare => path.to_string(),
            Self::Named(name) => format!("{name}:{path}"),
        }
    }
}

/// Deserialize a TOML document
pub fn from_toml<T: DeserializeOwned>(content: &str, origin: Origin<'_>) -> Result<T> {
    let table: toml::Table =
        toml::from_str(content).map_err(|e| Error::malformed(origin.document(), e.message()))?;

    serde_path_to_error::deserialize(toml::Value::Table(table)).map_err(|e| {
        let field = origin.field(e.path());
        Error::malformed(field, e.inner().message())
    })
}

/// Deserialize a JSON document
pub fn from_json<T: DeserializeOwned>(content: &str, origin: Origin<'_>) -> Result<T> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| Error::malformed(origin.document(), e.to_string()))?;

    serde_path_to_error::deserialize(value).map_err(|e| {
        let field = origin.field(e.path());
        Error::malformed(field, e.inner().to_string())
    })
}
