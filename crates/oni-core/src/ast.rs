//! Syntax dump loading
//!
//! A scan target is not raw source but a pre-parsed syntax dump: one JSON
//! document per source file (`*.ast.json`), produced by the frontend that
//! parsed the original code. The dump is a tree of [`Node`] values tagged by
//! `kind`. Only the node kinds that matter for pattern extraction are modeled
//! structurally; everything else arrives as [`Node::Other`] and is traversed
//! for nested calls but otherwise ignored.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a syntax dump.
///
/// Both variants are scoped to a single file. A malformed dump never aborts
/// the scan; the driver records the error and moves on to the next file.
#[derive(Debug, Error)]
pub enum AstError {
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed syntax dump '{file}': {message}")]
    Malformed { file: String, message: String },
}

/// One node of a syntax dump.
///
/// The shape mirrors what the frontend emits: imports carry binding
/// information, calls carry their callee expression and argument list, and
/// any construct without a dedicated kind nests its children under `other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Root of a file.
    Module {
        #[serde(default)]
        body: Vec<Node>,
    },

    /// `import re` or `import re as r`.
    Import {
        #[serde(default)]
        line: usize,
        module: String,
        #[serde(default)]
        alias: Option<String>,
    },

    /// `from re import match as m, compile`.
    ImportFrom {
        #[serde(default)]
        line: usize,
        module: String,
        #[serde(default)]
        names: Vec<ImportedName>,
    },

    /// A call expression. `func` is the callee, `args` the positional
    /// arguments in order.
    Call {
        #[serde(default)]
        line: usize,
        func: Box<Node>,
        #[serde(default)]
        args: Vec<Node>,
    },

    /// Attribute access, e.g. the `re.search` in `re.search(p, s)`.
    Attr { object: Box<Node>, name: String },

    /// A bare identifier.
    Name { id: String },

    /// A string literal.
    Str { value: String },

    /// Any construct the frontend does not model. Children are traversed so
    /// calls nested under conditionals, loops or function bodies are found.
    Other {
        #[serde(default)]
        line: usize,
        #[serde(default)]
        children: Vec<Node>,
    },
}

/// One name brought in by a `from` import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedName {
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// A loaded syntax dump together with the file it describes.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTree {
    pub file: String,
    pub root: Node,
}

impl SourceTree {
    /// Parses a dump from a JSON string. `file` names the original source
    /// file for reporting.
    pub fn from_json(file: impl Into<String>, json: &str) -> Result<Self, AstError> {
        let file = file.into();
        let root = serde_json::from_str(json).map_err(|e| AstError::Malformed {
            file: file.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { file, root })
    }

    /// Reads and parses a dump from disk.
    pub fn load(path: &Path) -> Result<Self, AstError> {
        let json = fs::read_to_string(path).map_err(|e| AstError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(path.display().to_string(), &json)
    }
}

impl AstError {
    /// The file the error is scoped to.
    pub fn file(&self) -> String {
        match self {
            AstError::Read { path, .. } => path.display().to_string(),
            AstError::Malformed { file, .. } => file.clone(),
        }
    }
}
