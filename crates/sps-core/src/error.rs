use std::io;

use thiserror::Error;

use crate::model::json_type_name;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Export needs a mapping at the root; carries the JSON type actually found.
    #[error("export expects an object at the document root, got {found}")]
    ExportRootType { found: &'static str },

    #[error("document has no file path yet, use save_as")]
    NoPath,

    #[error("json pointer not found: {0}")]
    PointerNotFound(String),

    #[error("{0}")]
    Edit(#[from] EditError),

    #[error("rename failed: {0}")]
    Rename(#[from] RenameError),
}

impl CoreError {
    pub fn export_root_type(value: &serde_json::Value) -> Self {
        CoreError::ExportRootType {
            found: json_type_name(value),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Why a rename was refused. None of these leave a trace in the document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenameError {
    #[error("name must not be empty")]
    EmptyName,
    #[error("old and new names are identical")]
    SameName,
    #[error("'{0}' does not exist")]
    NotFound(String),
    #[error("'{0}' already exists")]
    AlreadyExists(String),
    #[error("section '{0}' is not an object")]
    SectionNotMapping(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("id must not be empty")]
    EmptyId,
    #[error("'{0}' already exists")]
    AlreadyExists(String),
    #[error("'{0}' does not exist")]
    NotFound(String),
    #[error("'{0}' is not an object")]
    NotAMapping(String),
    #[error("'{0}' has no display order")]
    NotOrdered(String),
    #[error("cannot remove the document root")]
    RootRemoval,
    #[error("array index invalid: {0}")]
    BadIndex(String),
}
