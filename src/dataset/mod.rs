//! Dataset module - Loading datasets, writing encoded output and batch runs.

mod batch;
mod output;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::compute::CodeTableError;
use crate::schema::{BatchConfig, ConfigError, Dataset, VocabularyOrder};

pub use batch::*;
pub use output::*;

/// Dataset and output errors.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}: {source}")]
    CodeTable {
        path: PathBuf,
        #[source]
        source: CodeTableError,
    },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl DatasetError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Dataset {
    /// Load a dataset file: one sequence per line, whitespace-separated
    /// tokens. The dataset is named after the file.
    pub fn load<P: AsRef<Path>>(path: P, order: VocabularyOrder) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_text(&name, &text, order))
    }
}

impl BatchConfig {
    /// Read a batch configuration from a JSON file. Not validated here;
    /// [`BatchRunner::new`] does that.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Dataset files in `dir` with the given extension, sorted by file name.
pub fn discover<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>, DatasetError> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| DatasetError::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| DatasetError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
