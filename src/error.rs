use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::resolver::ResourceRequest;

pub type Result<T, E = SageError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum SageError {
    #[error("configuration error: {message}")]
    Configuration { message: String },

    #[error("resource not found: {request}{tried}")]
    ResourceNotFound {
        request: ResourceRequest,
        tried: CandidateList,
    },

    #[error("failed to parse '{}': {message}", .path.display())]
    ResourceParse { path: PathBuf, message: String },

    #[error("invalid resource path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("i/o error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SageError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SageError::Configuration {
            message: message.into(),
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl fmt::Display) -> Self {
        SageError::ResourceParse {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn io(path: &Path, source: io::Error) -> Self {
        SageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for the "nothing matched" case callers usually map to a 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            SageError::ResourceNotFound { .. } => true,
            SageError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// One physical path a failed lookup inspected, with the layer it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriedCandidate {
    pub layer: String,
    pub path: PathBuf,
}

/// Candidates inspected by a failed lookup, in the order they were tried.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateList(pub Vec<TriedCandidate>);

impl CandidateList {
    /// Layer names in the order they were searched, each listed once.
    pub fn layers(&self) -> Vec<&str> {
        let mut layers: Vec<&str> = Vec::new();
        for candidate in &self.0 {
            if layers.last() != Some(&candidate.layer.as_str()) {
                layers.push(&candidate.layer);
            }
        }
        layers
    }
}

impl std::ops::Deref for CandidateList {
    type Target = [TriedCandidate];

    fn deref(&self) -> &[TriedCandidate] {
        &self.0
    }
}

impl From<Vec<TriedCandidate>> for CandidateList {
    fn from(candidates: Vec<TriedCandidate>) -> Self {
        CandidateList(candidates)
    }
}

impl fmt::Display for CandidateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, " (no candidates)");
        }
        write!(f, "; layers searched: {}; tried:", self.layers().join(" > "))?;
        for candidate in &self.0 {
            write!(f, "\n  [{}] {}", candidate.layer, candidate.path.display())?;
        }
        Ok(())
    }
}
