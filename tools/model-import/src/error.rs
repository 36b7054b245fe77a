//! Import error type

use std::path::PathBuf;

use thiserror::Error;

/// Why an import attempt failed.
///
/// Every variant renders to a human-readable reason; the loader surfaces
/// that string verbatim as the last failure message.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file is empty")]
    EmptyFile,

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The scene importer rejected the input
    #[error("scene import failed: {0}")]
    Scene(String),

    /// Parsing succeeded but produced nothing to draw
    #[error("no triangle geometry: {0}")]
    NoTriangles(String),

    #[error("OBJ line {line}: {message}")]
    Obj { line: usize, message: String },

    #[error("missing {0} section")]
    MissingSection(&'static str),

    #[error("invalid Vertices array ({0} values)")]
    DegenerateVertices(usize),

    #[error("invalid PolygonVertexIndex array ({0} values)")]
    DegeneratePolygons(usize),

    #[error("import cancelled")]
    Cancelled,

    /// Every ladder tier failed
    #[error("{} | format={sniff}", .attempts.join(" | "))]
    Exhausted { attempts: Vec<String>, sniff: String },
}

impl ImportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn obj(line: usize, message: impl Into<String>) -> Self {
        Self::Obj {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message_lists_every_attempt() {
        let err = ImportError::Exhausted {
            attempts: vec!["primary: bad magic".into(), "static bake: bad magic".into()],
            sniff: "Binary v7400".into(),
        };
        assert_eq!(
            err.to_string(),
            "primary: bad magic | static bake: bad magic | format=Binary v7400"
        );
    }
}
