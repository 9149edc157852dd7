// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by output-directory operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Output directory not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Permission denied accessing {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error accessing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_classifies_kind() {
        let err = CoreError::io("/x", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, CoreError::NotFound { .. }));

        let err = CoreError::io("/x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, CoreError::PermissionDenied { .. }));

        let err = CoreError::io("/x", io::Error::new(io::ErrorKind::Other, "disk"));
        assert_eq!(err.to_string(), "IO error accessing /x: disk");
    }
}
