//! Settings error types.

use std::path::PathBuf;

use thiserror::Error;

/// Why settings could not be loaded.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The settings file exists but could not be read.
    #[error("cannot read settings file {}: {source}", .path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The settings file is not valid JSON.
    #[error("settings file {} is not valid JSON: {source}", .path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },

    /// The merged settings do not fit the expected shape (wrong value types).
    #[error("invalid settings: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/arbor.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "cannot read settings file /etc/arbor.json: denied");
    }

    #[test]
    fn shape_error_from_serde() {
        let serde_err = serde_json::from_str::<u32>("\"x\"").unwrap_err();
        let err: SettingsError = serde_err.into();
        assert!(err.to_string().starts_with("invalid settings: "));
    }
}
