//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to read an input file
    FileRead { path: String, error: std::io::Error },
    /// Input file could not be parsed
    InputParse { path: String, error: serde_json::Error },
    /// A pipeline cycle failed
    Cycle(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::InputParse { .. } = self {
            eprintln!();
            eprintln!("Expected a JSON array of cartons, for example:");
            eprintln!(
                r#"  [{{"item_id": "SKU-1", "quantity": 2, "package_id": "PKG-1", "content_id": "PC-1"}}]"#
            );
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::FileRead { path, error } => {
                write!(f, "Failed to read file '{}': {}", path, error)
            }
            CliError::InputParse { path, error } => {
                write!(f, "Failed to parse '{}': {}", path, error)
            }
            CliError::Cycle(msg) => write!(f, "Pipeline cycle failed: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::FileRead { error, .. } => Some(error),
            CliError::InputParse { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let e = CliError::Config("chunk_size must be > 0".to_string());
        assert_eq!(e.to_string(), "Configuration error: chunk_size must be > 0");

        let e = CliError::LoggingInit("permission denied".to_string());
        assert!(e.to_string().contains("initialize logging"));
    }

    #[test]
    fn test_source_chains_io_error() {
        use std::error::Error;
        let e = CliError::FileRead {
            path: "cartons.json".to_string(),
            error: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(e.source().is_some());
        assert!(CliError::Cycle("x".to_string()).source().is_none());
    }
}
