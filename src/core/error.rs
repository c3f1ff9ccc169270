//! DF-000: Error taxonomy.
//!
//! Fatal errors propagate to `main` as a single diagnostic. Persistence and
//! subprocess errors exist for logging; callers downgrade them to booleans.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DropformError {
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("only the 'digitalocean' provider is supported, got '{0}'")]
    UnsupportedProvider(String),

    #[error("undefined variable '{0}' used in provider block")]
    UndefinedVariable(String),

    #[error("missing digitalocean_droplet resource")]
    MissingResource,

    #[error("digitalocean_droplet resource has no '{0}' attribute")]
    MissingAttribute(String),

    #[error("no token specified in provider block")]
    NoTokenConfigured,

    #[error("remote API error{}: {message}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    RemoteApi {
        status: Option<u16>,
        message: String,
    },

    #[error("droplet {id} has no public IP after {attempts} poll(s) ({:.0}s)", elapsed.as_secs_f64())]
    PollTimeout {
        id: u64,
        attempts: u32,
        elapsed: Duration,
    },

    #[error("wait for droplet {id} cancelled")]
    Cancelled { id: u64 },

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("automation error: {0}")]
    Subprocess(String),
}

pub type Result<T> = std::result::Result<T, DropformError>;

impl DropformError {
    /// Build a `RemoteApi` error without a status code (transport failure).
    pub fn transport(message: impl Into<String>) -> Self {
        Self::RemoteApi {
            status: None,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_df000_remote_api_display_with_status() {
        let e = DropformError::RemoteApi {
            status: Some(422),
            message: "invalid size".to_string(),
        };
        assert_eq!(e.to_string(), "remote API error (HTTP 422): invalid size");
    }

    #[test]
    fn test_df000_transport_display() {
        let e = DropformError::transport("connection refused");
        assert_eq!(e.to_string(), "remote API error: connection refused");
    }

    #[test]
    fn test_df000_poll_timeout_display() {
        let e = DropformError::PollTimeout {
            id: 42,
            attempts: 3,
            elapsed: Duration::from_secs(15),
        };
        assert_eq!(
            e.to_string(),
            "droplet 42 has no public IP after 3 poll(s) (15s)"
        );
    }

    #[test]
    fn test_df000_undefined_variable_names_variable() {
        let e = DropformError::UndefinedVariable("token".to_string());
        assert!(e.to_string().contains("'token'"));
    }
}
