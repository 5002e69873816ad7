//! Unified error types for the gateway.
//!
//! Defines [`GatewayError`] (the main crate error enum) and
//! [`ValidationError`] for configuration validation failures. Both use
//! `thiserror` for `Display` and `Error` derives. Error messages
//! include contextual hints to guide the operator toward a fix.

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {}", self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

fn format_exit(code: &Option<i32>, signal: &Option<i32>) -> String {
    match (*code, *signal) {
        (Some(code), _) => format!("code={code}"),
        (None, Some(signal)) => format!("signal={signal}"),
        (None, None) => "unknown status".into(),
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error(
        "Missing graph file: {} (and no MLD/CH files found)\n\n  \
         Expected {}.partition or {}.hsgr as a fallback.",
        path.display(),
        path.display(),
        path.display()
    )]
    GraphMissing { path: PathBuf },

    #[error("Failed to launch backend '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Backend exited with {}", format_exit(.code, .signal))]
    BackendExited {
        code: Option<i32>,
        signal: Option<i32>,
    },

    #[error("Routing engine failed to initialize: {message}")]
    EngineInit { message: String },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Invalid rewrite rule '{0}', expected PREFIX=TARGET")]
    InvalidRewrite(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid URI: {source}")]
    UriParse {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP request failed: {source}")]
    HttpRequest {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Health check failed with status {0}")]
    HealthCheckFailed(hyper::StatusCode),
}

impl GatewayError {
    /// Process exit status for this error.
    ///
    /// A crashed backend propagates its own exit code; everything else
    /// (and a backend killed by a signal) maps to 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BackendExited {
                code: Some(code), ..
            } if *code != 0 => *code,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_exit_code_is_propagated() {
        let err = GatewayError::BackendExited {
            code: Some(3),
            signal: None,
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "Backend exited with code=3");
    }

    #[test]
    fn signalled_backend_exits_with_one() {
        let err = GatewayError::BackendExited {
            code: None,
            signal: Some(9),
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Backend exited with signal=9");
    }

    #[test]
    fn clean_backend_exit_is_still_a_failure() {
        let err = GatewayError::BackendExited {
            code: Some(0),
            signal: None,
        };
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn validation_errors_are_listed() {
        let err = GatewayError::ConfigValidation {
            errors: vec![
                ValidationError {
                    field: "port".into(),
                    message: "must differ from backend port".into(),
                    suggestion: Some("use --port 5100".into()),
                },
                ValidationError {
                    field: "algorithm".into(),
                    message: "unknown algorithm 'xyz'".into(),
                    suggestion: None,
                },
            ],
        };
        let text = err.to_string();
        assert!(text.contains("port: must differ from backend port (use --port 5100)"));
        assert!(text.contains("algorithm: unknown algorithm 'xyz'"));
    }
}
