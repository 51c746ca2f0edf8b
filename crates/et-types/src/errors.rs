use thiserror::Error;

/// Main error type for the EveTune system
#[derive(Error, Debug)]
pub enum EtError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Campaign-configuration errors. All of these are fatal and detected before
/// any trial runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown GPU profile: {name} (expected h100 or rtx5090)")]
    UnknownProfile { name: String },

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("sampling interval for {param} is inverted or not finite: [{low}, {high}]")]
    InvalidInterval {
        param: &'static str,
        low: f64,
        high: f64,
    },

    #[error("sampling interval for {param} escapes the hard bounds")]
    IntervalOutOfBounds { param: &'static str },

    #[error("jitter window for {param} must be finite and non-negative, got {width}")]
    InvalidJitter { param: &'static str, width: f64 },
}

/// Trial-ledger persistence errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("cannot open ledger table {path}: {message}")]
    Open { path: String, message: String },

    #[error("cannot write ledger table {path}: {message}")]
    Write { path: String, message: String },

    #[error("ledger table {path} has an unexpected header: {found}")]
    MalformedHeader { path: String, found: String },

    #[error("ledger table {path}, line {line}: {message}")]
    MalformedRow {
        path: String,
        line: usize,
        message: String,
    },
}

/// Result type alias for EveTune operations
pub type EtResult<T> = Result<T, EtError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ConfigError::UnknownProfile {
            name: "a100".to_string(),
        };
        assert!(error.to_string().contains("unknown GPU profile"));
        assert!(error.to_string().contains("a100"));

        let error = LedgerError::MalformedRow {
            path: "autotune_logs/eve_trials.tsv".to_string(),
            line: 3,
            message: "bad beta1".to_string(),
        };
        assert!(error.to_string().contains("line 3"));
        assert!(error.to_string().contains("bad beta1"));
    }

    #[test]
    fn test_error_conversion() {
        let config_error = ConfigError::ZeroCount {
            field: "stage1-trials",
        };
        let et_error: EtError = config_error.into();

        match et_error {
            EtError::Config(_) => (),
            _ => panic!("Expected Config error"),
        }

        let ledger_error = LedgerError::Open {
            path: "missing.tsv".to_string(),
            message: "not found".to_string(),
        };
        let et_error: EtError = ledger_error.into();
        match et_error {
            EtError::Ledger(_) => (),
            _ => panic!("Expected Ledger error"),
        }
    }
}
