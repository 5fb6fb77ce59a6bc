use std::fmt;
use std::path::PathBuf;

/// Machine-readable error codes for the sync runner and its alerting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigReadFailed,
    ConfigParseError,
    InvalidEnumValue,
    AliasWithoutPrimary,
    MalformedContact,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigReadFailed => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidEnumValue => "E2001",
            Self::AliasWithoutPrimary => "E4001",
            Self::MalformedContact => "E4002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigReadFailed => "Config file could not be read",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidEnumValue => "Invalid stage/hosting/type value",
            Self::AliasWithoutPrimary => "Alias email grouped without its primary contact",
            Self::MalformedContact => "Contact failed output validation",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigReadFailed => Some("Check the config path and its read permissions."),
            Self::ConfigParseError => Some("Fix the TOML syntax in the engine config and retry."),
            Self::InvalidEnumValue => None,
            Self::AliasWithoutPrimary | Self::MalformedContact => {
                Some("Upstream data contract was breached. Report a bug with logs; do not retry.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failure to load the engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::ConfigReadFailed,
            Self::Parse(_) => ErrorCode::ConfigParseError,
        }
    }
}

/// Broken invariants in the contact reconciler.
///
/// These mean an upstream data contract was violated. Callers propagate them
/// and abort the run; they are never retried or downgraded to warnings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactError {
    #[error("alias email {alias} has contact records but its primary {primary} has none")]
    AliasWithoutPrimary { primary: String, alias: String },

    #[error("contact {email} is malformed: {reason}")]
    MalformedContact { email: String, reason: String },
}

impl ContactError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AliasWithoutPrimary { .. } => ErrorCode::AliasWithoutPrimary,
            Self::MalformedContact { .. } => ErrorCode::MalformedContact,
        }
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {expected}: '{got}'")]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}
