//! Structured configuration issues.
//!
//! Configuration loaders report problems as a list of [`ConfigIssue`]s
//! instead of failing on the first one. Callers decide what to do: the
//! binary refuses to start on any [`Severity::Error`] and logs warnings.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A count or duration that must be positive is zero.
    ZeroValue,
    /// A fraction lies outside its allowed range.
    FractionOutOfRange,
    /// The agent poll interval is not shorter than the assignment timeout.
    PollSlowerThanTimeout,
    /// The timeout checker runs less often than assignments time out.
    CoarseTimeoutChecker,
    /// The log level string is not recognised.
    UnknownLogLevel,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    /// Dotted key the issue refers to (e.g. `"consensus.default_threshold"`)
    pub key: &'static str,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, key: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            key,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, key: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            key,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{} [{}]: {}", level, self.key, self.message)
    }
}
