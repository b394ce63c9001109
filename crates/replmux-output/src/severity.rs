//! Output severity
//!
//! Severity is part of the repeat-collapsing key, so it is never defaulted:
//! names that do not parse are rejected instead of silently becoming `Info`.

use serde::{Deserialize, Serialize};

use crate::error::OutputError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    /// Map a debug adapter output category to a severity.
    ///
    /// `stderr` is an error, `console` a warning, everything else informational.
    pub fn from_output_category(category: Option<&str>) -> Self {
        match category {
            Some("stderr") => Severity::Error,
            Some("console") => Severity::Warning,
            _ => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            _ => Err(OutputError::UnknownSeverity(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }

    #[test]
    fn test_parse() {
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!("Warning".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!(" ERROR ".parse::<Severity>().unwrap(), Severity::Error);
    }

    #[test]
    fn test_unknown_severity_rejected() {
        assert_eq!(
            "".parse::<Severity>(),
            Err(OutputError::UnknownSeverity(String::new()))
        );
        assert!("debug".parse::<Severity>().is_err());
    }

    #[test]
    fn test_output_category() {
        assert_eq!(Severity::from_output_category(Some("stderr")), Severity::Error);
        assert_eq!(Severity::from_output_category(Some("console")), Severity::Warning);
        assert_eq!(Severity::from_output_category(Some("stdout")), Severity::Info);
        assert_eq!(Severity::from_output_category(None), Severity::Info);
    }
}
