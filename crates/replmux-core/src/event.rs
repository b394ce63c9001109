//! Output events as sent by debug adapters

use serde::{Deserialize, Serialize};

use replmux_output::{Severity, SourceLocation};

/// Grouping instruction carried by an output event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputGroup {
    Start,
    StartCollapsed,
    End,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputEvent {
    /// `stdout`, `stderr`, `console`, `telemetry`, ...
    pub category: Option<String>,
    pub output: String,
    pub group: Option<OutputGroup>,
    pub source: Option<SourceLocation>,
}

impl OutputEvent {
    pub fn new(category: &str, output: impl Into<String>) -> Self {
        Self {
            category: Some(category.to_string()),
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::from_output_category(self.category.as_deref())
    }

    /// Telemetry events never reach the console
    pub fn is_telemetry(&self) -> bool {
        self.category.as_deref() == Some("telemetry")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_adapter_event() {
        let event: OutputEvent = serde_json::from_str(
            r#"{ "category": "stderr", "output": "boom\n", "group": "startCollapsed",
                 "source": { "source": "main.rs", "line": 3, "column": 1 } }"#,
        )
        .unwrap();

        assert_eq!(event.severity(), Severity::Error);
        assert_eq!(event.group, Some(OutputGroup::StartCollapsed));
        assert_eq!(event.source.unwrap().line, 3);
    }

    #[test]
    fn test_missing_fields_default() {
        let event: OutputEvent = serde_json::from_str(r#"{ "output": "x" }"#).unwrap();
        assert_eq!(event.severity(), Severity::Info);
        assert!(event.group.is_none());
        assert!(!event.is_telemetry());
        assert!(OutputEvent::new("telemetry", "{}").is_telemetry());
    }
}
