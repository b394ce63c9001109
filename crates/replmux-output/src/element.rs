//! Console elements
//!
//! Everything a console container can hold. Lines are immutable once
//! finalized except for their repeat count; groups are sealed exactly once.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::severity::Severity;
use crate::tree::Container;

/// Where a piece of output was produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub source: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Element {
    Line(OutputLine),
    Group(GroupElement),
    Expression(ExpressionElement),
    Variable(VariableElement),
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Element::Line(line) => &line.id,
            Element::Group(group) => &group.id,
            Element::Expression(expression) => &expression.id,
            Element::Variable(variable) => &variable.id,
        }
    }

    pub fn as_line(&self) -> Option<&OutputLine> {
        match self {
            Element::Line(line) => Some(line),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupElement> {
        match self {
            Element::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn as_expression(&self) -> Option<&ExpressionElement> {
        match self {
            Element::Expression(expression) => Some(expression),
            _ => None,
        }
    }
}

impl std::fmt::Display for Element {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Element::Line(line) => write!(f, "{}", line.value),
            Element::Group(group) => write!(f, "{}", group.name),
            Element::Expression(expression) => match &expression.value {
                Some(value) => write!(f, "{}\n{}", expression.input, value),
                None => write!(f, "{}", expression.input),
            },
            Element::Variable(variable) => match &variable.name {
                Some(name) => write!(f, "{} = {}", name, variable.value),
                None => write!(f, "{}", variable.value),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub id: String,
    /// Line text, including its terminating newline once finalized
    pub value: String,
    pub severity: Severity,
    /// How many consecutive identical lines this element stands for
    pub count: usize,
    pub source: Option<SourceLocation>,
}

impl OutputLine {
    pub fn new(value: String, severity: Severity, source: Option<SourceLocation>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            value,
            severity,
            count: 1,
            source,
        }
    }

    /// Two lines collapse when text and severity both match
    pub fn same_output(&self, other: &OutputLine) -> bool {
        self.severity == other.severity && self.value == other.value
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupElement {
    pub id: String,
    pub name: String,
    pub auto_expand: bool,
    pub source: Option<SourceLocation>,
    has_ended: bool,
    children: Container,
}

impl GroupElement {
    pub fn new(name: String, auto_expand: bool, source: Option<SourceLocation>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            auto_expand,
            source,
            has_ended: false,
            children: Container::default(),
        }
    }

    pub fn has_ended(&self) -> bool {
        self.has_ended
    }

    pub fn children(&self) -> &[Element] {
        self.children.elements()
    }

    /// A copy of this group holding `children` instead of its own
    pub fn with_children(&self, children: Vec<Element>) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            auto_expand: self.auto_expand,
            source: self.source.clone(),
            has_ended: self.has_ended,
            children: Container::from_elements(children),
        }
    }

    pub(crate) fn container(&self) -> &Container {
        &self.children
    }

    pub(crate) fn container_mut(&mut self) -> &mut Container {
        &mut self.children
    }

    pub(crate) fn seal(&mut self) {
        self.has_ended = true;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionElement {
    pub id: String,
    /// What the user typed
    pub input: String,
    /// Evaluation result, `None` while the evaluation is outstanding
    pub value: Option<String>,
    pub type_name: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub severity: Severity,
    /// False when the evaluation failed
    pub available: bool,
}

impl ExpressionElement {
    pub fn new(input: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            input,
            value: None,
            type_name: None,
            payload: None,
            severity: Severity::Info,
            available: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.value.is_some()
    }

    pub fn resolve(
        &mut self,
        value: String,
        type_name: Option<String>,
        payload: Option<serde_json::Value>,
    ) {
        self.value = Some(value);
        self.type_name = type_name;
        self.payload = payload;
        self.severity = Severity::Info;
        self.available = true;
    }

    pub fn fail(&mut self, message: String) {
        self.value = Some(message);
        self.type_name = None;
        self.payload = None;
        self.severity = Severity::Error;
        self.available = false;
    }
}

/// Structured output value handed over by a debug adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredValue {
    pub name: Option<String>,
    pub value: String,
    pub type_name: Option<String>,
    pub payload: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableElement {
    pub id: String,
    pub name: Option<String>,
    pub value: String,
    pub type_name: Option<String>,
    pub payload: Option<serde_json::Value>,
    pub severity: Severity,
    pub source: Option<SourceLocation>,
}

impl VariableElement {
    pub fn new(value: StructuredValue, severity: Severity, source: Option<SourceLocation>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: value.name,
            value: value.value,
            type_name: value.type_name,
            payload: value.payload,
            severity,
            source,
        }
    }
}
