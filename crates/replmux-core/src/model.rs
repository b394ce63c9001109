//! Console model
//!
//! One model exists per session that owns its console. Sessions that merge
//! into a parent write into the parent's model through the console router.
//! Every mutation is announced on the model's change stream with a sequence
//! number that only grows, so observers see writes in the order they landed.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use replmux_output::{
    ChangeKind, Element, ElementTree, ExpressionElement, Severity, SourceLocation,
    StructuredValue, TreeOptions, VariableElement,
};

use crate::Result;

pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Terminal "erase display" sequence; output containing it clears the console
const CLEAR_SEQUENCE: &str = "\u{1b}[2J";

/// A single write to a console
#[derive(Debug, Clone, PartialEq)]
pub struct OutputData {
    pub output: String,
    pub severity: Severity,
    /// Structured value to show instead of plain text
    pub expression: Option<StructuredValue>,
    pub source: Option<SourceLocation>,
}

impl OutputData {
    pub fn text(output: impl Into<String>, severity: Severity) -> Self {
        Self {
            output: output.into(),
            severity,
            expression: None,
            source: None,
        }
    }

    pub fn value(value: StructuredValue, severity: Severity) -> Self {
        Self {
            output: String::new(),
            severity,
            expression: Some(value),
            source: None,
        }
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }
}

/// Notification sent for every mutation of a model
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplChange {
    pub model_id: String,
    pub seq: u64,
    pub kind: ChangeKind,
}

struct ModelState {
    tree: ElementTree,
    seq: u64,
    /// Per-session listener channels currently bound to this model
    forwards: Vec<broadcast::Sender<ReplChange>>,
}

pub struct ReplModel {
    id: String,
    state: Arc<RwLock<ModelState>>,
    changes: broadcast::Sender<ReplChange>,
}

impl ReplModel {
    pub fn new(options: TreeOptions) -> Self {
        Self::from_tree(ElementTree::new(options))
    }

    fn from_tree(tree: ElementTree) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            id: Uuid::new_v4().to_string(),
            state: Arc::new(RwLock::new(ModelState {
                tree,
                seq: 0,
                forwards: Vec::new(),
            })),
            changes,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReplChange> {
        self.changes.subscribe()
    }

    /// Run `f` against the live top-level elements.
    ///
    /// `f` runs under the model's read lock: writing to this model from
    /// inside it deadlocks.
    pub fn with_elements<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&[Element]) -> T,
    {
        let state = self.state.read();
        f(state.tree.elements())
    }

    /// Snapshot of the top-level elements
    pub fn elements(&self) -> Vec<Element> {
        self.with_elements(|elements| elements.to_vec())
    }

    pub fn len(&self) -> usize {
        self.with_elements(|elements| elements.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn open_group_count(&self) -> usize {
        self.state.read().tree.open_group_count()
    }

    /// Append output to the active container
    pub fn append(&self, data: OutputData) -> Result<()> {
        let mut state = self.state.write();
        let mut output = data.output.as_str();
        let mut change = None;

        if let Some(index) = output.rfind(CLEAR_SEQUENCE) {
            state.tree.clear();
            state
                .tree
                .append_text("Console was cleared\n", Severity::Info, None)?;
            output = &output[index + CLEAR_SEQUENCE.len()..];
            change = Some(ChangeKind::Cleared);

            tracing::info!(model_id = %self.id, "Console cleared by output");
        }

        let written = match data.expression {
            Some(value) => Some(
                state
                    .tree
                    .add_variable(VariableElement::new(value, data.severity, data.source))?,
            ),
            None => state
                .tree
                .append_text(output, data.severity, data.source.as_ref())?,
        };

        if let Some(kind) = ChangeKind::strongest(change, written) {
            self.emit(&mut state, kind);
        }

        Ok(())
    }

    pub fn start_group(
        &self,
        name: String,
        auto_expand: bool,
        source: Option<SourceLocation>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let kind = state.tree.start_group(name, auto_expand, source)?;
        self.emit(&mut state, kind);
        Ok(())
    }

    pub fn end_group(&self) -> Result<()> {
        let mut state = self.state.write();
        let kind = state.tree.end_group()?;
        self.emit(&mut state, kind);
        Ok(())
    }

    /// Append an unevaluated expression and return its element id
    pub fn add_expression_input(&self, input: &str) -> Result<String> {
        let mut state = self.state.write();
        let id = state
            .tree
            .add_expression(ExpressionElement::new(input.to_string()))?;
        self.emit(&mut state, ChangeKind::Appended);
        Ok(id)
    }

    /// Apply an evaluation result to a previously added expression.
    ///
    /// Returns false when the expression is gone, e.g. the console was
    /// cleared while the evaluation was outstanding.
    pub fn resolve_expression<F>(&self, id: &str, apply: F) -> bool
    where
        F: FnOnce(&mut ExpressionElement),
    {
        let mut state = self.state.write();
        match state.tree.find_expression_mut(id) {
            Some(expression) => {
                apply(expression);
                self.emit(&mut state, ChangeKind::ExpressionResolved);
                true
            }
            None => {
                tracing::debug!(model_id = %self.id, expression_id = %id, "Expression no longer in console");
                false
            }
        }
    }

    /// Remove every element and close every open group
    pub fn remove_repl_expressions(&self) {
        let mut state = self.state.write();
        state.tree.clear();
        self.emit(&mut state, ChangeKind::Cleared);

        tracing::debug!(model_id = %self.id, "Console cleared");
    }

    /// Also deliver every change to `sender`
    pub(crate) fn forward_to(&self, sender: broadcast::Sender<ReplChange>) {
        self.state.write().forwards.push(sender);
    }

    pub(crate) fn clear_forwards(&self) {
        self.state.write().forwards.clear();
    }

    /// An independent copy of this model with its own change stream.
    ///
    /// Listener bindings are not copied.
    pub fn clone_detached(&self) -> Self {
        let tree = self.state.read().tree.clone();
        Self::from_tree(tree)
    }

    fn emit(&self, state: &mut ModelState, kind: ChangeKind) {
        state.seq += 1;
        let change = ReplChange {
            model_id: self.id.clone(),
            seq: state.seq,
            kind,
        };
        // No subscribers is fine
        for forward in &state.forwards {
            let _ = forward.send(change.clone());
        }
        let _ = self.changes.send(change);
    }
}

impl Clone for ReplModel {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            state: Arc::clone(&self.state),
            changes: self.changes.clone(),
        }
    }
}

impl std::fmt::Debug for ReplModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplModel")
            .field("id", &self.id)
            .field("elements", &self.len())
            .finish()
    }
}
