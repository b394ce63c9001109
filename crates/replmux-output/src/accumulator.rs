//! Line accumulation
//!
//! One accumulator exists per container. It tracks the unterminated line that
//! is still being written (`pending`) and the most recently finalized line,
//! which is the only line a new one may collapse into.
//!
//! ```text
//! append("2")      pending "2"
//! append("3\n4")   finalize "23\n", pending "4"
//! append("5\n")    finalize "45\n"
//! ```

use crate::element::{Element, OutputLine, SourceLocation};
use crate::severity::Severity;
use crate::tree::ChangeKind;

#[derive(Debug, Clone, Default)]
pub struct LineAccumulator {
    /// Index of the unterminated line; always the container's last element
    pending: Option<usize>,
    /// Index of the line new lines are compared against
    last_finalized: Option<usize>,
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Feed a chunk of output into `elements`.
    ///
    /// Returns the strongest change the chunk caused, or `None` for an empty chunk.
    pub fn append(
        &mut self,
        elements: &mut Vec<Element>,
        chunk: &str,
        severity: Severity,
        source: Option<&SourceLocation>,
        collapse: bool,
    ) -> Option<ChangeKind> {
        let mut change = None;

        // A severity change seals the current line without a newline
        if let Some(index) = self.pending {
            let pending_severity = match elements.get(index) {
                Some(Element::Line(line)) => Some(line.severity),
                _ => None,
            };
            if pending_severity != Some(severity) {
                change = ChangeKind::strongest(change, self.finalize(elements, collapse));
            }
        }

        let mut rest = chunk;
        while let Some(newline) = rest.find('\n') {
            let (line, tail) = rest.split_at(newline + 1);
            if self.pending.is_some() {
                self.extend_pending(elements, line);
                change = ChangeKind::strongest(change, Some(ChangeKind::PendingUpdated));
                change = ChangeKind::strongest(change, self.finalize(elements, collapse));
            } else {
                let finalized = self.push_finalized(elements, line, severity, source, collapse);
                change = ChangeKind::strongest(change, Some(finalized));
            }
            rest = tail;
        }

        if !rest.is_empty() {
            if self.pending.is_some() {
                self.extend_pending(elements, rest);
                change = ChangeKind::strongest(change, Some(ChangeKind::PendingUpdated));
            } else {
                elements.push(Element::Line(OutputLine::new(
                    rest.to_string(),
                    severity,
                    source.cloned(),
                )));
                self.pending = Some(elements.len() - 1);
                change = ChangeKind::strongest(change, Some(ChangeKind::Appended));
            }
        }

        change
    }

    /// Seal the pending line ahead of a non-line element landing in the
    /// container. Nothing collapses across that element afterwards.
    pub fn seal(&mut self, elements: &mut Vec<Element>, collapse: bool) -> Option<ChangeKind> {
        let change = self.finalize(elements, collapse);
        self.last_finalized = None;
        change
    }

    /// Forget all state, used when the container is cleared
    pub fn reset(&mut self) {
        self.pending = None;
        self.last_finalized = None;
    }

    /// Account for `removed` elements dropped from the front of the container
    pub fn shift(&mut self, removed: usize) {
        self.pending = self.pending.and_then(|index| index.checked_sub(removed));
        self.last_finalized = self.last_finalized.and_then(|index| index.checked_sub(removed));
    }

    fn extend_pending(&mut self, elements: &mut [Element], text: &str) {
        if let Some(Element::Line(line)) = self.pending.and_then(|index| elements.get_mut(index)) {
            line.value.push_str(text);
        }
    }

    /// Turn the pending line into a finalized one, collapsing it into the
    /// previous line when they match.
    fn finalize(&mut self, elements: &mut Vec<Element>, collapse: bool) -> Option<ChangeKind> {
        let index = self.pending.take()?;

        if collapse && self.matches_last(elements, index) {
            elements.remove(index);
            self.bump_last(elements);
            return Some(ChangeKind::Collapsed);
        }

        self.last_finalized = Some(index);
        None
    }

    fn push_finalized(
        &mut self,
        elements: &mut Vec<Element>,
        text: &str,
        severity: Severity,
        source: Option<&SourceLocation>,
        collapse: bool,
    ) -> ChangeKind {
        if collapse {
            let repeats = match self.last_finalized.and_then(|index| elements.get(index)) {
                Some(Element::Line(last)) => last.severity == severity && last.value == text,
                _ => false,
            };
            if repeats {
                self.bump_last(elements);
                return ChangeKind::CountBumped;
            }
        }

        elements.push(Element::Line(OutputLine::new(
            text.to_string(),
            severity,
            source.cloned(),
        )));
        self.last_finalized = Some(elements.len() - 1);
        ChangeKind::Appended
    }

    fn matches_last(&self, elements: &[Element], index: usize) -> bool {
        let Some(last) = self.last_finalized else {
            return false;
        };
        match (elements.get(last), elements.get(index)) {
            (Some(Element::Line(previous)), Some(Element::Line(current))) => {
                previous.same_output(current)
            }
            _ => false,
        }
    }

    fn bump_last(&self, elements: &mut [Element]) {
        if let Some(Element::Line(line)) = self.last_finalized.and_then(|index| elements.get_mut(index)) {
            line.count += 1;
        }
    }
}
