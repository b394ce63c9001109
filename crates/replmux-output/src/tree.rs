//! Element tree
//!
//! The root container plus the stack of currently open groups. Every write
//! lands in the innermost open group, or in the root when none is open.

use serde::{Deserialize, Serialize};

use crate::accumulator::LineAccumulator;
use crate::element::{Element, ExpressionElement, GroupElement, SourceLocation, VariableElement};
use crate::error::OutputError;
use crate::severity::Severity;
use crate::Result;

/// What a single write did to the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeKind {
    /// Elements were added or removed
    Appended,
    /// Only the text of the trailing unterminated line changed
    PendingUpdated,
    /// Only the repeat count of the last finalized line changed
    CountBumped,
    /// The trailing line was folded into the count of the line before it
    Collapsed,
    /// An outstanding expression received its value
    ExpressionResolved,
    /// The innermost open group was sealed
    GroupEnded,
    /// Everything was removed
    Cleared,
}

impl ChangeKind {
    fn weight(self) -> u8 {
        match self {
            ChangeKind::PendingUpdated => 0,
            ChangeKind::CountBumped | ChangeKind::ExpressionResolved | ChangeKind::GroupEnded => 1,
            ChangeKind::Collapsed => 2,
            ChangeKind::Appended => 3,
            ChangeKind::Cleared => 4,
        }
    }

    /// Keep whichever change asks the renderer for more work
    pub fn strongest(current: Option<Self>, next: Option<Self>) -> Option<Self> {
        match (current, next) {
            (Some(a), Some(b)) => Some(if b.weight() > a.weight() { b } else { a }),
            (a, b) => a.or(b),
        }
    }

    /// True when rows were added or removed, not just rewritten in place
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            ChangeKind::Appended | ChangeKind::Collapsed | ChangeKind::Cleared
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeOptions {
    pub collapse_identical_lines: bool,
    /// Cap on the number of root elements; the oldest are dropped first
    pub max_elements: usize,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            collapse_identical_lines: true,
            max_elements: 10_000,
        }
    }
}

/// An ordered element list with its own line accumulator
#[derive(Debug, Clone, Default, Serialize)]
pub struct Container {
    elements: Vec<Element>,
    #[serde(skip)]
    lines: LineAccumulator,
}

impl Container {
    pub(crate) fn from_elements(elements: Vec<Element>) -> Self {
        Self {
            elements,
            lines: LineAccumulator::default(),
        }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn has_pending_line(&self) -> bool {
        self.lines.has_pending()
    }

    fn append_text(
        &mut self,
        chunk: &str,
        severity: Severity,
        source: Option<&SourceLocation>,
        collapse: bool,
    ) -> Option<ChangeKind> {
        self.lines
            .append(&mut self.elements, chunk, severity, source, collapse)
    }

    fn push_element(&mut self, element: Element, collapse: bool) -> ChangeKind {
        self.lines.seal(&mut self.elements, collapse);
        self.elements.push(element);
        ChangeKind::Appended
    }
}

#[derive(Debug, Clone, Default)]
pub struct ElementTree {
    root: Container,
    /// Index path from the root to the innermost open group
    open_groups: Vec<usize>,
    options: TreeOptions,
}

impl ElementTree {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            root: Container::default(),
            open_groups: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> TreeOptions {
        self.options
    }

    /// Top-level elements
    pub fn elements(&self) -> &[Element] {
        self.root.elements()
    }

    pub fn root(&self) -> &Container {
        &self.root
    }

    /// Number of groups currently open
    pub fn open_group_count(&self) -> usize {
        self.open_groups.len()
    }

    /// The container writes currently land in
    pub fn active_container(&self) -> Result<&Container> {
        let mut container = &self.root;
        for &index in &self.open_groups {
            container = match container.elements.get(index) {
                Some(Element::Group(group)) => group.container(),
                _ => return Err(OutputError::DetachedGroup),
            };
        }
        Ok(container)
    }

    /// Append streamed output text to the active container
    pub fn append_text(
        &mut self,
        chunk: &str,
        severity: Severity,
        source: Option<&SourceLocation>,
    ) -> Result<Option<ChangeKind>> {
        let collapse = self.options.collapse_identical_lines;
        let change = self
            .active_mut()?
            .append_text(chunk, severity, source, collapse);
        Ok(self.after_write(change))
    }

    /// Append an unevaluated expression; returns its id for later resolution
    pub fn add_expression(&mut self, expression: ExpressionElement) -> Result<String> {
        let id = expression.id.clone();
        self.push(Element::Expression(expression))?;
        Ok(id)
    }

    pub fn add_variable(&mut self, variable: VariableElement) -> Result<ChangeKind> {
        self.push(Element::Variable(variable))
    }

    /// Open a group inside the active container and make it the active one
    pub fn start_group(
        &mut self,
        name: String,
        auto_expand: bool,
        source: Option<SourceLocation>,
    ) -> Result<ChangeKind> {
        let collapse = self.options.collapse_identical_lines;
        let container = self.active_mut()?;
        container.push_element(
            Element::Group(GroupElement::new(name, auto_expand, source)),
            collapse,
        );
        let index = container.len() - 1;
        self.open_groups.push(index);

        tracing::debug!(depth = self.open_groups.len(), "Group started");

        Ok(self
            .after_write(Some(ChangeKind::Appended))
            .unwrap_or(ChangeKind::Appended))
    }

    /// Seal the innermost open group and return to its parent container
    pub fn end_group(&mut self) -> Result<ChangeKind> {
        let collapse = self.options.collapse_identical_lines;
        let (&last, parents) = self
            .open_groups
            .split_last()
            .ok_or(OutputError::NoOpenGroup)?;

        let parent = descend(&mut self.root, parents).ok_or(OutputError::DetachedGroup)?;
        let Some(Element::Group(group)) = parent.elements.get_mut(last) else {
            return Err(OutputError::DetachedGroup);
        };

        let container = group.container_mut();
        container.lines.seal(&mut container.elements, collapse);
        group.seal();
        self.open_groups.pop();

        tracing::debug!(depth = self.open_groups.len(), "Group ended");

        Ok(ChangeKind::GroupEnded)
    }

    /// Find an expression anywhere in the tree, newest first
    pub fn find_expression_mut(&mut self, id: &str) -> Option<&mut ExpressionElement> {
        find_expression(&mut self.root.elements, id)
    }

    /// Drop every element and every open group
    pub fn clear(&mut self) {
        self.root = Container::default();
        self.open_groups.clear();
    }

    fn push(&mut self, element: Element) -> Result<ChangeKind> {
        let collapse = self.options.collapse_identical_lines;
        let change = self.active_mut()?.push_element(element, collapse);
        Ok(self.after_write(Some(change)).unwrap_or(change))
    }

    fn active_mut(&mut self) -> Result<&mut Container> {
        descend(&mut self.root, &self.open_groups).ok_or(OutputError::DetachedGroup)
    }

    fn after_write(&mut self, change: Option<ChangeKind>) -> Option<ChangeKind> {
        if self.trim() > 0 {
            ChangeKind::strongest(change, Some(ChangeKind::Appended))
        } else {
            change
        }
    }

    /// Drop the oldest root elements beyond the cap, never an open group
    fn trim(&mut self) -> usize {
        let max = self.options.max_elements.max(1);
        let len = self.root.elements.len();
        if len <= max {
            return 0;
        }

        let mut excess = len - max;
        if let Some(&first_open) = self.open_groups.first() {
            excess = excess.min(first_open);
        }
        if excess == 0 {
            return 0;
        }

        self.root.elements.drain(..excess);
        self.root.lines.shift(excess);
        if let Some(first_open) = self.open_groups.first_mut() {
            *first_open -= excess;
        }

        tracing::debug!(removed = excess, max_elements = max, "Trimmed console elements");

        excess
    }
}

fn descend<'a>(container: &'a mut Container, path: &[usize]) -> Option<&'a mut Container> {
    let Some((&index, rest)) = path.split_first() else {
        return Some(container);
    };
    match container.elements.get_mut(index)? {
        Element::Group(group) => descend(group.container_mut(), rest),
        _ => None,
    }
}

fn find_expression<'a>(elements: &'a mut [Element], id: &str) -> Option<&'a mut ExpressionElement> {
    for element in elements.iter_mut().rev() {
        match element {
            Element::Expression(expression) if expression.id == id => return Some(expression),
            Element::Group(group) => {
                if let Some(found) = find_expression(&mut group.container_mut().elements, id) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ElementTree {
        ElementTree::new(TreeOptions::default())
    }

    #[test]
    fn test_nested_groups() {
        let mut tree = tree();

        tree.start_group("outer".to_string(), true, None).unwrap();
        tree.append_text("first\n", Severity::Info, None).unwrap();
        tree.append_text("second\n", Severity::Info, None).unwrap();
        tree.start_group("inner".to_string(), false, None).unwrap();
        tree.append_text("third\n", Severity::Info, None).unwrap();
        tree.append_text("fourth\n", Severity::Info, None).unwrap();
        tree.end_group().unwrap();

        assert_eq!(tree.elements().len(), 1);
        let outer = tree.elements()[0].as_group().unwrap();
        assert_eq!(outer.children().len(), 3);
        assert!(!outer.has_ended());

        let inner = outer.children()[2].as_group().unwrap();
        assert!(inner.has_ended());
        assert!(!inner.auto_expand);
        assert_eq!(inner.children().len(), 2);

        tree.end_group().unwrap();
        assert!(tree.elements()[0].as_group().unwrap().has_ended());
        assert_eq!(tree.open_group_count(), 0);
    }

    #[test]
    fn test_end_group_without_open_group() {
        let mut tree = tree();
        assert_eq!(tree.end_group(), Err(OutputError::NoOpenGroup));

        tree.start_group("g".to_string(), true, None).unwrap();
        tree.end_group().unwrap();
        assert_eq!(tree.end_group(), Err(OutputError::NoOpenGroup));
    }

    #[test]
    fn test_writes_return_to_parent_after_end() {
        let mut tree = tree();

        tree.start_group("g".to_string(), true, None).unwrap();
        tree.append_text("inside\n", Severity::Info, None).unwrap();
        tree.end_group().unwrap();
        tree.append_text("outside\n", Severity::Info, None).unwrap();

        assert_eq!(tree.elements().len(), 2);
        assert_eq!(tree.elements()[1].to_string(), "outside\n");
    }

    #[test]
    fn test_collapsing_stops_at_group_boundary() {
        let mut tree = tree();

        tree.append_text("same\n", Severity::Info, None).unwrap();
        tree.start_group("g".to_string(), true, None).unwrap();
        tree.append_text("same\n", Severity::Info, None).unwrap();
        tree.end_group().unwrap();
        tree.append_text("same\n", Severity::Info, None).unwrap();

        let counts: Vec<usize> = tree
            .elements()
            .iter()
            .filter_map(Element::as_line)
            .map(|line| line.count)
            .collect();
        assert_eq!(counts, vec![1, 1]);
        assert_eq!(tree.elements().len(), 3);

        let group = tree.elements()[1].as_group().unwrap();
        assert_eq!(group.children()[0].as_line().unwrap().count, 1);
    }

    #[test]
    fn test_group_start_seals_pending_line() {
        let mut tree = tree();

        tree.append_text("loading", Severity::Info, None).unwrap();
        tree.start_group("g".to_string(), true, None).unwrap();
        tree.end_group().unwrap();
        tree.append_text("...", Severity::Info, None).unwrap();

        let rendered: Vec<String> = tree.elements().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["loading", "g", "..."]);
    }

    #[test]
    fn test_end_group_finalizes_its_pending_line() {
        let mut tree = tree();

        tree.start_group("g".to_string(), true, None).unwrap();
        tree.append_text("tail", Severity::Info, None).unwrap();
        assert!(tree.active_container().unwrap().has_pending_line());
        tree.end_group().unwrap();

        let group = tree.elements()[0].as_group().unwrap();
        assert!(!group.container().has_pending_line());
    }

    #[test]
    fn test_clear() {
        let mut tree = tree();

        tree.append_text("a\n", Severity::Info, None).unwrap();
        tree.start_group("g".to_string(), true, None).unwrap();
        tree.append_text("b", Severity::Info, None).unwrap();
        tree.clear();

        assert!(tree.elements().is_empty());
        assert_eq!(tree.open_group_count(), 0);
        assert_eq!(tree.end_group(), Err(OutputError::NoOpenGroup));

        tree.append_text("a\n", Severity::Info, None).unwrap();
        assert_eq!(tree.elements()[0].as_line().unwrap().count, 1);
    }

    #[test]
    fn test_expression_found_inside_group() {
        let mut tree = tree();

        tree.start_group("g".to_string(), true, None).unwrap();
        let id = tree
            .add_expression(ExpressionElement::new("x".to_string()))
            .unwrap();
        tree.end_group().unwrap();

        let expression = tree.find_expression_mut(&id).unwrap();
        expression.resolve("1".to_string(), None, None);

        let group = tree.elements()[0].as_group().unwrap();
        let stored = group.children()[0].as_expression().unwrap();
        assert_eq!(stored.value.as_deref(), Some("1"));
        assert!(tree.find_expression_mut("missing").is_none());
    }

    #[test]
    fn test_trim_keeps_newest_elements() {
        let mut tree = ElementTree::new(TreeOptions {
            collapse_identical_lines: true,
            max_elements: 3,
        });

        for i in 0..5 {
            tree.append_text(&format!("line {}\n", i), Severity::Info, None)
                .unwrap();
        }

        let rendered: Vec<String> = tree.elements().iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["line 2\n", "line 3\n", "line 4\n"]);

        // Collapsing still targets the newest line after trimming
        tree.append_text("line 4\n", Severity::Info, None).unwrap();
        assert_eq!(tree.elements()[2].as_line().unwrap().count, 2);
    }

    #[test]
    fn test_trim_never_drops_open_group() {
        let mut tree = ElementTree::new(TreeOptions {
            collapse_identical_lines: true,
            max_elements: 2,
        });

        tree.start_group("g".to_string(), true, None).unwrap();
        tree.end_group().unwrap();
        tree.start_group("open".to_string(), true, None).unwrap();
        tree.end_group().unwrap();
        tree.start_group("current".to_string(), true, None).unwrap();
        tree.append_text("inside\n", Severity::Info, None).unwrap();

        assert_eq!(tree.elements().len(), 2);
        assert_eq!(tree.elements()[1].to_string(), "current");
        assert_eq!(tree.active_container().unwrap().len(), 1);
        tree.end_group().unwrap();
    }

    #[test]
    fn test_strongest_change() {
        assert_eq!(
            ChangeKind::strongest(Some(ChangeKind::PendingUpdated), Some(ChangeKind::Appended)),
            Some(ChangeKind::Appended)
        );
        assert_eq!(
            ChangeKind::strongest(Some(ChangeKind::Collapsed), Some(ChangeKind::CountBumped)),
            Some(ChangeKind::Collapsed)
        );
        assert_eq!(ChangeKind::strongest(None, None), None);
        assert!(ChangeKind::Collapsed.is_structural());
        assert!(!ChangeKind::CountBumped.is_structural());
    }
}
