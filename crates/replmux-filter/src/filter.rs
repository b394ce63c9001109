//! Filter query parsing and matching

use serde::{Deserialize, Serialize};

use replmux_output::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterTerm {
    pub action: FilterAction,
    /// Lowercased term text
    pub text: String,
}

impl FilterTerm {
    fn parse(raw: &str) -> Self {
        let (action, text) = if let Some(escaped) = raw.strip_prefix('\\') {
            (FilterAction::Include, escaped)
        } else if let Some(negated) = raw.strip_prefix('!') {
            (FilterAction::Exclude, negated)
        } else {
            (FilterAction::Include, raw)
        };

        Self {
            action,
            text: text.to_lowercase(),
        }
    }

    fn matches(&self, haystack: &str) -> bool {
        haystack.contains(&self.text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplFilter {
    query: String,
    terms: Vec<FilterTerm>,
}

impl ReplFilter {
    pub fn new(query: &str) -> Self {
        let mut filter = Self::default();
        filter.set_query(query);
        filter
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn terms(&self) -> &[FilterTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.trim().to_string();
        self.terms = self
            .query
            .split(',')
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(FilterTerm::parse)
            .filter(|term| !term.text.is_empty())
            .collect();

        tracing::debug!(query = %self.query, terms = self.terms.len(), "Console filter updated");
    }

    /// Decide whether `element` is shown.
    ///
    /// `parent_visible` is passed through when the query has no include terms.
    pub fn filter(&self, element: &Element, parent_visible: bool) -> bool {
        if !Self::is_filterable(element) {
            return true;
        }

        let text = element.to_string().to_lowercase();
        let mut has_include = false;
        let mut include_matched = false;

        for term in &self.terms {
            match term.action {
                FilterAction::Exclude if term.matches(&text) => return false,
                FilterAction::Exclude => {}
                FilterAction::Include => {
                    has_include = true;
                    include_matched |= term.matches(&text);
                }
            }
        }

        if has_include {
            include_matched
        } else {
            parent_visible
        }
    }

    /// Elements the query lets through, with group children filtered
    /// against their group's visibility
    pub fn visible(&self, elements: &[Element], parent_visible: bool) -> Vec<Element> {
        elements
            .iter()
            .filter_map(|element| {
                let shown = self.filter(element, parent_visible);
                match element {
                    _ if !shown => None,
                    Element::Group(group) => {
                        let children = self.visible(group.children(), shown);
                        Some(Element::Group(group.with_children(children)))
                    }
                    other => Some(other.clone()),
                }
            })
            .collect()
    }

    fn is_filterable(element: &Element) -> bool {
        matches!(element, Element::Line(_))
    }
}
