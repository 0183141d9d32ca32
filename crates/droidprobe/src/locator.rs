//! Element queries and the object locator.
//!
//! # Design
//!
//! - **Declarative queries**: an [`ElementQuery`] says *what* to look for
//!   (text or content description, OR-combinable), never *where*.
//! - **Locale alternation**: one query can list every localized label of the
//!   same affordance (`"Allow"`, `"허용"`, ...); matching is case-insensitive.
//! - **Bounded polling**: [`ObjectLocator::find`] re-dumps the hierarchy at a
//!   fixed interval and gives up after the timeout with `Ok(None)`. Absence is
//!   an ordinary outcome, not an error.
//! - **Single-use handles**: [`ObjectLocator::click`] consumes the handle, and a
//!   handle found before any later device action is stale.

use regex::Regex;
use std::fmt;
use std::time::Duration;

use crate::driver::{DeviceController, UiNode};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{WaitOptions, Waiter};

/// How a single string attribute is matched. All variants ignore case.
#[derive(Debug, Clone)]
pub enum TextPattern {
    /// Whole text equals one of the labels (trimmed)
    OneOf(Vec<String>),
    /// Text contains one of the fragments
    Contains(Vec<String>),
    /// Whole text matches a regular expression
    Matches(Regex),
}

impl TextPattern {
    /// Exact match against any of `labels`
    #[must_use]
    pub fn one_of<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::OneOf(
            labels
                .into_iter()
                .map(|l| l.as_ref().trim().to_lowercase())
                .collect(),
        )
    }

    /// Substring match against a single fragment
    #[must_use]
    pub fn contains(fragment: impl AsRef<str>) -> Self {
        Self::contains_any([fragment])
    }

    /// Substring match against any of `fragments`
    #[must_use]
    pub fn contains_any<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Contains(
            fragments
                .into_iter()
                .map(|f| f.as_ref().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        )
    }

    /// Whole-text regex match, e.g. `"allow|허용"`
    pub fn matches(pattern: &str) -> ProbeResult<Self> {
        let anchored = format!("^(?i:{pattern})$");
        Regex::new(&anchored)
            .map(Self::Matches)
            .map_err(|e| ProbeError::config(format!("invalid text pattern '{pattern}': {e}")))
    }

    /// Test a string against the pattern
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::OneOf(labels) => {
                let text = text.trim().to_lowercase();
                labels.iter().any(|l| *l == text)
            }
            Self::Contains(fragments) => {
                let text = text.to_lowercase();
                fragments.iter().any(|f| text.contains(f.as_str()))
            }
            Self::Matches(re) => re.is_match(text.trim()),
        }
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneOf(labels) => write!(f, "one of {labels:?}"),
            Self::Contains(fragments) => write!(f, "contains {fragments:?}"),
            Self::Matches(re) => write!(f, "matches /{}/", re.as_str()),
        }
    }
}

/// Declarative description of an on-screen element
#[derive(Debug, Clone)]
pub enum ElementQuery {
    /// Match on visible text
    Text(TextPattern),
    /// Match on content description
    Description(TextPattern),
    /// Match if any sub-query matches
    Any(Vec<ElementQuery>),
}

impl ElementQuery {
    /// Query on visible text
    #[must_use]
    pub const fn text(pattern: TextPattern) -> Self {
        Self::Text(pattern)
    }

    /// Query on content description
    #[must_use]
    pub const fn description(pattern: TextPattern) -> Self {
        Self::Description(pattern)
    }

    /// Combine with another query (logical OR)
    #[must_use]
    pub fn or(self, other: Self) -> Self {
        match self {
            Self::Any(mut queries) => {
                queries.push(other);
                Self::Any(queries)
            }
            first => Self::Any(vec![first, other]),
        }
    }

    /// Whether `node` satisfies the query
    #[must_use]
    pub fn matches(&self, node: &UiNode) -> bool {
        match self {
            Self::Text(p) => p.is_match(&node.text),
            Self::Description(p) => p.is_match(&node.content_desc),
            Self::Any(queries) => queries.iter().any(|q| q.matches(node)),
        }
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(p) => write!(f, "text {p}"),
            Self::Description(p) => write!(f, "description {p}"),
            Self::Any(queries) => {
                for (i, q) in queries.iter().enumerate() {
                    if i > 0 {
                        write!(f, " OR ")?;
                    }
                    write!(f, "({q})")?;
                }
                Ok(())
            }
        }
    }
}

/// Transient reference to a located element.
///
/// Valid only for the next interaction: [`ObjectLocator::click`] takes it
/// by value, and any device action after the lookup makes it stale.
#[derive(Debug)]
pub struct ElementHandle {
    query: ElementQuery,
    node: UiNode,
    generation: u64,
}

impl ElementHandle {
    /// Node snapshot taken when the element was found
    #[must_use]
    pub const fn node(&self) -> &UiNode {
        &self.node
    }

    /// Query that found the element
    #[must_use]
    pub const fn query(&self) -> &ElementQuery {
        &self.query
    }

    /// Controller generation at lookup time
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Finds and interacts with on-screen elements by polling the hierarchy
#[derive(Debug, Clone, Copy)]
pub struct ObjectLocator {
    poll_interval_ms: u64,
}

impl ObjectLocator {
    /// Create a locator polling at the given interval
    #[must_use]
    pub const fn new(poll_interval_ms: u64) -> Self {
        Self { poll_interval_ms }
    }

    /// Create a locator polling at the controller's interval
    #[must_use]
    pub const fn for_controller(controller: &DeviceController) -> Self {
        Self::new(controller.poll_interval_ms())
    }

    /// Poll until an element matching `query` appears or `timeout` elapses.
    ///
    /// Returns `Ok(None)` on timeout. Off-screen nodes (empty bounds) never
    /// match. Hierarchy dump failures propagate.
    pub fn find(
        &self,
        controller: &mut DeviceController,
        query: &ElementQuery,
        timeout: Duration,
    ) -> ProbeResult<Option<ElementHandle>> {
        let waiter = Waiter::new(
            WaitOptions::new()
                .with_timeout(timeout.as_millis() as u64)
                .with_poll_interval(self.poll_interval_ms),
        );
        let description = query.to_string();
        let polled = waiter.poll_for(&description, || {
            let nodes = controller.dump_hierarchy()?;
            Ok(nodes
                .into_iter()
                .find(|n| !n.bounds.is_empty() && query.matches(n)))
        })?;

        match polled.value {
            Some(node) => {
                tracing::debug!(query = %description, bounds = %node.bounds, polls = polled.result.polls, "element found");
                Ok(Some(ElementHandle {
                    query: query.clone(),
                    node,
                    generation: controller.generation(),
                }))
            }
            None => {
                tracing::debug!(query = %description, polls = polled.result.polls, "element absent");
                Ok(None)
            }
        }
    }

    /// Whether the element behind `handle` is still on screen, unchanged
    pub fn exists(
        &self,
        controller: &mut DeviceController,
        handle: &ElementHandle,
    ) -> ProbeResult<bool> {
        if handle.generation != controller.generation() {
            return Ok(false);
        }
        Ok(controller
            .dump_hierarchy()?
            .iter()
            .any(|n| n.bounds == handle.node.bounds && handle.query.matches(n)))
    }

    /// Click the element behind `handle`.
    ///
    /// Re-checks existence first; a stale or vanished element fails with
    /// [`ProbeError::ElementNotFound`].
    pub fn click(&self, controller: &mut DeviceController, handle: ElementHandle) -> ProbeResult<()> {
        if !self.exists(controller, &handle)? {
            return Err(ProbeError::ElementNotFound {
                query: handle.query.to_string(),
            });
        }
        let point = handle.node.bounds.center();
        tracing::debug!(query = %handle.query, x = point.x, y = point.y, "click");
        controller.tap(point)
    }
}
