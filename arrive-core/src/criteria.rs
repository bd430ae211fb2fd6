//! The predicate model registrations are built from.
//!
//! A registration's interest is a [`Criteria`]: an AND-conjunction of
//! individual [`Criterion`] tests. The core crate ships the tag, class and
//! arbitrary-predicate forms; richer forms (the CSS-style selector engine in
//! `arrive-std`) implement [`Criterion`] and are pushed in the same way.

use crate::node::TreeNode;

/// One test over a candidate node.
///
/// Implementations must be pure with respect to dispatch: the dispatcher may
/// evaluate a criterion any number of times against any node.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Criterion` over `{N}`",
    label = "missing `Criterion` implementation",
    note = "Criteria must implement `matches` for the node handle type `{N}`."
)]
pub trait Criterion<N>: 'static {
    /// Whether the candidate satisfies this test.
    fn matches(&self, node: &N) -> bool;

    /// A short description used to identify the registration in logs.
    fn describe(&self) -> String;
}

/// Matches elements by tag name (ASCII case-insensitive).
pub struct TagIs(String);

impl TagIs {
    /// Create a tag-name criterion.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }
}

impl<N: TreeNode> Criterion<N> for TagIs {
    fn matches(&self, node: &N) -> bool {
        node.tag().eq_ignore_ascii_case(&self.0)
    }

    fn describe(&self) -> String {
        format!("tag={}", self.0)
    }
}

/// Matches elements carrying a class.
pub struct HasClass(String);

impl HasClass {
    /// Create a class criterion.
    pub fn new(class: impl Into<String>) -> Self {
        Self(class.into())
    }
}

impl<N: TreeNode> Criterion<N> for HasClass {
    fn matches(&self, node: &N) -> bool {
        node.has_class(&self.0)
    }

    fn describe(&self) -> String {
        format!("class={}", self.0)
    }
}

/// Matches elements by an arbitrary closure.
pub struct Predicate<F> {
    test: F,
    label: &'static str,
}

impl<F> Predicate<F> {
    /// Create a predicate criterion described as `predicate` in logs.
    pub fn new(test: F) -> Self {
        Self {
            test,
            label: "predicate",
        }
    }

    /// Create a predicate criterion with a custom log label.
    pub fn labeled(label: &'static str, test: F) -> Self {
        Self { test, label }
    }
}

impl<N, F> Criterion<N> for Predicate<F>
where
    N: TreeNode,
    F: Fn(&N) -> bool + 'static,
{
    fn matches(&self, node: &N) -> bool {
        (self.test)(node)
    }

    fn describe(&self) -> String {
        self.label.to_owned()
    }
}

/// An AND-conjunction of criteria describing one registration's interest.
///
/// An empty `Criteria` specifies no matchable test and is rejected by the
/// dispatcher with [`RegisterError::InvalidCriteria`].
///
/// # Example
///
/// ```rust,ignore
/// let criteria = Criteria::new()
///     .tag("div")
///     .class("dashlet")
///     .predicate(|node| node.attr("hidden").is_none());
/// ```
///
/// [`RegisterError::InvalidCriteria`]: crate::RegisterError::InvalidCriteria
pub struct Criteria<N> {
    tests: Vec<Box<dyn Criterion<N>>>,
}

impl<N: TreeNode> Criteria<N> {
    /// Create an empty conjunction.
    pub fn new() -> Self {
        Self { tests: Vec::new() }
    }

    /// Require a tag name.
    pub fn tag(self, tag: impl Into<String>) -> Self {
        self.push(TagIs::new(tag))
    }

    /// Require a class.
    pub fn class(self, class: impl Into<String>) -> Self {
        self.push(HasClass::new(class))
    }

    /// Require an arbitrary predicate.
    pub fn predicate<F>(self, test: F) -> Self
    where
        F: Fn(&N) -> bool + 'static,
    {
        self.push(Predicate::new(test))
    }

    /// Require any custom criterion.
    pub fn push(mut self, criterion: impl Criterion<N>) -> Self {
        self.tests.push(Box::new(criterion));
        self
    }

    /// Whether no test has been supplied.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Whether the candidate satisfies every test in the conjunction.
    pub fn matches(&self, node: &N) -> bool {
        self.tests.iter().all(|test| test.matches(node))
    }

    /// Join the member descriptions for log context.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = self.tests.iter().map(|test| test.describe()).collect();
        parts.join(" and ")
    }
}

impl<N: TreeNode> Default for Criteria<N> {
    fn default() -> Self {
        Self::new()
    }
}
