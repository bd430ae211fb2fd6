//! Handle abstraction over the observed element tree.
//!
//! The host environment owns the tree; Arrive only sees it through handles.
//! A handle must be cheap to clone (typically an `Rc` around shared node
//! data) because the dispatcher clones handles freely while flattening
//! batches and walking ancestor chains.

/// A cheap, clonable handle to one element in the observed tree.
///
/// Equality of handles is *identity*, not structural equality: two handles
/// are the [`same_node`] when they point at the same element, regardless of
/// attributes or position.
///
/// [`same_node`]: TreeNode::same_node
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `TreeNode`",
    label = "missing `TreeNode` implementation",
    note = "Implement `TreeNode` for the handle type of the tree you want to observe."
)]
pub trait TreeNode: Clone + 'static {
    /// The element's tag name.
    fn tag(&self) -> &str;

    /// The element's class list, in insertion order.
    fn classes(&self) -> Vec<String>;

    /// Look up an attribute value by name.
    fn attr(&self, name: &str) -> Option<String>;

    /// The element's parent, or `None` for a root or detached element.
    fn parent(&self) -> Option<Self>;

    /// The element's children, in document order.
    fn children(&self) -> Vec<Self>;

    /// Whether two handles point at the same element.
    fn same_node(&self, other: &Self) -> bool;

    /// Whether the element carries the given class.
    fn has_class(&self, name: &str) -> bool {
        self.classes().iter().any(|c| c == name)
    }

    /// Whether this element is `ancestor` itself or lies somewhere under it.
    fn is_under(&self, ancestor: &Self) -> bool {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.same_node(ancestor) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// A short human-readable description (`tag#id.class…`), used in logs.
    fn describe(&self) -> String {
        let mut out = String::from(self.tag());
        if let Some(id) = self.attr("id") {
            out.push('#');
            out.push_str(&id);
        }
        for class in self.classes() {
            out.push('.');
            out.push_str(&class);
        }
        out
    }
}

/// Flatten a subtree into pre-order (document order), root included.
///
/// Both the initial scan performed at registration time and the candidate
/// expansion of a mutation batch go through this, so pre-existing and
/// freshly-inserted matches are reported in the same order.
pub fn descendants_inclusive<N: TreeNode>(root: &N) -> Vec<N> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(node) = stack.pop() {
        let mut children = node.children();
        children.reverse();
        stack.extend(children);
        out.push(node);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::descendants_inclusive;
    use crate::TreeNode;
    use crate::test_node::TestNode;

    #[test]
    fn descendants_are_in_document_order() {
        let root = TestNode::new("div");
        let first = root.add_child("ul");
        let first_a = first.add_child("li");
        let first_b = first.add_child("li");
        let second = root.add_child("span");

        let flat = descendants_inclusive(&root);
        let tags: Vec<&str> = flat.iter().map(|n| n.tag()).collect();
        assert_eq!(tags, ["div", "ul", "li", "li", "span"]);
        assert!(flat[2].same_node(&first_a));
        assert!(flat[3].same_node(&first_b));
        assert!(flat[4].same_node(&second));
    }

    #[test]
    fn is_under_walks_ancestors() {
        let root = TestNode::new("div");
        let list = root.add_child("ul");
        let item = list.add_child("li");
        let stranger = TestNode::new("p");

        assert!(item.is_under(&list));
        assert!(item.is_under(&root));
        assert!(item.is_under(&item));
        assert!(!item.is_under(&stranger));
        assert!(!root.is_under(&item));
    }

    #[test]
    fn describe_includes_id_and_classes() {
        let node = TestNode::new("div");
        node.set_attr("id", "menu");
        node.add_class("open");
        node.add_class("dark");
        assert_eq!(node.describe(), "div#menu.open.dark");
    }
}
