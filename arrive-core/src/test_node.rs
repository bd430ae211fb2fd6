//! Minimal in-crate tree fixture for unit tests.
//!
//! The full-featured tree lives in `arrive-std`; this one exists only so the
//! core crate can test its own traits without a dependency cycle.

use crate::TreeNode;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Clone)]
pub(crate) struct TestNode(Rc<Data>);

struct Data {
    tag: Box<str>,
    state: RefCell<State>,
}

#[derive(Default)]
struct State {
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    parent: Weak<Data>,
    children: Vec<TestNode>,
}

impl TestNode {
    pub(crate) fn new(tag: &str) -> Self {
        Self(Rc::new(Data {
            tag: tag.into(),
            state: RefCell::new(State::default()),
        }))
    }

    pub(crate) fn add_child(&self, tag: &str) -> Self {
        let child = Self::new(tag);
        child.0.state.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.state.borrow_mut().children.push(child.clone());
        child
    }

    pub(crate) fn add_class(&self, name: &str) {
        self.0.state.borrow_mut().classes.push(name.to_owned());
    }

    pub(crate) fn set_attr(&self, name: &str, value: &str) {
        self.0
            .state
            .borrow_mut()
            .attrs
            .push((name.to_owned(), value.to_owned()));
    }
}

impl TreeNode for TestNode {
    fn tag(&self) -> &str {
        &self.0.tag
    }

    fn classes(&self) -> Vec<String> {
        self.0.state.borrow().classes.clone()
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.0
            .state
            .borrow()
            .attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    }

    fn parent(&self) -> Option<Self> {
        self.0.state.borrow().parent.upgrade().map(TestNode)
    }

    fn children(&self) -> Vec<Self> {
        self.0.state.borrow().children.clone()
    }

    fn same_node(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
