//! In-progress and shared tree nodes.
//!
//! Encoding builds [`PartialNode`]s whose containers stay mutable and
//! shareable until the pass finishes, so a nested container or a super
//! encoder can keep writing into a node that already sits inside its parent.
//! Decoding walks [`SharedNode`]s, whose containers are reference counted so
//! nested containers can hold on to a subtree without copying it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::value::Value;

pub(crate) type SharedArray = Rc<RefCell<Vec<PartialNode>>>;
pub(crate) type SharedObject = Rc<RefCell<BTreeMap<String, PartialNode>>>;

/// A node of the tree being encoded.
#[derive(Debug, Clone)]
pub(crate) enum PartialNode {
    Finished(Value),
    Array(SharedArray),
    Object(SharedObject),
}

impl PartialNode {
    pub(crate) fn new_array() -> SharedArray {
        Rc::new(RefCell::new(Vec::new()))
    }

    pub(crate) fn new_object() -> SharedObject {
        Rc::new(RefCell::new(BTreeMap::new()))
    }

    /// The placeholder a value that wrote nothing turns into.
    pub(crate) fn empty_object() -> Self {
        PartialNode::Object(PartialNode::new_object())
    }

    pub(crate) fn is_empty_object(&self) -> bool {
        match self {
            PartialNode::Object(object) => object.borrow().is_empty(),
            _ => false,
        }
    }

    /// Snapshot of the node as a plain value.
    pub(crate) fn finish(&self) -> Value {
        match self {
            PartialNode::Finished(value) => value.clone(),
            PartialNode::Array(items) => {
                Value::Array(items.borrow().iter().map(PartialNode::finish).collect())
            }
            PartialNode::Object(entries) => Value::Object(
                entries
                    .borrow()
                    .iter()
                    .map(|(key, node)| (key.clone(), node.finish()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for PartialNode {
    fn from(value: Value) -> Self {
        PartialNode::Finished(value)
    }
}

/// A node of the tree being decoded.
#[derive(Debug, Clone)]
pub(crate) enum SharedNode {
    Scalar(Value),
    Array(Rc<Vec<SharedNode>>),
    Object(Rc<BTreeMap<String, SharedNode>>),
}

impl SharedNode {
    pub(crate) fn null() -> Self {
        SharedNode::Scalar(Value::Null)
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self, SharedNode::Scalar(Value::Null))
    }

    pub(crate) fn type_description(&self) -> &'static str {
        match self {
            SharedNode::Scalar(value) => value.type_description(),
            SharedNode::Array(_) => "an array",
            SharedNode::Object(_) => "a dictionary",
        }
    }
}

impl From<&Value> for SharedNode {
    fn from(value: &Value) -> Self {
        match value {
            Value::Array(items) => SharedNode::Array(Rc::new(items.iter().map(SharedNode::from).collect())),
            Value::Object(entries) => SharedNode::Object(Rc::new(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), SharedNode::from(value)))
                    .collect(),
            )),
            scalar => SharedNode::Scalar(scalar.clone()),
        }
    }
}
