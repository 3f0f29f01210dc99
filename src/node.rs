/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Node: the tagged configuration value (§3, §4.1).
//!
//! Shared ownership is `Rc<RefCell<..>>` rather than `Arc<Mutex<..>>` because
//! the whole store runs on one cooperative event-loop thread (§5); there is
//! no concurrent access to race against. The read-only flag is fixed when a
//! Node is constructed (`from_tree`) and never changes afterward, so children
//! handed out by navigation never need to "become" read-only after the fact.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::{Scalar, Value};

/// Which variant a Node currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Map,
    List,
    Scalar,
    Null,
}

/// Insertion-ordered `String -> Node` map. No ordered-map crate is pulled in
/// for this; a parallel index mirrors the teacher's own hand-rolled
/// index-into-vector arenas rather than reaching for an external dependency.
#[derive(Debug, Default)]
pub struct OrderedMap {
    entries: Vec<(String, Node)>,
    index: std::collections::HashMap<String, usize>,
}

impl OrderedMap {
    fn new() -> Self {
        OrderedMap {
            entries: Vec::new(),
            index: std::collections::HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    fn insert(&mut self, key: String, node: Node) {
        if let Some(&i) = self.index.get(&key) {
            self.entries[i].1 = node;
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, node));
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        if let Some(i) = self.index.remove(key) {
            self.entries.remove(i);
            for (_, idx) in self.index.iter_mut() {
                if *idx > i {
                    *idx -= 1;
                }
            }
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug)]
enum NodeData {
    Map(OrderedMap),
    List(Vec<Node>),
    Scalar(Scalar),
    Null,
}

#[derive(Debug)]
struct NodeInner {
    data: NodeData,
    read_only: bool,
}

/// A reference-counted handle to one configuration value. Cloning a `Node`
/// clones the handle, not the subtree (§3 "shared ownership").
#[derive(Debug, Clone)]
pub struct Node(Rc<RefCell<NodeInner>>);

impl Node {
    fn new(data: NodeData, read_only: bool) -> Node {
        Node(Rc::new(RefCell::new(NodeInner { data, read_only })))
    }

    pub fn new_null(read_only: bool) -> Node {
        Node::new(NodeData::Null, read_only)
    }

    pub fn new_map(read_only: bool) -> Node {
        Node::new(NodeData::Map(OrderedMap::new()), read_only)
    }

    pub fn new_list(read_only: bool) -> Node {
        Node::new(NodeData::List(Vec::new()), read_only)
    }

    pub fn new_scalar(scalar: Scalar, read_only: bool) -> Node {
        Node::new(NodeData::Scalar(scalar), read_only)
    }

    pub fn tag(&self) -> Tag {
        match self.0.borrow().data {
            NodeData::Map(_) => Tag::Map,
            NodeData::List(_) => Tag::List,
            NodeData::Scalar(_) => Tag::Scalar,
            NodeData::Null => Tag::Null,
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.0.borrow().read_only
    }

    pub fn as_scalar(&self) -> Option<Scalar> {
        match &self.0.borrow().data {
            NodeData::Scalar(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn array_size(&self) -> usize {
        match &self.0.borrow().data {
            NodeData::List(items) => items.len(),
            other => panic!("arraySize: node is not a List (tag={:?})", tag_of(other)),
        }
    }

    /// Pure lookup on a Map child: never mutates, works regardless of the
    /// node's own writability. Used when a Level forces an atom read-only
    /// after the first layer (§4.5).
    pub fn get_map(&self, key: &str) -> Option<Node> {
        match &self.0.borrow().data {
            NodeData::Map(m) => m.get(key).cloned(),
            NodeData::Null => None,
            other => panic!("get_map: node is not a Map (tag={:?})", tag_of(other)),
        }
    }

    /// Pure lookup on a List child (by index): never mutates.
    pub fn get_index(&self, index: usize) -> Option<Node> {
        match &self.0.borrow().data {
            NodeData::List(items) => items.get(index).cloned(),
            NodeData::Null => None,
            other => panic!("get_index: node is not a List (tag={:?})", tag_of(other)),
        }
    }

    /// `child(key)` (§4.1): on a writable Map, inserts a fresh Null child if
    /// absent and always returns it; on a read-only Map, returns an absent
    /// handle (`None`) if missing.
    pub fn child(&self, key: &str) -> Option<Node> {
        let read_only = self.is_read_only();
        if read_only {
            return self.get_map(key);
        }
        let mut inner = self.0.borrow_mut();
        match &mut inner.data {
            NodeData::Map(m) => {
                if let Some(existing) = m.get(key) {
                    return Some(existing.clone());
                }
                let child = Node::new_null(false);
                m.insert(key.to_owned(), child.clone());
                Some(child)
            }
            other => panic!("child: node is not a Map (tag={:?})", tag_of(other)),
        }
    }

    /// `child(index)` (§4.1): on a writable List, grows the list with Null
    /// nodes up to `index` inclusive; on a read-only List, returns absent
    /// when out of range.
    pub fn child_index(&self, index: usize) -> Option<Node> {
        let read_only = self.is_read_only();
        if read_only {
            return self.get_index(index);
        }
        let mut inner = self.0.borrow_mut();
        match &mut inner.data {
            NodeData::List(items) => {
                while items.len() <= index {
                    items.push(Node::new_null(false));
                }
                Some(items[index].clone())
            }
            other => panic!("child_index: node is not a List (tag={:?})", tag_of(other)),
        }
    }

    /// Map-only. Removes a key, returning whether it was present.
    pub fn remove_key(&self, key: &str) -> bool {
        assert!(!self.is_read_only(), "remove: node is read-only");
        let mut inner = self.0.borrow_mut();
        match &mut inner.data {
            NodeData::Map(m) => m.remove(key),
            other => panic!("remove: node is not a Map (tag={:?})", tag_of(other)),
        }
    }

    /// List-only. Removes an element by index, returning whether it was in
    /// range (the spec's `OutOfRange` is a boolean result here, not an error).
    pub fn remove_index(&self, index: usize) -> bool {
        assert!(!self.is_read_only(), "remove: node is read-only");
        let mut inner = self.0.borrow_mut();
        match &mut inner.data {
            NodeData::List(items) => {
                if index < items.len() {
                    items.remove(index);
                    true
                } else {
                    false
                }
            }
            other => panic!("remove: node is not a List (tag={:?})", tag_of(other)),
        }
    }

    /// Map-only. Replaces (or inserts) `key`'s child, comparing materialized
    /// tree values first; returns whether a real change happened. This is
    /// the basis for the "dirty only on real change" guarantee (invariant 2).
    pub fn replace_child(&self, key: &str, new_node: Node) -> bool {
        assert!(!self.is_read_only(), "replaceChild: node is read-only");
        let existing_tree = self.get_map(key).map(|n| n.to_tree());
        let new_tree = new_node.to_tree();
        if existing_tree.as_ref() == Some(&new_tree) {
            return false;
        }
        let mut inner = self.0.borrow_mut();
        match &mut inner.data {
            NodeData::Map(m) => m.insert(key.to_owned(), new_node),
            other => panic!("replaceChild: node is not a Map (tag={:?})", tag_of(other)),
        }
        true
    }

    pub fn iterate_map<F: FnMut(&str, &Node)>(&self, mut cb: F) {
        match &self.0.borrow().data {
            NodeData::Map(m) => {
                for (k, v) in m.iter() {
                    cb(k, v);
                }
            }
            NodeData::Null => {}
            other => panic!("iterateMap: node is not a Map (tag={:?})", tag_of(other)),
        }
    }

    pub fn map_len(&self) -> usize {
        match &self.0.borrow().data {
            NodeData::Map(m) => m.len(),
            NodeData::Null => 0,
            other => panic!("map_len: node is not a Map (tag={:?})", tag_of(other)),
        }
    }

    /// Coerces the node's tag, discarding any prior payload. `Null -> X` is
    /// always allowed when writable; any other transition discards data
    /// (§4.1). Forbidden on a read-only node whose tag differs from target
    /// (programming error, per §7's TypeMismatch: fail fast).
    pub fn convert(&self, target: Tag) {
        let mut inner = self.0.borrow_mut();
        let current = match inner.data {
            NodeData::Map(_) => Tag::Map,
            NodeData::List(_) => Tag::List,
            NodeData::Scalar(_) => Tag::Scalar,
            NodeData::Null => Tag::Null,
        };
        if current == target {
            return;
        }
        assert!(
            !inner.read_only,
            "convert: cannot change tag of a read-only node ({:?} -> {:?})",
            current, target
        );
        inner.data = match target {
            Tag::Map => NodeData::Map(OrderedMap::new()),
            Tag::List => NodeData::List(Vec::new()),
            Tag::Null => NodeData::Null,
            Tag::Scalar => NodeData::Scalar(Scalar::Bool(false)),
        };
    }

    /// Materializes this subtree into a plain tree `Value`.
    pub fn to_tree(&self) -> Value {
        match &self.0.borrow().data {
            NodeData::Map(m) => {
                Value::Map(m.iter().map(|(k, v)| (k.to_owned(), v.to_tree())).collect())
            }
            NodeData::List(items) => Value::List(items.iter().map(Node::to_tree).collect()),
            NodeData::Scalar(s) => Value::Scalar(s.clone()),
            NodeData::Null => Value::Null,
        }
    }

    /// Builds a Node subtree from a plain tree `Value`, tagging every
    /// descendant with `read_only` (propagation described in §3).
    pub fn from_tree(tree: &Value, read_only: bool) -> Node {
        match tree {
            Value::Map(entries) => {
                let mut m = OrderedMap::new();
                for (k, v) in entries {
                    m.insert(k.clone(), Node::from_tree(v, read_only));
                }
                Node::new(NodeData::Map(m), read_only)
            }
            Value::List(items) => {
                let items = items.iter().map(|v| Node::from_tree(v, read_only)).collect();
                Node::new(NodeData::List(items), read_only)
            }
            Value::Scalar(s) => Node::new(NodeData::Scalar(s.clone()), read_only),
            Value::Null => Node::new(NodeData::Null, read_only),
        }
    }
}

fn tag_of(data: &NodeData) -> Tag {
    match data {
        NodeData::Map(_) => Tag::Map,
        NodeData::List(_) => Tag::List,
        NodeData::Scalar(_) => Tag::Scalar,
        NodeData::Null => Tag::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writable_map_inserts_null_on_missing_child() {
        let root = Node::new_map(false);
        let child = root.child("a").unwrap();
        assert_eq!(child.tag(), Tag::Null);
        assert_eq!(root.map_len(), 1);
    }

    #[test]
    fn read_only_map_returns_absent_on_missing_child() {
        let root = Node::from_tree(&Value::empty_map(), true);
        assert!(root.child("missing").is_none());
    }

    #[test]
    fn replace_child_reports_unchanged_for_equal_value() {
        let root = Node::new_map(false);
        assert!(root.replace_child("k", Node::new_scalar(Scalar::Int(1), false)));
        assert!(!root.replace_child("k", Node::new_scalar(Scalar::Int(1), false)));
        assert!(root.replace_child("k", Node::new_scalar(Scalar::Int(2), false)));
    }

    #[test]
    fn convert_null_to_map_always_allowed_when_writable() {
        let n = Node::new_null(false);
        n.convert(Tag::Map);
        assert_eq!(n.tag(), Tag::Map);
    }

    #[test]
    #[should_panic(expected = "convert: cannot change tag")]
    fn convert_forbidden_on_read_only_tag_mismatch() {
        let n = Node::new_null(true);
        n.convert(Tag::Map);
    }

    #[test]
    fn to_tree_from_tree_round_trips() {
        let tree = Value::Map(vec![
            ("a".into(), Value::int(1)),
            ("b".into(), Value::List(vec![Value::str("x"), Value::Null])),
        ]);
        let node = Node::from_tree(&tree, false);
        assert_eq!(node.to_tree(), tree);
    }

    #[test]
    fn shared_node_mutation_visible_through_clone() {
        let root = Node::new_map(false);
        let clone = root.clone();
        root.replace_child("k", Node::new_scalar(Scalar::Bool(true), false));
        assert_eq!(clone.map_len(), 1);
    }
}
