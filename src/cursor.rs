/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Cursor: the user-facing navigation and read/write handle (§4.6).
//!
//! A Cursor is a reference-counted handle (`Rc<RefCell<..>>`) rather than a
//! plain owned struct because `group()`/`arrayElement()` need to hand back
//! an independently-usable Cursor that still shares the parent's writable
//! atoms and keeps the parent's Sources alive via a memory-guard back-link.

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::PathBuf;
use std::rc::Rc;

use log::debug;

use crate::backend::Registry;
use crate::crypto::Crypto;
use crate::error::SourceError;
use crate::level::{Atom, Level};
use crate::node::{Node, Tag};
use crate::resolver::Resolver;
use crate::saver::Saver;
use crate::source::Source;
use crate::source_cache::SourceCache;
use crate::value::Value;

/// Recognized value flags (§6.5): `Normal` is the default (identity);
/// `Crypted` routes the value through the configured `Crypto` on read/write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub crypted: bool,
}

impl Flags {
    pub const NORMAL: Flags = Flags { crypted: false };
    pub const CRYPTED: Flags = Flags { crypted: true };
}

/// `parseNames(fullName)` (§4.6): split on `/`, discard empty segments.
fn parse_names(name: &str) -> Vec<&str> {
    name.split('/').filter(|s| !s.is_empty()).collect()
}

/// Opens each path against one root (user or system), appending newly
/// discovered Sources to `sources` and skipping duplicates already recorded
/// in `seen` (by canonical path).
fn collect_sources(
    paths: &[&str],
    system_dir: bool,
    create: bool,
    resolver: &dyn Resolver,
    registry: &Registry,
    cache: &SourceCache,
    sources: &mut Vec<Rc<Source>>,
    seen: &mut HashSet<PathBuf>,
) -> Result<(), SourceError> {
    for &path in paths {
        if let Some(source) = Source::open(path, system_dir, create, None, resolver, registry, cache)? {
            if seen.insert(source.path().to_owned()) {
                sources.push(source);
            }
        }
    }
    Ok(())
}

/// Builds the initial layered atoms for a freshly opened set of Sources, in
/// order (earlier Sources take precedence).
fn atoms_for(sources: &[Rc<Source>]) -> Vec<Atom> {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| Atom {
            node: s.root.clone(),
            source: Some(i),
        })
        .collect()
}

struct CursorInner {
    levels: Vec<Level>,
    sources: Vec<Rc<Source>>,
    /// Keeps the parent Cursor (and thus its Sources) alive for as long as
    /// this Cursor lives; also suppresses this Cursor's implicit sync on drop.
    guard: Option<Cursor>,
    saver: Rc<Saver>,
    crypto: Option<Rc<dyn Crypto>>,
}

pub struct Cursor(Rc<RefCell<CursorInner>>);

impl Cursor {
    /// Opens one or more backing paths: each is tried against the user
    /// directory first, then the system directory, skipping duplicates by
    /// canonical path; the resulting Sources become layered atoms in that
    /// order (user overrides system). Fallback tree values append further
    /// read-only atoms after all file Sources; a fallback whose root
    /// materializes to Scalar or Null is discarded.
    pub fn open(
        paths: &[&str],
        fallbacks: Vec<Value>,
        create: bool,
        resolver: &dyn Resolver,
        registry: &Registry,
        cache: &SourceCache,
        saver: Rc<Saver>,
        crypto: Option<Rc<dyn Crypto>>,
    ) -> Result<Cursor, SourceError> {
        let mut sources: Vec<Rc<Source>> = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        collect_sources(paths, false, create, resolver, registry, cache, &mut sources, &mut seen)?;
        collect_sources(paths, true, create, resolver, registry, cache, &mut sources, &mut seen)?;

        let mut atoms = atoms_for(&sources);

        for fallback in fallbacks {
            if matches!(fallback, Value::Scalar(_) | Value::Null) {
                debug!("discarding fallback whose root is Scalar/Null");
                continue;
            }
            atoms.push(Atom {
                node: Node::from_tree(&fallback, true),
                source: None,
            });
        }

        Ok(Cursor(Rc::new(RefCell::new(CursorInner {
            levels: vec![Level::new(atoms)],
            sources,
            guard: None,
            saver,
            crypto,
        }))))
    }

    /// Opens each path against the system directory only, skipping the user
    /// layer entirely — for callers that want a strictly system-scoped view
    /// (the demo CLI's `--system` flag). Every Source this produces is
    /// already read-only (§4.2 step 8 forces that for `system_dir=true`), so
    /// the returned Cursor never accepts writes.
    pub fn open_system_only(
        paths: &[&str],
        create: bool,
        resolver: &dyn Resolver,
        registry: &Registry,
        cache: &SourceCache,
        saver: Rc<Saver>,
        crypto: Option<Rc<dyn Crypto>>,
    ) -> Result<Cursor, SourceError> {
        let mut sources: Vec<Rc<Source>> = Vec::new();
        let mut seen: HashSet<PathBuf> = HashSet::new();

        collect_sources(paths, true, create, resolver, registry, cache, &mut sources, &mut seen)?;
        let atoms = atoms_for(&sources);

        Ok(Cursor(Rc::new(RefCell::new(CursorInner {
            levels: vec![Level::new(atoms)],
            sources,
            guard: None,
            saver,
            crypto,
        }))))
    }

    /// Constructs a Cursor directly from an in-memory tree value: the
    /// initial Level has one writable atom built from that tree, with no
    /// backing Source (writes never dirty anything, sync is a no-op).
    pub fn from_tree(tree: Value, saver: Rc<Saver>, crypto: Option<Rc<dyn Crypto>>) -> Cursor {
        let node = Node::from_tree(&tree, false);
        let atoms = vec![Atom { node, source: None }];
        Cursor(Rc::new(RefCell::new(CursorInner {
            levels: vec![Level::new(atoms)],
            sources: Vec::new(),
            guard: None,
            saver,
            crypto,
        })))
    }

    fn handle(&self) -> Cursor {
        Cursor(self.0.clone())
    }

    fn snapshot(&self) -> CursorInner {
        let inner = self.0.borrow();
        CursorInner {
            levels: inner.levels.clone(),
            sources: inner.sources.clone(),
            guard: None,
            saver: inner.saver.clone(),
            crypto: inner.crypto.clone(),
        }
    }

    /// `group(name)` (§4.6): derives an independently-usable Cursor over
    /// `name`, sharing the parent's writable atoms and guarding the parent's
    /// lifetime so mutations through the returned Cursor keep writing through
    /// after the caller that produced it would otherwise have dropped.
    pub fn group(&self, name: &str) -> Cursor {
        let segments = parse_names(name);
        let mut snapshot = self.snapshot();
        let mut level = snapshot.levels.last().unwrap().child_path(&segments);
        level = level.convert(Tag::Map);
        snapshot.levels.push(level);
        snapshot.guard = Some(self.handle());
        Cursor(Rc::new(RefCell::new(snapshot)))
    }

    /// `beginGroup(name)`: in-place push of a Map-typed Level.
    pub fn begin_group(&self, name: &str) {
        let segments = parse_names(name);
        let mut inner = self.0.borrow_mut();
        let mut level = inner.levels.last().unwrap().child_path(&segments);
        level = level.convert(Tag::Map);
        inner.levels.push(level);
    }

    /// `endGroup()`: refuses to pop the root frame.
    pub fn end_group(&self) {
        let mut inner = self.0.borrow_mut();
        assert!(inner.levels.len() > 1, "endGroup: cannot pop the root frame");
        inner.levels.pop();
    }

    /// `beginArray(name)`: pushes a List-typed Level, returns current length.
    pub fn begin_array(&self, name: &str) -> usize {
        let segments = parse_names(name);
        let mut inner = self.0.borrow_mut();
        let mut level = inner.levels.last().unwrap().child_path(&segments);
        level = level.convert(Tag::List);
        let size = level.first_with_tag(Tag::List).map(|a| a.node.array_size()).unwrap_or(0);
        inner.levels.push(level);
        size
    }

    /// `endArray()`: pops the array-element frame first, if present, then
    /// the list frame itself. Both pops are asserted (§9's reified rule).
    pub fn end_array(&self) {
        let mut inner = self.0.borrow_mut();
        if inner.levels.last().expect("endArray: empty stack").array_element {
            inner.levels.pop();
        }
        assert!(inner.levels.len() > 1, "endArray: no list frame to pop");
        inner.levels.pop();
    }

    /// `setArrayIndex(i)`: pops an active array-element frame first, then
    /// pushes a Map-typed Level at index `i` of the current (List) frame.
    pub fn set_array_index(&self, index: usize) {
        let mut inner = self.0.borrow_mut();
        if inner.levels.last().expect("setArrayIndex: empty stack").array_element {
            inner.levels.pop();
        }
        let current = inner.levels.last().expect("setArrayIndex: empty stack");
        let first_is_list = current.first().map(|a| a.node.tag() == Tag::List).unwrap_or(false);
        assert!(first_is_list, "setArrayIndex: current frame's first atom must be a List");
        let mut level = current.child_index(index).convert(Tag::Map);
        level.array_element = true;
        inner.levels.push(level);
    }

    /// `arrayElement(i)`: derives an independently-usable Cursor positioned
    /// at index `i` of the current array, guarding this Cursor's lifetime.
    pub fn array_element(&self, index: usize) -> Cursor {
        let snapshot = self.snapshot();
        let cursor = Cursor(Rc::new(RefCell::new(snapshot)));
        cursor.set_array_index(index);
        cursor.0.borrow_mut().guard = Some(self.handle());
        cursor
    }

    /// `arraySize()`: size of the first List atom of the appropriate frame
    /// (the parent of the array element, if currently positioned in one).
    pub fn array_size(&self) -> usize {
        let inner = self.0.borrow();
        let current = inner.levels.last().unwrap();
        let target = if current.array_element {
            &inner.levels[inner.levels.len() - 2]
        } else {
            current
        };
        target.first_with_tag(Tag::List).map(|a| a.node.array_size()).unwrap_or(0)
    }

    /// `value(key, default, flags)`. Keys with an embedded `/` are split on
    /// the last `/`: the prefix becomes a temporary `beginGroup`, popped
    /// again before this call returns (§4.6).
    pub fn value(&self, key: &str, default: Value, flags: Flags) -> Value {
        match key.rfind('/') {
            Some(pos) => {
                let (prefix, leaf) = (&key[..pos], &key[pos + 1..]);
                self.begin_group(prefix);
                let result = self.value_leaf(leaf, default, flags);
                self.end_group();
                result
            }
            None => self.value_leaf(key, default, flags),
        }
    }

    fn value_leaf(&self, key: &str, default: Value, flags: Flags) -> Value {
        let inner = self.0.borrow();
        let level = inner.levels.last().unwrap();
        for atom in level.atoms() {
            if atom.node.tag() != Tag::Map {
                continue;
            }
            if let Some(child) = atom.node.get_map(key) {
                if child.tag() != Tag::Null {
                    let mut tree = child.to_tree();
                    if flags.crypted {
                        if let Some(crypto) = &inner.crypto {
                            tree = crypto.decrypt(tree);
                        }
                    }
                    return tree;
                }
            }
        }
        default
    }

    /// `rootValue(default, flags)`: the first atom's materialized tree
    /// value, or `default` if the current Level has no atoms.
    pub fn root_value(&self, default: Value, flags: Flags) -> Value {
        let inner = self.0.borrow();
        let level = inner.levels.last().unwrap();
        match level.first() {
            Some(atom) => {
                let mut tree = atom.node.to_tree();
                if flags.crypted {
                    if let Some(crypto) = &inner.crypto {
                        tree = crypto.decrypt(tree);
                    }
                }
                tree
            }
            None => default,
        }
    }

    /// `setValue(key, v, flags)`.
    pub fn set_value(&self, key: &str, value: Value, flags: Flags) {
        match key.rfind('/') {
            Some(pos) => {
                let (prefix, leaf) = (&key[..pos], &key[pos + 1..]);
                self.begin_group(prefix);
                self.set_value_leaf(leaf, value, flags);
                self.end_group();
            }
            None => self.set_value_leaf(key, value, flags),
        }
    }

    fn set_value_leaf(&self, key: &str, value: Value, flags: Flags) {
        let inner = self.0.borrow();
        let level = inner.levels.last().unwrap();
        let atom = level.first().expect("setValue: current level has no atom");
        assert!(
            atom.node.tag() == Tag::Map && !atom.node.is_read_only(),
            "setValue: first atom of the current level must be a writable Map"
        );
        let value = if flags.crypted {
            match &inner.crypto {
                Some(crypto) => crypto.encrypt(value),
                None => value,
            }
        } else {
            value
        };
        let new_node = Node::from_tree(&value, false);
        let changed = atom.node.replace_child(key, new_node);
        if changed {
            if let Some(source_index) = atom.source {
                inner.sources[source_index].make_dirty();
            }
        }
    }

    /// `remove(key)` (Map). Acts on the current frame as-is: if positioned
    /// via `arrayElement`/`setArrayIndex`, that is the per-element Map frame
    /// itself, not the enclosing list, so no array-element frame is popped
    /// here (unlike `remove(index)`, which removes from the enclosing list).
    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.0.borrow_mut();
        let level = inner.levels.last().unwrap();
        let atom = level.first().expect("remove: current level has no atom");
        let removed = atom.node.remove_key(key);
        if removed {
            if let Some(source_index) = atom.source {
                inner.sources[source_index].make_dirty();
            }
        }
        removed
    }

    /// `remove(index)` (List). Pops an active array-element frame first.
    pub fn remove_index(&self, index: usize) -> bool {
        let mut inner = self.0.borrow_mut();
        if inner.levels.last().unwrap().array_element {
            inner.levels.pop();
        }
        let level = inner.levels.last().unwrap();
        let atom = level.first().expect("remove: current level has no atom");
        let removed = atom.node.remove_index(index);
        if removed {
            if let Some(source_index) = atom.source {
                inner.sources[source_index].make_dirty();
            }
        }
        removed
    }

    fn classify_children(&self) -> (Vec<String>, Vec<String>) {
        let inner = self.0.borrow();
        let level = inner.levels.last().unwrap();
        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        let mut keys = Vec::new();
        level.iterate_map(|_, k, child| {
            if seen.insert(k.to_owned()) {
                if child.tag() == Tag::Map {
                    groups.push(k.to_owned());
                } else {
                    keys.push(k.to_owned());
                }
            }
        });
        (groups, keys)
    }

    /// Keys whose first-seen value (across layered atoms) is a Map.
    pub fn child_groups(&self) -> Vec<String> {
        self.classify_children().0
    }

    /// Keys whose first-seen value (across layered atoms) is not a Map.
    pub fn child_keys(&self) -> Vec<String> {
        self.classify_children().1
    }

    pub fn has_child_group(&self, name: &str) -> bool {
        self.child_groups().iter().any(|g| g == name)
    }

    pub fn has_child_key(&self, name: &str) -> bool {
        self.child_keys().iter().any(|k| k == name)
    }

    /// For each dirty, not-yet-queued Source reachable from this Cursor,
    /// posts a save event and marks it queued (§4.6 drop / §4.7).
    pub fn sync(&self) {
        let inner = self.0.borrow();
        for source in &inner.sources {
            inner.saver.request_save(source.clone());
        }
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if Rc::strong_count(&self.0) == 1 {
            let has_guard = self.0.borrow().guard.is_some();
            if !has_guard {
                self.sync();
            }
        }
    }
}
