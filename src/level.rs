/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Level: one navigation frame in a Cursor's stack (§4.5): an ordered list
//! of Node atoms, writable-first, plus an "array-element" flag.

use crate::node::{Node, Tag};

/// One atom in a Level: the Node handle plus which Source (by index into
/// the owning Cursor's source list) it belongs to, if any. Tracking the
/// source index alongside the Node lets writes performed several navigation
/// steps deep still mark the right Source dirty, even after intervening
/// atoms were dropped by `child()` because a layer didn't have that key.
#[derive(Clone)]
pub struct Atom {
    pub node: Node,
    pub source: Option<usize>,
}

#[derive(Clone)]
pub struct Level {
    atoms: Vec<Atom>,
    pub array_element: bool,
}

impl Level {
    pub fn new(atoms: Vec<Atom>) -> Level {
        Level {
            atoms,
            array_element: false,
        }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn first(&self) -> Option<&Atom> {
        self.atoms.first()
    }

    /// First atom whose tag is the given one, used to resolve `arraySize()`
    /// against "the first non-empty List atom" (§4.6): a writable layer that
    /// hasn't had anything written through it yet must not shadow a deeper
    /// layer's real elements, so an empty List atom is skipped in favor of
    /// the next one and only returned if every atom with this tag is empty.
    pub fn first_with_tag(&self, tag: Tag) -> Option<&Atom> {
        if tag == Tag::List {
            let mut first_empty = None;
            for atom in &self.atoms {
                if atom.node.tag() != tag {
                    continue;
                }
                if atom.node.array_size() > 0 {
                    return Some(atom);
                }
                if first_empty.is_none() {
                    first_empty = Some(atom);
                }
            }
            return first_empty;
        }
        self.atoms.iter().find(|a| a.node.tag() == tag)
    }

    /// `child(key)` (§4.5): the first atom is navigated with full read/write
    /// semantics (inserting a Null child when writable); every atom after it
    /// is forced into a read-only view regardless of its actual writability,
    /// since only the top layer may ever be written through.
    pub fn child(&self, key: &str) -> Level {
        let mut atoms = Vec::with_capacity(self.atoms.len());
        for (i, atom) in self.atoms.iter().enumerate() {
            if atom.node.tag() != Tag::Map {
                continue;
            }
            let child = if i == 0 {
                atom.node.child(key)
            } else {
                atom.node.get_map(key)
            };
            if let Some(child) = child {
                atoms.push(Atom {
                    node: child,
                    source: atom.source,
                });
            }
        }
        Level::new(atoms)
    }

    /// `child(index)` (§4.5), symmetric over Lists.
    pub fn child_index(&self, index: usize) -> Level {
        let mut atoms = Vec::with_capacity(self.atoms.len());
        for (i, atom) in self.atoms.iter().enumerate() {
            if atom.node.tag() != Tag::List {
                continue;
            }
            let child = if i == 0 {
                atom.node.child_index(index)
            } else {
                atom.node.get_index(index)
            };
            if let Some(child) = child {
                atoms.push(Atom {
                    node: child,
                    source: atom.source,
                });
            }
        }
        Level::new(atoms)
    }

    /// `child([k1, k2, ...])`: iterated `child(key)`.
    pub fn child_path(&self, keys: &[&str]) -> Level {
        let mut level = self.clone();
        for key in keys {
            level = level.child(key);
        }
        level
    }

    /// `convert(targetTag)` (§4.5): writable atoms are coerced in place;
    /// read-only atoms whose tag differs from the target are dropped.
    pub fn convert(&self, target: Tag) -> Level {
        let mut atoms = Vec::with_capacity(self.atoms.len());
        for atom in &self.atoms {
            if atom.node.is_read_only() {
                if atom.node.tag() == target {
                    atoms.push(atom.clone());
                }
            } else {
                atom.node.convert(target);
                atoms.push(atom.clone());
            }
        }
        Level::new(atoms)
    }

    /// `iterateMap(cb)`: for each atom that is a Map, in order, yield every
    /// (key, child) pair. Deduplication across layers is the caller's job
    /// (Cursor's `childGroups`/`childKeys`).
    pub fn iterate_map<F: FnMut(&Atom, &str, &Node)>(&self, mut cb: F) {
        for atom in &self.atoms {
            if atom.node.tag() != Tag::Map {
                continue;
            }
            atom.node.iterate_map(|k, child| cb(atom, k, child));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn atom(node: Node) -> Atom {
        Atom { node, source: None }
    }

    #[test]
    fn child_forces_later_atoms_read_only() {
        let writable = Node::new_map(false);
        writable.child("shared");
        let readonly = Node::from_tree(
            &Value::Map(vec![("shared".into(), Value::int(1)), ("only_here".into(), Value::int(2))]),
            true,
        );
        let level = Level::new(vec![atom(writable.clone()), atom(readonly)]);
        let next = level.child("only_here");
        // writable atom has no "only_here" key and must not gain one via navigation
        // from a later, forced-read-only atom.
        assert_eq!(next.atoms().len(), 1);
        assert!(writable.get_map("only_here").is_none());
    }

    #[test]
    fn first_with_tag_skips_empty_list_atom_in_favor_of_populated_one() {
        let writable_empty = Node::new_list(false);
        let readonly_populated = Node::from_tree(
            &Value::List(vec![Value::int(1), Value::int(2), Value::int(3)]),
            true,
        );
        let level = Level::new(vec![atom(writable_empty), atom(readonly_populated)]);
        let found = level.first_with_tag(Tag::List).expect("a List atom exists");
        assert_eq!(found.node.array_size(), 3);
    }

    #[test]
    fn first_with_tag_falls_back_to_empty_list_atom_when_none_are_populated() {
        let writable_empty = Node::new_list(false);
        let level = Level::new(vec![atom(writable_empty)]);
        let found = level.first_with_tag(Tag::List).expect("a List atom exists");
        assert_eq!(found.node.array_size(), 0);
    }

    #[test]
    fn convert_drops_read_only_atoms_with_mismatched_tag() {
        let scalar_ro = Node::new_scalar(crate::value::Scalar::Int(1), true);
        let null_rw = Node::new_null(false);
        let level = Level::new(vec![atom(null_rw), atom(scalar_ro)]);
        let converted = level.convert(Tag::Map);
        assert_eq!(converted.atoms().len(), 1);
        assert_eq!(converted.atoms()[0].node.tag(), Tag::Map);
    }
}
