/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Source: one backing document (§4.2) — path, backend, root Node, dirty
//! bit, last-modified stamp.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use log::{debug, error, warn};

use crate::backend::{Backend, Registry};
use crate::error::{BackendError, SourceError};
use crate::node::{Node, Tag};
use crate::resolver::Resolver;
use crate::source_cache::SourceCache;

pub struct Source {
    path: PathBuf,
    backend: Rc<dyn Backend>,
    pub root: Node,
    dirty: Cell<bool>,
    queued: Cell<bool>,
    last_modified: Cell<Option<SystemTime>>,
}

impl Source {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_read_only(&self) -> bool {
        self.root.is_read_only()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn make_dirty(&self) {
        self.dirty.set(true);
    }

    pub fn is_queued(&self) -> bool {
        self.queued.get()
    }

    pub fn mark_queued(&self) {
        self.queued.set(true);
    }

    pub fn clear_queued(&self) {
        self.queued.set(false);
    }

    /// True iff the file's current modification time still matches the
    /// stamp recorded at load (§4.2 `isValid`).
    pub fn is_valid(&self) -> bool {
        let current = fs::metadata(&self.path).ok().and_then(|m| m.modified().ok());
        current == self.last_modified.get()
    }

    /// Serializes the root Node now, clears dirty, and refreshes the
    /// modification stamp (§4.2 `sync`).
    pub fn sync(&self) -> Result<(), BackendError> {
        self.backend.save(&self.path, &self.root.to_tree())?;
        self.dirty.set(false);
        self.last_modified
            .set(fs::metadata(&self.path).ok().and_then(|m| m.modified().ok()));
        Ok(())
    }

    /// Opening algorithm, §4.2 steps 1-11.
    pub fn open(
        name: &str,
        system_dir: bool,
        create: bool,
        backend: Option<Rc<dyn Backend>>,
        resolver: &dyn Resolver,
        registry: &Registry,
        cache: &SourceCache,
    ) -> Result<Option<Rc<Source>>, SourceError> {
        // 1. empty path substitutes "profile".
        let name = if name.is_empty() { "profile" } else { name };
        let mut candidate = PathBuf::from(name);

        // 2. relative paths resolve against the appropriate root; an
        // absolute path requested as a system-dir source is rejected.
        if candidate.is_absolute() {
            if system_dir {
                return Err(SourceError::AbsoluteSystemPath(candidate));
            }
        } else {
            let root = if system_dir {
                resolver.system_config_dir()
            } else {
                resolver.user_config_dir()
            };
            candidate = root.join(candidate);
        }

        // 3. canonicalize (lexically; the file may not exist yet, so we
        // normalize "." / ".." components rather than calling fs::canonicalize).
        let mut canonical = normalize(&candidate);

        // 4. cache lookup.
        if let Some(existing) = cache.get(&canonical) {
            if existing.is_valid() {
                debug!("source cache hit for '{}'", canonical.display());
                return Ok(Some(existing));
            }
        }

        // 5. backend selection by extension, falling back to the registry's
        // default and appending its tag to the filename.
        let backend = match backend {
            Some(b) => b,
            None => {
                let inferred = canonical
                    .extension()
                    .and_then(|e| e.to_str())
                    .and_then(|e| registry.by_extension(e));
                match inferred {
                    Some(b) => b,
                    None => {
                        let b = registry.default_backend().ok_or(SourceError::BackendMissing)?;
                        let mut os = canonical.into_os_string();
                        os.push(".");
                        os.push(b.name());
                        canonical = PathBuf::from(os);
                        if let Some(existing) = cache.get(&canonical) {
                            if existing.is_valid() {
                                return Ok(Some(existing));
                            }
                        }
                        b
                    }
                }
            }
        };

        // 6. missing file without create => absent.
        let exists = canonical.exists();
        if !exists && !create {
            return Ok(None);
        }

        // 7. ensure containing directory exists.
        if let Some(parent) = canonical.parent() {
            if create && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| BackendError::Io {
                    path: parent.to_owned(),
                    source,
                })?;
            }
        }

        // 8. read-only iff the file exists and isn't writable, or this is a
        // system-directory source.
        let file_writable = fs::metadata(&canonical)
            .map(|m| !m.permissions().readonly())
            .unwrap_or(true);
        let read_only = (exists && !file_writable) || system_dir;

        // 9. record lastModified, load the tree, build the root Node.
        let last_modified = fs::metadata(&canonical).ok().and_then(|m| m.modified().ok());
        let tree = backend.load(&canonical)?;
        let mut root = Node::from_tree(&tree, read_only);

        // 10. a Scalar/Null root is rejected unless create=true, in which
        // case it is replaced with an empty writable Map.
        if matches!(root.tag(), Tag::Scalar | Tag::Null) {
            if !create {
                return Ok(None);
            }
            root = Node::new_map(read_only);
        }

        let source = Rc::new(Source {
            path: canonical.clone(),
            backend,
            root,
            dirty: Cell::new(false),
            queued: Cell::new(false),
            last_modified: Cell::new(last_modified),
        });

        // 11. insert into cache and return.
        cache.insert(canonical, &source);
        Ok(Some(source))
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        if self.dirty.get() {
            warn!("dropping dirty source '{}', flushing synchronously", self.path.display());
            if let Err(e) = self.sync() {
                error!("last-chance flush of '{}' failed: {}", self.path.display(), e);
            }
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}
