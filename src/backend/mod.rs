/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Backend: the pluggable format codec interface (§4.4, §6.2), modeled on
//! the `FileSystemMount` trait's shape of a small set of required methods
//! with no other obligations placed on implementers.

pub mod json;
pub mod toml_backend;
pub mod yaml;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::error::BackendError;
use crate::value::Value;

/// A format codec: lowercase extension tag, `load`, `save`.
pub trait Backend {
    /// Lowercase file-extension tag, e.g. "json", "yaml", "toml".
    fn name(&self) -> &'static str;

    /// Returns `Value::Null` if the file is missing; round-trippable
    /// representations are preferred over lossy ones (§6.2).
    fn load(&self, path: &Path) -> Result<Value, BackendError>;

    /// Backends are encouraged, but not required by the core, to write
    /// atomically (write-temp-then-rename).
    fn save(&self, path: &Path, value: &Value) -> Result<(), BackendError>;
}

/// Process-wide ordered list of registered backends (§4.4, §9 "global
/// state"). Registration order is precedence order: the first entry is the
/// default when extension inference fails.
#[derive(Default)]
pub struct Registry {
    backends: Vec<Rc<dyn Backend>>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// A registry pre-loaded with the three backends this crate ships,
    /// JSON first so it is the default when a filename carries no/unknown
    /// extension.
    pub fn with_defaults() -> Registry {
        let mut registry = Registry::new();
        registry.register(Rc::new(json::JsonBackend::new()));
        registry.register(Rc::new(toml_backend::TomlBackend::new()));
        registry.register(Rc::new(yaml::YamlBackend::new()));
        registry
    }

    pub fn register(&mut self, backend: Rc<dyn Backend>) {
        self.backends.push(backend);
    }

    pub fn by_extension(&self, ext: &str) -> Option<Rc<dyn Backend>> {
        let ext = ext.to_ascii_lowercase();
        self.backends.iter().find(|b| b.name() == ext).cloned()
    }

    /// First-registered backend, used when extension inference fails.
    pub fn default_backend(&self) -> Option<Rc<dyn Backend>> {
        self.backends.first().cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

thread_local! {
    static GLOBAL: RefCell<Registry> = RefCell::new(Registry::with_defaults());
}

/// Runs `f` against the process-wide backend registry.
pub fn with_global<R>(f: impl FnOnce(&Registry) -> R) -> R {
    GLOBAL.with(|cell| f(&cell.borrow()))
}

/// Registers an additional backend on the process-wide registry, ahead of
/// calling `Source::open` so it participates in extension inference.
pub fn register_global(backend: Rc<dyn Backend>) {
    GLOBAL.with(|cell| cell.borrow_mut().register(backend));
}
