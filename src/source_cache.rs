/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! SourceCache: process-wide weak cache of open Sources keyed by canonical
//! path, with per-entry idle expiry (§4.3). Single-threaded, like
//! everything else here (§5) — a plain `RefCell` suffices.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use crate::source::Source;

/// Minimum idle window before an entry may be evicted (§4.3: "≥ 5 minutes").
pub const DEFAULT_IDLE_WINDOW: Duration = Duration::from_secs(5 * 60);

struct Entry {
    source: Weak<Source>,
    expires_at: Instant,
}

pub struct SourceCache {
    entries: RefCell<HashMap<PathBuf, Entry>>,
    idle_window: Duration,
}

impl SourceCache {
    pub fn new() -> SourceCache {
        SourceCache::with_idle_window(DEFAULT_IDLE_WINDOW)
    }

    pub fn with_idle_window(idle_window: Duration) -> SourceCache {
        SourceCache {
            entries: RefCell::new(HashMap::new()),
            idle_window,
        }
    }

    /// Looks up `path`, resetting its idle timer on a hit. Entries whose
    /// `Weak` no longer upgrades (the Source was dropped by its last owning
    /// Cursor) are pruned lazily here rather than on a separate sweep.
    pub fn get(&self, path: &Path) -> Option<Rc<Source>> {
        self.evict_expired();
        let mut entries = self.entries.borrow_mut();
        match entries.get_mut(path) {
            Some(entry) => match entry.source.upgrade() {
                Some(source) => {
                    entry.expires_at = Instant::now() + self.idle_window;
                    Some(source)
                }
                None => {
                    entries.remove(path);
                    None
                }
            },
            None => None,
        }
    }

    pub fn insert(&self, path: PathBuf, source: &Rc<Source>) {
        self.entries.borrow_mut().insert(
            path,
            Entry {
                source: Rc::downgrade(source),
                expires_at: Instant::now() + self.idle_window,
            },
        );
    }

    fn evict_expired(&self) {
        let now = Instant::now();
        self.entries
            .borrow_mut()
            .retain(|_, entry| entry.expires_at > now && entry.source.strong_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

impl Default for SourceCache {
    fn default() -> Self {
        SourceCache::new()
    }
}

thread_local! {
    static GLOBAL: SourceCache = SourceCache::new();
}

/// Runs `f` against the process-wide source cache (§9 "global state").
pub fn with_global<R>(f: impl FnOnce(&SourceCache) -> R) -> R {
    GLOBAL.with(f)
}
