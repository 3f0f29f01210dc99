/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Saver: the coalescing deferred-save protocol (§4.7). A process-wide
//! singleton living on the event loop; the "queued" bit on each Source is
//! the dedup token that keeps two mutations from posting two save events.

use std::rc::Rc;

use log::{info, warn};

use crate::event_loop::{EventLoop, Priority};
use crate::source::Source;

pub struct Saver {
    event_loop: Rc<dyn EventLoop>,
}

impl Saver {
    pub fn new(event_loop: Rc<dyn EventLoop>) -> Saver {
        Saver { event_loop }
    }

    /// Posts a save event for `source` iff it is dirty and not already
    /// queued; the queued bit is cleared once the event actually runs, even
    /// if the save itself failed (background failures log and rely on the
    /// next mutation to re-queue, per §7's BackendFailure policy).
    pub fn request_save(&self, source: Rc<Source>) {
        if !source.is_dirty() || source.is_queued() {
            return;
        }
        source.mark_queued();
        let path = source.path().to_owned();
        self.event_loop.post(
            Priority::BelowNormal,
            Box::new(move || {
                let result = source.sync();
                source.clear_queued();
                match result {
                    Ok(()) => info!("saved '{}'", path.display()),
                    Err(e) => warn!("background save of '{}' failed: {}", path.display(), e),
                }
            }),
        );
    }

    /// Forces dispatch of every pending save event. Call at process
    /// shutdown so no dirty Source is lost (§4.7, §8 property 8).
    pub fn shutdown_drain(&self) {
        self.event_loop.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Registry;
    use crate::resolver::FixedResolver;
    use crate::source_cache::SourceCache;
    use crate::event_loop::QueueEventLoop;
    use std::path::PathBuf;

    fn tmp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("layeredconf-test-saver-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn second_request_while_queued_is_a_no_op() {
        let dir = tmp_dir("coalesce");
        let resolver = FixedResolver {
            user_dir: dir.clone(),
            system_dir: dir.join("sys"),
        };
        let registry = Registry::with_defaults();
        let cache = SourceCache::new();
        let source = Source::open("t.json", false, true, None, &resolver, &registry, &cache)
            .unwrap()
            .unwrap();
        source.root.child("k");
        source.make_dirty();

        let event_loop = Rc::new(QueueEventLoop::new());
        let saver = Saver::new(event_loop.clone());
        saver.request_save(source.clone());
        saver.request_save(source.clone());
        assert_eq!(event_loop.len(), 1, "two requests on one dirty source coalesce into one event");

        event_loop.drain();
        assert!(!source.is_dirty());
        assert!(!source.is_queued());
    }
}
