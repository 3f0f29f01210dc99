/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A hierarchical configuration store that layers multiple backing
//! documents into a single logical view, navigated through group/array
//! cursors and persisted through a coalescing, event-loop-driven save path.
//!
//! Everything here runs on one cooperative thread (§5 of the design notes):
//! no locks, `Rc`/`RefCell` shared ownership throughout.

pub mod backend;
pub mod crypto;
pub mod cursor;
pub mod error;
pub mod event_loop;
pub mod level;
pub mod node;
pub mod resolver;
pub mod saver;
pub mod source;
pub mod source_cache;
pub mod value;

pub use cursor::{Cursor, Flags};
pub use error::{BackendError, SourceError};
pub use node::{Node, Tag};
pub use saver::Saver;
pub use source::Source;
pub use value::{Scalar, Value};
