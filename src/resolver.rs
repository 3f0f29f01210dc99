/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Resolver: external path-resolution collaborator (§6.1). The core only
//! consumes this trait; shape modeled on `command::CommandInterface`'s
//! trait-plus-local-implementation split.

use std::env;
use std::path::PathBuf;

/// Maps the two config roots the core cares about: a writable "user"
/// directory and a typically-read-only "system" directory.
pub trait Resolver {
    fn user_config_dir(&self) -> PathBuf;
    fn system_config_dir(&self) -> PathBuf;
}

/// Reference `Resolver` reading the conventional XDG locations, overridable
/// via environment variables for tests (`LAYEREDCONF_SYSTEM_DIR`).
pub struct EnvResolver;

impl EnvResolver {
    pub fn new() -> EnvResolver {
        EnvResolver
    }
}

impl Default for EnvResolver {
    fn default() -> Self {
        EnvResolver::new()
    }
}

impl Resolver for EnvResolver {
    fn user_config_dir(&self) -> PathBuf {
        if let Ok(dir) = env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(dir);
        }
        let home = env::var("HOME").unwrap_or_else(|_| ".".to_owned());
        PathBuf::from(home).join(".config")
    }

    fn system_config_dir(&self) -> PathBuf {
        if let Ok(dir) = env::var("LAYEREDCONF_SYSTEM_DIR") {
            return PathBuf::from(dir);
        }
        PathBuf::from("/etc/xdg")
    }
}

/// Fixed-directory `Resolver`, useful for tests that want both roots under
/// one temporary directory instead of touching the real environment.
pub struct FixedResolver {
    pub user_dir: PathBuf,
    pub system_dir: PathBuf,
}

impl Resolver for FixedResolver {
    fn user_config_dir(&self) -> PathBuf {
        self.user_dir.clone()
    }

    fn system_config_dir(&self) -> PathBuf {
        self.system_dir.clone()
    }
}
