/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the demo binary's own configuration file, in TOML format
    #[arg(long, default_value_t = String::from("./config.toml"))]
    pub config_path: String,

    /// Store file name, resolved against the user/system config directories
    #[arg(short, long, default_value_t = String::from("store.json"))]
    pub store: String,

    /// Open the store read-only against the system directory only
    #[arg(long, default_value_t = false)]
    pub system: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
#[clap(rename_all = "kebab_case")]
pub enum Command {
    /// Read a value ("a/b/c" style key) and print it
    Get {
        key: String,
    },
    /// Set a string value and request a save
    Set {
        key: String,
        value: String,
        /// Encrypt the value with the demo Crypto before storing it
        #[arg(long, default_value_t = false)]
        secret: bool,
    },
    /// Remove a key
    Remove {
        key: String,
    },
    /// List the child groups and keys under a group ("" for the root)
    List {
        #[arg(default_value_t = String::new())]
        group: String,
    },
    /// Force an immediate save, bypassing the coalescing event loop
    Sync,
}
