/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use serde::{Deserialize, Serialize};

/// Configuration for the demo binary itself, not the store it drives. Loaded
/// via `toml::from_str` the same way the teacher's own `run()` loads its
/// fuzzing configuration.
#[derive(Serialize, Deserialize, Clone)]
pub struct DemoConfig {
    /// Overrides the log4rs root level when set (e.g. "debug", "warn").
    pub log_level: Option<String>,
    /// Backend extension used when a store path carries no/unknown extension.
    #[serde(default = "default_backend")]
    pub default_backend: String,
    /// Symmetric key for the reference `Base64XorCrypto`, used by the `secret`
    /// subcommand. Not a production secret store; demo convenience only.
    #[serde(default = "default_crypto_key")]
    pub crypto_key: String,
}

fn default_backend() -> String {
    "json".to_owned()
}

fn default_crypto_key() -> String {
    "layeredconf-demo".to_owned()
}

impl Default for DemoConfig {
    fn default() -> Self {
        DemoConfig {
            log_level: None,
            default_backend: default_backend(),
            crypto_key: default_crypto_key(),
        }
    }
}
