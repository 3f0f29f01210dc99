/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Crypto: external encrypt/decrypt collaborator for *Crypted*-flagged
//! values (§6.3). The core only consumes this trait.

use base64::Engine;

use crate::value::{Scalar, Value};

pub trait Crypto {
    fn encrypt(&self, value: Value) -> Value;
    fn decrypt(&self, value: Value) -> Value;
}

/// Reference `Crypto` implementation: XOR against a repeating keystream,
/// then base64. This is **not** cryptographically secure — it exists so
/// tests and the demo CLI can exercise the *Crypted* flag end-to-end
/// without this crate depending on a real cipher. A production deployment
/// supplies its own `Crypto` backed by an actual symmetric cipher.
///
/// Only `Scalar::Str` is transformed; other scalar kinds and non-scalar
/// values pass through unchanged.
pub struct Base64XorCrypto {
    key: Vec<u8>,
}

impl Base64XorCrypto {
    pub fn new(key: impl Into<Vec<u8>>) -> Base64XorCrypto {
        let key = key.into();
        assert!(!key.is_empty(), "Base64XorCrypto: key must not be empty");
        Base64XorCrypto { key }
    }

    fn xor(&self, bytes: &[u8]) -> Vec<u8> {
        bytes
            .iter()
            .enumerate()
            .map(|(i, b)| b ^ self.key[i % self.key.len()])
            .collect()
    }
}

impl Crypto for Base64XorCrypto {
    fn encrypt(&self, value: Value) -> Value {
        match value {
            Value::Scalar(Scalar::Str(s)) => {
                let xored = self.xor(s.as_bytes());
                Value::Scalar(Scalar::Str(base64::engine::general_purpose::STANDARD.encode(xored)))
            }
            other => other,
        }
    }

    fn decrypt(&self, value: Value) -> Value {
        match value {
            Value::Scalar(Scalar::Str(s)) => {
                match base64::engine::general_purpose::STANDARD.decode(&s) {
                    Ok(bytes) => {
                        let xored = self.xor(&bytes);
                        match String::from_utf8(xored) {
                            Ok(plain) => Value::Scalar(Scalar::Str(plain)),
                            Err(_) => Value::Scalar(Scalar::Str(s)),
                        }
                    }
                    Err(_) => Value::Scalar(Scalar::Str(s)),
                }
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let crypto = Base64XorCrypto::new("key");
        let plain = Value::str("hi");
        let encrypted = crypto.encrypt(plain.clone());
        assert_ne!(encrypted, plain);
        assert_eq!(crypto.decrypt(encrypted), plain);
    }

    #[test]
    fn non_string_scalars_pass_through() {
        let crypto = Base64XorCrypto::new("key");
        let v = Value::int(42);
        assert_eq!(crypto.encrypt(v.clone()), v);
    }
}
