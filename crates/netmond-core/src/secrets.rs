//! Per-worker secret lookup.
//!
//! Secrets are sourced first from an environment variable named
//! `<WORKERNAME>_<KEY>` (dots in the key replaced with underscores, the whole
//! name uppercased), then from a file at
//! `$CONFIGURATION_DIRECTORY/<workername-lowercase>/<key>`. A secret is valid
//! when it is non-empty after trimming; if neither source yields a valid
//! secret the lookup fails.

use crate::error::{NetmondError, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

/// Environment variable naming the runtime configuration directory.
///
/// Systemd sets this for services using `ConfigurationDirectory=`.
pub const CONFIG_DIR_ENV: &str = "CONFIGURATION_DIRECTORY";

/// Looks up a secret for the named worker.
pub fn load_secret(worker_name: &str, key: &str) -> Result<String> {
    if let Some(value) = env_secret(worker_name, key) {
        if is_valid_secret(&value) {
            return Ok(value);
        }
    }
    if let Some(value) = file_secret(worker_name, key) {
        if is_valid_secret(&value) {
            return Ok(value);
        }
    }
    Err(NetmondError::SecretNotFound(format!(
        "{}/{}",
        worker_name, key
    )))
}

/// Builds the environment variable name for a worker/key pair.
pub fn env_var_name(worker_name: &str, key: &str) -> String {
    format!("{}_{}", worker_name, key.replace('.', "_")).to_uppercase()
}

fn env_secret(worker_name: &str, key: &str) -> Option<String> {
    env::var(env_var_name(worker_name, key)).ok()
}

fn file_secret(worker_name: &str, key: &str) -> Option<String> {
    let confdir = env::var(CONFIG_DIR_ENV).ok()?;
    let path: PathBuf = [&confdir, &worker_name.to_lowercase(), key]
        .iter()
        .collect();
    fs::read_to_string(path).ok()
}

/// A secret is valid when it contains something other than whitespace.
fn is_valid_secret(value: &str) -> bool {
    !value.trim().is_empty()
}
