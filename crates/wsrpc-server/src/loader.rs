//! Config loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with [`ServerConfig::default()`]
//! 2. If the config file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value;
use serde_json::map::Entry;
use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::error::ConfigError;

/// Load the config from `path`, then apply `WSRPC_*` overrides read through
/// `lookup` (usually `std::env::var`).
///
/// A missing file yields the defaults. Invalid JSON is an error.
pub fn load_config_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<ServerConfig, ConfigError> {
    let mut merged = serde_json::to_value(ServerConfig::default())?;
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(?path, "loading config from file");
            let user: Value = serde_json::from_str(&content)?;
            merged = deep_merge(merged, user);
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(?path, "config file not found, using defaults");
        }
        Err(err) => return Err(err.into()),
    }

    let mut config: ServerConfig = serde_json::from_value(merged)?;
    apply_overrides(&mut config, lookup);
    Ok(config)
}

/// Merge `overlay` into `base`.
///
/// Objects merge key by key. A null in `overlay` keeps the `base` value; any
/// other non-object replaces it.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                if value.is_null() {
                    continue;
                }
                match base.entry(key) {
                    Entry::Occupied(entry) => {
                        let slot = entry.into_mut();
                        *slot = deep_merge(slot.take(), value);
                    }
                    Entry::Vacant(entry) => {
                        let _ = entry.insert(value);
                    }
                }
            }
            Value::Object(base)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Apply `WSRPC_*` overrides read through `lookup`.
///
/// Values that fail to parse or fall outside their range are logged and
/// ignored, leaving the file or default value in place.
pub fn apply_overrides(config: &mut ServerConfig, lookup: impl Fn(&str) -> Option<String>) {
    let lookup = &lookup;
    if let Some(v) = read_string(lookup, "WSRPC_HOST") {
        config.host = v;
    }
    if let Some(v) = read_in_range(lookup, "WSRPC_PORT", &(0..=u16::MAX)) {
        config.port = v;
    }
    if let Some(v) = read_string(lookup, "WSRPC_PATH") {
        if v.starts_with('/') {
            config.path = v;
        } else {
            warn!(key = "WSRPC_PATH", value = %v, "path must start with '/', ignoring");
        }
    }
    if let Some(v) = read_in_range(lookup, "WSRPC_MAX_MESSAGE_SIZE", &(1024..=1 << 30)) {
        config.max_message_size = v;
    }
    if let Some(v) = read_in_range(lookup, "WSRPC_CLOSE_DEADLINE_MS", &(1..=600_000)) {
        config.close_deadline_ms = v;
    }
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn read_string(lookup: Lookup<'_>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.is_empty())
}

fn read_in_range<T>(lookup: Lookup<'_>, name: &str, range: &RangeInclusive<T>) -> Option<T>
where
    T: FromStr + PartialOrd + Display,
{
    let raw = lookup(name)?;
    let parsed = parse_in_range(&raw, range);
    if parsed.is_none() {
        warn!(
            key = name,
            value = %raw,
            min = %range.start(),
            max = %range.end(),
            "out-of-range or malformed override, ignoring"
        );
    }
    parsed
}

/// Parse `raw` and keep it only if it falls inside `range`.
pub fn parse_in_range<T: FromStr + PartialOrd>(raw: &str, range: &RangeInclusive<T>) -> Option<T> {
    raw.trim().parse().ok().filter(|n| range.contains(n))
}
