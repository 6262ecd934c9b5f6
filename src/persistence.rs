use std::collections::HashMap;

use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt;

use crate::error::{Result, SerializeSnafu};

pub const PROGRESS_KEY: &str = "wordmemo_progress_v1";
pub const DAILY_STATS_KEY: &str = "wordmemo_daily_stats_v1";
pub const FORGOT_STATS_KEY: &str = "wordmemo_forgot_stats_v1";
pub const LAST_SEEN_KEY: &str = "wordmemo_last_seen_v1";
pub const UNKNOWN_EVER_KEY: &str = "wordmemo_unknown_ever_v1";
pub const PREFERENCES_KEY: &str = "wordmemo_prefs_v1";

/// String key/value storage supplied by the host, e.g. browser local storage
/// or a file-backed map.
pub trait Persistence {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPersistence {
    entries: HashMap<String, String>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Persistence for MemoryPersistence {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }
}

impl<P: Persistence + ?Sized> Persistence for Box<P> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        (**self).set(key, value)
    }
}

/// Reads a JSON value, falling back to the default when the key is absent
/// or its contents do not parse.
pub fn load<T, P>(store: &P, key: &str) -> T
where
    T: DeserializeOwned + Default,
    P: Persistence + ?Sized,
{
    let Some(raw) = store.get(key) else {
        return T::default();
    };
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!("ignoring unreadable {key}: {err}");
            T::default()
        }
    }
}

pub fn save<T, P>(store: &mut P, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    P: Persistence + ?Sized,
{
    let raw = serde_json::to_string(value).context(SerializeSnafu { key })?;
    store.set(key, raw);
    Ok(())
}
