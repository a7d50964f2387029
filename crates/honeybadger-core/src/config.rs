//! Dispatch configuration
//!
//! Settings are layered, lowest precedence first:
//! 1. built-in defaults
//! 2. `HONEYBADGER_*` environment variables
//! 3. `honeybadger.*` entries of the process property registry
//! 4. explicit [`ConfigOverrides`]

use crate::error::{HoneybadgerError, HoneybadgerResult};
use crate::properties;
use crate::utils::split_list;
use config::{Config, Environment};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.honeybadger.io/v1/notices";

pub const API_KEY_PROPERTY: &str = "honeybadger.api_key";
pub const URL_PROPERTY: &str = "honeybadger.url";
pub const EXCLUDED_SYS_PROPS_PROPERTY: &str = "honeybadger.excluded_sys_props";
pub const EXCLUDED_EXCEPTION_CLASSES_PROPERTY: &str = "honeybadger.excluded_exception_classes";
pub const EXCLUDED_FRAME_CLASSES_PROPERTY: &str = "honeybadger.excluded_frame_classes";
pub const ASYNC_PROPERTY: &str = "honeybadger.async";
pub const MAX_THREADS_PROPERTY: &str = "honeybadger.max_threads";
pub const PRIORITY_PROPERTY: &str = "honeybadger.priority";
pub const QUEUE_SIZE_PROPERTY: &str = "honeybadger.queue_size";

/// Prefix of the environment variables read by [`DispatchConfig::load`]
pub const ENV_PREFIX: &str = "HONEYBADGER";

/// Worker scheduling priorities, on a 1..=10 scale
pub const MIN_PRIORITY: i32 = 1;
pub const NORM_PRIORITY: i32 = 5;
pub const MAX_PRIORITY: i32 = 10;

pub const DEFAULT_WORKER_COUNT: usize = 1;
pub const DEFAULT_WORKER_PRIORITY: i32 = MIN_PRIORITY;
pub const DEFAULT_QUEUE_CAPACITY: usize = usize::MAX;

/// Property keys that never leave the process: credentials and the notifier's own settings
pub const MANDATORY_EXCLUDED_METADATA_KEYS: [&str; 5] = [
    API_KEY_PROPERTY,
    URL_PROPERTY,
    EXCLUDED_SYS_PROPS_PROPERTY,
    EXCLUDED_EXCEPTION_CLASSES_PROPERTY,
    EXCLUDED_FRAME_CLASSES_PROPERTY,
];

/// (settings field, property key) pairs for the property layer
const PROPERTY_KEYS: [(&str, &str); 9] = [
    ("api_key", API_KEY_PROPERTY),
    ("url", URL_PROPERTY),
    ("excluded_sys_props", EXCLUDED_SYS_PROPS_PROPERTY),
    ("excluded_exception_classes", EXCLUDED_EXCEPTION_CLASSES_PROPERTY),
    ("excluded_frame_classes", EXCLUDED_FRAME_CLASSES_PROPERTY),
    ("async", ASYNC_PROPERTY),
    ("max_threads", MAX_THREADS_PROPERTY),
    ("priority", PRIORITY_PROPERTY),
    ("queue_size", QUEUE_SIZE_PROPERTY),
];

/// Resolved settings of one client instance, read-only once the client is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub api_key: String,
    pub endpoint: Url,
    pub async_enabled: bool,
    pub worker_count: usize,
    pub worker_priority: i32,
    pub queue_capacity: usize,
    pub excluded_exception_prefixes: BTreeSet<String>,
    pub excluded_frame_prefixes: BTreeSet<String>,
    pub excluded_metadata_keys: BTreeSet<String>,
}

/// Explicit settings; any field left `None` falls through to properties, then environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub excluded_metadata_keys: Option<Vec<String>>,
    pub excluded_exception_prefixes: Option<Vec<String>>,
    pub excluded_frame_prefixes: Option<Vec<String>>,
    pub async_enabled: Option<bool>,
    pub worker_count: Option<usize>,
    pub worker_priority: Option<i32>,
    pub queue_capacity: Option<usize>,
}

/// Raw string values after the environment and property layers are merged
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    api_key: Option<String>,
    url: Option<String>,
    excluded_sys_props: Option<String>,
    excluded_exception_classes: Option<String>,
    excluded_frame_classes: Option<String>,
    #[serde(rename = "async")]
    async_enabled: Option<String>,
    max_threads: Option<String>,
    priority: Option<String>,
    queue_size: Option<String>,
}

impl DispatchConfig {
    /// Loads settings from the process environment and property registry
    pub fn load(overrides: ConfigOverrides) -> HoneybadgerResult<Self> {
        Self::load_from(overrides, std::env::vars().collect())
    }

    /// Same as [`DispatchConfig::load`] with an explicit environment map
    pub fn load_from(
        overrides: ConfigOverrides,
        env: HashMap<String, String>,
    ) -> HoneybadgerResult<Self> {
        let mut builder = Config::builder().add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .source(Some(env)),
        );

        for (field, key) in PROPERTY_KEYS {
            if let Some(value) = properties::property(key) {
                builder = builder.set_override(field, value)?;
            }
        }

        let raw: RawSettings = builder.build()?.try_deserialize()?;
        Self::resolve(raw, overrides)
    }

    /// Starts a fully explicit configuration; nothing is read from the process
    pub fn builder(api_key: impl Into<String>) -> DispatchConfigBuilder {
        DispatchConfigBuilder {
            overrides: ConfigOverrides {
                api_key: Some(api_key.into()),
                ..Default::default()
            },
        }
    }

    fn resolve(raw: RawSettings, overrides: ConfigOverrides) -> HoneybadgerResult<Self> {
        let api_key = overrides.api_key.or(raw.api_key).unwrap_or_default();
        if api_key.trim().is_empty() {
            warn!(
                "No Honeybadger API key configured, set [{}] or {}_API_KEY",
                API_KEY_PROPERTY, ENV_PREFIX
            );
        }

        let url = overrides
            .endpoint
            .or(raw.url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let endpoint = parse_endpoint(&url)?;

        let async_enabled = match overrides.async_enabled {
            Some(value) => value,
            None => match raw.async_enabled {
                Some(value) => parse_bool(ASYNC_PROPERTY, &value)?,
                None => true,
            },
        };

        let worker_count = match overrides.worker_count {
            Some(0) => DEFAULT_WORKER_COUNT,
            Some(count) => count,
            None => {
                let parsed =
                    parse_positive(MAX_THREADS_PROPERTY, raw.max_threads, DEFAULT_WORKER_COUNT as i64)?;
                usize::try_from(parsed).unwrap_or(DEFAULT_WORKER_COUNT)
            }
        };

        let worker_priority = match overrides.worker_priority {
            Some(priority) => positive_or(i64::from(priority), DEFAULT_WORKER_PRIORITY as i64),
            None => parse_positive(PRIORITY_PROPERTY, raw.priority, DEFAULT_WORKER_PRIORITY as i64)?,
        }
        .min(MAX_PRIORITY as i64) as i32;

        let queue_capacity = match overrides.queue_capacity {
            Some(capacity) if capacity > 0 => capacity,
            Some(_) => DEFAULT_QUEUE_CAPACITY,
            None => match raw.queue_size {
                Some(value) => {
                    let parsed = parse_number(QUEUE_SIZE_PROPERTY, &value)?;
                    if parsed > 0 {
                        usize::try_from(parsed).unwrap_or(DEFAULT_QUEUE_CAPACITY)
                    } else {
                        DEFAULT_QUEUE_CAPACITY
                    }
                }
                None => DEFAULT_QUEUE_CAPACITY,
            },
        };

        let excluded_metadata_keys = overrides
            .excluded_metadata_keys
            .unwrap_or_else(|| raw.excluded_sys_props.as_deref().map(split_list).unwrap_or_default());
        let excluded_exception_prefixes = overrides.excluded_exception_prefixes.unwrap_or_else(|| {
            raw.excluded_exception_classes
                .as_deref()
                .map(split_list)
                .unwrap_or_default()
        });
        let excluded_frame_prefixes = overrides.excluded_frame_prefixes.unwrap_or_else(|| {
            raw.excluded_frame_classes
                .as_deref()
                .map(split_list)
                .unwrap_or_default()
        });

        Ok(Self {
            api_key,
            endpoint,
            async_enabled,
            worker_count,
            worker_priority,
            queue_capacity,
            excluded_exception_prefixes: with_mandatory(
                excluded_exception_prefixes,
                [crate::error::internal_error_type()],
            ),
            excluded_frame_prefixes: clean_set(excluded_frame_prefixes),
            excluded_metadata_keys: with_mandatory(
                excluded_metadata_keys,
                MANDATORY_EXCLUDED_METADATA_KEYS,
            ),
        })
    }
}

/// Builder for [`DispatchConfig`] that ignores environment variables and properties
#[derive(Debug, Clone)]
pub struct DispatchConfigBuilder {
    overrides: ConfigOverrides,
}

impl DispatchConfigBuilder {
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.overrides.endpoint = Some(url.into());
        self
    }

    pub fn async_enabled(mut self, enabled: bool) -> Self {
        self.overrides.async_enabled = Some(enabled);
        self
    }

    pub fn worker_count(mut self, count: usize) -> Self {
        self.overrides.worker_count = Some(count);
        self
    }

    pub fn worker_priority(mut self, priority: i32) -> Self {
        self.overrides.worker_priority = Some(priority);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.overrides.queue_capacity = Some(capacity);
        self
    }

    pub fn exclude_metadata_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides
            .excluded_metadata_keys
            .get_or_insert_with(Vec::new)
            .extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn exclude_exception_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides
            .excluded_exception_prefixes
            .get_or_insert_with(Vec::new)
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn exclude_frame_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.overrides
            .excluded_frame_prefixes
            .get_or_insert_with(Vec::new)
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> HoneybadgerResult<DispatchConfig> {
        DispatchConfig::resolve(RawSettings::default(), self.overrides)
    }
}

fn parse_endpoint(url: &str) -> HoneybadgerResult<Url> {
    let endpoint = Url::parse(url.trim()).map_err(|e| HoneybadgerError::InvalidEndpoint {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match endpoint.scheme() {
        "http" | "https" => Ok(endpoint),
        other => Err(HoneybadgerError::InvalidEndpoint {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

fn parse_bool(key: &str, value: &str) -> HoneybadgerResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(HoneybadgerError::configuration(format!(
            "[{}] expects a boolean, got '{}'",
            key, value
        ))),
    }
}

fn parse_number(key: &str, value: &str) -> HoneybadgerResult<i64> {
    value.trim().parse::<i64>().map_err(|_| {
        HoneybadgerError::configuration(format!("[{}] expects an integer, got '{}'", key, value))
    })
}

fn parse_positive(key: &str, value: Option<String>, default: i64) -> HoneybadgerResult<i64> {
    match value {
        Some(value) => Ok(positive_or(parse_number(key, &value)?, default)),
        None => Ok(default),
    }
}

fn positive_or(value: i64, default: i64) -> i64 {
    if value > 0 {
        value
    } else {
        default
    }
}

fn clean_set(entries: Vec<String>) -> BTreeSet<String> {
    entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn with_mandatory<const N: usize>(entries: Vec<String>, mandatory: [&str; N]) -> BTreeSet<String> {
    let mut set = clean_set(entries);
    set.extend(mandatory.iter().map(|entry| entry.to_string()));
    set
}
