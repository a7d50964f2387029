//! Notice payload construction
//!
//! Turns an [`ErrorRecord`] plus process metadata into the JSON document accepted by the
//! notices API. Hostname and runtime root are resolved once per builder; the diagnostic
//! context and the property registry are read on every build.

use honeybadger_core::{
    mdc, properties, DispatchConfig, ErrorRecord, Fault, HoneybadgerError, HoneybadgerResult,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use sysinfo::{System, SystemExt};
use tracing::error;

pub const NOTIFIER_NAME: &str = "honeybadger-rust-notifier";
pub const NOTIFIER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub notifier: NotifierInfo,
    pub error: ErrorSection,
    pub request: Map<String, Value>,
    pub server: ServerSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierInfo {
    pub name: String,
    pub version: String,
}

impl Default for NotifierInfo {
    fn default() -> Self {
        Self {
            name: NOTIFIER_NAME.to_string(),
            version: NOTIFIER_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSection {
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
    pub backtrace: Vec<BacktraceEntry>,
    /// `"1"`, `"2"`, ... in insertion order
    pub source: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktraceEntry {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub file: Option<String>,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    pub environment_name: String,
    pub hostname: String,
    pub runtime_root: String,
    pub system_properties: BTreeMap<String, String>,
}

pub struct PayloadBuilder {
    hostname: String,
    runtime_root: String,
    excluded_metadata_keys: BTreeSet<String>,
}

impl PayloadBuilder {
    pub fn new(config: &DispatchConfig) -> Self {
        Self::with_host(config, resolve_hostname(), resolve_runtime_root())
    }

    /// Builder with fixed host facts, skipping the lookups
    pub fn with_host(
        config: &DispatchConfig,
        hostname: impl Into<String>,
        runtime_root: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            runtime_root: runtime_root.into(),
            excluded_metadata_keys: config.excluded_metadata_keys.clone(),
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn runtime_root(&self) -> &str {
        &self.runtime_root
    }

    pub fn build(&self, record: &ErrorRecord) -> HoneybadgerResult<Notice> {
        let fault = record.fault().ok_or(HoneybadgerError::MissingFault)?;

        Ok(Notice {
            notifier: NotifierInfo::default(),
            error: ErrorSection {
                class: error_class(record.reporter(), fault),
                message: record.effective_message().map(str::to_string),
                backtrace: backtrace(fault),
                source: source_lines(fault),
            },
            request: request_section(record),
            server: ServerSection {
                environment_name: environment_name(),
                hostname: self.hostname.clone(),
                runtime_root: self.runtime_root.clone(),
                system_properties: self.system_properties(),
            },
        })
    }

    fn system_properties(&self) -> BTreeMap<String, String> {
        let mut props = properties::snapshot();
        props.retain(|key, _| !self.excluded_metadata_keys.contains(key));
        props
    }
}

/// `<reporter>-<type>`; a missing reporter keeps the leading hyphen
fn error_class(reporter: Option<&str>, fault: &Fault) -> String {
    format!("{}-{}", reporter.unwrap_or_default(), fault.type_name)
}

fn backtrace(fault: &Fault) -> Vec<BacktraceEntry> {
    fault
        .frames
        .iter()
        .map(|frame| BacktraceEntry {
            number: frame.line,
            file: frame.file.clone(),
            method: frame.qualified_method(),
        })
        .collect()
}

fn source_lines(fault: &Fault) -> Map<String, Value> {
    fault
        .rendered_lines()
        .into_iter()
        .enumerate()
        .map(|(index, line)| ((index + 1).to_string(), Value::String(line)))
        .collect()
}

fn request_section(record: &ErrorRecord) -> Map<String, Value> {
    let mut request = record
        .context()
        .map(|context| context.to_document())
        .unwrap_or_default();

    let mdc: Map<String, Value> = mdc::snapshot()
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    match request.get_mut("context") {
        Some(Value::Object(context)) => {
            context.insert("mdc".to_string(), Value::Object(mdc));
        }
        _ => {
            let mut context = Map::new();
            context.insert("mdc".to_string(), Value::Object(mdc));
            request.insert("context".to_string(), Value::Object(context));
        }
    }
    request
}

/// First of: `RUST_ENV` property, `RUST_ENV` variable, `ENV` property, `ENV` variable
pub fn environment_name() -> String {
    properties::property("RUST_ENV")
        .or_else(|| std::env::var("RUST_ENV").ok())
        .or_else(|| properties::property("ENV"))
        .or_else(|| std::env::var("ENV").ok())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

fn resolve_hostname() -> String {
    match System::new().host_name() {
        Some(host) if !host.is_empty() => host,
        _ => {
            error!("Unable to find hostname");
            UNKNOWN.to_string()
        }
    }
}

fn resolve_runtime_root() -> String {
    match std::env::current_dir().and_then(|dir| dir.canonicalize()) {
        Ok(path) => path.display().to_string(),
        Err(e) => {
            error!("Can't get runtime root path: {}", e);
            UNKNOWN.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use honeybadger_core::StackFrame;

    #[test]
    fn test_class_without_reporter_keeps_hyphen() {
        let fault = Fault::new("app::Oops");
        assert_eq!(error_class(None, &fault), "-app::Oops");
        assert_eq!(error_class(Some("billing"), &fault), "billing-app::Oops");
    }

    #[test]
    fn test_backtrace_entries() {
        let fault = Fault::new("app::Oops")
            .with_frame(
                StackFrame::new("app::worker", "run")
                    .with_file("src/worker.rs")
                    .with_line(12),
            )
            .with_frame(StackFrame::new("app", "main"));

        let entries = backtrace(&fault);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].number, Some(12));
        assert_eq!(entries[0].file.as_deref(), Some("src/worker.rs"));
        assert_eq!(entries[0].method, "app::worker.run");
        assert_eq!(entries[1].number, None);
    }

    #[test]
    fn test_missing_fault_is_rejected() {
        let config = DispatchConfig::builder("key").build().unwrap();
        let builder = PayloadBuilder::with_host(&config, "host", "/srv");
        let err = builder.build(&ErrorRecord::default()).unwrap_err();
        assert!(matches!(err, HoneybadgerError::MissingFault));
    }
}
