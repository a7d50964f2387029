//! Process-wide property registry
//!
//! A string-to-string map shared by the whole process, seeded with runtime facts and open
//! to the application. It feeds two consumers: configuration loading (the `honeybadger.*`
//! keys) and the `server.system_properties` section of every notice.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

static PROPERTIES: Lazy<RwLock<BTreeMap<String, String>>> =
    Lazy::new(|| RwLock::new(default_properties()));

fn default_properties() -> BTreeMap<String, String> {
    let mut props = BTreeMap::new();
    props.insert("os.name".to_string(), std::env::consts::OS.to_string());
    props.insert("os.arch".to_string(), std::env::consts::ARCH.to_string());
    props.insert("os.family".to_string(), std::env::consts::FAMILY.to_string());
    props.insert("process.id".to_string(), std::process::id().to_string());
    props.insert(
        "rust.target.pointer_width".to_string(),
        usize::BITS.to_string(),
    );
    props.insert(
        "honeybadger.notifier.version".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    if let Ok(exe) = std::env::current_exe() {
        props.insert(
            "process.executable".to_string(),
            exe.display().to_string(),
        );
    }
    if let Ok(dir) = std::env::current_dir() {
        props.insert("user.dir".to_string(), dir.display().to_string());
    }
    props
}

/// Sets a property, returning the previous value
pub fn set_property(key: impl Into<String>, value: impl Into<String>) -> Option<String> {
    PROPERTIES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key.into(), value.into())
}

pub fn property(key: &str) -> Option<String> {
    PROPERTIES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(key)
        .cloned()
}

/// Removes a property, returning its value
pub fn clear_property(key: &str) -> Option<String> {
    PROPERTIES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(key)
}

/// Point-in-time copy of every property
pub fn snapshot() -> BTreeMap<String, String> {
    PROPERTIES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[serial_test::serial]
    fn test_defaults_are_seeded() {
        let props = snapshot();
        assert_eq!(props.get("os.name").map(String::as_str), Some(std::env::consts::OS));
        assert_eq!(
            props.get("process.id"),
            Some(&std::process::id().to_string())
        );
    }

    #[test]
    #[serial_test::serial]
    fn test_set_and_clear() {
        assert_eq!(set_property("test.properties.key", "one"), None);
        assert_eq!(property("test.properties.key"), Some("one".to_string()));
        assert_eq!(
            set_property("test.properties.key", "two"),
            Some("one".to_string())
        );
        assert_eq!(
            clear_property("test.properties.key"),
            Some("two".to_string())
        );
        assert_eq!(property("test.properties.key"), None);
    }
}
