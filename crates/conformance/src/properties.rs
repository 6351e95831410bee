//! Test suite properties
//!
//! Properties are flat name/value pairs loaded (lowest priority first) from:
//! 1. `common.json` in the config directory
//! 2. `<protocol>.json` in the config directory, e.g. `MS-ASCNTC.json`
//! 3. Environment variables named `CONFORMANCE_<PropertyName>`
//!
//! A value may reference other properties as `[Name]`; references are
//! resolved recursively on read and unknown references are left as-is.

use anyhow::Context;
use log::debug;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::context::UserInformation;
use crate::error::{ConformanceError, Result};
use crate::poll::RetryBudget;

/// Shared properties file, loaded for every protocol
pub const COMMON_FILE: &str = "common.json";

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "CONFORMANCE_";

/// Nesting limit for `[Name]` references
const MAX_SUBSTITUTION_DEPTH: usize = 16;

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\[\]]+)\]").expect("reference pattern is valid")
});

/// Property bag for one protocol's test run
#[derive(Debug, Clone, Default)]
pub struct TestProperties {
    values: HashMap<String, String>,
}

impl TestProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the layered property files for `protocol` plus env overrides
    pub fn load(protocol: &str) -> anyhow::Result<Self> {
        let dir = config::config_dir().context("Could not determine config directory")?;
        let mut props = Self::load_from_dir(&dir, protocol)?;
        props.apply_env_overrides(std::env::vars());
        Ok(props)
    }

    /// Load `common.json` and `<protocol>.json` from `dir`, either may be absent
    pub fn load_from_dir(dir: &Path, protocol: &str) -> anyhow::Result<Self> {
        let mut props = Self::new();
        for filename in [COMMON_FILE.to_string(), format!("{protocol}.json")] {
            let path = dir.join(&filename);
            if let Some(raw) = config::load_json_file_if_exists::<BTreeMap<String, Value>>(&path)? {
                debug!("Loaded {} properties from {}", raw.len(), path.display());
                props.merge(Self::from_raw(raw)?);
            }
        }
        Ok(props)
    }

    /// Load properties from a specific JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw: BTreeMap<String, Value> = config::load_json_file(path)?;
        Self::from_raw(raw)
    }

    /// Parse a flat JSON object; scalar values are stored as strings
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let raw: BTreeMap<String, Value> =
            serde_json::from_str(json).context("Failed to parse properties JSON")?;
        Self::from_raw(raw)
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    fn from_raw(raw: BTreeMap<String, Value>) -> anyhow::Result<Self> {
        let mut values = HashMap::with_capacity(raw.len());
        for (name, value) in raw {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => anyhow::bail!("Property '{name}' must be a scalar, got {other}"),
            };
            values.insert(name, value);
        }
        Ok(Self { values })
    }

    /// Overlay `other` on top of these properties
    pub fn merge(&mut self, other: TestProperties) {
        self.values.extend(other.values);
    }

    /// Apply `CONFORMANCE_<Name>` variables from `vars`
    pub fn apply_env_overrides(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            match key.strip_prefix(ENV_PREFIX) {
                Some(name) if !name.is_empty() => {
                    debug!("Property {name} overridden from environment");
                    self.values.insert(name.to_string(), value);
                }
                _ => {}
            }
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Builder-style [`set`](Self::set)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Resolved value of `name`; a missing property is an error
    pub fn get(&self, name: &str) -> Result<String> {
        let raw = self
            .values
            .get(name)
            .ok_or_else(|| ConformanceError::Config(format!("property '{name}' is not defined")))?;
        self.resolve(raw, 0)
    }

    /// Resolved value of `name`, `None` when it is not defined
    pub fn get_opt(&self, name: &str) -> Result<Option<String>> {
        match self.values.get(name) {
            Some(raw) => self.resolve(raw, 0).map(Some),
            None => Ok(None),
        }
    }

    /// Parse the resolved value of `name`
    pub fn get_parsed<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.get(name)?;
        value.trim().parse().map_err(|e: T::Err| {
            ConformanceError::Config(format!("property '{name}' has invalid value '{value}': {e}"))
        })
    }

    /// Strict `true`/`false`, case-insensitive
    pub fn get_bool(&self, name: &str) -> Result<bool> {
        let value = self.get(name)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(ConformanceError::Config(format!(
                "property '{name}' must be true or false, got '{value}'"
            ))),
        }
    }

    /// Switch for an optional requirement, read from `R<id>Enabled`
    pub fn is_requirement_enabled(&self, id: u32) -> Result<bool> {
        self.get_bool(&format!("R{id}Enabled"))
    }

    /// Budget for the fetch loop from `WaitTime` (ms) and `RetryCount`
    pub fn retry_budget(&self) -> Result<RetryBudget> {
        let wait_ms: u64 = self.get_parsed("WaitTime")?;
        let attempts: u32 = self.get_parsed("RetryCount")?;
        RetryBudget::from_millis(wait_ms, attempts).map_err(|e| ConformanceError::Config(e.to_string()))
    }

    /// ActiveSync protocol version under test, e.g. "14.1"
    pub fn protocol_version(&self) -> Result<String> {
        self.get("ActiveSyncProtocolVersion")
    }

    /// Credentials for `User<n>Name` / `User<n>Password` in `Domain`
    pub fn user(&self, n: u32) -> Result<UserInformation> {
        Ok(UserInformation::new(
            self.get(&format!("User{n}Name"))?,
            self.get(&format!("User{n}Password"))?,
            self.get("Domain")?,
        ))
    }

    fn resolve(&self, raw: &str, depth: usize) -> Result<String> {
        if depth > MAX_SUBSTITUTION_DEPTH {
            return Err(ConformanceError::Config(format!(
                "property reference nesting exceeds {MAX_SUBSTITUTION_DEPTH} in '{raw}'"
            )));
        }

        let mut resolved = String::with_capacity(raw.len());
        let mut last = 0;
        for caps in REFERENCE.captures_iter(raw) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            resolved.push_str(&raw[last..whole.start()]);
            match self.values.get(name.as_str()) {
                Some(value) => resolved.push_str(&self.resolve(value, depth + 1)?),
                None => resolved.push_str(whole.as_str()),
            }
            last = whole.end();
        }
        resolved.push_str(&raw[last..]);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_from_json_stores_scalars_as_strings() {
        let props = TestProperties::from_json(
            r#"{"Domain": "contoso.com", "RetryCount": 5, "R1010Enabled": true}"#,
        )
        .unwrap();

        assert_eq!(props.get("Domain").unwrap(), "contoso.com");
        assert_eq!(props.get("RetryCount").unwrap(), "5");
        assert!(props.is_requirement_enabled(1010).unwrap());
    }

    #[test]
    fn test_from_json_rejects_nested_values() {
        let err = TestProperties::from_json(r#"{"Users": ["a", "b"]}"#).unwrap_err();
        assert!(err.to_string().contains("Users"));
    }

    #[test]
    fn test_missing_property_is_an_error() {
        let props = TestProperties::new();
        let err = props.get("SutComputerName").unwrap_err();
        assert!(err.to_string().contains("SutComputerName"));
        assert!(props.get_opt("SutComputerName").unwrap().is_none());
    }

    #[test]
    fn test_references_resolve_recursively() {
        let props = TestProperties::from_pairs([
            ("SutComputerName", "sut01"),
            ("Domain", "contoso.com"),
            ("ServerUrl", "https://[SutComputerName].[Domain]"),
            ("SiteUrl", "[ServerUrl]/sites/[Unknown]"),
        ]);

        assert_eq!(
            props.get("SiteUrl").unwrap(),
            "https://sut01.contoso.com/sites/[Unknown]"
        );
    }

    #[test]
    fn test_reference_cycle_is_reported() {
        let props = TestProperties::from_pairs([("A", "[B]"), ("B", "[A]")]);
        let err = props.get("A").unwrap_err();
        assert!(matches!(err, ConformanceError::Config(_)));
    }

    #[test]
    fn test_requirement_switch_must_be_boolean() {
        let props = TestProperties::from_pairs([
            ("R695Enabled", "TRUE"),
            ("R697Enabled", "False"),
            ("R509Enabled", "yes"),
        ]);

        assert!(props.is_requirement_enabled(695).unwrap());
        assert!(!props.is_requirement_enabled(697).unwrap());
        assert!(props.is_requirement_enabled(509).is_err());
        assert!(props.is_requirement_enabled(1).is_err());
    }

    #[test]
    fn test_retry_budget() {
        let props = TestProperties::from_pairs([("WaitTime", "500"), ("RetryCount", "4")]);
        let budget = props.retry_budget().unwrap();
        assert_eq!(budget.wait(), Duration::from_millis(500));
        assert_eq!(budget.max_attempts(), 4);

        let zero = props.clone().with("RetryCount", "0");
        assert!(zero.retry_budget().is_err());

        let negative = props.with("WaitTime", "-1");
        assert!(negative.retry_budget().is_err());
    }

    #[test]
    fn test_user() {
        let props = TestProperties::from_pairs([
            ("User1Name", "alice"),
            ("User1Password", "secret"),
            ("Domain", "contoso.com"),
        ]);

        let user = props.user(1).unwrap();
        assert_eq!(user.name, "alice");
        assert_eq!(user.mail_address(), "alice@contoso.com");
        assert!(props.user(2).is_err());
    }

    #[test]
    fn test_protocol_file_overrides_common_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(COMMON_FILE),
            r#"{"Domain": "contoso.com", "WaitTime": "1000"}"#,
        )
        .unwrap();
        std::fs::write(temp.path().join("MS-ASCNTC.json"), r#"{"WaitTime": "10"}"#).unwrap();

        let props = TestProperties::load_from_dir(temp.path(), "MS-ASCNTC").unwrap();
        assert_eq!(props.get("Domain").unwrap(), "contoso.com");
        assert_eq!(props.get("WaitTime").unwrap(), "10");
    }

    #[test]
    fn test_env_overrides() {
        let mut props = TestProperties::from_pairs([("RetryCount", "3")]);
        props.apply_env_overrides([
            ("CONFORMANCE_RetryCount".to_string(), "9".to_string()),
            ("CONFORMANCE_".to_string(), "ignored".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ]);

        assert_eq!(props.get("RetryCount").unwrap(), "9");
        assert!(!props.contains("PATH"));
        assert!(!props.contains(""));
    }
}
