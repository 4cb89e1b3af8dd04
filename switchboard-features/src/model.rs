//! Feature and toggle definitions.
//!
//! Stores produce these values; the engine and strategies only read them.

use crate::error::{ParameterError, ParameterResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a feature: its name within an optional product scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureKey {
    pub product_name: Option<String>,
    pub name: String,
}

impl FeatureKey {
    pub fn new(name: impl Into<String>, product_name: Option<&str>) -> Self {
        Self {
            product_name: product_name.map(str::to_string),
            name: name.into(),
        }
    }
}

impl fmt::Display for FeatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.product_name {
            Some(ref product) => write!(f, "{}/{}", product, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A named unit of functionality with a master switch and activation toggles.
///
/// # Examples
///
/// ```
/// use switchboard_features::{Feature, Toggle};
///
/// let feature = Feature::new("live-scores")
///     .with_product("web")
///     .enabled()
///     .with_toggle(
///         Toggle::new("from_to")
///             .with_parameter("From", "2020-01-01 00:00:00")
///             .with_parameter("To", "2030-01-01 00:00:00"),
///     );
///
/// assert!(feature.is_enabled());
/// assert!(feature.get_toggle("from_to").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeature")]
pub struct Feature {
    name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    product_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    enabled: bool,

    toggles: Vec<Toggle>,
}

impl Feature {
    /// Create a disabled feature with no toggles in the default product.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            product_name: None,
            description: None,
            enabled: false,
            toggles: Vec::new(),
        }
    }

    pub fn with_product(mut self, product_name: impl Into<String>) -> Self {
        self.product_name = Some(product_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Turn the master switch on.
    pub fn enabled(mut self) -> Self {
        self.enabled = true;
        self
    }

    /// Turn the master switch off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_toggle(mut self, toggle: Toggle) -> Self {
        self.add_toggle(toggle);
        self
    }

    /// Attach a toggle.
    ///
    /// A toggle whose type is already attached is merged into the existing
    /// one; parameters of the new toggle overwrite same-named ones.
    pub fn add_toggle(&mut self, toggle: Toggle) {
        match self
            .toggles
            .iter_mut()
            .find(|t| t.type_name == toggle.type_name)
        {
            Some(existing) => existing.parameters.extend(toggle.parameters),
            None => self.toggles.push(toggle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn product_name(&self) -> Option<&str> {
        self.product_name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn toggles(&self) -> &[Toggle] {
        &self.toggles
    }

    /// Find the toggle of the given strategy type.
    pub fn get_toggle(&self, type_name: &str) -> Option<&Toggle> {
        self.toggles.iter().find(|t| t.type_name == type_name)
    }

    pub fn key(&self) -> FeatureKey {
        FeatureKey::new(self.name.clone(), self.product_name())
    }
}

/// Wire shape of a feature before validation and toggle merging.
#[derive(Deserialize)]
struct RawFeature {
    name: String,
    #[serde(default, alias = "product")]
    product_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    toggles: Vec<Toggle>,
}

impl TryFrom<RawFeature> for Feature {
    type Error = String;

    fn try_from(raw: RawFeature) -> Result<Self, Self::Error> {
        if raw.name.trim().is_empty() {
            return Err("feature name cannot be empty".to_string());
        }

        let mut feature = Feature {
            name: raw.name,
            product_name: raw.product_name,
            description: raw.description,
            enabled: raw.enabled,
            toggles: Vec::with_capacity(raw.toggles.len()),
        };
        for toggle in raw.toggles {
            feature.add_toggle(toggle);
        }
        Ok(feature)
    }
}

/// One activation rule attached to a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toggle {
    /// Registry key of the strategy implementing this rule
    #[serde(rename = "type")]
    type_name: String,

    #[serde(default)]
    parameters: ToggleParameters,
}

impl Toggle {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            parameters: ToggleParameters::default(),
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.parameters.insert(name, value);
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn parameters(&self) -> &ToggleParameters {
        &self.parameters
    }
}

/// Named toggle parameters stored as text and parsed on demand.
///
/// Lookups try the exact name first and fall back to an ASCII
/// case-insensitive match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Value>")]
pub struct ToggleParameters(BTreeMap<String, String>);

/// Loaders may write numbers and booleans; they are kept as their text form.
impl From<BTreeMap<String, Value>> for ToggleParameters {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(
            map.into_iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                })
                .collect(),
        )
    }
}

impl ToggleParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl ToString) {
        self.0.insert(name.into(), value.to_string());
    }

    pub fn extend(&mut self, other: ToggleParameters) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Raw text of a parameter, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .or_else(|| {
                self.0
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// Required text parameter.
    pub fn get_str(&self, name: &str) -> ParameterResult<&str> {
        self.get(name)
            .ok_or_else(|| ParameterError::Missing(name.to_string()))
    }

    /// Required UTC timestamp in the given `chrono` format.
    pub fn get_date(&self, name: &str, format: &str) -> ParameterResult<DateTime<Utc>> {
        let value = self.get_str(name)?;
        NaiveDateTime::parse_from_str(value.trim(), format)
            .map(|naive| naive.and_utc())
            .map_err(|e| invalid(name, value, e))
    }

    pub fn get_int(&self, name: &str) -> ParameterResult<i64> {
        let value = self.get_str(name)?;
        value.trim().parse().map_err(|e| invalid(name, value, e))
    }

    pub fn get_bool(&self, name: &str) -> ParameterResult<bool> {
        let value = self.get_str(name)?;
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(invalid(name, value, "expected a boolean")),
        }
    }

    /// Required list parameter split on `separator`, entries trimmed, blanks dropped.
    pub fn get_list(&self, name: &str, separator: char) -> ParameterResult<Vec<&str>> {
        Ok(self
            .get_str(name)?
            .split(separator)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect())
    }
}

fn invalid(name: &str, value: &str, reason: impl fmt::Display) -> ParameterError {
    ParameterError::Invalid {
        name: name.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
