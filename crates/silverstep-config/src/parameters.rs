//! Resolution of `%dotted.key%` placeholders against the `[parameters]` table.

use std::fmt;
use thiserror::Error;

/// Errors raised while resolving configuration parameters
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Parameter '{key}' not found in [parameters]")]
    ParameterNotFound { key: String },

    #[error("Parameter '{key}' is a {kind}, expected a string, integer, float or boolean")]
    ParameterNotScalar { key: String, kind: &'static str },
}

/// A scalar resolved from configuration, opaque to the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::String(s) => write!(f, "{}", s),
            ParameterValue::Integer(i) => write!(f, "{}", i),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::String(value.to_string())
    }
}

/// Supplies configuration-derived scalars by key.
pub trait ParameterResolver: Send + Sync {
    fn resolve(&self, key: &str) -> Result<ParameterValue, ConfigError>;

    /// Resolve `%key%` placeholders; any other text is returned as a literal string.
    fn resolve_placeholder(&self, raw: &str) -> Result<ParameterValue, ConfigError> {
        match placeholder_key(raw) {
            Some(key) => self.resolve(key),
            None => Ok(ParameterValue::String(raw.to_string())),
        }
    }
}

/// Extract `key` from `%key%`, if `raw` is a whole-string placeholder.
pub fn placeholder_key(raw: &str) -> Option<&str> {
    raw.strip_prefix('%')
        .and_then(|rest| rest.strip_suffix('%'))
        .filter(|key| !key.is_empty() && !key.contains('%'))
}

/// Parameters backed by a TOML table
#[derive(Debug, Clone, Default)]
pub struct Parameters {
    values: toml::Table,
}

impl Parameters {
    pub fn new(values: toml::Table) -> Self {
        Self { values }
    }
}

impl ParameterResolver for Parameters {
    fn resolve(&self, key: &str) -> Result<ParameterValue, ConfigError> {
        let not_found = || ConfigError::ParameterNotFound {
            key: key.to_string(),
        };

        let mut segments = key.split('.');
        let first = segments.next().ok_or_else(not_found)?;
        let mut current = self.values.get(first).ok_or_else(not_found)?;

        for segment in segments {
            current = current
                .as_table()
                .and_then(|table| table.get(segment))
                .ok_or_else(not_found)?;
        }

        match current {
            toml::Value::String(s) => Ok(ParameterValue::String(s.clone())),
            toml::Value::Integer(i) => Ok(ParameterValue::Integer(*i)),
            toml::Value::Float(v) => Ok(ParameterValue::Float(*v)),
            toml::Value::Boolean(b) => Ok(ParameterValue::Boolean(*b)),
            // Datetimes are passed through in their TOML text form.
            toml::Value::Datetime(dt) => Ok(ParameterValue::String(dt.to_string())),
            other => Err(ConfigError::ParameterNotScalar {
                key: key.to_string(),
                kind: other.type_str(),
            }),
        }
    }
}
