//! Configuration loader implementation

use crate::schema::{
    self, default_image_expiration_timeout, default_lustre_replication, default_ost_count,
    example_document, PropertyKind, ServiceConfig, PROPERTIES, REQUIRED_FIELDS,
};
use figment::providers::Env;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info, warn};
use types::utils::{describe_value, is_integer, json_type_name};
use types::{ConfigError, ExpirationTimeout};

/// Default prefix for environment variable overrides
pub const DEFAULT_ENV_PREFIX: &str = "IMAGEMNGR_";

type Result<T> = std::result::Result<T, ConfigError>;

/// Document formats understood by [`ConfigLoader::load_file`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "json" => Ok(DocumentFormat::Json),
            "yaml" | "yml" => Ok(DocumentFormat::Yaml),
            _ => Err(ConfigError::UnsupportedFormat { extension }),
        }
    }

    pub fn parse(&self, content: &str) -> Result<Value> {
        match self {
            DocumentFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            DocumentFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
        }
    }

    pub fn render(&self, document: &Value) -> Result<String> {
        match self {
            DocumentFormat::Json => serde_json::to_string_pretty(document)
                .map_err(|e| ConfigError::Parse(e.to_string())),
            DocumentFormat::Yaml => serde_yaml::to_string(&to_yaml(document))
                .map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }
}

// Numbers keep their literal text in serde_json, which serde_yaml cannot
// serialize directly.
fn to_yaml(value: &Value) -> serde_yaml::Value {
    match value {
        Value::Null => serde_yaml::Value::Null,
        Value::Bool(b) => serde_yaml::Value::Bool(*b),
        Value::Number(n) => n
            .as_u64()
            .map(serde_yaml::Number::from)
            .or_else(|| n.as_i64().map(serde_yaml::Number::from))
            .or_else(|| n.as_f64().map(serde_yaml::Number::from))
            .map(serde_yaml::Value::Number)
            .unwrap_or_else(|| serde_yaml::Value::String(n.to_string())),
        Value::String(s) => serde_yaml::Value::String(s.clone()),
        Value::Array(items) => serde_yaml::Value::Sequence(items.iter().map(to_yaml).collect()),
        Value::Object(map) => serde_yaml::Value::Mapping(
            map.iter()
                .map(|(k, v)| (serde_yaml::Value::String(k.clone()), to_yaml(v)))
                .collect(),
        ),
    }
}

/// Configuration loader that validates documents into a [`ServiceConfig`]
///
/// [`ConfigLoader::load`] is the pure validation pass. The file helpers only
/// acquire a document (plus environment overrides) and hand it to `load`.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Set environment variable prefix for overrides
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Validate a raw document and build the configuration from it
    ///
    /// Checks run in a fixed order and stop at the first problem:
    /// document shape, required keys, value types, then constraints.
    /// Optional keys that are absent get their documented defaults.
    pub fn load(document: &Value) -> Result<ServiceConfig> {
        let map = document
            .as_object()
            .ok_or_else(|| ConfigError::MalformedDocument {
                actual: json_type_name(document).to_string(),
            })?;

        for field in REQUIRED_FIELDS {
            if !map.contains_key(field) {
                return Err(ConfigError::MissingRequiredField {
                    field: field.to_string(),
                });
            }
        }

        for key in map.keys() {
            if schema::property(key).is_none() {
                debug!(key = %key, "Ignoring unknown configuration key");
            }
        }

        for property in &PROPERTIES {
            if let Some(value) = map.get(property.name) {
                check_type(property.name, property.kind, value)?;
            }
        }

        for property in &PROPERTIES {
            if let Some(value) = map.get(property.name) {
                check_constraint(property.name, property.kind, value)?;
            }
        }

        let config = ServiceConfig::new(
            required(map, schema::WORKER_THREADS, integer_field)?,
            optional(map, schema::DEFAULT_LUSTRE_REPLICATION, integer_field)?
                .unwrap_or_else(default_lustre_replication),
            optional(map, schema::DEFAULT_OST_COUNT, integer_field)?
                .unwrap_or_else(default_ost_count),
            required(map, schema::DEFAULT_IMAGE_REMOTE, string_field)?,
            required(map, schema::DEFAULT_IMAGE_FORMAT, string_field)?,
            required(map, schema::PULL_UPDATE_TIME, integer_field)?,
            optional(map, schema::IMAGE_EXPIRATION_TIMEOUT, timeout_field)?
                .unwrap_or_else(default_image_expiration_timeout),
        );

        for property in PROPERTIES.iter().filter(|p| !p.required) {
            if !map.contains_key(property.name) {
                debug!(field = property.name, "Using default for absent optional field");
            }
        }

        Ok(config)
    }

    /// Load configuration from a JSON string
    pub fn load_from_str(json_content: &str) -> Result<ServiceConfig> {
        let document = DocumentFormat::Json.parse(json_content)?;
        Self::load(&document)
    }

    /// Load configuration from a YAML string
    pub fn load_from_yaml_str(yaml_content: &str) -> Result<ServiceConfig> {
        let document = DocumentFormat::Yaml.parse(yaml_content)?;
        Self::load(&document)
    }

    /// Load configuration from file and environment variables
    pub fn load_file<P: AsRef<Path>>(&self, config_path: P) -> Result<ServiceConfig> {
        let config_path = config_path.as_ref();

        // Check if config file exists
        if !config_path.exists() {
            return Err(ConfigError::FileNotFound {
                path: config_path.display().to_string(),
            });
        }

        let format = DocumentFormat::from_path(config_path)?;
        let content = std::fs::read_to_string(config_path)?;
        let mut document = format.parse(&content)?;

        self.apply_env_overrides(&mut document)?;

        let config = Self::load(&document)?;
        info!(
            path = %config_path.display(),
            worker_threads = config.worker_threads(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Overlay `<prefix><Property>` environment variables onto a document
    ///
    /// Names match properties case-insensitively. String properties take the
    /// variable's text verbatim. Integer properties take it as a JSON number
    /// when it reads as one, otherwise as a string so `load` reports the type.
    pub fn apply_env_overrides(&self, document: &mut Value) -> Result<()> {
        let overrides: Vec<(String, String)> = Env::prefixed(&self.env_prefix)
            .iter()
            .map(|(key, raw)| (key.as_str().to_string(), raw))
            .collect();

        if overrides.is_empty() {
            return Ok(());
        }

        // A malformed document is reported by `load`, not here.
        let Some(map) = document.as_object_mut() else {
            return Ok(());
        };

        for (key, raw) in overrides {
            let Some(property) = PROPERTIES
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(&key))
            else {
                warn!(
                    variable = %format!("{}{}", self.env_prefix, key.to_ascii_uppercase()),
                    "Ignoring environment variable with no matching configuration field"
                );
                continue;
            };

            let value = match property.kind {
                PropertyKind::Integer { .. } => match serde_json::from_str::<Value>(raw.trim()) {
                    Ok(number @ Value::Number(_)) => number,
                    _ => Value::String(raw),
                },
                PropertyKind::String | PropertyKind::TimeDescriptor => Value::String(raw),
            };

            debug!(field = property.name, "Overriding configuration field from environment");
            map.insert(property.name.to_string(), value);
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let content = format.render(&example_document())?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn check_type(field: &str, kind: PropertyKind, value: &Value) -> Result<()> {
    let matches = match kind {
        PropertyKind::Integer { .. } => is_integer(value),
        PropertyKind::String | PropertyKind::TimeDescriptor => value.is_string(),
    };

    if matches {
        Ok(())
    } else {
        Err(ConfigError::TypeMismatch {
            field: field.to_string(),
            expected: kind.json_type().to_string(),
            actual: format!("{} {}", json_type_name(value), describe_value(value)),
        })
    }
}

fn check_constraint(field: &str, kind: PropertyKind, value: &Value) -> Result<()> {
    let violation = |constraint: String| ConfigError::ConstraintViolation {
        field: field.to_string(),
        constraint,
        actual: describe_value(value),
    };

    match kind {
        PropertyKind::Integer { minimum, maximum } => {
            // integers past the i64/u64 range only carry their sign
            let negative = value.to_string().starts_with('-');
            if value.as_i64().map_or(negative, |n| n < minimum) {
                return Err(violation(format!(">= {}", minimum)));
            }
            if value.as_u64().map_or(!negative, |n| n > maximum) {
                return Err(violation(format!("<= {}", maximum)));
            }
            Ok(())
        }
        PropertyKind::String => Ok(()),
        PropertyKind::TimeDescriptor => {
            let raw = value.as_str().unwrap_or_default();
            raw.parse::<ExpirationTimeout>()
                .map(|_| ())
                .map_err(|e| violation(format!("time descriptor (D:H:M:S or e.g. 24h): {}", e)))
        }
    }
}

fn required<T>(
    map: &Map<String, Value>,
    field: &str,
    extract: fn(&str, &Value) -> Result<T>,
) -> Result<T> {
    optional(map, field, extract)?.ok_or_else(|| ConfigError::MissingRequiredField {
        field: field.to_string(),
    })
}

fn optional<T>(
    map: &Map<String, Value>,
    field: &str,
    extract: fn(&str, &Value) -> Result<T>,
) -> Result<Option<T>> {
    map.get(field).map(|value| extract(field, value)).transpose()
}

// `check_constraint` has already bounded the value to the property's range,
// so the error arm cannot be reached for a property in `PROPERTIES`.
fn integer_field<T: TryFrom<u64>>(field: &str, value: &Value) -> Result<T> {
    value
        .as_u64()
        .and_then(|n| T::try_from(n).ok())
        .ok_or_else(|| {
            let constraint = match schema::property(field).map(|p| p.kind) {
                Some(PropertyKind::Integer { minimum, maximum }) => {
                    format!(">= {} and <= {}", minimum, maximum)
                }
                _ => "integer".to_string(),
            };
            ConfigError::ConstraintViolation {
                field: field.to_string(),
                constraint,
                actual: describe_value(value),
            }
        })
}

fn string_field(field: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ConfigError::TypeMismatch {
            field: field.to_string(),
            expected: "string".to_string(),
            actual: describe_value(value),
        })
}

fn timeout_field(field: &str, value: &Value) -> Result<ExpirationTimeout> {
    let raw = string_field(field, value)?;
    raw.parse().map_err(|e: types::TimeoutParseError| ConfigError::ConstraintViolation {
        field: field.to_string(),
        constraint: format!("time descriptor (D:H:M:S or e.g. 24h): {}", e),
        actual: describe_value(value),
    })
}
