//! Configuration schema definitions

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use types::ExpirationTimeout;

pub const WORKER_THREADS: &str = "WorkerThreads";
pub const DEFAULT_LUSTRE_REPLICATION: &str = "DefaultLustreReplication";
pub const DEFAULT_OST_COUNT: &str = "DefaultOstCount";
pub const DEFAULT_IMAGE_REMOTE: &str = "DefaultImageRemote";
pub const DEFAULT_IMAGE_FORMAT: &str = "DefaultImageFormat";
pub const PULL_UPDATE_TIME: &str = "PullUpdateTime";
pub const IMAGE_EXPIRATION_TIMEOUT: &str = "ImageExpirationTimeout";

/// Required keys, in the order their absence is reported
pub const REQUIRED_FIELDS: [&str; 4] = [
    WORKER_THREADS,
    DEFAULT_IMAGE_REMOTE,
    DEFAULT_IMAGE_FORMAT,
    PULL_UPDATE_TIME,
];

/// Declared type and constraints of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// JSON integer within `[minimum, maximum]`
    Integer { minimum: i64, maximum: u64 },
    /// Any JSON string
    String,
    /// JSON string holding a time descriptor such as `1:00:00:00` or `24h`
    TimeDescriptor,
}

impl PropertyKind {
    /// JSON Schema type keyword
    pub fn json_type(&self) -> &'static str {
        match self {
            PropertyKind::Integer { .. } => "integer",
            PropertyKind::String | PropertyKind::TimeDescriptor => "string",
        }
    }
}

/// One entry of the image manager configuration schema
#[derive(Debug, Clone, Copy)]
pub struct Property {
    pub name: &'static str,
    pub kind: PropertyKind,
    pub required: bool,
    pub description: &'static str,
}

const COUNT: PropertyKind = PropertyKind::Integer {
    minimum: 1,
    maximum: u32::MAX as u64,
};

const SECONDS: PropertyKind = PropertyKind::Integer {
    minimum: 1,
    maximum: u64::MAX,
};

/// Every property the image manager understands, in declaration order
pub const PROPERTIES: [Property; 7] = [
    Property {
        name: WORKER_THREADS,
        kind: COUNT,
        required: true,
        description: "Number of worker threads to instantiate",
    },
    Property {
        name: DEFAULT_LUSTRE_REPLICATION,
        kind: COUNT,
        required: false,
        description: "number of copies of an image to generate",
    },
    Property {
        name: DEFAULT_OST_COUNT,
        kind: COUNT,
        required: false,
        description: "number of OSTs to stripe images across (if lustre)",
    },
    Property {
        name: DEFAULT_IMAGE_REMOTE,
        kind: PropertyKind::String,
        required: true,
        description: "Default remote location to use if unspecified",
    },
    Property {
        name: DEFAULT_IMAGE_FORMAT,
        kind: PropertyKind::String,
        required: true,
        description: "Default image format",
    },
    Property {
        name: PULL_UPDATE_TIME,
        kind: SECONDS,
        required: true,
        description: "number of seconds an image is assumed up-to-date after pull",
    },
    Property {
        name: IMAGE_EXPIRATION_TIMEOUT,
        kind: PropertyKind::TimeDescriptor,
        required: false,
        description: "time descriptor detailing how long until an image will expire after lookup or pull",
    },
];

/// Look up a property by its exact (case-sensitive) name
pub fn property(name: &str) -> Option<&'static Property> {
    PROPERTIES.iter().find(|p| p.name == name)
}

/// Validated image manager configuration
///
/// Only [`ConfigLoader`](crate::ConfigLoader) builds one. There are no
/// setters; a configuration change means loading a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceConfig {
    #[serde(rename = "WorkerThreads")]
    worker_threads: u32,
    #[serde(rename = "DefaultLustreReplication")]
    default_lustre_replication: u32,
    #[serde(rename = "DefaultOstCount")]
    default_ost_count: u32,
    #[serde(rename = "DefaultImageRemote")]
    default_image_remote: String,
    #[serde(rename = "DefaultImageFormat")]
    default_image_format: String,
    #[serde(rename = "PullUpdateTime")]
    pull_update_time: u64,
    #[serde(rename = "ImageExpirationTimeout")]
    image_expiration_timeout: ExpirationTimeout,
}

// Default value functions
pub fn default_lustre_replication() -> u32 {
    1
}

pub fn default_ost_count() -> u32 {
    1
}

pub fn default_image_expiration_timeout() -> ExpirationTimeout {
    ExpirationTimeout::from_secs(24 * 60 * 60) // 1 day
}

/// Multiple of the pull update time a single pull may run for
pub const PULL_TIMEOUT_FACTOR: u32 = 10;

/// Formats the image converter can produce
pub const KNOWN_IMAGE_FORMATS: [&str; 3] = ["squashfs", "ext4", "cramfs"];

impl ServiceConfig {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        worker_threads: u32,
        default_lustre_replication: u32,
        default_ost_count: u32,
        default_image_remote: String,
        default_image_format: String,
        pull_update_time: u64,
        image_expiration_timeout: ExpirationTimeout,
    ) -> Self {
        Self {
            worker_threads,
            default_lustre_replication,
            default_ost_count,
            default_image_remote,
            default_image_format,
            pull_update_time,
            image_expiration_timeout,
        }
    }

    pub fn worker_threads(&self) -> u32 {
        self.worker_threads
    }

    pub fn default_lustre_replication(&self) -> u32 {
        self.default_lustre_replication
    }

    pub fn default_ost_count(&self) -> u32 {
        self.default_ost_count
    }

    pub fn default_image_remote(&self) -> &str {
        &self.default_image_remote
    }

    pub fn default_image_format(&self) -> &str {
        &self.default_image_format
    }

    /// Seconds an image is assumed up-to-date after a pull
    pub fn pull_update_time(&self) -> u64 {
        self.pull_update_time
    }

    pub fn image_expiration_timeout(&self) -> ExpirationTimeout {
        self.image_expiration_timeout
    }

    pub fn pull_update_interval(&self) -> Duration {
        Duration::from_secs(self.pull_update_time)
    }

    /// Longest a single pull may run before it is considered stalled
    pub fn pull_timeout(&self) -> Duration {
        self.pull_update_interval().saturating_mul(PULL_TIMEOUT_FACTOR)
    }

    /// Earliest time an image pulled at `last_pull` should be pulled again
    pub fn next_pull_after(&self, last_pull: DateTime<Utc>) -> DateTime<Utc> {
        saturating_add(last_pull, self.pull_update_interval())
    }

    pub fn is_up_to_date(&self, last_pull: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now < self.next_pull_after(last_pull)
    }

    /// Expiry timestamp to record for an image looked up or pulled at `now`
    pub fn expiration_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        saturating_add(now, self.image_expiration_timeout.as_duration())
    }

    pub fn is_expired(&self, expiration: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        expiration < now
    }
}

fn saturating_add(at: DateTime<Utc>, delta: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delta)
        .ok()
        .and_then(|d| at.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Draft-04 JSON Schema describing the configuration document
///
/// Title, property names, types and minimums match the schema shipped with the
/// image gateway. Two spelling fixes: "stripe" in the `DefaultOstCount`
/// description, and no trailing comma in `required`.
pub fn json_schema() -> Value {
    let mut properties = Map::new();
    for property in &PROPERTIES {
        let mut entry = json!({
            "description": property.description,
            "type": property.kind.json_type(),
        });
        if let PropertyKind::Integer { minimum, .. } = property.kind {
            entry["minimum"] = json!(minimum);
        }
        properties.insert(property.name.to_string(), entry);
    }

    json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "title": "imagemanager Configuration Schema",
        "type": "object",
        "properties": properties,
        "required": REQUIRED_FIELDS,
    })
}

/// A complete, valid configuration document
pub fn example_document() -> Value {
    let mut document = Map::new();
    document.insert(WORKER_THREADS.to_string(), json!(8));
    document.insert(
        DEFAULT_LUSTRE_REPLICATION.to_string(),
        json!(default_lustre_replication()),
    );
    document.insert(DEFAULT_OST_COUNT.to_string(), json!(16));
    document.insert(DEFAULT_IMAGE_REMOTE.to_string(), json!("index.docker.io"));
    document.insert(DEFAULT_IMAGE_FORMAT.to_string(), json!("squashfs"));
    document.insert(PULL_UPDATE_TIME.to_string(), json!(300));
    document.insert(
        IMAGE_EXPIRATION_TIMEOUT.to_string(),
        json!(default_image_expiration_timeout().to_string()),
    );
    Value::Object(document)
}
