//! Advisory checks on a loaded configuration
//!
//! Everything the schema forbids is rejected by the loader. The checks here
//! look at values that are legal but probably not what the operator meant.

use crate::schema::{ServiceConfig, KNOWN_IMAGE_FORMATS};
use std::num::NonZeroUsize;

/// Worker threads per available core above which a warning is raised
const MAX_THREADS_PER_CORE: usize = 4;

/// Pull update times below this many seconds cause a warning
const MIN_SENSIBLE_PULL_UPDATE_SECS: u64 = 60;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate against the parallelism of the current host
    pub fn validate(config: &ServiceConfig) -> ValidationReport {
        let cores = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::validate_for_cores(config, cores)
    }

    /// Validate as if the host had `cores` CPUs
    pub fn validate_for_cores(config: &ServiceConfig, cores: usize) -> ValidationReport {
        let mut report = ValidationReport::new();

        Self::validate_workers(config, cores, &mut report);
        Self::validate_image_defaults(config, &mut report);
        Self::validate_lustre(config, &mut report);
        Self::validate_timing(config, &mut report);

        report
    }

    fn validate_workers(config: &ServiceConfig, cores: usize, report: &mut ValidationReport) {
        let limit = cores.max(1).saturating_mul(MAX_THREADS_PER_CORE);
        if config.worker_threads() as usize > limit {
            report.add_warning(
                "WorkerThreads",
                format!(
                    "{} worker threads on a host with {} cores is very high",
                    config.worker_threads(),
                    cores
                ),
            );
        }
    }

    fn validate_image_defaults(config: &ServiceConfig, report: &mut ValidationReport) {
        if config.default_image_remote().trim().is_empty() {
            report.add_warning("DefaultImageRemote", "Default image remote is empty");
        }

        let format = config.default_image_format();
        if format.trim().is_empty() {
            report.add_warning("DefaultImageFormat", "Default image format is empty");
        } else if !KNOWN_IMAGE_FORMATS.contains(&format) {
            report.add_warning(
                "DefaultImageFormat",
                format!(
                    "Unknown image format '{}'. Known formats: {:?}",
                    format, KNOWN_IMAGE_FORMATS
                ),
            );
        }
    }

    fn validate_lustre(config: &ServiceConfig, report: &mut ValidationReport) {
        if config.default_ost_count() < config.default_lustre_replication() {
            report.add_warning(
                "DefaultOstCount",
                format!(
                    "OST count ({}) is lower than the replication count ({})",
                    config.default_ost_count(),
                    config.default_lustre_replication()
                ),
            );
        }
    }

    fn validate_timing(config: &ServiceConfig, report: &mut ValidationReport) {
        if config.pull_update_time() < MIN_SENSIBLE_PULL_UPDATE_SECS {
            report.add_warning(
                "PullUpdateTime",
                format!(
                    "Pull update time of {}s is very short, images will be re-pulled frequently",
                    config.pull_update_time()
                ),
            );
        }

        if config.image_expiration_timeout().is_zero() {
            report.add_warning(
                "ImageExpirationTimeout",
                "Expiration timeout is zero, images expire as soon as they are looked up",
            );
        }
    }
}

/// Advisory findings for one configuration
///
/// Only warnings: anything that would make a configuration unusable is
/// already a [`types::ConfigError`] from the loader.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub warnings: Vec<ValidationWarning>,
}

/// A legal but questionable value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub field: &'static str,
    pub message: String,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, field: &'static str, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            field,
            message: message.into(),
        });
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn summary(&self) -> String {
        match self.warnings.len() {
            1 => "Validation: 1 warning".to_string(),
            n => format!("Validation: {} warnings", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigLoader;
    use serde_json::json;

    fn load(document: serde_json::Value) -> ServiceConfig {
        ConfigLoader::load(&document).unwrap()
    }

    fn warned_fields(report: &ValidationReport) -> Vec<&str> {
        report.warnings.iter().map(|w| w.field).collect()
    }

    #[test]
    fn test_clean_config_has_no_findings() {
        let config = load(crate::schema::example_document());
        let report = ConfigValidator::validate_for_cores(&config, 8);
        assert!(!report.has_warnings(), "{:?}", report.warnings);
        assert_eq!(report.summary(), "Validation: 0 warnings");
    }

    #[test]
    fn test_questionable_values_warn() {
        let config = load(json!({
            "WorkerThreads": 100,
            "DefaultLustreReplication": 4,
            "DefaultOstCount": 2,
            "DefaultImageRemote": " ",
            "DefaultImageFormat": "qcow2",
            "PullUpdateTime": 5,
            "ImageExpirationTimeout": "0s"
        }));
        let report = ConfigValidator::validate_for_cores(&config, 2);

        assert_eq!(report.summary(), "Validation: 6 warnings");
        assert_eq!(
            warned_fields(&report),
            vec![
                "WorkerThreads",
                "DefaultImageRemote",
                "DefaultImageFormat",
                "DefaultOstCount",
                "PullUpdateTime",
                "ImageExpirationTimeout",
            ]
        );
    }

    #[test]
    fn test_worker_limit_scales_with_cores() {
        let config = load(json!({
            "WorkerThreads": 16,
            "DefaultImageRemote": "index.docker.io",
            "DefaultImageFormat": "squashfs",
            "PullUpdateTime": 300
        }));
        assert!(!ConfigValidator::validate_for_cores(&config, 4).has_warnings());
        let report = ConfigValidator::validate_for_cores(&config, 2);
        assert_eq!(report.summary(), "Validation: 1 warning");
        assert_eq!(report.warnings[0].field, "WorkerThreads");
        assert!(ConfigValidator::validate_for_cores(&config, 0).has_warnings());
    }
}
