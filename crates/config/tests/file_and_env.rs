//! End-to-end loading from files with environment overrides

use config::{ConfigLoader, ServiceConfig};
use std::io::Write;
use tempfile::{Builder, NamedTempFile};
use types::ConfigError;

const PREFIX: &str = "IMAGEMNGR_IT_";

fn write_config(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn load(file: &NamedTempFile) -> Result<ServiceConfig, ConfigError> {
    ConfigLoader::new().with_env_prefix(PREFIX).load_file(file.path())
}

const MINIMAL_JSON: &str = r#"{
    "WorkerThreads": 4,
    "DefaultImageRemote": "registry.example.org",
    "DefaultImageFormat": "squashfs",
    "PullUpdateTime": 300,
    "Platforms": {"systema": {"accesstype": "local"}}
}"#;

#[test]
fn loads_json_file_without_overrides() {
    let file = write_config(".json", MINIMAL_JSON);
    let config = temp_env::with_vars_unset(["IMAGEMNGR_IT_WORKERTHREADS"], || load(&file)).unwrap();
    assert_eq!(config.worker_threads(), 4);
    assert_eq!(config.pull_update_time(), 300);
}

#[test]
fn loads_yaml_file() {
    let file = write_config(
        ".yml",
        "WorkerThreads: 3\nDefaultImageRemote: index.docker.io\nDefaultImageFormat: ext4\nPullUpdateTime: 120\nImageExpirationTimeout: \"2:00:00:00\"\n",
    );
    let config = temp_env::with_vars_unset(["IMAGEMNGR_IT_WORKERTHREADS"], || load(&file)).unwrap();
    assert_eq!(config.worker_threads(), 3);
    assert_eq!(config.default_image_format(), "ext4");
    assert_eq!(config.image_expiration_timeout().as_secs(), 2 * 86_400);
}

#[test]
fn environment_overrides_file_values() {
    let file = write_config(".json", MINIMAL_JSON);
    let config = temp_env::with_vars(
        [
            ("IMAGEMNGR_IT_WORKERTHREADS", Some("16")),
            ("IMAGEMNGR_IT_DefaultImageFormat", Some("cramfs")),
            ("IMAGEMNGR_IT_IMAGEEXPIRATIONTIMEOUT", Some("12h")),
        ],
        || load(&file),
    )
    .unwrap();

    assert_eq!(config.worker_threads(), 16);
    assert_eq!(config.default_image_format(), "cramfs");
    assert_eq!(config.image_expiration_timeout().as_secs(), 12 * 3600);
    assert_eq!(config.default_image_remote(), "registry.example.org");
}

#[test]
fn environment_can_supply_missing_required_field() {
    let file = write_config(
        ".json",
        r#"{"WorkerThreads": 4, "DefaultImageRemote": "r", "DefaultImageFormat": "squashfs"}"#,
    );

    let err = temp_env::with_vars_unset(["IMAGEMNGR_IT_PULLUPDATETIME"], || load(&file)).unwrap_err();
    assert_eq!(err.field(), Some("PullUpdateTime"));

    let config = temp_env::with_var("IMAGEMNGR_IT_PULLUPDATETIME", Some("90"), || load(&file)).unwrap();
    assert_eq!(config.pull_update_time(), 90);
}

#[test]
fn numeric_environment_value_stays_a_string_for_string_fields() {
    let file = write_config(".json", MINIMAL_JSON);
    let config = temp_env::with_var("IMAGEMNGR_IT_DEFAULTIMAGEREMOTE", Some("8080"), || load(&file))
        .unwrap();
    assert_eq!(config.default_image_remote(), "8080");
}

#[test]
fn environment_text_is_kept_verbatim_for_string_fields() {
    let file = write_config(".json", MINIMAL_JSON);
    for raw in ["007", "1.50", "[a]", "true", "1e3", "{\"a\": 1}"] {
        let config = temp_env::with_var("IMAGEMNGR_IT_DEFAULTIMAGEREMOTE", Some(raw), || load(&file))
            .unwrap();
        assert_eq!(config.default_image_remote(), raw);
    }

    let config = temp_env::with_var("IMAGEMNGR_IT_DEFAULTIMAGEFORMAT", Some("0123"), || load(&file))
        .unwrap();
    assert_eq!(config.default_image_format(), "0123");
}

#[test]
fn integer_fields_only_accept_integer_text() {
    let file = write_config(".json", MINIMAL_JSON);

    let config = temp_env::with_var("IMAGEMNGR_IT_WORKERTHREADS", Some(" 8 "), || load(&file)).unwrap();
    assert_eq!(config.worker_threads(), 8);

    for raw in ["007", "1.50", "[8]", "true"] {
        let err = temp_env::with_var("IMAGEMNGR_IT_WORKERTHREADS", Some(raw), || load(&file)).unwrap_err();
        assert!(
            matches!(err, ConfigError::TypeMismatch { ref field, .. } if field == "WorkerThreads"),
            "{}: {:?}",
            raw,
            err
        );
    }
}

#[test]
fn oversized_environment_integer_is_a_range_error() {
    let file = write_config(".json", MINIMAL_JSON);
    let err = temp_env::with_var(
        "IMAGEMNGR_IT_PULLUPDATETIME",
        Some("99999999999999999999"),
        || load(&file),
    )
    .unwrap_err();
    match err {
        ConfigError::ConstraintViolation {
            field, constraint, ..
        } => {
            assert_eq!(field, "PullUpdateTime");
            assert_eq!(constraint, format!("<= {}", u64::MAX));
        }
        other => panic!("expected constraint violation, got {:?}", other),
    }
}

#[test]
fn environment_values_are_still_validated() {
    let file = write_config(".json", MINIMAL_JSON);

    let err = temp_env::with_var("IMAGEMNGR_IT_WORKERTHREADS", Some("0"), || load(&file)).unwrap_err();
    assert!(matches!(err, ConfigError::ConstraintViolation { .. }));

    let err = temp_env::with_var("IMAGEMNGR_IT_WORKERTHREADS", Some("many"), || load(&file)).unwrap_err();
    assert!(matches!(err, ConfigError::TypeMismatch { .. }));
}

#[test]
fn unknown_environment_keys_are_ignored() {
    let file = write_config(".json", MINIMAL_JSON);
    let config = temp_env::with_var("IMAGEMNGR_IT_MONGODBURI", Some("mongodb://db"), || load(&file))
        .unwrap();
    assert_eq!(config.worker_threads(), 4);
}

#[test]
fn malformed_file_contents_are_rejected() {
    let file = write_config(".json", "[1, 2, 3]");
    let err = load(&file).unwrap_err();
    assert!(matches!(err, ConfigError::MalformedDocument { .. }));

    let file = write_config(".json", "{\"WorkerThreads\": ");
    let err = load(&file).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn unsupported_extension_is_rejected() {
    let file = write_config(".toml", "WorkerThreads = 4\n");
    let err = load(&file).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { ref extension } if extension == "toml"));
}
