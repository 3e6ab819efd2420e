use std::io::Write;

use jobhop::app::App;
use jobhop::catalog::Catalog;
use jobhop::config::load_and_validate;
use jobhop::errors::JobhopError;
use jobhop::registry::LocalRegistry;
use jobhop_test_utils::builders::{ConfigFileBuilder, ResourceConfigBuilder};
use tempfile::NamedTempFile;

fn config_error(toml: &str) -> String {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{toml}").unwrap();
    match load_and_validate(file.path()) {
        Err(JobhopError::ConfigError(msg)) => msg,
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn parses_a_full_config() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[config]
follow_interval_secs = 3
registry_dir = "/tmp/jobhop-registry"

[resource.cluster]
type = "ssh"
host = "login.example.org"
user = "me"
port = 2222

[resource.box]
type = "shell"
id = "fixed-id"
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.config.follow_interval_secs, 3);
    assert_eq!(
        cfg.config.registry_dir.as_deref(),
        Some(std::path::Path::new("/tmp/jobhop-registry"))
    );

    let cluster = cfg.resource_named("cluster").unwrap();
    assert_eq!(cluster.kind, "ssh");
    assert_eq!(cluster.host.as_deref(), Some("login.example.org"));
    assert_eq!(cluster.port, Some(2222));

    assert_eq!(cfg.resource_named("box").unwrap().id, "fixed-id");
}

#[test]
fn empty_config_uses_defaults() {
    let file = NamedTempFile::new().unwrap();
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.config.follow_interval_secs, 10);
    assert!(cfg.resource.is_empty());
}

#[test]
fn ssh_resource_needs_a_host() {
    let msg = config_error("[resource.cluster]\ntype = \"ssh\"\n");
    assert!(msg.contains("cluster"));
    assert!(msg.contains("host"));
}

#[test]
fn shell_resource_cannot_set_a_host() {
    let msg = config_error("[resource.box]\ntype = \"shell\"\nhost = \"x\"\n");
    assert!(msg.contains("box"));
}

#[test]
fn follow_interval_must_be_positive() {
    let msg = config_error("[config]\nfollow_interval_secs = 0\n");
    assert!(msg.contains("follow_interval_secs"));
}

#[test]
fn local_must_stay_a_shell() {
    let msg = config_error("[resource.local]\ntype = \"ssh\"\nhost = \"h\"\n");
    assert!(msg.contains("local"));
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[resource.x\ntype = ").unwrap();
    assert!(matches!(
        load_and_validate(file.path()),
        Err(JobhopError::TomlError(_))
    ));
}

#[test]
fn local_resource_is_implicit() {
    let cfg = ConfigFileBuilder::new().build();
    let local = cfg.resource_named("local").unwrap();
    assert_eq!(local.kind, "shell");
    assert_eq!(local.id, cfg.resource_named("local").unwrap().id);

    match cfg.resource_named("nowhere") {
        Err(JobhopError::ResourceNotFound(name)) => assert_eq!(name, "nowhere"),
        other => panic!("expected ResourceNotFound, got {other:?}"),
    }
}

#[test]
fn derived_ids_are_stable_and_distinct() {
    let cfg = ConfigFileBuilder::new()
        .with_resource("a", ResourceConfigBuilder::shell().build())
        .with_resource("b", ResourceConfigBuilder::shell().build())
        .build();
    let a = cfg.resource_named("a").unwrap();
    let b = cfg.resource_named("b").unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(a.id, cfg.resource_named("a").unwrap().id);
}

#[test]
fn resource_for_job_checks_identity() {
    let cfg = ConfigFileBuilder::new()
        .with_resource("box", ResourceConfigBuilder::shell().id("id-1").build())
        .build();
    assert!(cfg.resource_for_job("box", "id-1").is_ok());
    assert!(matches!(
        cfg.resource_for_job("box", "id-2"),
        Err(JobhopError::ResourceNotFound(_))
    ));
    assert!(matches!(
        cfg.resource_for_job("gone", "id-1"),
        Err(JobhopError::ResourceNotFound(_))
    ));
}

#[test]
fn unknown_resource_types_are_rejected_by_the_app() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ConfigFileBuilder::new()
        .with_resource("pod", ResourceConfigBuilder::of_type("kubernetes").build())
        .build();
    match App::new(cfg, Catalog::builtin(), LocalRegistry::new(dir.path())) {
        Err(JobhopError::ConfigError(msg)) => {
            assert!(msg.contains("pod"));
            assert!(msg.contains("kubernetes"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn ssh_resource_builds_an_ssh_session() {
    let cfg = ConfigFileBuilder::new()
        .with_resource("cluster", ResourceConfigBuilder::ssh("login").user("me").port(22).build())
        .build();
    let resource = cfg.resource_named("cluster").unwrap();
    let session = resource.get_session(&Catalog::builtin()).unwrap();
    assert_eq!(session.transport_kind(), "ssh");
    assert!(!session.is_open());
}
