// Integration tests for catalog-adapter
//
// Each test builds a throwaway workspace (catalog, schema, policy and a
// per-combination input tree) and runs the full generator against it.

use std::fs;
use std::path::PathBuf;

use serde_json::{Value, json};
use tempfile::TempDir;

use catalog_adapter::error::{EXIT_INPUT_NOT_FOUND, EXIT_PROCESSING_ERROR};
use catalog_adapter::{AdapterError, FailureMode, RunConfig, generate, generate_from_catalog};

const DEFAULT_POLICY: &str = include_str!("../resources/adapter_policy_default.json");

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        ws.write("catalog.json", &json!({"Catalog": {"Name": "test", "Version": "1.0"}}));
        ws.write("CatalogSchema.json", &json!({"type": "object"}));
        fs::create_dir_all(ws.input_dir()).unwrap();
        ws
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn input_dir(&self) -> PathBuf {
        self.path("out/main")
    }

    fn output_dir(&self) -> PathBuf {
        self.path("out/adapter/input/config")
    }

    fn write(&self, rel: &str, value: &Value) {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn write_source(&self, combo: &str, file: &str, value: Value) {
        self.write(&format!("out/main/{combo}/{file}"), &value);
    }

    fn write_policy(&self, policy: &Value) {
        self.write("policy.json", policy);
    }

    fn config(&self) -> RunConfig {
        RunConfig {
            schema: self.path("CatalogSchema.json"),
            input_dir: self.input_dir(),
            output_dir: self.output_dir(),
            policy: self.path("policy.json"),
            jobs: Some(2),
            ..RunConfig::new(self.path("catalog.json"))
        }
    }

    fn output(&self, rel: &str) -> Value {
        let text = fs::read_to_string(self.output_dir().join(rel)).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn output_exists(&self, rel: &str) -> bool {
        self.output_dir().join(rel).exists()
    }
}

fn functional_layer() -> Value {
    json!({
        "K8S Controller": {"packages": [
            {"package": "kubeadm", "type": "rpm", "repo_name": "k8s", "architecture": ["x86_64"]},
            {"package": "kubectl", "type": "rpm", "repo_name": "k8s", "architecture": ["x86_64"]},
            {"package": "etcd", "type": "tarball", "uri": "https://example.com/etcd.tar.gz", "architecture": ["x86_64"]}
        ]},
        "K8S Worker": {"packages": [
            {"package": "kubelet", "type": "rpm", "repo_name": "k8s", "architecture": ["x86_64"]},
            {"package": "kubeadm", "type": "rpm", "repo_name": "k8s", "architecture": ["x86_64"]},
            {"package": "kubectl", "type": "rpm", "repo_name": "k8s", "architecture": ["x86_64"]}
        ]},
        "Login Node": {"packages": [
            {"package": "munge", "type": "rpm", "repo_name": "baseos"},
            {"package": "slurm", "type": "rpm", "repo_name": "slurm"}
        ]},
        "Compiler": {"packages": [
            {"package": "gcc", "type": "rpm", "repo_name": "appstream"}
        ]},
        "Slurm Controller": {"packages": [
            {"package": "munge", "type": "rpm", "repo_name": "baseos"},
            {"package": "slurm-slurmctld", "type": "rpm", "repo_name": "slurm"}
        ]},
        "Slurm Worker": {"packages": [
            {"package": "munge", "type": "rpm", "repo_name": "baseos"},
            {"package": "slurm", "type": "rpm", "repo_name": "slurm"}
        ]}
    })
}

fn base_os() -> Value {
    json!({
        "Base OS": {"packages": [
            {"package": "nfs-utils", "type": "rpm", "repo_name": "baseos", "architecture": ["x86_64"]},
            {"package": "openldap-clients", "type": "rpm", "repo_name": "baseos", "architecture": ["x86_64"]},
            {"package": "libnfsidmap", "type": "rpm", "repo_name": "baseos", "architecture": ["x86_64"]},
            {"package": "vim-enhanced", "type": "rpm", "repo_name": "appstream", "architecture": ["x86_64"]}
        ]}
    })
}

fn default_workspace(combos: &[&str]) -> Workspace {
    let ws = Workspace::new();
    for combo in combos {
        ws.write_source(combo, "functional_layer.json", functional_layer());
        ws.write_source(combo, "base_os.json", base_os());
        ws.write_source(
            combo,
            "miscellaneous.json",
            json!({"Miscellaneous": {"packages": [{"package": "jq", "type": "rpm"}]}}),
        );
    }
    ws.write("policy.json", &serde_json::from_str::<Value>(DEFAULT_POLICY).unwrap());
    ws
}

fn names(role: &Value) -> Vec<&str> {
    role["cluster"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["package"].as_str().unwrap())
        .collect()
}

// =============================================================================
// Default policy scenarios
// =============================================================================

#[test]
fn test_default_policy_generates_all_targets() {
    let ws = default_workspace(&["x86_64/rhel/9.0"]);
    let summary = generate(&ws.config()).unwrap();

    assert_eq!(summary.combinations, 1);
    assert_eq!(summary.units, 7);
    assert_eq!(summary.written.len(), 7);
    for file in [
        "default_packages.json",
        "nfs.json",
        "openldap.json",
        "openmpi.json",
        "service_k8s.json",
        "slurm_custom.json",
        "miscellaneous.json",
    ] {
        assert!(ws.output_exists(&format!("x86_64/rhel/9.0/{file}")), "{file} missing");
    }
}

#[test]
fn test_k8s_common_packages_are_extracted() {
    let ws = default_workspace(&["x86_64/rhel/9.0"]);
    generate(&ws.config()).unwrap();

    let k8s = ws.output("x86_64/rhel/9.0/service_k8s.json");
    assert_eq!(names(&k8s["service_k8s"]), vec!["kubeadm", "kubectl"]);
    assert_eq!(names(&k8s["service_kube_control_plane"]), vec!["etcd"]);
    assert_eq!(names(&k8s["service_kube_node"]), vec!["kubelet"]);
    assert!(k8s["service_k8s"]["cluster"][0].get("architecture").is_none());
}

#[test]
fn test_slurm_common_packages_are_extracted() {
    let ws = default_workspace(&["x86_64/rhel/9.0"]);
    generate(&ws.config()).unwrap();

    let slurm = ws.output("x86_64/rhel/9.0/slurm_custom.json");
    assert_eq!(names(&slurm["slurms_custom"]), vec!["munge", "slurm"]);
    assert!(names(&slurm["login_node"]).is_empty());
    assert_eq!(names(&slurm["login_compiler_node"]), vec!["gcc"]);
    assert_eq!(names(&slurm["slurm_control_node"]), vec!["slurm-slurmctld"]);
    assert!(names(&slurm["slurm_node"]).is_empty());
}

#[test]
fn test_nfs_substring_filter() {
    let ws = default_workspace(&["x86_64/rhel/9.0"]);
    generate(&ws.config()).unwrap();

    let nfs = ws.output("x86_64/rhel/9.0/nfs.json");
    assert_eq!(names(&nfs["nfs"]), vec!["nfs-utils", "libnfsidmap"]);
    assert_eq!(
        nfs["nfs"]["cluster"][0],
        json!({"package": "nfs-utils", "type": "rpm", "repo_name": "baseos"})
    );

    let openmpi = ws.output("x86_64/rhel/9.0/openmpi.json");
    assert!(names(&openmpi["openmpi"]).is_empty());
}

#[test]
fn test_every_combination_gets_output() {
    let ws = default_workspace(&["x86_64/rhel/9.0", "aarch64/rhel/9.0", "x86_64/rhel/8.8"]);
    let summary = generate(&ws.config()).unwrap();

    assert_eq!(summary.combinations, 3);
    assert_eq!(summary.written.len(), 21);
    assert!(ws.output_exists("aarch64/rhel/9.0/nfs.json"));
    assert!(ws.output_exists("x86_64/rhel/8.8/service_k8s.json"));
}

#[test]
fn test_runs_are_byte_identical() {
    let ws = default_workspace(&["x86_64/rhel/9.0", "aarch64/rhel/9.0"]);
    let first = generate(&ws.config()).unwrap();
    let snapshot: Vec<(PathBuf, Vec<u8>)> = first
        .written
        .iter()
        .map(|p| (p.clone(), fs::read(p).unwrap()))
        .collect();

    let mut config = ws.config();
    config.jobs = Some(1);
    let second = generate(&config).unwrap();
    assert_eq!(first.written, second.written);
    for (path, bytes) in snapshot {
        assert_eq!(fs::read(&path).unwrap(), bytes, "{} changed", path.display());
    }
}

// =============================================================================
// Policy features
// =============================================================================

#[test]
fn test_conditions_skip_other_architectures() {
    let ws = Workspace::new();
    for combo in ["x86_64/rhel/9.0", "aarch64/rhel/9.0"] {
        ws.write_source(combo, "base_os.json", base_os());
    }
    ws.write_policy(&json!({
        "version": "2.0.0",
        "targets": {
            "x86_only.json": {
                "conditions": {"architectures": ["x86_64"]},
                "sources": [{"source_file": "base_os.json", "pulls": [{"source_key": "Base OS"}]}]
            }
        }
    }));

    let summary = generate(&ws.config()).unwrap();
    assert_eq!(summary.written.len(), 1);
    assert_eq!(summary.skipped, 1);
    assert!(ws.output_exists("x86_64/rhel/9.0/x86_only.json"));
    assert!(!ws.output_exists("aarch64/rhel/9.0/x86_only.json"));
}

#[test]
fn test_multi_source_merge_with_renames() {
    let ws = Workspace::new();
    ws.write_source("x86_64/rhel/9.0", "base_os.json", base_os());
    ws.write_source(
        "x86_64/rhel/9.0",
        "infrastructure.json",
        json!({"csi_driver_powerscale": {"packages": [
            {"package": "csi-powerscale", "type": "git", "url": "https://example.com/csi.git", "version": "v2.11.0"}
        ]}}),
    );
    ws.write_policy(&json!({
        "version": "2.0.0",
        "targets": {
            "combined.json": {
                "sources": [
                    {
                        "source_file": "base_os.json",
                        "pulls": [{
                            "source_key": "Base OS",
                            "target_key": "editors",
                            "filter": {"type": "allowlist", "field": "repo_name", "values": ["appstream"]},
                            "transform": {"exclude_fields": ["architecture", "repo_name"]}
                        }]
                    },
                    {
                        "source_file": "infrastructure.json",
                        "pulls": [{
                            "source_key": "csi_driver_powerscale",
                            "target_key": "csi",
                            "transform": {"rename_fields": {"url": "uri"}}
                        }]
                    }
                ]
            }
        }
    }));

    generate(&ws.config()).unwrap();
    let out = ws.output("x86_64/rhel/9.0/combined.json");
    assert_eq!(out["editors"]["cluster"], json!([{"package": "vim-enhanced", "type": "rpm"}]));
    assert_eq!(out["csi"]["cluster"][0]["uri"], json!("https://example.com/csi.git"));
    assert!(out["csi"]["cluster"][0].get("url").is_none());
}

#[test]
fn test_target_without_roles_is_not_written() {
    let ws = Workspace::new();
    ws.write_source("x86_64/rhel/9.0", "base_os.json", base_os());
    ws.write_policy(&json!({
        "version": "2.0.0",
        "targets": {
            "empty.json": {"sources": [{"source_file": "base_os.json", "pulls": []}]}
        }
    }));

    let summary = generate(&ws.config()).unwrap();
    assert!(summary.written.is_empty());
    assert_eq!(summary.skipped, 1);
    assert!(!ws.output_exists("x86_64/rhel/9.0/empty.json"));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_nonexistent_role_fails_only_its_unit() {
    let ws = Workspace::new();
    ws.write_source("x86_64/rhel/9.0", "functional_layer.json", functional_layer());
    ws.write_policy(&json!({
        "version": "2.0.0",
        "targets": {
            "bad.json": {"sources": [{
                "source_file": "functional_layer.json",
                "pulls": [{"source_key": "Nonexistent Role"}]
            }]},
            "good.json": {"sources": [{
                "source_file": "functional_layer.json",
                "pulls": [{"source_key": "K8S Worker"}]
            }]}
        }
    }));

    let err = generate(&ws.config()).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_PROCESSING_ERROR);
    let AdapterError::UnitsFailed { failed, total, first, .. } = &err else {
        panic!("Expected UnitsFailed, got {err}");
    };
    assert_eq!((*failed, *total), (1, 2));
    assert!(first.to_string().contains("Role 'Nonexistent Role' not found"));
    assert!(ws.output_exists("x86_64/rhel/9.0/good.json"));
    assert!(!ws.output_exists("x86_64/rhel/9.0/bad.json"));
}

#[test]
fn test_fail_fast_stops_after_first_failure() {
    let ws = Workspace::new();
    for combo in ["a/rhel/9.0", "b/rhel/9.0", "c/rhel/9.0"] {
        ws.write_source(combo, "functional_layer.json", functional_layer());
    }
    ws.write_policy(&json!({
        "version": "2.0.0",
        "targets": {
            "bad.json": {"sources": [{
                "source_file": "functional_layer.json",
                "pulls": [{"source_key": "Nonexistent Role"}]
            }]}
        }
    }));

    let mut config = ws.config();
    config.jobs = Some(1);
    config.failure_mode = FailureMode::FailFast;
    let err = generate(&config).unwrap_err();
    let AdapterError::UnitsFailed { failed, total, .. } = err else {
        panic!("Expected UnitsFailed");
    };
    assert_eq!((failed, total), (1, 3));
}

#[test]
fn test_missing_source_file_exits_with_input_not_found() {
    let ws = Workspace::new();
    ws.write_source("x86_64/rhel/9.0", "functional_layer.json", functional_layer());
    ws.write_policy(&json!({
        "version": "2.0.0",
        "targets": {
            "default_packages.json": {"sources": [{
                "source_file": "base_os.json",
                "pulls": [{"source_key": "Base OS"}]
            }]}
        }
    }));

    let err = generate(&ws.config()).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_INPUT_NOT_FOUND);
}

#[test]
fn test_invalid_policy_writes_nothing() {
    let ws = default_workspace(&["x86_64/rhel/9.0"]);
    ws.write_policy(&json!({
        "version": "2.0.0",
        "targets": {
            "bad.json": {"sources": [{
                "source_file": "base_os.json",
                "pulls": [{"source_key": "Base OS", "filter": {"type": "regex", "values": ["^nfs"]}}]
            }]}
        }
    }));

    let err = generate(&ws.config()).unwrap_err();
    assert!(matches!(err, AdapterError::Policy { .. }));
    assert_eq!(err.exit_code(), EXIT_PROCESSING_ERROR);
    assert!(!ws.output_dir().exists());
}

#[test]
fn test_missing_inputs_are_reported_before_work() {
    let ws = default_workspace(&["x86_64/rhel/9.0"]);

    let mut config = ws.config();
    config.input_dir = ws.path("missing");
    assert_eq!(generate(&config).unwrap_err().exit_code(), EXIT_INPUT_NOT_FOUND);

    let mut config = ws.config();
    config.policy = ws.path("missing.json");
    assert_eq!(generate(&config).unwrap_err().exit_code(), EXIT_INPUT_NOT_FOUND);

    let mut config = ws.config();
    config.schema = ws.path("missing.json");
    assert_eq!(generate(&config).unwrap_err().exit_code(), EXIT_INPUT_NOT_FOUND);

    assert!(!ws.output_dir().exists());
}

#[test]
fn test_malformed_catalog_is_rejected_unless_skipped() {
    let ws = default_workspace(&["x86_64/rhel/9.0"]);
    fs::write(ws.path("catalog.json"), "{ not json").unwrap();

    let err = generate(&ws.config()).unwrap_err();
    assert_eq!(err.exit_code(), EXIT_PROCESSING_ERROR);

    let mut config = ws.config();
    config.skip_catalog_check = true;
    assert!(generate(&config).is_ok());
}

#[test]
fn test_generate_from_catalog_requires_catalog() {
    let ws = Workspace::new();
    let out = ws.path("elsewhere");
    let err = generate_from_catalog(
        &ws.path("missing-catalog.json"),
        &ws.path("CatalogSchema.json"),
        &out,
        None,
    )
    .unwrap_err();
    assert_eq!(err.exit_code(), EXIT_INPUT_NOT_FOUND);
    assert!(!out.exists());
}
