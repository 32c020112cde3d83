//! End-to-end template loading: files on disk → rendered → parsed groups.

use std::fs;
use std::path::PathBuf;

use kubedeploy_renderer::{load_resource_set, EnvOverlay, RenderError};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write template");
    path
}

fn overlay() -> EnvOverlay {
    EnvOverlay::from_vars([
        ("PLUGIN_IMAGE_TAG", "1.4.2"),
        ("DRONE_COMMIT_SHA", "abc123"),
    ])
}

const DEPLOYMENT: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
  annotations:
    commit: "{{ .env.DRONE_COMMIT_SHA }}"
    owner: "{{ .env.OWNER }}"
spec:
  template:
    spec:
      containers:
        - name: web
          image: "ghcr.io/acme/web:{{ .env.image_tag }}"
---
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  ports:
    - port: 80
"#;

#[test]
fn one_group_per_file_in_order() {
    let dir = TempDir::new().expect("tempdir");
    let app = write(&dir, "app.yaml", DEPLOYMENT);
    let ns = write(
        &dir,
        "ns.yml",
        "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: web\n",
    );

    let set = load_resource_set(&[ns.clone(), app.clone()], &overlay()).expect("load");
    assert_eq!(set.groups.len(), 2);
    assert_eq!(set.groups[0].source, ns);
    assert_eq!(set.groups[1].source, app);
    assert_eq!(set.object_count(), 3);
}

#[test]
fn env_values_are_substituted() {
    let dir = TempDir::new().expect("tempdir");
    let app = write(&dir, "app.yaml", DEPLOYMENT);

    let set = load_resource_set(&[app], &overlay()).expect("load");
    let deploy = &set.groups[0].objects[0];
    assert_eq!(
        deploy.get_path(&["metadata", "annotations", "commit"]).and_then(|v| v.as_str()),
        Some("abc123")
    );
    assert_eq!(
        deploy.get_path(&["metadata", "annotations", "owner"]).and_then(|v| v.as_str()),
        Some(""),
        "unset variables must render empty"
    );
    let image = deploy.as_value()["spec"]["template"]["spec"]["containers"][0]["image"]
        .as_str()
        .expect("image");
    assert_eq!(image, "ghcr.io/acme/web:1.4.2");
}

#[test]
fn non_manifest_files_are_skipped() {
    let dir = TempDir::new().expect("tempdir");
    let readme = write(&dir, "README.md", "# not a manifest {{");
    let app = write(&dir, "app.yaml", DEPLOYMENT);

    let set = load_resource_set(&[readme, app], &overlay()).expect("load");
    assert_eq!(set.groups.len(), 1);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TempDir::new().expect("tempdir");
    let err = load_resource_set(&[dir.path().join("gone.yaml")], &overlay()).unwrap_err();
    assert!(matches!(err, RenderError::Io { .. }), "got: {err}");
}

#[test]
fn bad_document_names_the_file() {
    let dir = TempDir::new().expect("tempdir");
    let bad = write(&dir, "bad.yaml", "apiVersion: v1\nkind: Service\n");
    let err = load_resource_set(&[bad], &overlay()).unwrap_err();
    assert!(matches!(err, RenderError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("bad.yaml"));
}

#[test]
fn configmap_script_with_shell_length_expansion_loads() {
    let dir = TempDir::new().expect("tempdir");
    let cm = write(
        &dir,
        "cm.yaml",
        "apiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: scripts\ndata:\n  run.sh: |\n    echo ${#ARGS[@]}\n",
    );

    let set = load_resource_set(&[cm], &EnvOverlay::default()).expect("load");
    let obj = &set.groups[0].objects[0];
    assert_eq!(
        obj.get_path(&["data", "run.sh"]).and_then(|v| v.as_str()),
        Some("echo ${#ARGS[@]}\n")
    );
}
