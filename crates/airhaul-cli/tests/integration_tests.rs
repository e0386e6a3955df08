//! Integration tests for CLI commands

use std::path::Path;
use std::process::Command;

/// Helper to run airhaul against a store directory
fn airhaul(store: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_airhaul"))
        .args(args)
        .env("AIRHAUL_STORE_DIR", store)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute airhaul")
}

const CONTENT: &str = r#"apiVersion: content.airhaul.io/v1alpha1
kind: Images
metadata:
  name: base
spec:
  images:
    - ref: nginx:1.25
    - ref: ghcr.io/org/app:v2
---
apiVersion: content.airhaul.io/v1alpha1
kind: Files
metadata:
  name: scripts
spec:
  files:
    - ref: https://get.example.io/install.sh
"#;

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path.display().to_string()
}

mod sync_command {
    use super::*;

    #[test]
    fn test_sync_then_info() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let content = write(dir.path(), "content.yaml", CONTENT);

        let output = airhaul(&store, &["store", "sync", "-f", &content]);
        assert!(output.status.success(), "sync failed: {}", String::from_utf8_lossy(&output.stderr));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Synced 2 document(s), 3 artifact(s)"));

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("is deprecated"));

        let output = airhaul(&store, &["store", "info", "--json"]);
        assert!(output.status.success());
        let json: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
        let refs: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["reference"].as_str().unwrap())
            .collect();
        assert_eq!(
            refs,
            vec![
                "docker.io/library/nginx:1.25",
                "ghcr.io/org/app:v2",
                "airhaul/install.sh:latest"
            ]
        );
        assert_eq!(json[2]["kind"], "file");
    }

    #[test]
    fn test_unsupported_kind() {
        let dir = tempfile::tempdir().unwrap();
        let content = write(
            dir.path(),
            "bogus.yaml",
            "apiVersion: content.airhaul.io/v1alpha1\nkind: Bogus\nspec: {}\n",
        );

        let output = airhaul(&dir.path().join("store"), &["store", "sync", "-f", &content]);
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("unsupported Kind Bogus for content.airhaul.io/v1alpha1"));
    }

    #[test]
    fn test_v1alpha2_not_yet_supported() {
        let dir = tempfile::tempdir().unwrap();
        let content = write(
            dir.path(),
            "next.yaml",
            "apiVersion: collection.airhaul.io/v1alpha2\nkind: K3s\nspec:\n  version: stable\n",
        );

        let output = airhaul(&dir.path().join("store"), &["store", "sync", "-f", &content]);
        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("not yet supported"));
    }

    #[test]
    fn test_missing_content_file_keeps_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let content = write(dir.path(), "content.yaml", CONTENT);
        assert!(airhaul(&store, &["store", "sync", "-f", &content]).status.success());

        let missing = dir.path().join("missing.yaml").display().to_string();
        let output = airhaul(&store, &["store", "sync", "-f", &missing]);
        assert_eq!(output.status.code(), Some(5));

        let output = airhaul(&store, &["store", "info", "--json"]);
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_files_required() {
        let dir = tempfile::tempdir().unwrap();
        let output = airhaul(&dir.path().join("store"), &["store", "sync"]);
        assert!(!output.status.success());
    }
}

mod info_command {
    use super::*;

    #[test]
    fn test_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let output = airhaul(&dir.path().join("store"), &["store", "info"]);
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("No content in store"));
    }
}

mod extract_command {
    use super::*;

    #[test]
    fn test_unreachable_store_registry() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        let content = write(dir.path(), "content.yaml", CONTENT);
        assert!(airhaul(&store, &["store", "sync", "-f", &content]).status.success());

        let out = dir.path().join("out");
        let output = airhaul(
            &store,
            &[
                "store",
                "--store-registry",
                "127.0.0.1:1",
                "extract",
                "airhaul/install.sh:latest",
                "--dir",
                out.to_str().unwrap(),
            ],
        );

        assert_eq!(output.status.code(), Some(4));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("extract 127.0.0.1:1/airhaul/install.sh:latest"));
        assert!(!out.exists());
    }

    #[test]
    fn test_reference_required() {
        let dir = tempfile::tempdir().unwrap();
        let output = airhaul(&dir.path().join("store"), &["store", "extract"]);
        assert!(!output.status.success());
    }
}
