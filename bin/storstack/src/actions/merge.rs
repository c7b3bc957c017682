//! `storstack merge`: fold topology documents into one

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use storstack_config::{dump_node, load_many, merge_all, Configuration};
use tracing::info;

/// Merge `inputs` left to right and write the result to `output`, or stdout
pub fn run(inputs: &[PathBuf], output: Option<&Path>) -> Result<()> {
    let merged = merge_documents(inputs)?;
    match output {
        Some(path) => {
            std::fs::write(path, &merged)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Merged {} documents into {}", inputs.len(), path.display());
        }
        None => print!("{merged}"),
    }
    Ok(())
}

/// Merge documents and check the result is a valid topology
pub fn merge_documents(inputs: &[PathBuf]) -> Result<String> {
    let nodes = load_many(inputs).context("failed to load documents")?;
    let merged = merge_all(&nodes)?;
    Configuration::from_node(&merged).context("merged topology is invalid")?;
    Ok(dump_node(&merged)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use storstack_config::parse_node;

    #[test]
    fn test_merge_documents() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let site = dir.path().join("site.yaml");
        std::fs::write(
            &base,
            "raid:\n  speed_limit_min: 1000\nfs:\n  volumes:\n    - {name: a, fs_type: ext4, device_path: /dev/md0, mount_location: /a}\n",
        )
        .unwrap();
        std::fs::write(
            &site,
            "raid:\n  speed_limit_min: 5000\nfs:\n  volumes:\n    - {name: b, fs_type: ext3, device_path: /dev/md1, mount_location: /b}\n",
        )
        .unwrap();

        let merged = merge_documents(&[base, site]).unwrap();
        let config = Configuration::from_node(&parse_node(&merged).unwrap()).unwrap();
        assert_eq!(config.raid.speed_limit_min, 5000);
        let names: Vec<&str> = config.fs.volumes.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn test_merge_rejects_shape_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let site = dir.path().join("site.yaml");
        std::fs::write(&base, "fs:\n  volumes: []\n").unwrap();
        std::fs::write(&site, "fs:\n  volumes: {}\n").unwrap();
        assert!(merge_documents(&[base, site]).is_err());
    }

    #[test]
    fn test_merge_validates_result() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        std::fs::write(&base, "raid:\n  speed_limit_min: 10\n  speed_limit_max: 1\n").unwrap();
        assert!(merge_documents(&[base]).is_err());
    }

    #[test]
    fn test_merge_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let out = dir.path().join("merged.yaml");
        std::fs::write(&base, "bind:\n  read_only: []\n").unwrap();
        run(&[base], Some(&out)).unwrap();
        assert!(std::fs::read_to_string(&out).unwrap().contains("read_only"));
    }
}
