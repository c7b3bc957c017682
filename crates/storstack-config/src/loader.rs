//! YAML loading and dumping of topology documents

use crate::node::{merge_all, ConfigNode};
use crate::schema::Configuration;
use std::path::Path;
use storstack_common::{Error, Result};
use tracing::debug;

/// Parse a YAML document into a configuration tree
///
/// An empty document is an empty mapping. Any other non-mapping root is rejected.
pub fn parse_node(raw: &str) -> Result<ConfigNode> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(raw).map_err(|e| Error::Yaml(e.to_string()))?;
    match ConfigNode::try_from(value)? {
        node @ ConfigNode::Mapping(_) => Ok(node),
        ConfigNode::Scalar(crate::node::Scalar::Null) => Ok(ConfigNode::empty_mapping()),
        other => Err(Error::Yaml(format!(
            "document root must be a mapping, got a {}",
            other.shape()
        ))),
    }
}

/// Load one YAML document from disk
pub fn load_node(path: impl AsRef<Path>) -> Result<ConfigNode> {
    let path = path.as_ref();
    debug!("Loading topology document {}", path.display());
    let raw = std::fs::read_to_string(path)?;
    parse_node(&raw).map_err(|e| match e {
        Error::Yaml(msg) => Error::Yaml(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Load several YAML documents, preserving their order
pub fn load_many<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<ConfigNode>> {
    paths.iter().map(load_node).collect()
}

/// Load and merge several documents into one tree
pub fn load_merged<P: AsRef<Path>>(paths: &[P]) -> Result<ConfigNode> {
    let nodes = load_many(paths)?;
    merge_all(&nodes)
}

/// Load one document and decode it into a typed configuration
pub fn load_configuration(path: impl AsRef<Path>) -> Result<Configuration> {
    Configuration::from_node(&load_node(path)?)
}

/// Render a configuration tree as YAML, keeping key order
pub fn dump_node(node: &ConfigNode) -> Result<String> {
    serde_yaml::to_string(node).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_empty_document() {
        assert_eq!(parse_node("").unwrap(), ConfigNode::empty_mapping());
        assert_eq!(parse_node("# only a comment\n").unwrap(), ConfigNode::empty_mapping());
    }

    #[test]
    fn test_parse_rejects_non_mapping_root() {
        assert!(matches!(parse_node("- a\n- b\n"), Err(Error::Yaml(_))));
        assert!(matches!(parse_node("key: [unclosed\n"), Err(Error::Yaml(_))));
    }

    #[test]
    fn test_dump_preserves_order() {
        let node = parse_node("raid:\n  volumes: []\ndisk:\n  device_groups: []\n").unwrap();
        let dumped = dump_node(&node).unwrap();
        let raid = dumped.find("raid").unwrap();
        let disk = dumped.find("disk").unwrap();
        assert!(raid < disk);
        assert_eq!(parse_node(&dumped).unwrap(), node);
    }

    #[test]
    fn test_load_merged_files() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("base.yaml");
        let extra = dir.path().join("extra.yaml");
        fs::write(
            &base,
            "raid:\n  speed_limit_min: 1000\n  volumes:\n    - name: data\n",
        )
        .unwrap();
        fs::write(
            &extra,
            "raid:\n  speed_limit_min: 5000\n  volumes:\n    - name: scratch\n",
        )
        .unwrap();

        let merged = load_merged(&[&base, &extra]).unwrap();
        let raid = merged.get("raid").unwrap();
        assert_eq!(raid.get("speed_limit_min"), Some(&ConfigNode::from(5000_i64)));
        match raid.get("volumes") {
            Some(ConfigNode::Sequence(volumes)) => assert_eq!(volumes.len(), 2),
            other => panic!("unexpected volumes: {other:?}"),
        }
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(load_node("/nonexistent/topology.yaml"), Err(Error::Io(_))));
    }
}
