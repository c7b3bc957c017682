//! Untyped configuration trees and the hierarchical merge
//!
//! A [`ConfigNode`] is a closed union of mapping, sequence and scalar. Merging
//! never mutates its inputs: mappings merge key by key, sequences concatenate
//! and scalars are replaced by the right-hand side. Merging two nodes of a
//! different shape is an [`Error::InconsistentType`].

use indexmap::IndexMap;
use serde::de::{DeserializeOwned, Error as _};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use storstack_common::{Error, Result};

/// Ordered string-keyed mapping of nodes
pub type Mapping = IndexMap<String, ConfigNode>;

/// A configuration tree value
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigNode {
    Mapping(Mapping),
    Sequence(Vec<ConfigNode>),
    Scalar(Scalar),
}

/// Leaf values of a configuration tree
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Shape class of a node, the unit of merge compatibility
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Mapping,
    Sequence,
    Scalar,
}

impl Shape {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mapping => "mapping",
            Self::Sequence => "sequence",
            Self::Scalar => "scalar",
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl ConfigNode {
    /// An empty mapping, the identity of [`merge_all`]
    #[must_use]
    pub fn empty_mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    #[must_use]
    pub const fn shape(&self) -> Shape {
        match self {
            Self::Mapping(_) => Shape::Mapping,
            Self::Sequence(_) => Shape::Sequence,
            Self::Scalar(_) => Shape::Scalar,
        }
    }

    #[must_use]
    pub const fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Look up a key if this node is a mapping
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_mapping().and_then(|m| m.get(key))
    }

    /// Decode this node into a typed record
    ///
    /// `path` names the node in error messages.
    pub fn decode<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let value = serde_yaml::Value::from(self.clone());
        serde_yaml::from_value(value).map_err(|e| Error::invalid_field(path, e.to_string()))
    }
}

impl From<Scalar> for ConfigNode {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl From<i64> for ConfigNode {
    fn from(v: i64) -> Self {
        Self::Scalar(Scalar::Int(v))
    }
}

impl From<&str> for ConfigNode {
    fn from(v: &str) -> Self {
        Self::Scalar(Scalar::String(v.to_string()))
    }
}

impl From<bool> for ConfigNode {
    fn from(v: bool) -> Self {
        Self::Scalar(Scalar::Bool(v))
    }
}

impl From<Vec<Self>> for ConfigNode {
    fn from(v: Vec<Self>) -> Self {
        Self::Sequence(v)
    }
}

impl From<Mapping> for ConfigNode {
    fn from(m: Mapping) -> Self {
        Self::Mapping(m)
    }
}

/// Merge two configuration trees into a new tree
pub fn merge(lhs: &ConfigNode, rhs: &ConfigNode) -> Result<ConfigNode> {
    merge_at(lhs, rhs, &mut Vec::new())
}

/// Left-fold [`merge`] over `nodes`, starting from an empty mapping
pub fn merge_all<'a, I>(nodes: I) -> Result<ConfigNode>
where
    I: IntoIterator<Item = &'a ConfigNode>,
{
    nodes
        .into_iter()
        .try_fold(ConfigNode::empty_mapping(), |acc, node| merge(&acc, node))
}

fn merge_at(lhs: &ConfigNode, rhs: &ConfigNode, path: &mut Vec<String>) -> Result<ConfigNode> {
    match (lhs, rhs) {
        (ConfigNode::Mapping(l), ConfigNode::Mapping(r)) => {
            let mut result = l.clone();
            for (key, value) in r {
                let merged = match result.get(key) {
                    Some(existing) => {
                        path.push(key.clone());
                        let merged = merge_at(existing, value, path);
                        path.pop();
                        merged?
                    }
                    None => value.clone(),
                };
                // Existing keys keep their position.
                result.insert(key.clone(), merged);
            }
            Ok(ConfigNode::Mapping(result))
        }
        (ConfigNode::Sequence(l), ConfigNode::Sequence(r)) => {
            Ok(ConfigNode::Sequence(l.iter().chain(r).cloned().collect()))
        }
        (ConfigNode::Scalar(_), ConfigNode::Scalar(r)) => Ok(ConfigNode::Scalar(r.clone())),
        _ => Err(Error::InconsistentType {
            path: if path.is_empty() {
                ".".to_string()
            } else {
                path.join(".")
            },
            lhs: lhs.shape().name(),
            rhs: rhs.shape().name(),
        }),
    }
}

impl TryFrom<serde_yaml::Value> for ConfigNode {
    type Error = Error;

    fn try_from(value: serde_yaml::Value) -> Result<Self> {
        use serde_yaml::Value;

        Ok(match value {
            Value::Null => Self::Scalar(Scalar::Null),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Scalar(Scalar::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Self::Scalar(Scalar::Float(f))
                } else {
                    return Err(Error::Yaml(format!("unsupported number: {n}")));
                }
            }
            Value::String(s) => Self::Scalar(Scalar::String(s)),
            Value::Sequence(items) => Self::Sequence(
                items
                    .into_iter()
                    .map(Self::try_from)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Mapping(entries) => {
                let mut mapping = Mapping::with_capacity(entries.len());
                for (key, value) in entries {
                    let key = match key {
                        Value::String(s) => s,
                        Value::Bool(b) => b.to_string(),
                        Value::Number(n) => n.to_string(),
                        other => {
                            return Err(Error::Yaml(format!(
                                "mapping keys must be scalars, got {other:?}"
                            )));
                        }
                    };
                    mapping.insert(key, Self::try_from(value)?);
                }
                Self::Mapping(mapping)
            }
            Value::Tagged(tagged) => Self::try_from(tagged.value)?,
        })
    }
}

impl From<ConfigNode> for serde_yaml::Value {
    fn from(node: ConfigNode) -> Self {
        match node {
            ConfigNode::Mapping(m) => Self::Mapping(
                m.into_iter()
                    .map(|(k, v)| (Self::String(k), Self::from(v)))
                    .collect(),
            ),
            ConfigNode::Sequence(items) => {
                Self::Sequence(items.into_iter().map(Self::from).collect())
            }
            ConfigNode::Scalar(Scalar::Null) => Self::Null,
            ConfigNode::Scalar(Scalar::Bool(b)) => Self::Bool(b),
            ConfigNode::Scalar(Scalar::Int(i)) => Self::Number(i.into()),
            ConfigNode::Scalar(Scalar::Float(f)) => Self::Number(f.into()),
            ConfigNode::Scalar(Scalar::String(s)) => Self::String(s),
        }
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Mapping(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Self::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Scalar(Scalar::Null) => serializer.serialize_unit(),
            Self::Scalar(Scalar::Bool(b)) => serializer.serialize_bool(*b),
            Self::Scalar(Scalar::Int(i)) => serializer.serialize_i64(*i),
            Self::Scalar(Scalar::Float(f)) => serializer.serialize_f64(*f),
            Self::Scalar(Scalar::String(s)) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for ConfigNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = serde_yaml::Value::deserialize(deserializer)?;
        Self::try_from(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn map(entries: &[(&str, ConfigNode)]) -> ConfigNode {
        ConfigNode::Mapping(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        )
    }

    fn int(v: i64) -> ConfigNode {
        ConfigNode::from(v)
    }

    fn seq(items: &[i64]) -> ConfigNode {
        ConfigNode::Sequence(items.iter().copied().map(ConfigNode::from).collect())
    }

    fn keys(node: &ConfigNode) -> Vec<&str> {
        node.as_mapping()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_merge_disjoint_keys() {
        let defaults = map(&[("readahead_sectors", int(256)), ("nr_requests", int(128))]);
        let overrides = map(&[("path", "/dev/sdb".into())]);

        let merged = merge(&defaults, &overrides).unwrap();
        assert_eq!(keys(&merged), ["readahead_sectors", "nr_requests", "path"]);
        assert_eq!(merged.get("readahead_sectors"), Some(&int(256)));
        assert_eq!(merged.get("path"), Some(&ConfigNode::from("/dev/sdb")));
    }

    #[test]
    fn test_merge_override_wins() {
        let merged = merge(&map(&[("a", int(1))]), &map(&[("a", int(2))])).unwrap();
        assert_eq!(merged, map(&[("a", int(2))]));
    }

    #[test]
    fn test_merge_recursion() {
        let lhs = map(&[("a", map(&[("x", int(1))]))]);
        let rhs = map(&[("a", map(&[("y", int(2))]))]);
        let expected = map(&[("a", map(&[("x", int(1)), ("y", int(2))]))]);
        assert_eq!(merge(&lhs, &rhs).unwrap(), expected);
    }

    #[test]
    fn test_merge_key_order() {
        let lhs = map(&[("b", int(1)), ("a", int(1))]);
        let rhs = map(&[("c", int(2)), ("a", int(2)), ("d", int(2))]);
        let merged = merge(&lhs, &rhs).unwrap();
        assert_eq!(keys(&merged), ["b", "a", "c", "d"]);
    }

    #[test]
    fn test_merge_sequence_concatenation() {
        assert_eq!(merge(&seq(&[1, 2]), &seq(&[3, 4])).unwrap(), seq(&[1, 2, 3, 4]));
        // No de-duplication.
        assert_eq!(merge(&seq(&[1]), &seq(&[1])).unwrap(), seq(&[1, 1]));
    }

    #[test]
    fn test_merge_scalar_kinds() {
        // Scalars of any kind share a shape class.
        assert_eq!(merge(&int(1), &"one".into()).unwrap(), ConfigNode::from("one"));
        assert_eq!(
            merge(&true.into(), &ConfigNode::Scalar(Scalar::Null)).unwrap(),
            ConfigNode::Scalar(Scalar::Null)
        );
    }

    #[test]
    fn test_merge_type_mismatch() {
        let err = merge(&map(&[("a", int(1))]), &seq(&[1, 2])).unwrap_err();
        assert!(matches!(
            err,
            Error::InconsistentType {
                lhs: "mapping",
                rhs: "sequence",
                ..
            }
        ));
    }

    #[test]
    fn test_merge_type_mismatch_path() {
        let lhs = map(&[("disk", map(&[("device_groups", seq(&[1]))]))]);
        let rhs = map(&[("disk", map(&[("device_groups", map(&[]))]))]);
        match merge(&lhs, &rhs).unwrap_err() {
            Error::InconsistentType { path, .. } => assert_eq!(path, "disk.device_groups"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let lhs = map(&[("a", seq(&[1])), ("b", int(1))]);
        let rhs = map(&[("a", seq(&[2])), ("b", int(2))]);
        let (lhs_before, rhs_before) = (lhs.clone(), rhs.clone());
        let _ = merge(&lhs, &rhs).unwrap();
        assert_eq!(lhs, lhs_before);
        assert_eq!(rhs, rhs_before);
    }

    #[test]
    fn test_merge_all_left_fold() {
        let a = map(&[("raid", map(&[("speed_limit_min", int(1000))])), ("l", seq(&[1]))]);
        let b = map(&[("raid", map(&[("speed_limit_max", int(2000))])), ("l", seq(&[2]))]);
        let c = map(&[("raid", map(&[("speed_limit_min", int(500))])), ("l", seq(&[3]))]);

        let folded = merge_all([&a, &b, &c]).unwrap();
        let nested = merge(
            &merge(&merge(&ConfigNode::empty_mapping(), &a).unwrap(), &b).unwrap(),
            &c,
        )
        .unwrap();
        assert_eq!(folded, nested);
        assert_eq!(folded.get("l"), Some(&seq(&[1, 2, 3])));
        assert_eq!(
            folded.get("raid").and_then(|r| r.get("speed_limit_min")),
            Some(&int(500))
        );
    }

    #[test]
    fn test_merge_all_empty() {
        let docs: Vec<ConfigNode> = Vec::new();
        assert_eq!(merge_all(&docs).unwrap(), ConfigNode::empty_mapping());
    }

    #[test]
    fn test_merge_all_rejects_non_mapping_document() {
        assert!(merge_all([&seq(&[1])]).is_err());
    }

    #[test]
    fn test_merge_random_disjoint_mappings() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let n: usize = rng.gen_range(0..8);
            let m: usize = rng.gen_range(0..8);
            let lhs: Mapping = (0..n)
                .map(|i| (format!("d{i}"), ConfigNode::from(rng.gen_range(0..1000_i64))))
                .collect();
            let rhs: Mapping = (0..m)
                .map(|i| (format!("o{i}"), ConfigNode::from(rng.gen_range(0..1000_i64))))
                .collect();

            let merged = merge(&lhs.clone().into(), &rhs.clone().into()).unwrap();
            let merged = merged.as_mapping().unwrap();
            assert_eq!(merged.len(), n + m);
            for (k, v) in lhs.iter().chain(rhs.iter()) {
                assert_eq!(merged.get(k), Some(v));
            }
        }
    }

    #[test]
    fn test_yaml_value_conversion() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("b: 1\na: [x, 2.5, true, ~]\n1: one\n").unwrap();
        let node = ConfigNode::try_from(value).unwrap();
        assert_eq!(keys(&node), ["b", "a", "1"]);
        assert_eq!(
            node.get("a"),
            Some(&ConfigNode::Sequence(vec![
                "x".into(),
                Scalar::Float(2.5).into(),
                true.into(),
                Scalar::Null.into(),
            ]))
        );
    }

    #[test]
    fn test_decode() {
        #[derive(Deserialize)]
        struct Limits {
            speed_limit_min: u32,
        }

        let node = map(&[("speed_limit_min", int(1000))]);
        let limits: Limits = node.decode("raid").unwrap();
        assert_eq!(limits.speed_limit_min, 1000);

        let bad = map(&[("speed_limit_min", "fast".into())]);
        assert!(matches!(
            bad.decode::<Limits>("raid"),
            Err(Error::InvalidField { path, .. }) if path == "raid"
        ));
    }
}
