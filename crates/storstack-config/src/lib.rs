//! Topology configuration for storstack
//!
//! Topology documents are YAML trees describing disks, RAID volumes, crypt
//! volumes, filesystems, bind mounts and NFS exports. Several documents can be
//! folded together with [`merge_all`] before they are decoded into a typed
//! [`Configuration`].

pub mod loader;
pub mod node;
pub mod schema;

pub use loader::{dump_node, load_configuration, load_many, load_merged, load_node, parse_node};
pub use node::{merge, merge_all, ConfigNode, Mapping, Scalar, Shape};
pub use schema::Configuration;
