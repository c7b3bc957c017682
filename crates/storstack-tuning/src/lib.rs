//! Tuning for storstack
//!
//! - [`params`]: pure derivation of tuning values from a topology
//! - [`probe`]: measured device values from hdparm, blockdev and sysfs
//! - [`scheduler`]: I/O scheduler selection per device class
//! - [`planner`]: the complete [`TuningPlan`] for a configuration

pub mod params;
pub mod planner;
pub mod probe;
pub mod scheduler;

pub use planner::{DiskTuning, FsTuning, Planner, RaidTuning, RaidVolumeTuning, TuningPlan};
pub use probe::{DeviceProbe, SystemProbe};
