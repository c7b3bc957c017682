//! I/O scheduler selection
//!
//! The kernel lists available schedulers in `queue/scheduler` with the active
//! one in brackets, e.g. `mq-deadline kyber [bfq] none`. Each device class has
//! a priority list; the first candidate the kernel offers wins.

use serde::Serialize;

const ROTATIONAL_PRIORITY: &[&str] = &["bfq", "mq-deadline", "deadline"];
const NVME_PRIORITY: &[&str] = &["kyber", "mq-deadline", "none"];
const EMMC_PRIORITY: &[&str] = &["mq-deadline", "deadline", "noop", "none"];
const SSD_PRIORITY: &[&str] = &["mq-deadline", "kyber", "deadline", "none"];

/// Broad device class driving the scheduler choice
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Rotational,
    Nvme,
    Emmc,
    SolidState,
}

impl DeviceClass {
    /// Classify a device by kernel name and its rotational flag
    #[must_use]
    pub fn detect(basename: &str, rotational: bool) -> Self {
        if rotational {
            Self::Rotational
        } else if basename.starts_with("nvme") {
            Self::Nvme
        } else if basename.starts_with("mmcblk") {
            Self::Emmc
        } else {
            Self::SolidState
        }
    }

    #[must_use]
    pub const fn priorities(self) -> &'static [&'static str] {
        match self {
            Self::Rotational => ROTATIONAL_PRIORITY,
            Self::Nvme => NVME_PRIORITY,
            Self::Emmc => EMMC_PRIORITY,
            Self::SolidState => SSD_PRIORITY,
        }
    }
}

/// Scheduler names offered by a sysfs `scheduler` listing
pub fn available(listing: &str) -> impl Iterator<Item = &str> {
    listing
        .split_whitespace()
        .map(|name| name.trim_start_matches('[').trim_end_matches(']'))
}

/// The currently active scheduler, shown in brackets
#[must_use]
pub fn active(listing: &str) -> Option<&str> {
    listing
        .split_whitespace()
        .find_map(|name| name.strip_prefix('[')?.strip_suffix(']'))
}

/// Pick the preferred scheduler for a device class, if the kernel offers one
#[must_use]
pub fn select_scheduler(listing: &str, class: DeviceClass) -> Option<&'static str> {
    class
        .priorities()
        .iter()
        .find(|&&candidate| available(listing).any(|name| name == candidate))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_class() {
        assert_eq!(DeviceClass::detect("sda", true), DeviceClass::Rotational);
        assert_eq!(DeviceClass::detect("nvme0n1", false), DeviceClass::Nvme);
        assert_eq!(DeviceClass::detect("mmcblk0", false), DeviceClass::Emmc);
        assert_eq!(DeviceClass::detect("sdb", false), DeviceClass::SolidState);
    }

    #[test]
    fn test_parse_listing() {
        let listing = "mq-deadline kyber [bfq] none\n";
        let names: Vec<&str> = available(listing).collect();
        assert_eq!(names, ["mq-deadline", "kyber", "bfq", "none"]);
        assert_eq!(active(listing), Some("bfq"));
        assert_eq!(active("none"), None);
    }

    #[test]
    fn test_select_by_priority() {
        let listing = "[mq-deadline] kyber bfq none";
        assert_eq!(select_scheduler(listing, DeviceClass::Rotational), Some("bfq"));
        assert_eq!(select_scheduler(listing, DeviceClass::Nvme), Some("kyber"));
        assert_eq!(select_scheduler(listing, DeviceClass::SolidState), Some("mq-deadline"));
    }

    #[test]
    fn test_select_requires_exact_name() {
        // "deadline" must not match inside "mq-deadline".
        assert_eq!(select_scheduler("[mq-deadline] none", DeviceClass::Rotational), Some("mq-deadline"));
        assert_eq!(select_scheduler("[none]", DeviceClass::Rotational), None);
        assert_eq!(select_scheduler("", DeviceClass::Nvme), None);
    }
}
