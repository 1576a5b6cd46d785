//! Kernel version model and the retention planner.
//!
//! A version is the numeric tuple `MAJOR.MINOR.PATCH-BUILD`; any trailing
//! variation suffix (`-generic`, `-lowlatency`) belongs to the package name,
//! not to the version identity, so entries differing only by variation
//! collapse to one version for planning.

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Error, Result};

/// A parsed kernel version. Ordering is strict lexicographic comparison of
/// the four numeric fields, matching how the distribution orders its kernel
/// packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KernelVersion {
    /// Leading release number.
    pub major: u32,
    /// Second release number.
    pub minor: u32,
    /// Patch level.
    pub patch: u32,
    /// Distribution build number after the dash.
    pub build: u32,
}

impl KernelVersion {
    /// Parse `MAJOR.MINOR.PATCH-BUILD` exactly; anything trailing rejects.
    pub fn parse(s: &str) -> Option<Self> {
        match Self::parse_prefix(s) {
            Some((version, "")) => Some(version),
            _ => None,
        }
    }

    /// What: Parse a version anchored at the start of `s`.
    ///
    /// Inputs:
    /// - `s`: Text beginning with a version, e.g. `5.15.0-91-generic`.
    ///
    /// Output:
    /// - The version and the unconsumed remainder, or `None` when the text
    ///   does not start with the version grammar.
    pub fn parse_prefix(s: &str) -> Option<(Self, &str)> {
        let (major, s) = take_number(s)?;
        let s = s.strip_prefix('.')?;
        let (minor, s) = take_number(s)?;
        let s = s.strip_prefix('.')?;
        let (patch, s) = take_number(s)?;
        let s = s.strip_prefix('-')?;
        let (build, rest) = take_number(s)?;
        Some((
            Self {
                major,
                minor,
                patch,
                build,
            },
            rest,
        ))
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}-{}",
            self.major, self.minor, self.patch, self.build
        )
    }
}

/// Split a leading run of ASCII digits off `s`.
fn take_number(s: &str) -> Option<(u32, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}

/// Where the running kernel sits among the installed versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningPosition {
    /// The only installed version; nothing to plan.
    Only,
    /// The oldest installed version; planning must wait for a reboot.
    Oldest,
    /// Between other versions; newer kernels remain after the purge.
    Middle,
    /// The newest installed version.
    Latest,
}

/// Outcome of the retention computation.
#[derive(Debug)]
pub struct RetentionPlan {
    /// The immediate predecessor of the running version, always retained as
    /// the rollback target (absent for `Only`/`Oldest`).
    pub rollback: Option<KernelVersion>,
    /// Versions safe to purge, ascending. Never contains the rollback
    /// target, the running version, or anything newer.
    pub remove: Vec<KernelVersion>,
    /// Position classification for messaging.
    pub position: RunningPosition,
}

/// What: Compute the conservative retention/removal split.
///
/// Inputs:
/// - `installed`: Deduplicated set of installed kernel versions.
/// - `running`: The booted kernel's version.
///
/// Output:
/// - A [`RetentionPlan`]; `StateInconsistency` when `running` is not among
///   `installed` (drift between `uname` and the package metadata).
///
/// # Errors
///
/// - Returns `Err` only for the running-version-not-installed case; every
///   other input has a plan, possibly an empty one.
///
/// Details:
/// - Only versions strictly older than the retained predecessor become
///   removal candidates, so a rollback path always survives the purge.
pub fn plan_retention(
    installed: &BTreeSet<KernelVersion>,
    running: KernelVersion,
) -> Result<RetentionPlan> {
    let kernels: Vec<KernelVersion> = installed.iter().copied().collect();
    let Some(index) = kernels.iter().position(|v| *v == running) else {
        return Err(Error::StateInconsistency(format!(
            "Current kernel {running} seems to be not installed!"
        )));
    };
    if kernels.len() == 1 {
        return Ok(RetentionPlan {
            rollback: None,
            remove: Vec::new(),
            position: RunningPosition::Only,
        });
    }
    if index == 0 {
        return Ok(RetentionPlan {
            rollback: None,
            remove: Vec::new(),
            position: RunningPosition::Oldest,
        });
    }
    let position = if index == kernels.len() - 1 {
        RunningPosition::Latest
    } else {
        RunningPosition::Middle
    };
    Ok(RetentionPlan {
        rollback: Some(kernels[index - 1]),
        remove: kernels[..index - 1].to_vec(),
        position,
    })
}

#[cfg(test)]
mod tests {
    use super::{KernelVersion, RunningPosition, plan_retention};
    use std::collections::BTreeSet;

    fn v(s: &str) -> KernelVersion {
        KernelVersion::parse(s).unwrap_or_else(|| panic!("bad test version {s}"))
    }

    fn set(versions: &[&str]) -> BTreeSet<KernelVersion> {
        versions.iter().map(|s| v(s)).collect()
    }

    #[test]
    fn parse_display_round_trip() {
        for s in ["1.0.0-1", "5.15.0-91", "6.8.0-1014", "0.0.0-0"] {
            assert_eq!(v(s).to_string(), s);
        }
    }

    #[test]
    fn parse_rejects_malformed_versions() {
        for s in ["6.8.0", "6.8-49", "abc", "6.8.0-49x", "6.8.0-49-generic", ""] {
            assert!(KernelVersion::parse(s).is_none(), "{s} should not parse");
        }
    }

    #[test]
    fn parse_prefix_leaves_variation_suffix() {
        let (version, rest) =
            KernelVersion::parse_prefix("5.15.0-91-generic").unwrap_or_else(|| panic!("no parse"));
        assert_eq!(version, v("5.15.0-91"));
        assert_eq!(rest, "-generic");
    }

    /// What: Ordering matches componentwise numeric comparison.
    ///
    /// Inputs:
    /// - Version pairs where string comparison and numeric comparison differ.
    ///
    /// Output:
    /// - Numeric ordering wins in every field position.
    #[test]
    fn ordering_is_numeric_per_field() {
        assert!(v("1.0.0-2") < v("1.0.0-10"));
        assert!(v("1.2.3-4") < v("1.10.0-1"));
        assert!(v("4.9.0-99") < v("5.0.0-1"));
        assert!(v("5.15.0-91") < v("5.15.1-1"));
        assert_eq!(v("5.15.0-91"), v("5.15.0-91"));
    }

    #[test]
    fn single_kernel_plans_nothing() {
        let plan = plan_retention(&set(&["5.15.0-91"]), v("5.15.0-91"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(plan.position, RunningPosition::Only);
        assert!(plan.remove.is_empty());
        assert!(plan.rollback.is_none());
    }

    #[test]
    fn oldest_running_kernel_defers_to_reboot() {
        let plan = plan_retention(&set(&["1.0.0-1", "1.0.0-2", "1.0.0-3"]), v("1.0.0-1"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(plan.position, RunningPosition::Oldest);
        assert!(plan.remove.is_empty());
    }

    #[test]
    fn middle_running_kernel_keeps_predecessor_and_removes_nothing_yet() {
        // Three installed, running the middle one: the only older version IS
        // the retained predecessor, so no removal candidates remain.
        let plan = plan_retention(&set(&["1.0.0-1", "1.0.0-2", "1.0.0-3"]), v("1.0.0-2"))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(plan.position, RunningPosition::Middle);
        assert_eq!(plan.rollback, Some(v("1.0.0-1")));
        assert!(plan.remove.is_empty());
    }

    #[test]
    fn latest_running_kernel_purges_everything_before_predecessor() {
        let plan = plan_retention(
            &set(&["1.0.0-1", "1.0.0-2", "1.0.0-3", "1.0.0-4"]),
            v("1.0.0-4"),
        )
        .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(plan.position, RunningPosition::Latest);
        assert_eq!(plan.rollback, Some(v("1.0.0-3")));
        assert_eq!(plan.remove, vec![v("1.0.0-1"), v("1.0.0-2")]);
    }

    #[test]
    fn predecessor_is_never_a_removal_candidate() {
        let installed = set(&["4.4.0-1", "4.4.0-7", "5.0.0-3", "5.4.0-2", "5.4.0-9"]);
        for running in ["4.4.0-7", "5.0.0-3", "5.4.0-2", "5.4.0-9"] {
            let plan = plan_retention(&installed, v(running)).unwrap_or_else(|e| panic!("{e}"));
            let rollback = plan.rollback.unwrap_or_else(|| panic!("no rollback"));
            assert!(rollback < v(running));
            assert!(!plan.remove.contains(&rollback));
            assert!(plan.remove.iter().all(|r| *r < rollback));
        }
    }

    #[test]
    fn unknown_running_kernel_is_a_state_inconsistency() {
        let err = plan_retention(&set(&["1.0.0-1", "1.0.0-2"]), v("2.0.0-1"));
        match err {
            Err(crate::error::Error::StateInconsistency(msg)) => {
                assert!(msg.contains("2.0.0-1"));
            }
            other => panic!("expected state inconsistency, got {other:?}"),
        }
    }
}
