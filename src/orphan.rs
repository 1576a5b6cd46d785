//! Reverse-dependency closure over the orphaned-package candidate set.
//!
//! The dependency map records, for each candidate, the packages an
//! authoritative dry run reports alongside it. Anything that map mentions
//! but does not key is an external blocker; the closure then pulls in every
//! candidate that would drag a blocker along, until nothing more qualifies.
//! What survives is the purge plan, pending independent verification.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};

/// Candidate package mapped to its reverse-dependency set (self excluded).
/// Ordered so every derived listing is deterministic.
pub type DependencyMap = BTreeMap<String, BTreeSet<String>>;

/// Result bundle from the closure computation.
#[derive(Debug)]
pub struct PurgeAnalysis {
    /// Names referenced by some candidate but absent from the candidate set.
    pub externals: BTreeSet<String>,
    /// Externals plus every candidate transitively pinned by them.
    pub blockers: BTreeSet<String>,
    /// Candidates safe to purge, lexicographically sorted.
    pub to_purge: Vec<String>,
}

/// Names appearing in some reverse-dependency set but not among the
/// candidates. Every such name blocks its dependents unconditionally.
pub fn externals(map: &DependencyMap) -> BTreeSet<String> {
    map.values()
        .flatten()
        .filter(|name| !map.contains_key(*name))
        .cloned()
        .collect()
}

/// What: Grow the blocker set to its fixed point.
///
/// Inputs:
/// - `map`: The dependency map.
/// - `seed`: Initial blockers, normally the externals.
///
/// Output:
/// - The stable blocker set: `seed` plus every candidate whose
///   reverse-dependency set intersects it, transitively.
///
/// Details:
/// - The set only grows and candidates are finite, so the loop terminates
///   after at most one pass per candidate. Re-running on the result is a
///   no-op.
pub fn expand_blockers(map: &DependencyMap, seed: &BTreeSet<String>) -> BTreeSet<String> {
    let mut blockers = seed.clone();
    loop {
        let additions: Vec<String> = map
            .iter()
            .filter(|(package, deps)| {
                !blockers.contains(*package) && !deps.is_disjoint(&blockers)
            })
            .map(|(package, _)| package.clone())
            .collect();
        if additions.is_empty() {
            break;
        }
        tracing::debug!(count = additions.len(), "blocker set grew");
        blockers.extend(additions);
    }
    blockers
}

/// Narrow every stored reverse-dependency set to its intersection with the
/// final blockers. Reporting data only; nothing reads it for correctness.
pub fn narrow_to_blockers(map: &mut DependencyMap, blockers: &BTreeSet<String>) {
    for deps in map.values_mut() {
        deps.retain(|name| blockers.contains(name));
    }
}

/// Candidates minus blockers, in key order (lexicographic).
pub fn derive_plan(map: &DependencyMap, blockers: &BTreeSet<String>) -> Vec<String> {
    map.keys()
        .filter(|package| !blockers.contains(*package))
        .cloned()
        .collect()
}

/// Run the whole closure: externals, fixed point, narrowing, plan.
pub fn analyze(map: &mut DependencyMap) -> PurgeAnalysis {
    let externals = externals(map);
    let blockers = expand_blockers(map, &externals);
    narrow_to_blockers(map, &blockers);
    let to_purge = derive_plan(map, &blockers);
    tracing::info!(
        candidates = map.len(),
        externals = externals.len(),
        blocked = blockers.len() - externals.len(),
        planned = to_purge.len(),
        "purge analysis complete"
    );
    PurgeAnalysis {
        externals,
        blockers,
        to_purge,
    }
}

/// What: Demand set-equality between the plan and a fresh simulation.
///
/// Inputs:
/// - `planned`: The derived purge plan.
/// - `verified`: The removal set a second authoritative dry run reported
///   for the whole plan at once.
///
/// Output:
/// - `Ok(())` when set-equal; `PlanVerificationFailed` carrying the sorted
///   symmetric difference otherwise.
///
/// # Errors
///
/// - Returns `Err` on any difference between the two sets, in either
///   direction.
///
/// Details:
/// - Simulating removals one package at a time can diverge from simulating
///   them together, so a mismatch here means the model of reality is wrong
///   and nothing may be executed.
pub fn check_verification(planned: &[String], verified: &[String]) -> Result<()> {
    let planned_set: BTreeSet<&str> = planned.iter().map(String::as_str).collect();
    let verified_set: BTreeSet<&str> = verified.iter().map(String::as_str).collect();
    if planned_set == verified_set {
        return Ok(());
    }
    let missing = planned_set
        .difference(&verified_set)
        .map(ToString::to_string)
        .collect();
    let extra = verified_set
        .difference(&planned_set)
        .map(ToString::to_string)
        .collect();
    Err(Error::PlanVerificationFailed { missing, extra })
}
