//! Concrete apt/dpkg collaborator invocations.
//!
//! One function per invocation, each returning structured facts extracted
//! from the command's output. Destructive commands run with the
//! confirmation relay active; everything else is captured quietly and
//! parsed.

use std::collections::BTreeSet;

use crate::error::{Error, Result};
use crate::kernel::KernelVersion;
use crate::parse::{self, KernelLine};
use crate::proc;
use crate::relay;

/// Outcome of one best-effort reinstall attempt. These never escalate; the
/// caller accumulates them and decides what to report.
#[derive(Debug)]
pub enum ReinstallOutcome {
    /// The package was actually fetched and reinstalled.
    Reinstalled,
    /// apt reported the package cannot be downloaded; it stays an orphan.
    NotDownloadable,
    /// The attempt itself failed; swallowed per item.
    Failed(Error),
}

/// Verify the required external tools exist on PATH before planning.
///
/// # Errors
///
/// - Returns `Err` naming the first missing tool.
pub fn ensure_tools(tools: &[&str]) -> Result<()> {
    for tool in tools {
        if which::which(tool).is_err() {
            return Err(Error::StateInconsistency(format!(
                "Required tool {tool} not found on PATH"
            )));
        }
    }
    Ok(())
}

/// What: List the installed packages whose origin cannot be verified.
///
/// Output:
/// - Sorted, deduplicated `[installed,local]` package names.
///
/// # Errors
///
/// - Returns `Err` when the listing command fails; an empty listing is not
///   an error.
pub fn list_local_packages() -> Result<Vec<String>> {
    let out = proc::run(&["sudo", "apt", "list", "--installed"], false, Some(0))?;
    Ok(parse::local_packages(&out))
}

/// Best-effort reinstall probe for a candidate. A success means the package
/// has a verified origin after all and planning must start over.
pub fn try_reinstall(package: &str) -> ReinstallOutcome {
    classify_install(proc::run(
        &["sudo", "apt-get", "install", "--reinstall", package],
        true,
        Some(0),
    ))
}

/// Best-effort plain install, used for the post-purge reinstall audit.
pub fn try_install(package: &str) -> ReinstallOutcome {
    classify_install(proc::run(
        &["sudo", "apt-get", "install", package],
        true,
        Some(0),
    ))
}

fn classify_install(result: Result<String>) -> ReinstallOutcome {
    match result {
        Ok(out) if out.contains(parse::CANNOT_DOWNLOAD_MARKER) => ReinstallOutcome::NotDownloadable,
        Ok(_) => ReinstallOutcome::Reinstalled,
        Err(err) => ReinstallOutcome::Failed(err),
    }
}

/// What: Authoritative dry-run removal of one candidate in isolation.
///
/// Inputs:
/// - `package`: The candidate to simulate removing.
///
/// Output:
/// - The reported removal set with the candidate itself stripped (absence
///   tolerated).
///
/// # Errors
///
/// - Returns `Err` when the command fails or the output has no removal
///   block, since a partial reading of the simulation cannot be trusted.
pub fn reverse_removal_set(package: &str) -> Result<BTreeSet<String>> {
    let out = proc::run(&["sudo", "apt-get", "-s", "remove", package], false, Some(0))?;
    let Some(listed) = parse::removal_set(&out) else {
        return Err(Error::Parse(format!(
            "{package}: Error retrieving dependencies"
        )));
    };
    let mut set: BTreeSet<String> = listed.into_iter().collect();
    set.remove(package);
    Ok(set)
}

/// Dry-run removal of the whole plan at once, for verification.
///
/// # Errors
///
/// - Returns `Err` when the command fails or reports no removal block.
pub fn simulate_remove(packages: &[String]) -> Result<Vec<String>> {
    let mut args = vec!["sudo", "apt-get", "-s", "remove"];
    args.extend(packages.iter().map(String::as_str));
    let out = proc::run(&args, false, Some(0))?;
    parse::removal_set(&out).ok_or_else(|| Error::Parse("Error verifying remove".to_string()))
}

/// The real removal, relay active so the confirmation prompt stays visible.
///
/// # Errors
///
/// - Returns `Err` when the removal command fails or writes to stderr.
pub fn remove_packages(packages: &[String]) -> Result<()> {
    let mut args = vec!["sudo", "apt-get", "remove"];
    args.extend(packages.iter().map(String::as_str));
    proc::run_filtered(&args, &relay::purge_filter, Some(0))?;
    Ok(())
}

/// Kernel package lines from `dpkg --list`.
///
/// # Errors
///
/// - Returns `Err` when the listing command fails.
pub fn installed_kernel_lines() -> Result<Vec<KernelLine>> {
    let out = proc::run(&["dpkg", "--list"], false, Some(0))?;
    Ok(parse::kernel_lines(&out))
}

/// The running kernel's release string, trimmed.
///
/// # Errors
///
/// - Returns `Err` when `uname` fails.
pub fn running_kernel_release() -> Result<String> {
    let out = proc::run(&["uname", "-r"], false, Some(0))?;
    Ok(out.trim().to_string())
}

/// Purge every package of the given kernel versions, relay active. The
/// shell-glob patterns cover image, headers, and modules packages alike.
///
/// # Errors
///
/// - Returns `Err` when the purge command fails or writes to stderr.
pub fn purge_kernels(versions: &[KernelVersion]) -> Result<()> {
    let patterns: Vec<String> = versions
        .iter()
        .map(|version| format!("linux-*-{version}*"))
        .collect();
    let mut args = vec!["sudo", "apt-get", "purge"];
    args.extend(patterns.iter().map(String::as_str));
    proc::run_filtered(&args, &relay::purge_filter, Some(0))?;
    Ok(())
}

/// Refresh the boot loader after kernels were purged.
///
/// # Errors
///
/// - Returns `Err` when the boot loader update fails.
pub fn update_boot_loader() -> Result<()> {
    proc::run(&["sudo", "update-grub2"], false, Some(0))?;
    Ok(())
}
