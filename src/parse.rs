//! Text-to-structure extractors over collaborator output.
//!
//! Pure functions, no state. The patterns live here as module constants so
//! the shapes this tool trusts are all in one place; anything a pattern does
//! not match is ignored rather than guessed at.

use crate::kernel::KernelVersion;

/// Sentinel heading apt prints before the simulated removal list.
pub const REMOVED_SENTINEL: &str = "The following packages will be REMOVED:";

/// Status column apt prints for packages with no verifiable origin.
pub const LOCAL_STATUS: &str = "[installed,local]";

/// Marker apt-get prints when a reinstall cannot fetch the package.
pub const CANNOT_DOWNLOAD_MARKER: &str = "is not possible, it cannot be downloaded";

/// What: Extract the names of `[installed,local]` packages from
/// `apt list --installed` output.
///
/// Inputs:
/// - `text`: Full listing output.
///
/// Output:
/// - Sorted, deduplicated package names whose status is exactly
///   `[installed,local]`.
///
/// Details:
/// - A listing entry is `name/channel version arch [installed,local]`;
///   lines with any other shape (headings, the apt CLI warning, entries in
///   other states) are skipped.
pub fn local_packages(text: &str) -> Vec<String> {
    let mut names: Vec<String> = text
        .lines()
        .filter_map(local_entry_name)
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();
    names
}

/// Match one listing line, returning the package name before the slash.
fn local_entry_name(line: &str) -> Option<&str> {
    let mut fields = line.split_whitespace();
    let spec = fields.next()?;
    let _version = fields.next()?;
    let _arch = fields.next()?;
    let status = fields.next()?;
    if status != LOCAL_STATUS || fields.next().is_some() {
        return None;
    }
    let (name, channel) = spec.split_once('/')?;
    if name.is_empty() || channel.is_empty() {
        return None;
    }
    Some(name)
}

/// What: Extract the simulated removal set from `apt-get -s remove` output.
///
/// Inputs:
/// - `text`: Full dry-run output.
///
/// Output:
/// - The package tokens listed under the REMOVED sentinel, in report order;
///   `None` when the sentinel or its indented block is absent.
///
/// Details:
/// - The block is one or more two-space-indented lines of space/asterisk
///   separated tokens, terminated by a blank line, an unindented line, or
///   end of output. apt marks auto-removable packages with `*`, which is
///   token noise, not part of any name.
pub fn removal_set(text: &str) -> Option<Vec<String>> {
    let mut lines = text.lines();
    loop {
        let line = lines.next()?;
        if line.ends_with(REMOVED_SENTINEL) {
            break;
        }
    }
    let mut packages: Vec<String> = Vec::new();
    let mut matched_block = false;
    for line in lines {
        if !line.starts_with("  ") {
            break;
        }
        matched_block = true;
        packages.extend(
            line.split(|c: char| c.is_whitespace() || c == '*')
                .filter(|token| !token.is_empty())
                .map(str::to_string),
        );
    }
    matched_block.then_some(packages)
}

/// One matched kernel package line from `dpkg --list`.
#[derive(Debug, Clone)]
pub struct KernelLine {
    /// The full listing line, for echoing to the operator.
    pub raw: String,
    /// Version embedded in the package name, variation stripped.
    pub version: KernelVersion,
    /// Trailing variation suffix of the package name, when present.
    pub variation: Option<String>,
}

/// What: Extract installed kernel package lines from `dpkg --list` output.
///
/// Inputs:
/// - `text`: Full listing output.
///
/// Output:
/// - One [`KernelLine`] per line naming a versioned kernel package.
///
/// Details:
/// - A match is a two-letter lowercase status code, a package name of the
///   shape `linux-<word>[-<word>]-MAJOR.MINOR.PATCH-BUILD[-variation]`, and
///   at least one further column. Unversioned meta packages
///   (`linux-image-generic`) and unrelated `linux-*` packages never match.
pub fn kernel_lines(text: &str) -> Vec<KernelLine> {
    text.lines().filter_map(kernel_line).collect()
}

fn kernel_line(line: &str) -> Option<KernelLine> {
    let mut fields = line.split_whitespace();
    let status = fields.next()?;
    if status.len() != 2 || !status.chars().all(|c| c.is_ascii_lowercase()) {
        return None;
    }
    let package = fields.next()?;
    fields.next()?;
    let (version, variation) = kernel_package_version(package)?;
    Some(KernelLine {
        raw: line.to_string(),
        version,
        variation,
    })
}

/// Pull the version (and optional variation suffix) out of a kernel package
/// name such as `linux-image-5.15.0-91-generic`.
fn kernel_package_version(package: &str) -> Option<(KernelVersion, Option<String>)> {
    let rest = package.strip_prefix("linux-")?;
    let segments: Vec<&str> = rest.split('-').collect();
    let mut idx = 0;
    while idx < segments.len() && is_lower_alpha(segments[idx]) {
        idx += 1;
    }
    // One or two flavor words before the version: image, headers,
    // modules-extra, image-unsigned.
    if !(1..=2).contains(&idx) {
        return None;
    }
    let dotted = *segments.get(idx)?;
    let build = *segments.get(idx + 1)?;
    if !is_digits(build) {
        return None;
    }
    let version = KernelVersion::parse(&format!("{dotted}-{build}"))?;
    let variation = match segments.get(idx + 2) {
        None => None,
        Some(seg) if segments.len() == idx + 3 && is_lower_alpha(seg) => Some((*seg).to_string()),
        Some(_) => return None,
    };
    Some((version, variation))
}

/// What: Extract the running kernel's version from `uname -r` output.
///
/// Inputs:
/// - `release`: The release string, already trimmed.
///
/// Output:
/// - The version anchored at the start of the string; `None` on any other
///   shape.
pub fn uname_version(release: &str) -> Option<KernelVersion> {
    KernelVersion::parse_prefix(release).map(|(version, _)| version)
}

fn is_lower_alpha(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_lowercase())
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
