//! Interactive confirmation relay for destructive apt runs.
//!
//! apt prints its `Do you want to continue?` question after the disk-space
//! summary, but line-buffered capture swallows the prompt text before the
//! process blocks on the answer. The relay re-appends the literal prompt
//! after the summary line so the console still shows what the process is
//! waiting for.

/// The literal question apt asks before a removal proceeds.
pub const CONTINUE_PROMPT: &str = "Do you want to continue? [Y/n] ";

const FREED_SUFFIX: &str = " disk space will be freed.";
const USED_SUFFIX: &str = " disk space will be used.";

/// Informational lines dropped from the relayed stream entirely.
const NOISE_MARKERS: [&str; 2] = ["Note, selecting", "is not installed, so not removed"];

/// What: Rewrite one streamed line of an apt removal run.
///
/// Inputs:
/// - `line`: The line as read, without its trailing newline.
///
/// Output:
/// - `None` for noise lines; the line plus the re-appended prompt for the
///   disk-space summary; the line unchanged (newline restored) otherwise.
pub fn purge_filter(line: &str) -> Option<String> {
    if NOISE_MARKERS.iter().any(|marker| line.contains(marker)) {
        return None;
    }
    if line.ends_with(FREED_SUFFIX) || line.ends_with(USED_SUFFIX) {
        return Some(format!("{line}\n{CONTINUE_PROMPT}"));
    }
    Some(format!("{line}\n"))
}

#[cfg(test)]
mod tests {
    use super::{CONTINUE_PROMPT, purge_filter};

    #[test]
    fn trigger_line_gets_prompt_appended_once() {
        let line = "After this operation, 485 MB disk space will be freed.";
        let emitted = purge_filter(line).unwrap_or_else(|| panic!("line dropped"));
        assert_eq!(emitted, format!("{line}\n{CONTINUE_PROMPT}"));
        assert_eq!(emitted.matches(CONTINUE_PROMPT).count(), 1);
    }

    #[test]
    fn used_variant_also_triggers() {
        let line = "After this operation, 12.3 kB of additional disk space will be used.";
        let emitted = purge_filter(line).unwrap_or_else(|| panic!("line dropped"));
        assert!(emitted.ends_with(CONTINUE_PROMPT));
    }

    #[test]
    fn ordinary_lines_pass_through_unchanged() {
        let line = "Removing libfoo1 (1.2-3) ...";
        assert_eq!(purge_filter(line), Some(format!("{line}\n")));
    }

    #[test]
    fn noise_lines_are_consumed() {
        assert_eq!(
            purge_filter("Note, selecting 'linux-image-5.15.0-91-generic' for glob"),
            None
        );
        assert_eq!(
            purge_filter("Package 'linux-headers-5.15.0-79' is not installed, so not removed"),
            None
        );
    }
}
