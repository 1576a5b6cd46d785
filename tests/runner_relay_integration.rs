//! The process runner and confirmation relay against scripted children.
//!
//! A shell stand-in prints an apt-like removal transcript; the relay must
//! drop the noise lines and re-append the confirmation prompt after the
//! disk-space summary, and the runner must enforce the status and stderr
//! gates around it.

use aptsweep::error::Error;
use aptsweep::proc::{run, run_filtered};
use aptsweep::relay::{CONTINUE_PROMPT, purge_filter};

// No single quotes in the transcript: it is spliced into a single-quoted
// printf argument below.
const TRANSCRIPT: &str = "\
Reading package lists...\\n\
Note, selecting linux-image-5.15.0-79-generic for glob linux-*-5.15.0-79*\\n\
Package linux-headers-5.15.0-79 is not installed, so not removed\\n\
The following packages will be REMOVED:\\n\
  linux-image-5.15.0-79-generic*\\n\
After this operation, 485 MB disk space will be freed.\\n\
Removing linux-image-5.15.0-79-generic (5.15.0-79.86) ...\\n";

fn scripted(transcript: &str) -> String {
    format!("printf '{transcript}'")
}

#[test]
fn relay_drops_noise_and_restores_the_prompt() {
    let script = scripted(TRANSCRIPT);
    let out = run_filtered(&["sh", "-c", &script], &purge_filter, Some(0)).expect("run succeeds");
    assert!(!out.contains("Note, selecting"));
    assert!(!out.contains("is not installed, so not removed"));
    let expected_summary = format!("disk space will be freed.\n{CONTINUE_PROMPT}");
    assert!(out.contains(&expected_summary), "prompt restored: {out}");
    assert_eq!(out.matches(CONTINUE_PROMPT).count(), 1);
    assert!(out.contains("The following packages will be REMOVED:\n"));
}

#[test]
fn filtered_run_fails_on_unexpected_status_after_draining() {
    let script = format!("{}; exit 100", scripted("partial output\\n"));
    match run_filtered(&["sh", "-c", &script], &purge_filter, Some(0)) {
        Err(Error::UnexpectedExitStatus { code }) => assert_eq!(code, 100),
        other => panic!("expected status failure, got {other:?}"),
    }
}

#[test]
fn filtered_run_fails_on_stderr_chatter() {
    let script = "echo fine; echo complaint >&2";
    assert!(matches!(
        run_filtered(&["sh", "-c", script], &purge_filter, Some(0)),
        Err(Error::StderrOutput(_))
    ));
}

#[test]
fn plain_run_returns_the_whole_transcript() {
    let script = scripted("one\\ntwo\\n");
    let out = run(&["sh", "-c", &script], false, Some(0)).expect("run succeeds");
    assert_eq!(out, "one\ntwo\n");
}
