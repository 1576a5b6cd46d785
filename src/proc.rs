//! Line-oriented execution of collaborator processes.
//!
//! Every external fact this tool acts on is re-derived from the text these
//! invocations print, so the runner is strict: an unexpected exit status is
//! fatal, and a filtered run must not produce error-stream output. The
//! command line is echoed as `$ argv` before launch so the console shows
//! exactly what ran.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

/// Per-line rewrite applied to a streamed run; `None` drops the line.
pub type LineFilter = dyn Fn(&str) -> Option<String>;

/// What: Execute a command to completion and return its captured stdout.
///
/// Inputs:
/// - `args`: Full argv, program first.
/// - `print_out`: Print the captured output once the process finishes.
/// - `expected`: Exit code the process must report; `None` means don't care.
///
/// Output:
/// - `Ok(String)` with the process stdout; an error when the spawn fails or
///   the exit status does not match `expected`.
///
/// # Errors
///
/// - Returns `Err` if the process cannot be spawned or drained, or if its
///   exit code differs from `expected`.
///
/// Details:
/// - stderr is captured and logged, not treated as a failure here; apt
///   prints advisory notes there that the extractors simply never match.
pub fn run(args: &[&str], print_out: bool, expected: Option<i32>) -> Result<String> {
    let command_line = echo(args);
    let (program, rest) = split_argv(args)?;
    let output = Command::new(program)
        .args(rest)
        .env("LC_ALL", "C")
        .env("LANG", "C")
        .output()
        .map_err(|e| Error::Io {
            command: command_line.clone(),
            source: e,
        })?;
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if print_out {
        println!("{stdout}");
    }
    if !output.stderr.is_empty() {
        tracing::debug!(
            command = %command_line,
            stderr = %String::from_utf8_lossy(&output.stderr),
            "collaborator wrote to stderr"
        );
    }
    check_status(output.status.code(), expected)?;
    Ok(stdout)
}

/// What: Execute a command while rewriting its stdout line by line.
///
/// Inputs:
/// - `args`: Full argv, program first.
/// - `filter`: Per-line rewrite; returned text is emitted to the console
///   immediately and collected verbatim, `None` consumes the line silently.
/// - `expected`: Exit code the process must report; `None` means don't care.
///
/// Output:
/// - `Ok(String)` with the concatenated filtered text.
///
/// # Errors
///
/// - Returns `Err` if the process cannot be spawned or drained, if it wrote
///   anything to stderr, or if its exit code differs from `expected`.
///
/// Details:
/// - stdin is inherited so the real process can still take the operator's
///   confirmation answer.
/// - Any error-stream output fails the run: a destructive command talking on
///   stderr is outside the textual contract this tool trusts.
pub fn run_filtered(args: &[&str], filter: &LineFilter, expected: Option<i32>) -> Result<String> {
    let command_line = echo(args);
    let io_err = |e| Error::Io {
        command: command_line.clone(),
        source: e,
    };
    let (program, rest) = split_argv(args)?;
    let mut child = Command::new(program)
        .args(rest)
        .env("LC_ALL", "C")
        .env("LANG", "C")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(io_err)?;

    let mut collected = String::new();
    if let Some(stdout) = child.stdout.take() {
        let mut reader = BufReader::new(stdout);
        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).map_err(io_err)? == 0 {
                break;
            }
            let stripped = line.strip_suffix('\n').unwrap_or(&line);
            if let Some(emitted) = filter(stripped) {
                print!("{emitted}");
                let _ = std::io::stdout().flush();
                collected.push_str(&emitted);
            }
        }
    }

    let mut stderr_text = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        stderr.read_to_string(&mut stderr_text).map_err(io_err)?;
    }
    let status = child.wait().map_err(io_err)?;
    if !stderr_text.is_empty() {
        return Err(Error::StderrOutput(stderr_text));
    }
    check_status(status.code(), expected)?;
    Ok(collected)
}

/// Print and log the command line about to run; returns the joined argv.
fn echo(args: &[&str]) -> String {
    let command_line = args.join(" ");
    println!("$ {command_line}");
    tracing::debug!(command = %command_line, "running collaborator");
    command_line
}

fn split_argv<'a>(args: &'a [&'a str]) -> Result<(&'a str, &'a [&'a str])> {
    args.split_first()
        .map(|(program, rest)| (*program, rest))
        .ok_or_else(|| Error::StateInconsistency("Empty command line".to_string()))
}

fn check_status(code: Option<i32>, expected: Option<i32>) -> Result<()> {
    let Some(want) = expected else {
        return Ok(());
    };
    let code = code.unwrap_or(-1);
    if code == want {
        Ok(())
    } else {
        Err(Error::UnexpectedExitStatus { code })
    }
}

#[cfg(test)]
mod tests {
    use super::{run, run_filtered};
    use crate::error::Error;

    #[test]
    fn run_captures_stdout_and_checks_status() {
        let out = run(&["sh", "-c", "printf 'a\\nb\\n'"], false, Some(0))
            .unwrap_or_else(|e| panic!("run failed: {e}"));
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn run_rejects_unexpected_exit_code() {
        let err = run(&["sh", "-c", "exit 3"], false, Some(0));
        match err {
            Err(Error::UnexpectedExitStatus { code }) => assert_eq!(code, 3),
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn run_ignores_status_when_unspecified() {
        assert!(run(&["sh", "-c", "exit 7"], false, None).is_ok());
    }

    #[test]
    fn run_filtered_applies_filter_per_line() {
        let out = run_filtered(
            &["sh", "-c", "printf 'keep\\ndrop\\nkeep\\n'"],
            &|line| {
                if line == "drop" {
                    None
                } else {
                    Some(format!("{line}\n"))
                }
            },
            Some(0),
        )
        .unwrap_or_else(|e| panic!("run_filtered failed: {e}"));
        assert_eq!(out, "keep\nkeep\n");
    }

    #[test]
    fn run_filtered_rejects_stderr_output() {
        let err = run_filtered(
            &["sh", "-c", "echo noise >&2"],
            &|line| Some(format!("{line}\n")),
            Some(0),
        );
        assert!(matches!(err, Err(Error::StderrOutput(_))));
    }
}
