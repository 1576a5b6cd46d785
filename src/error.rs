//! Failure taxonomy shared by both planners.
//!
//! Every fatal condition surfaces as one of these variants; the binaries
//! render them as a single `ERROR! <message>` line. Best-effort steps never
//! construct errors that escalate, they record per-item outcomes instead.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Conditions that abort the current run.
#[derive(Debug, Error)]
pub enum Error {
    /// A collaborator process exited with a status other than the expected one.
    #[error("Unexpected return code {code}")]
    UnexpectedExitStatus {
        /// Actual exit code reported by the process (-1 when killed by signal).
        code: i32,
    },

    /// A collaborator wrote to its error stream during a filtered run.
    #[error("Unexpected error output: {0:?}")]
    StderrOutput(String),

    /// Expected structured text was missing from collaborator output.
    #[error("{0}")]
    Parse(String),

    /// The observed system state contradicts itself.
    #[error("{0}")]
    StateInconsistency(String),

    /// The verification dry run disagreed with the computed plan.
    ///
    /// Carries the precise symmetric difference; never auto-reconciled.
    #[error(
        "Verification failed: missing: {}, extra: {}",
        list_or_none(.missing),
        list_or_none(.extra)
    )]
    PlanVerificationFailed {
        /// Planned names the verification run did not report.
        missing: Vec<String>,
        /// Reported names the plan did not contain.
        extra: Vec<String>,
    },

    /// Failure launching or draining a child process.
    #[error("{command}: {source}")]
    Io {
        /// The command line that was being executed.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Render a name list for display, `None` when empty.
fn list_or_none(names: &[String]) -> String {
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn verification_failure_lists_both_sides() {
        let err = Error::PlanVerificationFailed {
            missing: vec!["a".into(), "b".into()],
            extra: Vec::new(),
        };
        assert_eq!(
            err.to_string(),
            "Verification failed: missing: a b, extra: None"
        );
    }

    #[test]
    fn exit_status_message_carries_code() {
        let err = Error::UnexpectedExitStatus { code: 100 };
        assert_eq!(err.to_string(), "Unexpected return code 100");
    }
}
