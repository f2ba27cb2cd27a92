//! Terminal output shared by the subcommands.

use colored::Colorize;
use nb_core::postmortem::{FailureRecord, FailureTracker};
use nb_protocol::process_models::LaunchState;

/// Exit code for a failure without a recorded exit code.
pub const GENERIC_FAILURE: i32 = 1;

pub fn print_state(state: LaunchState) {
    let label = match state {
        LaunchState::Completed | LaunchState::Running => state.to_string().green(),
        LaunchState::Terminated => state.to_string().red(),
        LaunchState::New | LaunchState::Launched => state.to_string().yellow(),
    };
    println!("{} {label}", "State:".bold());
}

/// Print every recorded failure, oldest first.
pub fn print_failures(tracker: &FailureTracker) {
    if tracker.is_empty() {
        return;
    }
    for (index, record) in tracker.snapshot().iter().enumerate() {
        println!();
        println!("{}", format!("Failure #{}", index + 1).red().bold());
        println!("{record}");
    }
}

/// Exit code a failed run reports to the shell.
pub fn exit_code(record: Option<&FailureRecord>) -> i32 {
    record
        .and_then(FailureRecord::interpreted_exit_code)
        .filter(|code| *code != 0)
        .unwrap_or(GENERIC_FAILURE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nb_protocol::process_models::{EXIT_STATUS_TIMEOUT, NEVER_STARTED_SENTINEL};

    #[test]
    fn test_exit_code_prefers_interpreted_code() {
        let mut record = FailureRecord::new();
        record.set_original_exit_code(Some(NEVER_STARTED_SENTINEL));
        record.set_interpreted_exit_code(Some(EXIT_STATUS_TIMEOUT));

        assert_eq!(exit_code(Some(&record)), EXIT_STATUS_TIMEOUT);
    }

    #[test]
    fn test_exit_code_falls_back_to_generic_failure() {
        assert_eq!(exit_code(None), GENERIC_FAILURE);

        let mut record = FailureRecord::new();
        record.set_original_exit_code(Some(0));
        assert_eq!(exit_code(Some(&record)), GENERIC_FAILURE);
    }
}
