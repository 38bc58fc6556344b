use std::fmt::Write as _;

use kubestrap_operations::{RunStatus, RunSummary};

/// Print a run summary: successes to stdout, aborts to stderr.
pub(crate) fn print_summary(summary: &RunSummary) {
    let text = format_summary(summary);
    if matches!(summary.status, RunStatus::Aborted { .. }) {
        eprint!("{text}");
    } else {
        print!("{text}");
    }
}

pub(crate) fn format_summary(summary: &RunSummary) -> String {
    let mut output = String::new();

    match &summary.status {
        RunStatus::Completed { join_command } => {
            let _ = writeln!(output, "{} completed successfully.", summary.kind);
            if let Some(command) = join_command {
                let _ = writeln!(output, "\nJoin worker nodes with:\n  {command}");
            }
            format_warnings(&mut output, &summary.warnings);
        }
        RunStatus::Aborted {
            step,
            message,
            applied,
            failed,
            failures,
            restored_services,
        } => {
            let _ = writeln!(output, "{} failed at step '{step}': {message}", summary.kind);
            let _ = writeln!(
                output,
                "Rollback: {applied} change(s) undone, {failed} could not be undone."
            );
            if !restored_services.is_empty() {
                let _ = writeln!(output, "Restarted services: {}", restored_services.join(", "));
            }
            if !failures.is_empty() {
                output.push_str("Manual cleanup needed:\n");
                for failure in failures {
                    let _ = writeln!(output, "  {failure}");
                }
            }
            format_warnings(&mut output, &summary.warnings);
        }
        RunStatus::Declined => {
            output.push_str("Aborted by user; no changes were made.\n");
        }
    }

    if let Some(path) = &summary.log_path {
        let _ = writeln!(output, "\nAudit log: {}", path.display());
    }

    output
}

fn format_warnings(output: &mut String, warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    output.push_str("\nWarnings:\n");
    for warning in warnings {
        let _ = writeln!(output, "  {warning}");
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn summary(status: RunStatus) -> RunSummary {
        RunSummary {
            kind: "install-master".to_string(),
            status,
            completed_steps: Vec::new(),
            warnings: Vec::new(),
            log_path: None,
        }
    }

    #[test]
    fn completed_shows_join_command_and_warnings() {
        let mut s = summary(RunStatus::Completed {
            join_command: Some("kubeadm join 10.0.0.1:6443 --token abc".to_string()),
        });
        s.warnings = vec!["Warning: untaint_control_plane failed: no nodes".to_string()];
        s.log_path = Some(PathBuf::from("/var/log/kubestrap/run.log"));

        let text = format_summary(&s);

        assert!(text.starts_with("install-master completed successfully."));
        assert!(text.contains("  kubeadm join 10.0.0.1:6443 --token abc"));
        assert!(text.contains("Warnings:\n  Warning: untaint_control_plane"));
        assert!(text.contains("Audit log: /var/log/kubestrap/run.log"));
    }

    #[test]
    fn aborted_reports_rollback_tally() {
        let s = summary(RunStatus::Aborted {
            step: "kubeadm_init".to_string(),
            message: "command failed".to_string(),
            applied: 7,
            failed: 1,
            failures: vec!["restore /etc/fstab: permission denied".to_string()],
            restored_services: vec!["kubelet".to_string()],
        });

        let text = format_summary(&s);

        assert!(text.contains("failed at step 'kubeadm_init': command failed"));
        assert!(text.contains("7 change(s) undone, 1 could not be undone"));
        assert!(text.contains("Restarted services: kubelet"));
        assert!(text.contains("Manual cleanup needed:\n  restore /etc/fstab"));
        assert!(!text.contains("Warnings:"));
    }

    #[test]
    fn declined_says_nothing_changed() {
        let text = format_summary(&summary(RunStatus::Declined));

        assert_eq!(text, "Aborted by user; no changes were made.\n");
    }
}
