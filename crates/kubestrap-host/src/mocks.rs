use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{HostError, Result};
use crate::exec::{CommandExecutor, CommandOutput, render_command};

/// In-memory [`CommandExecutor`] for tests.
///
/// Records every command line and answers from scripted rules. A rule matches
/// when the rendered command line starts with its prefix; the most recently
/// added rule wins. Unmatched `systemctl` calls are simulated against a set of
/// active units, and everything else succeeds with empty output.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    rules: Mutex<Vec<(String, CommandOutput)>>,
    calls: Mutex<Vec<String>>,
    missing: Mutex<HashSet<String>>,
    active: Mutex<HashSet<String>>,
}

impl ScriptedExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An executor whose `id -u` reports root.
    #[must_use]
    pub fn root() -> Self {
        Self::new().respond("id -u", CommandOutput::success("0\n"))
    }

    #[must_use]
    pub fn respond(self, prefix: &str, output: CommandOutput) -> Self {
        self.set_response(prefix, output);
        self
    }

    /// Make every command starting with `prefix` exit with status 1.
    #[must_use]
    pub fn fail(self, prefix: &str, stderr: &str) -> Self {
        self.respond(prefix, CommandOutput::failure(1, stderr))
    }

    #[must_use]
    pub fn without_tool(self, program: &str) -> Self {
        lock(&self.missing).insert(program.to_string());
        self
    }

    #[must_use]
    pub fn with_active(self, units: &[&str]) -> Self {
        lock(&self.active).extend(units.iter().map(ToString::to_string));
        self
    }

    pub fn set_response(&self, prefix: &str, output: CommandOutput) {
        lock(&self.rules).push((prefix.to_string(), output));
    }

    /// Deactivate a unit, as if it crashed.
    pub fn deactivate(&self, unit: &str) {
        lock(&self.active).remove(unit);
    }

    #[must_use]
    pub fn is_unit_active(&self, unit: &str) -> bool {
        lock(&self.active).contains(unit)
    }

    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    #[must_use]
    pub fn called(&self, prefix: &str) -> bool {
        self.position(prefix).is_some()
    }

    /// Index of the first recorded command starting with `prefix`.
    #[must_use]
    pub fn position(&self, prefix: &str) -> Option<usize> {
        lock(&self.calls).iter().position(|c| c.starts_with(prefix))
    }

    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn simulate_systemctl(&self, args: &[&str]) -> CommandOutput {
        let mut active = lock(&self.active);
        match args {
            ["is-active", "--quiet", unit] => {
                if active.contains(*unit) {
                    CommandOutput::success("")
                } else {
                    CommandOutput::failure(3, "")
                }
            }
            ["start" | "restart", unit] | ["enable", "--now", unit] => {
                active.insert((*unit).to_string());
                CommandOutput::success("")
            }
            ["stop", unit] | ["disable", "--now", unit] => {
                active.remove(*unit);
                CommandOutput::success("")
            }
            _ => CommandOutput::success(""),
        }
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        if lock(&self.missing).contains(program) {
            return Err(HostError::Spawn {
                program: program.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }

        let line = render_command(program, args);
        lock(&self.calls).push(line.clone());

        let scripted = lock(&self.rules)
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone());

        Ok(match scripted {
            Some(output) => {
                if program == "systemctl" && output.is_success() {
                    self.simulate_systemctl(args);
                }
                output
            }
            None if program == "systemctl" => self.simulate_systemctl(args),
            None => CommandOutput::success(""),
        })
    }

    fn command_exists(&self, program: &str) -> bool {
        !lock(&self.missing).contains(program)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}
