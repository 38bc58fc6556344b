use crate::error::Result;
use crate::exec::CommandExecutor;

/// `systemctl` front-end.
#[derive(Debug, Clone, Copy)]
pub struct Systemd<'a, E: ?Sized> {
    exec: &'a E,
}

impl<'a, E> Systemd<'a, E>
where
    E: CommandExecutor + ?Sized,
{
    pub fn new(exec: &'a E) -> Self {
        Self { exec }
    }

    /// `systemctl is-active --quiet <unit>`; any failure counts as inactive.
    pub fn is_active(&self, unit: &str) -> bool {
        self.exec
            .run("systemctl", &["is-active", "--quiet", unit])
            .is_ok_and(|output| output.is_success())
    }

    /// # Errors
    ///
    /// Returns an error if `systemctl` fails.
    pub fn start(&self, unit: &str) -> Result<()> {
        self.systemctl(&["start", unit])
    }

    /// # Errors
    ///
    /// Returns an error if `systemctl` fails.
    pub fn stop(&self, unit: &str) -> Result<()> {
        self.systemctl(&["stop", unit])
    }

    /// # Errors
    ///
    /// Returns an error if `systemctl` fails.
    pub fn restart(&self, unit: &str) -> Result<()> {
        self.systemctl(&["restart", unit])
    }

    /// # Errors
    ///
    /// Returns an error if `systemctl` fails.
    pub fn enable_now(&self, unit: &str) -> Result<()> {
        self.systemctl(&["enable", "--now", unit])
    }

    /// # Errors
    ///
    /// Returns an error if `systemctl` fails.
    pub fn disable_now(&self, unit: &str) -> Result<()> {
        self.systemctl(&["disable", "--now", unit])
    }

    /// # Errors
    ///
    /// Returns an error if `systemctl` fails.
    pub fn daemon_reload(&self) -> Result<()> {
        self.systemctl(&["daemon-reload"])
    }

    fn systemctl(&self, args: &[&str]) -> Result<()> {
        self.exec.run_checked("systemctl", args).map(|_| ())
    }
}
