use std::fmt;

use indexmap::IndexMap;

use crate::error::ActionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Active,
    Inactive,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// Probe and restart host services.
///
/// Implemented by the pipeline context so the runner can capture service
/// state before the first step and the rollback controller can restore it.
pub trait ServiceControl {
    fn is_active(&self, service: &str) -> bool;

    /// # Errors
    ///
    /// Returns an error if the service could not be started.
    fn start(&self, service: &str) -> Result<(), ActionError>;
}

/// Liveness of the watched services, keyed in probe order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceSnapshot {
    states: IndexMap<String, ServiceState>,
}

impl ServiceSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe every service through `control`.
    pub fn capture<C, S>(control: &C, services: &[S]) -> Self
    where
        C: ServiceControl + ?Sized,
        S: AsRef<str>,
    {
        let states = services
            .iter()
            .map(|service| {
                let service = service.as_ref();
                let state = if control.is_active(service) {
                    ServiceState::Active
                } else {
                    ServiceState::Inactive
                };
                (service.to_string(), state)
            })
            .collect();
        Self { states }
    }

    pub fn insert(&mut self, service: impl Into<String>, state: ServiceState) {
        self.states.insert(service.into(), state);
    }

    #[must_use]
    pub fn get(&self, service: &str) -> Option<ServiceState> {
        self.states.get(service).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ServiceState)> {
        self.states.iter().map(|(name, state)| (name.as_str(), *state))
    }

    /// Services that were active when the snapshot was taken.
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, state)| *state == ServiceState::Active)
            .map(|(name, _)| name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    struct FixedServices {
        active: HashSet<&'static str>,
    }

    impl ServiceControl for FixedServices {
        fn is_active(&self, service: &str) -> bool {
            self.active.contains(service)
        }

        fn start(&self, _service: &str) -> Result<(), ActionError> {
            Ok(())
        }
    }

    #[test]
    fn capture_probes_in_order() {
        let control = FixedServices {
            active: HashSet::from(["containerd"]),
        };

        let snapshot = ServiceSnapshot::capture(&control, &["kubelet", "containerd", "docker"]);

        let probed: Vec<_> = snapshot.iter().collect();
        assert_eq!(
            probed,
            vec![
                ("kubelet", ServiceState::Inactive),
                ("containerd", ServiceState::Active),
                ("docker", ServiceState::Inactive),
            ]
        );
    }

    #[test]
    fn active_filters_inactive_services() {
        let mut snapshot = ServiceSnapshot::new();
        snapshot.insert("kubelet", ServiceState::Active);
        snapshot.insert("docker", ServiceState::Inactive);

        let active: Vec<_> = snapshot.active().collect();

        assert_eq!(active, vec!["kubelet"]);
        assert_eq!(snapshot.get("docker"), Some(ServiceState::Inactive));
        assert_eq!(snapshot.get("containerd"), None);
    }
}
