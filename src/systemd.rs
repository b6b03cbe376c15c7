//! sd_notify integration for running under a systemd `Type=notify` unit.
//!
//! Every method is a no-op when disabled or off Linux, so callers never
//! need `#[cfg]`.

/// Lifecycle states reported to the service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ServiceState<'a> {
    Ready,
    Stopping,
    Status(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SystemdNotifier {
    enabled: bool,
}

impl SystemdNotifier {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// `READY=1`, sent once the schedules are registered.
    pub(crate) fn notify_ready(&self) {
        self.send(ServiceState::Ready);
    }

    /// `STOPPING=1`, sent when the first shutdown signal arrives.
    pub(crate) fn notify_stopping(&self) {
        self.send(ServiceState::Stopping);
    }

    /// `STATUS=<msg>`, shown by `systemctl status`.
    pub(crate) fn notify_status(&self, msg: &str) {
        self.send(ServiceState::Status(msg));
    }

    fn send(&self, state: ServiceState<'_>) {
        if self.enabled {
            send_impl(state);
        }
    }
}

#[cfg(target_os = "linux")]
fn send_impl(state: ServiceState<'_>) {
    use sd_notify::NotifyState;

    let notify_state = match state {
        ServiceState::Ready => NotifyState::Ready,
        ServiceState::Stopping => NotifyState::Stopping,
        ServiceState::Status(msg) => NotifyState::Status(msg),
    };
    if let Err(e) = sd_notify::notify(false, &[notify_state]) {
        tracing::debug!(error = %e, state = ?state, "sd_notify failed");
    }
}

#[cfg(not(target_os = "linux"))]
fn send_impl(_state: ServiceState<'_>) {}
