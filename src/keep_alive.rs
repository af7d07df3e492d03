//! Hooks for environments that let a speech session go idle in the
//! background. Playback calls the policy when it enters and leaves the
//! playing state; the core behaves the same with [`NoKeepAlive`].

use tracing::debug;

pub trait KeepAlivePolicy {
    fn playing_started(&mut self);
    fn playing_stopped(&mut self);
}

/// Does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeepAlive;

impl KeepAlivePolicy for NoKeepAlive {
    fn playing_started(&mut self) {}

    fn playing_stopped(&mut self) {}
}

/// Logs transitions; useful when diagnosing sessions that stall in the
/// background.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingKeepAlive {
    active: bool,
}

impl LoggingKeepAlive {
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl KeepAlivePolicy for LoggingKeepAlive {
    fn playing_started(&mut self) {
        self.active = true;
        debug!("Keep-alive engaged");
    }

    fn playing_stopped(&mut self) {
        self.active = false;
        debug!("Keep-alive released");
    }
}
