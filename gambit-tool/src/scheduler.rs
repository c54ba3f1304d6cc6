//! Admission control for tool calls.
//!
//! The event-publishing decorator consults a scheduler before each call and
//! sleeps cooperatively for whatever delay it grants. Use this for rate
//! limiting or to smooth bursts of tool traffic.

use std::time::Duration;

/// Grants an optional admission delay before a tool call.
pub trait OperationScheduler: Send + Sync {
    /// How long to wait before invoking `tool`. `Duration::ZERO` means
    /// proceed immediately.
    fn delay_before(&self, tool: &str) -> Duration;
}

/// Never delays.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl OperationScheduler for NoDelay {
    fn delay_before(&self, _tool: &str) -> Duration {
        Duration::ZERO
    }
}

/// Delays every call by a fixed amount.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl OperationScheduler for FixedDelay {
    fn delay_before(&self, _tool: &str) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_delay_is_zero() {
        assert_eq!(NoDelay.delay_before("any"), Duration::ZERO);
    }

    #[test]
    fn fixed_delay_is_constant() {
        let sched = FixedDelay(Duration::from_millis(5));
        assert_eq!(sched.delay_before("a"), Duration::from_millis(5));
        assert_eq!(sched.delay_before("b"), Duration::from_millis(5));
    }
}
