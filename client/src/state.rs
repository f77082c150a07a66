use std::fmt;
use std::time::Duration;

use guru_protocol::close_code;

use crate::connection::ReconnectPolicy;

/// Lifecycle of the single channel a manager owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Constructed, never dialed
    Idle,
    Connecting,
    Open,
    /// Dropped, closed by either side, or given up
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// What the driver should do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseOutcome {
    /// Manual or normal closure; stay closed
    Stay,
    /// Arm the retry timer
    Retry { attempt: u32, delay: Duration },
    /// Budget spent; stay closed until disconnect + connect
    GiveUp,
}

/// Pure reconnect state machine. The driver feeds it transport events and
/// acts on its answers; it never touches I/O or timers itself.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: ConnectionState,
    policy: ReconnectPolicy,
    attempts: u32,
    manual: bool,
    exhausted: bool,
    room: Option<String>,
}

impl Lifecycle {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            policy,
            attempts: 0,
            manual: false,
            exhausted: false,
            room: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Caller asked to connect. Returns whether a new attempt should start.
    pub fn request_connect(&mut self) -> bool {
        if self.in_flight() || self.exhausted {
            return false;
        }

        self.manual = false;
        self.state = ConnectionState::Connecting;
        true
    }

    /// The retry timer fired. The budget was charged when it was armed.
    pub fn retry_due(&mut self) -> bool {
        if self.manual || self.in_flight() {
            return false;
        }

        self.state = ConnectionState::Connecting;
        true
    }

    pub fn on_open(&mut self) {
        self.state = ConnectionState::Open;
        self.attempts = 0;
        self.manual = false;
    }

    pub fn on_close(&mut self, code: u16) -> CloseOutcome {
        self.state = ConnectionState::Closed;

        if self.manual || code == close_code::NORMAL {
            return CloseOutcome::Stay;
        }

        if self.attempts < self.policy.max_attempts {
            self.attempts += 1;
            return CloseOutcome::Retry {
                attempt: self.attempts,
                delay: self.policy.delay_for(self.attempts),
            };
        }

        self.exhausted = true;
        CloseOutcome::GiveUp
    }

    /// Manual disconnect: suppress retries and start the next connect clean.
    pub fn disconnect(&mut self) {
        self.state = ConnectionState::Closed;
        self.manual = true;
        self.attempts = 0;
        self.exhausted = false;
    }

    pub fn room(&self) -> Option<&str> {
        self.room.as_deref()
    }

    pub fn remember_room(&mut self, room_id: &str) {
        self.room = Some(room_id.to_string());
    }

    pub fn forget_room(&mut self, room_id: &str) {
        if self.room.as_deref() == Some(room_id) {
            self.room = None;
        }
    }

    fn in_flight(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> Lifecycle {
        let mut lifecycle = Lifecycle::new(ReconnectPolicy::default());
        assert!(lifecycle.request_connect());
        lifecycle.on_open();
        lifecycle
    }

    #[test]
    fn test_starts_idle() {
        let lifecycle = Lifecycle::new(ReconnectPolicy::default());
        assert_eq!(lifecycle.state(), ConnectionState::Idle);
    }

    #[test]
    fn test_connect_is_idempotent() {
        let mut lifecycle = Lifecycle::new(ReconnectPolicy::default());

        assert!(lifecycle.request_connect());
        assert!(!lifecycle.request_connect());
        assert_eq!(lifecycle.state(), ConnectionState::Connecting);

        lifecycle.on_open();
        assert!(!lifecycle.request_connect());
        assert_eq!(lifecycle.state(), ConnectionState::Open);
    }

    #[test]
    fn test_normal_close_never_retries() {
        let mut lifecycle = opened();

        assert_eq!(lifecycle.on_close(close_code::NORMAL), CloseOutcome::Stay);
        assert_eq!(lifecycle.state(), ConnectionState::Closed);
        assert!(!lifecycle.is_exhausted());
    }

    #[test]
    fn test_going_away_scenario() {
        let mut lifecycle = opened();

        let mut delays = Vec::new();
        for _ in 0..3 {
            match lifecycle.on_close(close_code::GOING_AWAY) {
                CloseOutcome::Retry { delay, .. } => delays.push(delay.as_millis()),
                other => panic!("expected retry, got {:?}", other),
            }
            assert!(lifecycle.retry_due());
        }

        assert_eq!(delays, vec![2000, 4000, 6000]);
        assert_eq!(
            lifecycle.on_close(close_code::GOING_AWAY),
            CloseOutcome::GiveUp
        );
        assert!(lifecycle.is_exhausted());
    }

    #[test]
    fn test_exhausted_until_disconnect() {
        let mut lifecycle = opened();
        for _ in 0..3 {
            lifecycle.on_close(close_code::ABNORMAL);
            lifecycle.retry_due();
        }
        lifecycle.on_close(close_code::ABNORMAL);

        assert!(!lifecycle.request_connect());
        assert_eq!(lifecycle.state(), ConnectionState::Closed);

        lifecycle.disconnect();
        assert_eq!(lifecycle.attempts(), 0);
        assert!(lifecycle.request_connect());
    }

    #[test]
    fn test_open_resets_attempts() {
        let mut lifecycle = opened();

        lifecycle.on_close(close_code::ABNORMAL);
        lifecycle.retry_due();
        assert_eq!(lifecycle.attempts(), 1);

        lifecycle.on_open();
        assert_eq!(lifecycle.attempts(), 0);
        assert_eq!(
            lifecycle.on_close(close_code::ABNORMAL),
            CloseOutcome::Retry {
                attempt: 1,
                delay: Duration::from_millis(2000)
            }
        );
    }

    #[test]
    fn test_manual_disconnect_suppresses_retry() {
        let mut lifecycle = opened();

        lifecycle.disconnect();
        assert_eq!(lifecycle.state(), ConnectionState::Closed);
        assert_eq!(lifecycle.on_close(close_code::ABNORMAL), CloseOutcome::Stay);
        assert!(!lifecycle.retry_due());
    }

    #[test]
    fn test_disconnect_after_scheduled_retry() {
        let mut lifecycle = opened();

        assert!(matches!(
            lifecycle.on_close(close_code::GOING_AWAY),
            CloseOutcome::Retry { attempt: 1, .. }
        ));
        lifecycle.disconnect();

        assert!(!lifecycle.retry_due());
        assert_eq!(lifecycle.state(), ConnectionState::Closed);
        assert_eq!(lifecycle.attempts(), 0);
    }

    #[test]
    fn test_explicit_connect_clears_manual_flag() {
        let mut lifecycle = opened();
        lifecycle.disconnect();

        assert!(lifecycle.request_connect());
        assert!(matches!(
            lifecycle.on_close(close_code::ABNORMAL),
            CloseOutcome::Retry { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_custom_policy_budget() {
        let policy = ReconnectPolicy {
            max_attempts: 1,
            ..ReconnectPolicy::default()
        };
        let mut lifecycle = Lifecycle::new(policy);
        lifecycle.request_connect();

        assert!(matches!(
            lifecycle.on_close(close_code::ABNORMAL),
            CloseOutcome::Retry { attempt: 1, .. }
        ));
        lifecycle.retry_due();
        assert_eq!(lifecycle.on_close(close_code::ABNORMAL), CloseOutcome::GiveUp);
    }

    #[test]
    fn test_room_memory() {
        let mut lifecycle = Lifecycle::new(ReconnectPolicy::default());

        lifecycle.remember_room("general");
        lifecycle.forget_room("study");
        assert_eq!(lifecycle.room(), Some("general"));

        lifecycle.forget_room("general");
        assert_eq!(lifecycle.room(), None);
    }
}
