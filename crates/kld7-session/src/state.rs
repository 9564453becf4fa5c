//! Session state machine.
//!
//! ```text
//! Disconnected ─Connect─▶ Initializing ─Acked─▶ ConfiguringSpeed ─▶ ConfiguringRange ─▶ Streaming
//!      ▲                       │ Rejected                                                 │ ▲ Poll
//!      │                       ▼                                                          │ └──┘
//!      └───────────────── Disconnected ◀── ShuttingDown ◀──────────── Cancel ─────────────┘
//! ```
//!
//! While in `Initializing`, `ConfiguringSpeed`, `ConfiguringRange` and
//! `ShuttingDown` the session is waiting for the acknowledgment of that
//! state's command. [`transition`] is pure: it says what to do next and the
//! session carries it out.

use std::fmt;

use kld7_frame::AckError;

use crate::error::{Result, SessionError};

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Initializing,
    ConfiguringSpeed,
    ConfiguringRange,
    Streaming,
    ShuttingDown,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Initializing => "initializing",
            SessionState::ConfiguringSpeed => "configuring-speed",
            SessionState::ConfiguringRange => "configuring-range",
            SessionState::Streaming => "streaming",
            SessionState::ShuttingDown => "shutting-down",
        };
        f.write_str(name)
    }
}

/// Commands the session sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Init,
    SetMaxSpeed,
    SetMaxRange,
    NextFrame,
    Goodbye,
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The caller handed over an open link.
    Connect,
    /// The pending command was acknowledged.
    Acked,
    /// The pending command was not acknowledged.
    Rejected(AckError),
    /// Start the next streaming cycle.
    Poll,
    /// The caller asked to stop.
    Cancel,
    /// A fatal error occurred; `link_usable` says whether a goodbye can
    /// still be sent.
    Fault { link_usable: bool },
}

impl Event {
    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Connect => "connect",
            Event::Acked => "acked",
            Event::Rejected(_) => "rejected",
            Event::Poll => "poll",
            Event::Cancel => "cancel",
            Event::Fault { .. } => "fault",
        }
    }
}

/// Side effects the session must carry out, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Send a command and wait for its acknowledgment.
    Send(Command),
    /// Wait for the device to settle, then switch the link to the negotiated
    /// rate.
    RaiseBaudRate,
    /// Read the detection header and any target payload.
    ReadDetection,
    /// Log that a tolerated command failed.
    Warn(Command, AckError),
    /// Record that `INIT` failed.
    FailInitialization(AckError),
    /// Close the link.
    Close,
}

/// Outcome of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: SessionState,
    pub effects: Vec<Effect>,
}

impl Transition {
    fn to(next: SessionState, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }
}

/// Compute the next state and its effects.
///
/// Fails with `InvalidTransition` for pairs the protocol does not allow; the
/// caller's state is then unchanged.
pub fn transition(state: SessionState, event: Event) -> Result<Transition> {
    use Effect::*;
    use SessionState::*;

    let outcome = match (state, event) {
        (Disconnected, Event::Connect) => Transition::to(Initializing, vec![Send(Command::Init)]),

        // The device acknowledges INIT at the power-up rate; only then may the
        // link switch.
        (Initializing, Event::Acked) => Transition::to(
            ConfiguringSpeed,
            vec![RaiseBaudRate, Send(Command::SetMaxSpeed)],
        ),
        (Initializing, Event::Rejected(err)) => {
            Transition::to(Disconnected, vec![FailInitialization(err), Close])
        }

        (ConfiguringSpeed, Event::Acked) => {
            Transition::to(ConfiguringRange, vec![Send(Command::SetMaxRange)])
        }
        (ConfiguringSpeed, Event::Rejected(err)) => Transition::to(
            ConfiguringRange,
            vec![Warn(Command::SetMaxSpeed, err), Send(Command::SetMaxRange)],
        ),

        (ConfiguringRange, Event::Acked) => Transition::to(Streaming, Vec::new()),
        (ConfiguringRange, Event::Rejected(err)) => {
            Transition::to(Streaming, vec![Warn(Command::SetMaxRange, err)])
        }

        (Streaming, Event::Poll) => Transition::to(Streaming, vec![Send(Command::NextFrame)]),
        (Streaming, Event::Acked) => Transition::to(Streaming, vec![ReadDetection]),
        (Streaming, Event::Rejected(err)) => {
            Transition::to(Streaming, vec![Warn(Command::NextFrame, err)])
        }
        (Streaming, Event::Cancel) => Transition::to(ShuttingDown, vec![Send(Command::Goodbye)]),

        // Goodbye is best-effort: whatever comes back, close.
        (ShuttingDown, Event::Acked | Event::Rejected(_) | Event::Fault { .. }) => {
            Transition::to(Disconnected, vec![Close])
        }

        (Initializing, Event::Fault { .. }) => Transition::to(Disconnected, vec![Close]),
        (
            ConfiguringSpeed | ConfiguringRange | Streaming,
            Event::Fault { link_usable: true },
        ) => Transition::to(ShuttingDown, vec![Send(Command::Goodbye)]),
        (
            ConfiguringSpeed | ConfiguringRange | Streaming,
            Event::Fault { link_usable: false },
        ) => Transition::to(Disconnected, vec![Close]),
        (Disconnected, Event::Fault { .. }) => Transition::to(Disconnected, Vec::new()),

        (state, event) => {
            return Err(SessionError::InvalidTransition {
                state,
                event: event.name(),
            })
        }
    };

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use kld7_frame::AckStatus;

    use super::*;

    const REFUSED: AckError = AckError::NotAcknowledged {
        status: AckStatus::InvalidParameter,
    };

    fn step(state: SessionState, event: Event) -> Transition {
        transition(state, event).expect("transition should be valid")
    }

    #[test]
    fn connect_sends_init() {
        let t = step(SessionState::Disconnected, Event::Connect);
        assert_eq!(t.next, SessionState::Initializing);
        assert_eq!(t.effects, vec![Effect::Send(Command::Init)]);
    }

    #[test]
    fn init_ack_raises_baud_before_next_command() {
        let t = step(SessionState::Initializing, Event::Acked);
        assert_eq!(t.next, SessionState::ConfiguringSpeed);
        assert_eq!(
            t.effects,
            vec![Effect::RaiseBaudRate, Effect::Send(Command::SetMaxSpeed)]
        );
    }

    #[test]
    fn init_failure_is_fatal_without_goodbye() {
        let t = step(SessionState::Initializing, Event::Rejected(AckError::Timeout));
        assert_eq!(t.next, SessionState::Disconnected);
        assert_eq!(
            t.effects,
            vec![
                Effect::FailInitialization(AckError::Timeout),
                Effect::Close
            ]
        );
        assert!(!t.effects.contains(&Effect::Send(Command::Goodbye)));
    }

    #[test]
    fn configuration_failures_are_warnings() {
        let speed = step(SessionState::ConfiguringSpeed, Event::Rejected(REFUSED));
        assert_eq!(speed.next, SessionState::ConfiguringRange);
        assert_eq!(
            speed.effects,
            vec![
                Effect::Warn(Command::SetMaxSpeed, REFUSED),
                Effect::Send(Command::SetMaxRange)
            ]
        );

        let range = step(SessionState::ConfiguringRange, Event::Rejected(REFUSED));
        assert_eq!(range.next, SessionState::Streaming);
        assert_eq!(
            range.effects,
            vec![Effect::Warn(Command::SetMaxRange, REFUSED)]
        );
    }

    #[test]
    fn range_ack_enters_streaming_without_handshake() {
        let t = step(SessionState::ConfiguringRange, Event::Acked);
        assert_eq!(t.next, SessionState::Streaming);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn streaming_cycle() {
        let poll = step(SessionState::Streaming, Event::Poll);
        assert_eq!(poll.next, SessionState::Streaming);
        assert_eq!(poll.effects, vec![Effect::Send(Command::NextFrame)]);

        let acked = step(SessionState::Streaming, Event::Acked);
        assert_eq!(acked.effects, vec![Effect::ReadDetection]);
    }

    #[test]
    fn missed_acks_never_leave_streaming() {
        let mut state = SessionState::Streaming;
        for _ in 0..3 {
            state = step(state, Event::Poll).next;
            let t = step(state, Event::Rejected(AckError::Timeout));
            assert_eq!(t.effects, vec![Effect::Warn(Command::NextFrame, AckError::Timeout)]);
            state = t.next;
            assert_eq!(state, SessionState::Streaming);
        }
    }

    #[test]
    fn cancel_sends_goodbye_then_closes_regardless() {
        let t = step(SessionState::Streaming, Event::Cancel);
        assert_eq!(t.next, SessionState::ShuttingDown);
        assert_eq!(t.effects, vec![Effect::Send(Command::Goodbye)]);

        for event in [
            Event::Acked,
            Event::Rejected(AckError::Timeout),
            Event::Fault { link_usable: false },
        ] {
            let t = step(SessionState::ShuttingDown, event);
            assert_eq!(t.next, SessionState::Disconnected);
            assert_eq!(t.effects, vec![Effect::Close]);
        }
    }

    #[test]
    fn fault_skips_goodbye_only_when_link_is_gone() {
        let usable = step(SessionState::Streaming, Event::Fault { link_usable: true });
        assert_eq!(usable.next, SessionState::ShuttingDown);
        assert_eq!(usable.effects, vec![Effect::Send(Command::Goodbye)]);

        let lost = step(SessionState::ConfiguringSpeed, Event::Fault { link_usable: false });
        assert_eq!(lost.next, SessionState::Disconnected);
        assert_eq!(lost.effects, vec![Effect::Close]);

        let during_init = step(SessionState::Initializing, Event::Fault { link_usable: true });
        assert_eq!(during_init.next, SessionState::Disconnected);
        assert_eq!(during_init.effects, vec![Effect::Close]);
    }

    #[test]
    fn invalid_pairs_are_rejected() {
        for (state, event) in [
            (SessionState::Disconnected, Event::Poll),
            (SessionState::Disconnected, Event::Acked),
            (SessionState::Initializing, Event::Cancel),
            (SessionState::ConfiguringRange, Event::Poll),
            (SessionState::Streaming, Event::Connect),
            (SessionState::ShuttingDown, Event::Poll),
        ] {
            let err = transition(state, event).unwrap_err();
            assert!(matches!(err, SessionError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn state_names() {
        assert_eq!(SessionState::ConfiguringSpeed.to_string(), "configuring-speed");
        assert_eq!(Event::Fault { link_usable: true }.name(), "fault");
    }
}
