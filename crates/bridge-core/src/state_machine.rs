use std::fmt;

use crate::error::CoreError;

/// Phases of one settlement attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AttemptPhase {
    /// Salt generated and hashes derived; nothing sent anywhere yet.
    Committed,
    /// Reveal material stored by the off-chain registry.
    Registered,
    /// Escrow transaction broadcast; confirmation not yet observed.
    Submitted,
    /// Escrow transaction confirmed on-chain; awaiting settlement status.
    Confirmed,
    /// Polling reached a terminal status. Final state.
    Settled,
    /// The attempt stopped on an error or cancellation. Final state.
    Aborted,
}

impl AttemptPhase {
    /// Whether this is a final (terminal) phase.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Settled | Self::Aborted)
    }

    /// Whether an on-chain transaction may exist for this attempt.
    pub fn is_broadcast(&self) -> bool {
        matches!(self, Self::Submitted | Self::Confirmed | Self::Settled)
    }
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Committed => write!(f, "Committed"),
            Self::Registered => write!(f, "Registered"),
            Self::Submitted => write!(f, "Submitted"),
            Self::Confirmed => write!(f, "Confirmed"),
            Self::Settled => write!(f, "Settled"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Events that advance an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEvent {
    /// The registry acknowledged the reveal material.
    RegistrationSucceeded,
    /// The escrow transaction was handed to the node.
    Broadcast,
    /// The required confirmations were observed.
    ConfirmationObserved,
    /// The poller returned a terminal status.
    TerminalStatusReached,
    /// The attempt failed or was cancelled.
    Aborted,
}

/// Enforces attempt ordering.
///
/// Valid transitions:
/// - Committed → Registered (RegistrationSucceeded)
/// - Registered → Submitted (Broadcast)
/// - Submitted → Confirmed (ConfirmationObserved)
/// - Confirmed → Settled (TerminalStatusReached)
/// - any non-final phase → Aborted (Aborted)
///
/// There is no path from `Committed` to `Submitted`: broadcasting requires
/// registration first.
pub struct AttemptStateMachine;

impl AttemptStateMachine {
    /// Apply `event` to `current`, returning the next phase.
    pub fn transition(current: AttemptPhase, event: AttemptEvent) -> Result<AttemptPhase, CoreError> {
        let next = match (current, event) {
            (AttemptPhase::Committed, AttemptEvent::RegistrationSucceeded) => {
                AttemptPhase::Registered
            }
            (AttemptPhase::Registered, AttemptEvent::Broadcast) => AttemptPhase::Submitted,
            (AttemptPhase::Submitted, AttemptEvent::ConfirmationObserved) => {
                AttemptPhase::Confirmed
            }
            (AttemptPhase::Confirmed, AttemptEvent::TerminalStatusReached) => {
                AttemptPhase::Settled
            }
            (phase, AttemptEvent::Aborted) if !phase.is_final() => AttemptPhase::Aborted,
            _ => {
                let target = match event {
                    AttemptEvent::RegistrationSucceeded => AttemptPhase::Registered,
                    AttemptEvent::Broadcast => AttemptPhase::Submitted,
                    AttemptEvent::ConfirmationObserved => AttemptPhase::Confirmed,
                    AttemptEvent::TerminalStatusReached => AttemptPhase::Settled,
                    AttemptEvent::Aborted => AttemptPhase::Aborted,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(from = %current, to = %next, event = ?event, "attempt phase transition");

        Ok(next)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: AttemptPhase, event: AttemptEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let phase = AttemptPhase::Committed;
        let phase = AttemptStateMachine::transition(phase, AttemptEvent::RegistrationSucceeded).unwrap();
        assert_eq!(phase, AttemptPhase::Registered);

        let phase = AttemptStateMachine::transition(phase, AttemptEvent::Broadcast).unwrap();
        assert_eq!(phase, AttemptPhase::Submitted);

        let phase = AttemptStateMachine::transition(phase, AttemptEvent::ConfirmationObserved).unwrap();
        assert_eq!(phase, AttemptPhase::Confirmed);

        let phase = AttemptStateMachine::transition(phase, AttemptEvent::TerminalStatusReached).unwrap();
        assert_eq!(phase, AttemptPhase::Settled);
        assert!(phase.is_final());
    }

    #[test]
    fn test_cannot_broadcast_before_registration() {
        let result = AttemptStateMachine::transition(AttemptPhase::Committed, AttemptEvent::Broadcast);
        assert!(matches!(
            result,
            Err(CoreError::InvalidStateTransition {
                from: AttemptPhase::Committed,
                to: AttemptPhase::Submitted
            })
        ));
    }

    #[test]
    fn test_abort_from_every_open_phase() {
        for phase in [
            AttemptPhase::Committed,
            AttemptPhase::Registered,
            AttemptPhase::Submitted,
            AttemptPhase::Confirmed,
        ] {
            assert_eq!(
                AttemptStateMachine::transition(phase, AttemptEvent::Aborted).unwrap(),
                AttemptPhase::Aborted
            );
        }
    }

    #[test]
    fn test_final_phases_are_closed() {
        assert!(!AttemptStateMachine::can_transition(AttemptPhase::Settled, AttemptEvent::Aborted));
        assert!(!AttemptStateMachine::can_transition(AttemptPhase::Aborted, AttemptEvent::Aborted));
        assert!(!AttemptStateMachine::can_transition(
            AttemptPhase::Aborted,
            AttemptEvent::RegistrationSucceeded
        ));
    }

    #[test]
    fn test_cannot_register_twice() {
        assert!(!AttemptStateMachine::can_transition(
            AttemptPhase::Registered,
            AttemptEvent::RegistrationSucceeded
        ));
    }

    #[test]
    fn test_is_broadcast() {
        assert!(!AttemptPhase::Committed.is_broadcast());
        assert!(!AttemptPhase::Registered.is_broadcast());
        assert!(AttemptPhase::Submitted.is_broadcast());
        assert!(AttemptPhase::Confirmed.is_broadcast());
        assert!(AttemptPhase::Settled.is_broadcast());
        assert!(!AttemptPhase::Aborted.is_broadcast());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", AttemptPhase::Committed), "Committed");
        assert_eq!(format!("{}", AttemptPhase::Settled), "Settled");
    }
}
