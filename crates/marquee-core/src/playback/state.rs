use super::PlaybackState;
use crate::events::Event;

/// Result of a state change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: PlaybackState,
    pub to: PlaybackState,
    /// Event announcing the new state, if it has one
    pub event: Option<Event>,
}

/// Tracks the current [`PlaybackState`] and suppresses same-state transitions
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    state: PlaybackState,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Move to `next`; `None` when already there
    pub fn transition(&mut self, next: PlaybackState) -> Option<Transition> {
        if self.state == next {
            return None;
        }
        let from = std::mem::replace(&mut self.state, next);
        Some(Transition {
            from,
            to: next,
            event: announcement(next),
        })
    }

    pub fn reset(&mut self) {
        self.state = PlaybackState::Idle;
    }
}

fn announcement(state: PlaybackState) -> Option<Event> {
    match state {
        PlaybackState::Buffering => Some(Event::Stalled),
        PlaybackState::Paused => Some(Event::DidPause),
        PlaybackState::Playing => Some(Event::Playing),
        // idle is announced by didStop / didComplete
        PlaybackState::Idle => None,
    }
}
