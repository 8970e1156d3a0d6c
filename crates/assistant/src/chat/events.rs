use super::message::{Complexity, Message, Tool};

/// Tri-state loading indicator owned by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    Generating,
    /// Held only while the fallback reply is being recorded; observers see `Idle` after.
    Error,
}

/// Input for the loading state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingTransition {
    Start,
    Complete,
    Fail,
    Recover,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingTransitionRejection {
    AlreadyGenerating,
    NotGenerating,
    NoFailure,
}

pub type LoadingTransitionResult = Result<LoadingState, LoadingTransitionRejection>;

impl LoadingState {
    pub fn is_generating(self) -> bool {
        self == Self::Generating
    }

    /// Applies one transition deterministically.
    ///
    /// `Start` is only accepted from `Idle`, which is what gates a second submission
    /// while a generation is in flight.
    pub fn apply(self, transition: LoadingTransition) -> LoadingTransitionResult {
        match (self, transition) {
            (Self::Idle, LoadingTransition::Start) => Ok(Self::Generating),
            (Self::Generating | Self::Error, LoadingTransition::Start) => {
                Err(LoadingTransitionRejection::AlreadyGenerating)
            }
            (Self::Generating, LoadingTransition::Complete) => Ok(Self::Idle),
            (Self::Generating, LoadingTransition::Fail) => Ok(Self::Error),
            (Self::Idle | Self::Error, LoadingTransition::Complete | LoadingTransition::Fail) => {
                Err(LoadingTransitionRejection::NotGenerating)
            }
            (Self::Error, LoadingTransition::Recover) => Ok(Self::Idle),
            (Self::Idle | Self::Generating, LoadingTransition::Recover) => {
                Err(LoadingTransitionRejection::NoFailure)
            }
            (_, LoadingTransition::Reset) => Ok(Self::Idle),
        }
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SidebarSnapshot {
    pub messages: Vec<Message>,
    pub tool: Tool,
    pub complexity: Complexity,
    pub is_generating: bool,
}

/// What happened to a finished generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The formatted reply was recorded.
    Replied,
    /// The generation failed and the fallback reply was recorded.
    FellBack,
    /// The originating conversation or tool is no longer current; nothing changed.
    Discarded,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_rejected_while_generating() {
        let generating = LoadingState::Idle
            .apply(LoadingTransition::Start)
            .expect("idle accepts start");

        assert_eq!(generating, LoadingState::Generating);
        assert_eq!(
            generating.apply(LoadingTransition::Start),
            Err(LoadingTransitionRejection::AlreadyGenerating)
        );
    }

    #[test]
    fn failure_recovers_to_idle() {
        let state = LoadingState::Generating
            .apply(LoadingTransition::Fail)
            .and_then(|state| state.apply(LoadingTransition::Recover));

        assert_eq!(state, Ok(LoadingState::Idle));
    }

    #[test]
    fn terminal_transitions_need_an_active_generation() {
        assert_eq!(
            LoadingState::Idle.apply(LoadingTransition::Complete),
            Err(LoadingTransitionRejection::NotGenerating)
        );
        assert_eq!(
            LoadingState::Generating.apply(LoadingTransition::Recover),
            Err(LoadingTransitionRejection::NoFailure)
        );
    }

    #[test]
    fn reset_always_returns_to_idle() {
        for state in [LoadingState::Idle, LoadingState::Generating, LoadingState::Error] {
            assert_eq!(state.apply(LoadingTransition::Reset), Ok(LoadingState::Idle));
        }
    }
}
