use snafu::Snafu;

use super::history::PreviousChatId;

#[derive(Debug, Snafu, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("message index {index} is out of range for {len} messages"))]
    MessageOutOfRange {
        stage: &'static str,
        index: usize,
        len: usize,
    },
    #[snafu(display("message {index} is not a user message and cannot be edited"))]
    NotUserMessage { stage: &'static str, index: usize },
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Reasons an inbound panel event was rejected before any side effect.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ControllerError {
    #[snafu(display("input on `{stage}` is empty"))]
    InvalidInput { stage: &'static str },
    #[snafu(display("a generation is already in flight"))]
    Busy { stage: &'static str },
    #[snafu(display("the assistant panel is closed"))]
    PanelClosed { stage: &'static str },
    #[snafu(display("session rejected `{stage}`: {source}"))]
    Session {
        stage: &'static str,
        source: SessionError,
    },
    #[snafu(display("previous chat '{id}' was not found"))]
    PreviousChatNotFound {
        stage: &'static str,
        id: PreviousChatId,
    },
}

pub type ControllerResult<T> = Result<T, ControllerError>;
