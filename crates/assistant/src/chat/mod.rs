/// Orchestration of one assistant panel.
pub mod controller;
pub mod error;
/// Loading state machine and presentation-facing snapshots.
pub mod events;
pub mod history;
/// Domain entities and stale-response routing keys.
pub mod message;
pub mod session;


pub use controller::{
    EDIT_REGENERATION_COMPLEXITY, FALLBACK_REPLY, GenerationOutcome, PanelConfig,
    PendingGeneration, SidebarController,
};
pub use error::{ControllerError, ControllerResult, SessionError, SessionResult};
pub use events::{
    ApplyOutcome, LoadingState, LoadingTransition, LoadingTransitionRejection, SidebarSnapshot,
};
pub use history::{ChatArchive, PreviousChat, PreviousChatId, PreviousChatSummary};
pub use message::{
    Complexity, ConversationId, GenerationId, GenerationTarget, Message, Role, Tool,
};
pub use session::{ChatSession, EditOutcome};
