use futures::FutureExt;
use mentor_llm::{BoxFuture, GenerationClient, GenerationFailure, GenerationRequest};
use snafu::{OptionExt, ResultExt, ensure};
use tokio::sync::watch;

use super::error::{
    BusySnafu, ControllerResult, InvalidInputSnafu, PanelClosedSnafu, PreviousChatNotFoundSnafu,
    SessionSnafu,
};
use super::events::{ApplyOutcome, LoadingState, LoadingTransition, SidebarSnapshot};
use super::history::{ChatArchive, PreviousChatId, PreviousChatSummary};
use super::message::{Complexity, ConversationId, GenerationId, GenerationTarget, Message, Tool};
use super::session::ChatSession;
use crate::{formatter, prompt};

/// Reply recorded when a generation fails for any reason.
pub const FALLBACK_REPLY: &str = "Failed to generate content. Please try again.";

/// Regeneration after an edit always uses this tier, whatever the panel selection is.
pub const EDIT_REGENERATION_COMPLEXITY: Complexity = Complexity::Easy;

/// Construction-time panel state, replacing ambient UI globals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelConfig {
    pub tool: Tool,
    pub complexity: Complexity,
    pub panel_open: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            tool: Tool::default(),
            complexity: Complexity::default(),
            panel_open: true,
        }
    }
}

/// A generation that has been admitted but not yet run.
///
/// The controller already switched to generating and recorded the user message. Run
/// it on any executor, then hand the outcome back to [`SidebarController::apply`].
/// A caller that gives up on it must pass its target to [`SidebarController::abandon`]
/// or the panel stays busy.
#[must_use = "the panel stays busy until the outcome is applied or the generation is abandoned"]
pub struct PendingGeneration {
    target: GenerationTarget,
    task: BoxFuture<'static, Result<String, GenerationFailure>>,
}

impl PendingGeneration {
    pub fn target(&self) -> GenerationTarget {
        self.target
    }

    pub async fn run(self) -> GenerationOutcome {
        GenerationOutcome {
            target: self.target,
            result: self.task.await,
        }
    }
}

/// The finished result of a [`PendingGeneration`].
#[derive(Debug)]
pub struct GenerationOutcome {
    pub target: GenerationTarget,
    pub result: Result<String, GenerationFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveGeneration {
    target: GenerationTarget,
    /// Index the reply is inserted at; equals the history length for a plain submit.
    reply_slot: usize,
}

/// Orchestrates one assistant panel: session, prompt building, generation and
/// formatting, plus the loading indicator.
///
/// Entry points are synchronous and take `&mut self`, so admission of a generation
/// happens before any suspension point and a second submit is refused as busy.
pub struct SidebarController {
    client: GenerationClient,
    session: ChatSession,
    archive: ChatArchive,
    loading: LoadingState,
    panel_open: bool,
    conversation_id: ConversationId,
    next_generation_id: u64,
    active: Option<ActiveGeneration>,
    snapshot_tx: watch::Sender<SidebarSnapshot>,
}

impl SidebarController {
    pub fn new(client: GenerationClient, config: PanelConfig) -> Self {
        let session = ChatSession::new(config.tool, config.complexity);
        let (snapshot_tx, _) = watch::channel(SidebarSnapshot {
            messages: Vec::new(),
            tool: config.tool,
            complexity: config.complexity,
            is_generating: false,
        });

        Self {
            client,
            session,
            archive: ChatArchive::default(),
            loading: LoadingState::Idle,
            panel_open: config.panel_open,
            conversation_id: ConversationId::new(1),
            next_generation_id: 1,
            active: None,
            snapshot_tx,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn loading_state(&self) -> LoadingState {
        self.loading
    }

    pub fn is_generating(&self) -> bool {
        self.loading.is_generating()
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.conversation_id
    }

    pub fn snapshot(&self) -> SidebarSnapshot {
        SidebarSnapshot {
            messages: self.session.messages().to_vec(),
            tool: self.session.tool(),
            complexity: self.session.complexity(),
            is_generating: self.is_generating(),
        }
    }

    /// Receiver that observes a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SidebarSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Records the topic and admits a generation with the current tool and complexity.
    ///
    /// Blank topics are rejected with no state change and no network call.
    pub fn submit(&mut self, topic: &str) -> ControllerResult<PendingGeneration> {
        ensure!(
            !topic.trim().is_empty(),
            InvalidInputSnafu {
                stage: "submit-validate-topic",
            }
        );
        self.ensure_can_start("submit")?;

        self.session.append(Message::user(topic));
        let request = prompt::build(topic, self.session.tool(), self.session.complexity());
        let reply_slot = self.session.len();

        Ok(self.start_generation(request, reply_slot))
    }

    /// Edits a user message; if that drops a stale reply, admits its regeneration.
    ///
    /// The regenerated reply is placed where the stale one was and is always built at
    /// [`EDIT_REGENERATION_COMPLEXITY`]. Returns `None` when no reply was removed.
    pub fn edit_message(
        &mut self,
        index: usize,
        new_content: &str,
    ) -> ControllerResult<Option<PendingGeneration>> {
        ensure!(
            !new_content.trim().is_empty(),
            InvalidInputSnafu {
                stage: "edit-validate-content",
            }
        );
        self.ensure_can_start("edit")?;

        let outcome = self
            .session
            .edit(index, new_content)
            .context(SessionSnafu {
                stage: "edit-message",
            })?;

        if !outcome.needs_regeneration() {
            self.publish();
            return Ok(None);
        }

        let request = prompt::build(
            new_content,
            self.session.tool(),
            EDIT_REGENERATION_COMPLEXITY,
        );
        Ok(Some(self.start_generation(request, outcome.reply_slot())))
    }

    /// Archives the current conversation and starts an empty one.
    ///
    /// An in-flight generation keeps running but its reply will be discarded.
    pub fn new_chat(&mut self) {
        let messages = self.session.replace_messages(Vec::new());
        if let Some(id) = self.archive.archive(self.session.tool(), messages) {
            tracing::debug!(previous_chat_id = %id, "archived conversation");
        }
        self.start_new_conversation();
        self.publish();
    }

    /// Switches the artifact kind. History is kept; a pending reply for the old tool is
    /// discarded when it arrives.
    pub fn select_tool(&mut self, tool: Tool) {
        if self.session.tool() == tool {
            return;
        }
        self.session.set_tool(tool);
        self.invalidate_active("select-tool");
        self.publish();
    }

    pub fn select_complexity(&mut self, complexity: Complexity) {
        self.session.set_complexity(complexity);
        self.publish();
    }

    pub fn open_panel(&mut self) {
        if self.panel_open {
            return;
        }
        self.panel_open = true;
        self.publish();
    }

    /// Closes the panel and discards its session.
    pub fn close_panel(&mut self) {
        if !self.panel_open {
            return;
        }
        self.panel_open = false;
        self.session.clear();
        self.start_new_conversation();
        self.publish();
    }

    /// Archived conversations, newest first.
    pub fn previous_chats(&self, search: &str, tool: Option<Tool>) -> Vec<PreviousChatSummary> {
        self.archive.search(search, tool)
    }

    /// Restores an archived conversation, archiving the current one in its place.
    pub fn open_previous_chat(&mut self, id: PreviousChatId) -> ControllerResult<()> {
        ensure!(
            !self.is_generating(),
            BusySnafu {
                stage: "open-previous-chat",
            }
        );
        let chat = self.archive.take(id).context(PreviousChatNotFoundSnafu {
            stage: "open-previous-chat",
            id,
        })?;

        let current = self.session.replace_messages(chat.messages);
        self.archive.archive(self.session.tool(), current);
        self.session.set_tool(chat.tool);
        self.start_new_conversation();
        self.publish();
        Ok(())
    }

    /// Records a finished generation if it still belongs to the current context.
    ///
    /// Failures never escape: they become [`FALLBACK_REPLY`] and the panel returns to idle.
    pub fn apply(&mut self, outcome: GenerationOutcome) -> ApplyOutcome {
        let Some(active) = self.active.filter(|active| active.target == outcome.target) else {
            tracing::debug!(
                generation = ?outcome.target,
                active = ?self.active.map(|active| active.target),
                succeeded = outcome.result.is_ok(),
                "dropping stale generation result"
            );
            return ApplyOutcome::Discarded;
        };
        self.active = None;

        let applied = match outcome.result {
            Ok(raw) => {
                let content = formatter::format(&raw);
                if content.is_empty() {
                    tracing::debug!(generation = ?active.target, "model returned no content");
                }
                self.record_reply(active, content);
                self.transition(LoadingTransition::Complete);
                ApplyOutcome::Replied
            }
            Err(error) => {
                tracing::warn!(
                    generation = ?active.target,
                    stage = error.stage,
                    error = %error,
                    "generation failed; recording fallback reply"
                );
                self.transition(LoadingTransition::Fail);
                self.record_reply(active, FALLBACK_REPLY.to_string());
                self.transition(LoadingTransition::Recover);
                ApplyOutcome::FellBack
            }
        };

        self.publish();
        applied
    }

    /// Releases the panel after the caller dropped a [`PendingGeneration`] without
    /// applying it. Nothing is recorded for the abandoned request.
    ///
    /// Returns `false` when `target` is no longer the active generation.
    pub fn abandon(&mut self, target: GenerationTarget) -> bool {
        if self.active.is_none_or(|active| active.target != target) {
            tracing::debug!(generation = ?target, "ignoring abandon for inactive generation");
            return false;
        }

        self.invalidate_active("abandon");
        self.publish();
        true
    }

    /// Submits and waits for the reply in one step.
    pub async fn submit_and_wait(&mut self, topic: &str) -> ControllerResult<ApplyOutcome> {
        let pending = self.submit(topic)?;
        let outcome = pending.run().await;
        Ok(self.apply(outcome))
    }

    /// Edits and waits for the regenerated reply, if one was needed.
    pub async fn edit_and_wait(
        &mut self,
        index: usize,
        new_content: &str,
    ) -> ControllerResult<Option<ApplyOutcome>> {
        let Some(pending) = self.edit_message(index, new_content)? else {
            return Ok(None);
        };
        let outcome = pending.run().await;
        Ok(Some(self.apply(outcome)))
    }

    fn ensure_can_start(&self, stage: &'static str) -> ControllerResult<()> {
        ensure!(self.panel_open, PanelClosedSnafu { stage });
        if let Err(rejection) = self.loading.apply(LoadingTransition::Start) {
            tracing::debug!(stage, ?rejection, "generation refused");
            return BusySnafu { stage }.fail();
        }
        Ok(())
    }

    fn start_generation(
        &mut self,
        request: GenerationRequest,
        reply_slot: usize,
    ) -> PendingGeneration {
        let target = GenerationTarget::new(
            self.conversation_id,
            GenerationId::new(self.next_generation_id),
        );
        self.next_generation_id = self.next_generation_id.wrapping_add(1);
        self.active = Some(ActiveGeneration { target, reply_slot });
        self.transition(LoadingTransition::Start);
        self.publish();

        tracing::debug!(
            generation = ?target,
            tool = %self.session.tool(),
            provider_id = %self.client.provider_id(),
            "generation admitted"
        );

        let client = self.client.clone();
        let task = async move { client.generate(&request).await }.boxed();
        PendingGeneration { target, task }
    }

    fn record_reply(&mut self, active: ActiveGeneration, content: String) {
        let slot = active.reply_slot.min(self.session.len());
        if let Err(error) = self.session.insert(slot, Message::assistant(content)) {
            tracing::error!(error = %error, "failed to record reply");
        }
        debug_assert!(!self.session.has_consecutive_replies());
    }

    fn start_new_conversation(&mut self) {
        self.conversation_id = self.conversation_id.next();
        self.invalidate_active("new-conversation");
    }

    /// Forgets the in-flight generation so its reply is dropped, and frees the input.
    fn invalidate_active(&mut self, stage: &'static str) {
        if let Some(active) = self.active.take() {
            tracing::debug!(
                stage,
                generation = ?active.target,
                "in-flight generation invalidated"
            );
        }
        self.transition(LoadingTransition::Reset);
    }

    fn transition(&mut self, transition: LoadingTransition) {
        match self.loading.apply(transition) {
            Ok(next) => self.loading = next,
            Err(rejection) => {
                tracing::error!(
                    ?transition,
                    ?rejection,
                    state = ?self.loading,
                    "illegal loading transition"
                );
            }
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
