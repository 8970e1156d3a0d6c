use snafu::ensure;

use super::error::{MessageOutOfRangeSnafu, NotUserMessageSnafu, SessionResult};
use super::message::{Complexity, Message, Tool};

/// Result of editing a user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Index of the edited user message.
    pub index: usize,
    /// The assistant reply that followed the edited message, now stale.
    pub removed_reply: Option<Message>,
}

impl EditOutcome {
    /// A stale reply was dropped, so the caller must generate a new one.
    pub fn needs_regeneration(&self) -> bool {
        self.removed_reply.is_some()
    }

    /// Slot the regenerated reply belongs in.
    pub fn reply_slot(&self) -> usize {
        self.index + 1
    }
}

/// In-memory chat state for one open panel.
///
/// Holds no generation state; in-flight bookkeeping lives in the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSession {
    messages: Vec<Message>,
    tool: Tool,
    complexity: Complexity,
}

impl ChatSession {
    pub fn new(tool: Tool, complexity: Complexity) -> Self {
        Self {
            messages: Vec::new(),
            tool,
            complexity,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn complexity(&self) -> Complexity {
        self.complexity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Places a message at `index`, shifting later messages back.
    pub fn insert(&mut self, index: usize, message: Message) -> SessionResult<()> {
        ensure!(
            index <= self.messages.len(),
            MessageOutOfRangeSnafu {
                stage: "session-insert",
                index,
                len: self.messages.len(),
            }
        );
        self.messages.insert(index, message);
        Ok(())
    }

    /// Replaces a user message and drops the assistant reply directly after it.
    ///
    /// Exactly one trailing reply is removed, never more.
    pub fn edit(
        &mut self,
        index: usize,
        new_content: impl Into<String>,
    ) -> SessionResult<EditOutcome> {
        let len = self.messages.len();
        let Some(message) = self.messages.get_mut(index) else {
            return MessageOutOfRangeSnafu {
                stage: "session-edit",
                index,
                len,
            }
            .fail();
        };
        ensure!(
            message.is_user(),
            NotUserMessageSnafu {
                stage: "session-edit",
                index,
            }
        );

        message.content = new_content.into();

        let removed_reply = match self.messages.get(index + 1) {
            Some(next) if next.is_assistant() => Some(self.messages.remove(index + 1)),
            _ => None,
        };

        Ok(EditOutcome {
            index,
            removed_reply,
        })
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    pub fn set_complexity(&mut self, complexity: Complexity) {
        self.complexity = complexity;
    }

    /// Swaps in a whole history, returning the previous one.
    pub(crate) fn replace_messages(&mut self, messages: Vec<Message>) -> Vec<Message> {
        std::mem::replace(&mut self.messages, messages)
    }

    /// True when two assistant messages sit next to each other, which only a
    /// controller bug can produce.
    pub fn has_consecutive_replies(&self) -> bool {
        self.messages
            .windows(2)
            .any(|pair| pair[0].is_assistant() && pair[1].is_assistant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::error::SessionError;

    fn session_with(messages: &[Message]) -> ChatSession {
        let mut session = ChatSession::default();
        for message in messages {
            session.append(message.clone());
        }
        session
    }

    #[test]
    fn append_keeps_insertion_order() {
        let session = session_with(&[
            Message::user("gravity"),
            Message::assistant("It pulls."),
            Message::user("magnets"),
        ]);

        let contents = session
            .messages()
            .iter()
            .map(|message| message.content.as_str())
            .collect::<Vec<_>>();
        assert_eq!(contents, ["gravity", "It pulls.", "magnets"]);
    }

    #[test]
    fn edit_replaces_content_and_drops_one_stale_reply() {
        let mut session = session_with(&[
            Message::user("gravity"),
            Message::assistant("old answer"),
            Message::user("magnets"),
            Message::assistant("magnet answer"),
        ]);

        let outcome = session.edit(0, "orbits").expect("edit succeeds");

        assert!(outcome.needs_regeneration());
        assert_eq!(outcome.reply_slot(), 1);
        assert_eq!(outcome.removed_reply, Some(Message::assistant("old answer")));
        assert_eq!(
            session.messages(),
            [
                Message::user("orbits"),
                Message::user("magnets"),
                Message::assistant("magnet answer"),
            ]
        );
    }

    #[test]
    fn edit_of_last_user_message_without_reply_removes_nothing() {
        let mut session = session_with(&[Message::assistant("hi"), Message::user("draft")]);

        let outcome = session.edit(1, "final").expect("edit succeeds");

        assert!(!outcome.needs_regeneration());
        assert_eq!(session.messages()[1], Message::user("final"));
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn edit_rejects_assistant_messages() {
        let mut session = session_with(&[Message::user("q"), Message::assistant("a")]);

        let error = session.edit(1, "rewrite").expect_err("assistant edits are rejected");

        assert_eq!(
            error,
            SessionError::NotUserMessage {
                stage: "session-edit",
                index: 1
            }
        );
        assert_eq!(session.messages()[1], Message::assistant("a"));
    }

    #[test]
    fn edit_rejects_out_of_range_index() {
        let mut session = session_with(&[Message::user("q")]);

        assert!(matches!(
            session.edit(3, "x"),
            Err(SessionError::MessageOutOfRange { index: 3, len: 1, .. })
        ));
    }

    #[test]
    fn tool_and_complexity_swaps_keep_history() {
        let mut session = session_with(&[Message::user("q"), Message::assistant("a")]);

        session.set_tool(Tool::Flashcard);
        session.set_complexity(Complexity::Hard);

        assert_eq!(session.tool(), Tool::Flashcard);
        assert_eq!(session.complexity(), Complexity::Hard);
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn clear_empties_history_but_keeps_selection() {
        let mut session = ChatSession::new(Tool::Quiz, Complexity::Medium);
        session.append(Message::user("q"));

        session.clear();

        assert!(session.is_empty());
        assert_eq!(session.tool(), Tool::Quiz);
        assert_eq!(session.complexity(), Complexity::Medium);
    }

    #[test]
    fn insert_places_reply_in_vacated_slot() {
        let mut session = session_with(&[Message::user("a"), Message::user("b")]);

        session
            .insert(1, Message::assistant("reply"))
            .expect("slot in range");

        assert!(!session.has_consecutive_replies());
        assert_eq!(session.messages()[1], Message::assistant("reply"));
        assert!(session.insert(9, Message::assistant("x")).is_err());
    }

    #[test]
    fn detects_consecutive_replies() {
        let session = session_with(&[
            Message::user("q"),
            Message::assistant("a"),
            Message::assistant("b"),
        ]);

        assert!(session.has_consecutive_replies());
    }
}
