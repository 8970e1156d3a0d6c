use std::fmt;

use uuid::Uuid;

use super::message::{Message, Tool};

pub const TITLE_MAX_CHARS: usize = 48;
pub const UNTITLED_CHAT: &str = "Untitled chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviousChatId(pub Uuid);

impl PreviousChatId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PreviousChatId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A conversation set aside by "new chat". Lives only as long as the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousChat {
    pub id: PreviousChatId,
    pub title: String,
    pub tool: Tool,
    pub messages: Vec<Message>,
}

/// List row for the previous-chats picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviousChatSummary {
    pub id: PreviousChatId,
    pub title: String,
    pub tool: Tool,
    pub message_count: usize,
}

/// Newest-last store of archived conversations.
#[derive(Debug, Clone, Default)]
pub struct ChatArchive {
    chats: Vec<PreviousChat>,
}

impl ChatArchive {
    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    /// Archives a conversation. Empty histories are not worth keeping.
    pub fn archive(&mut self, tool: Tool, messages: Vec<Message>) -> Option<PreviousChatId> {
        if messages.is_empty() {
            return None;
        }

        let id = PreviousChatId::new_v4();
        self.chats.push(PreviousChat {
            id,
            title: chat_title(&messages),
            tool,
            messages,
        });
        Some(id)
    }

    /// Newest first, filtered by case-insensitive title match and optional tool.
    pub fn search(&self, term: &str, tool: Option<Tool>) -> Vec<PreviousChatSummary> {
        let term = term.trim().to_lowercase();
        self.chats
            .iter()
            .rev()
            .filter(|chat| tool.is_none_or(|tool| chat.tool == tool))
            .filter(|chat| term.is_empty() || chat.title.to_lowercase().contains(&term))
            .map(|chat| PreviousChatSummary {
                id: chat.id,
                title: chat.title.clone(),
                tool: chat.tool,
                message_count: chat.messages.len(),
            })
            .collect()
    }

    pub fn take(&mut self, id: PreviousChatId) -> Option<PreviousChat> {
        let position = self.chats.iter().position(|chat| chat.id == id)?;
        Some(self.chats.remove(position))
    }
}

/// Title from the first user message, flattened to one line and truncated.
fn chat_title(messages: &[Message]) -> String {
    let Some(first) = messages.iter().find(|message| message.is_user()) else {
        return UNTITLED_CHAT.to_string();
    };

    let flattened = first.content.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.is_empty() {
        return UNTITLED_CHAT.to_string();
    }

    if flattened.chars().count() <= TITLE_MAX_CHARS {
        return flattened;
    }

    let mut title = flattened
        .chars()
        .take(TITLE_MAX_CHARS - 1)
        .collect::<String>()
        .trim_end()
        .to_string();
    title.push('\u{2026}');
    title
}
