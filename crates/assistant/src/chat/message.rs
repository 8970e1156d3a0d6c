use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one conversation shown in the panel.
///
/// Bumped on every "new chat" so replies for the old conversation can be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(pub u64);

impl ConversationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Identifier of one generation call. Never reused within a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GenerationId(pub u64);

impl GenerationId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Routing key used for stale-response rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenerationTarget {
    pub conversation_id: ConversationId,
    pub generation_id: GenerationId,
}

impl GenerationTarget {
    pub const fn new(conversation_id: ConversationId, generation_id: GenerationId) -> Self {
        Self {
            conversation_id,
            generation_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Kind of artifact the assistant produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Analogy,
    Quiz,
    Flashcard,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::Analogy, Tool::Quiz, Tool::Flashcard];

    /// Menu label for the tool picker.
    pub fn label(self) -> &'static str {
        match self {
            Self::Analogy => "Create Analogy",
            Self::Quiz => "Create Quiz",
            Self::Flashcard => "Create Flashcard",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Analogy => "analogy",
            Self::Quiz => "quiz",
            Self::Flashcard => "flashcard",
        };
        formatter.write_str(name)
    }
}

/// Requested depth of the generated artifact.
///
/// Only changes the prompt wording; sampling parameters stay fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Complexity {
    pub const ALL: [Complexity; 3] = [Complexity::Easy, Complexity::Medium, Complexity::Hard];
}

impl fmt::Display for Complexity {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        };
        formatter.write_str(name)
    }
}
