use mentor_llm::GenerationRequest;

use crate::chat::{Complexity, Tool};

/// Model-steering hint only; `formatter::format` enforces the layout regardless.
pub const FORMAT_INSTRUCTION: &str = "Separate paragraphs with exactly one blank line and do not start your response with blank lines.";

pub const MEDIUM_CLAUSE: &str = "Make it moderately complex, more detail.";
pub const HARD_CLAUSE: &str = "Make it highly complex, nuanced, advanced concepts.";

const ANALOGY_PERSONA: &str = "You are a helpful assistant specialized in creating analogies. Explain ideas through clear comparisons to everyday experiences, using simple language and short, friendly paragraphs.";
const QUIZ_PERSONA: &str = "You are a helpful assistant specialized in writing quiz questions. Write one clear question with a single correct answer, then give the answer and a brief explanation of why it is correct.";
const FLASHCARD_PERSONA: &str = "You are a helpful assistant specialized in creating study flashcards. Put a term or question on the front and a concise, accurate answer on the back, labelled Front and Back.";

pub fn system_prompt(tool: Tool) -> &'static str {
    match tool {
        Tool::Analogy => ANALOGY_PERSONA,
        Tool::Quiz => QUIZ_PERSONA,
        Tool::Flashcard => FLASHCARD_PERSONA,
    }
}

pub fn instruction_verb(tool: Tool) -> &'static str {
    match tool {
        Tool::Analogy => "Create an analogy for: ",
        Tool::Quiz => "Create a quiz question and answer about: ",
        Tool::Flashcard => "Create a flashcard for: ",
    }
}

pub fn complexity_clause(complexity: Complexity) -> Option<&'static str> {
    match complexity {
        Complexity::Easy => None,
        Complexity::Medium => Some(MEDIUM_CLAUSE),
        Complexity::Hard => Some(HARD_CLAUSE),
    }
}

/// Builds the model input for one artifact request.
///
/// Pure: the same `(topic, tool, complexity)` always yields an equal request. The topic
/// is used verbatim; callers reject blank topics before getting here.
pub fn build(topic: &str, tool: Tool, complexity: Complexity) -> GenerationRequest {
    let mut user_prompt = format!("{FORMAT_INSTRUCTION}\n\n{}{topic}", instruction_verb(tool));
    if let Some(clause) = complexity_clause(complexity) {
        user_prompt.push_str("\n\n");
        user_prompt.push_str(clause);
    }

    GenerationRequest::new(system_prompt(tool), user_prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_llm::GenerationParameters;

    #[test]
    fn build_is_deterministic_for_every_combination() {
        for tool in Tool::ALL {
            for complexity in Complexity::ALL {
                assert_eq!(
                    build("cell division", tool, complexity),
                    build("cell division", tool, complexity)
                );
            }
        }
    }

    #[test]
    fn hard_quiz_carries_verb_topic_and_clause() {
        let request = build("gravity", Tool::Quiz, Complexity::Hard);

        assert!(
            request
                .user_prompt()
                .contains("Create a quiz question and answer about: gravity")
        );
        assert!(request.user_prompt().ends_with(HARD_CLAUSE));
        assert!(
            request
                .user_prompt()
                .contains("highly complex, nuanced, advanced concepts")
        );
        assert_eq!(request.system_prompt(), QUIZ_PERSONA);
    }

    #[test]
    fn easy_quiz_has_no_complexity_clause() {
        let request = build("gravity", Tool::Quiz, Complexity::Easy);

        assert!(
            request
                .user_prompt()
                .ends_with("Create a quiz question and answer about: gravity")
        );
        assert!(!request.user_prompt().contains(MEDIUM_CLAUSE));
        assert!(!request.user_prompt().contains(HARD_CLAUSE));
    }

    #[test]
    fn medium_appends_medium_clause_only() {
        let prompt = build("tides", Tool::Analogy, Complexity::Medium)
            .user_prompt()
            .to_string();

        assert!(prompt.contains("Create an analogy for: tides"));
        assert!(prompt.ends_with(MEDIUM_CLAUSE));
        assert!(prompt.contains("moderately complex, more detail"));
        assert!(!prompt.contains(HARD_CLAUSE));
    }

    #[test]
    fn format_instruction_leads_exactly_once() {
        let prompt = build("enzymes", Tool::Flashcard, Complexity::Hard)
            .user_prompt()
            .to_string();

        assert!(prompt.starts_with(FORMAT_INSTRUCTION));
        assert_eq!(prompt.matches(FORMAT_INSTRUCTION).count(), 1);
    }

    #[test]
    fn each_tool_has_its_own_persona() {
        let personas = Tool::ALL.map(system_prompt);

        assert_ne!(personas[0], personas[1]);
        assert_ne!(personas[1], personas[2]);
        assert_ne!(personas[0], personas[2]);
    }

    mod proptest_build {
        use super::*;
        use proptest::prelude::*;

        fn tool() -> impl Strategy<Value = Tool> {
            prop::sample::select(Tool::ALL.to_vec())
        }

        fn complexity() -> impl Strategy<Value = Complexity> {
            prop::sample::select(Complexity::ALL.to_vec())
        }

        proptest! {
            #[test]
            fn build_is_deterministic(topic in "\\PC{1,120}", tool in tool(), complexity in complexity()) {
                prop_assert_eq!(build(&topic, tool, complexity), build(&topic, tool, complexity));
            }

            #[test]
            fn topic_follows_the_tool_verb(topic in "\\PC{1,120}", tool in tool(), complexity in complexity()) {
                let request = build(&topic, tool, complexity);
                let expected = format!("{}{topic}", instruction_verb(tool));

                prop_assert!(request.user_prompt().contains(&expected));
            }
        }
    }

    #[test]
    fn complexity_never_changes_parameters() {
        for complexity in Complexity::ALL {
            assert_eq!(
                build("x", Tool::Analogy, complexity).parameters(),
                &GenerationParameters::FIXED
            );
        }
    }
}
