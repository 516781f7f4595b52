use serde::{Deserialize, Serialize};

use crate::model::Category;

/// Default question count when a coach directive names none.
const DEFAULT_REQUEST_COUNT: u32 = 10;

/// Most questions a coach directive may request.
const MAX_REQUEST_COUNT: u32 = 50;

/// Who said a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// One turn in a coach conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

//
// ─── COACH ACTIONS ─────────────────────────────────────────────────────────────
//

/// A concrete action the coach asks the app to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoachAction {
    /// Launch a quiz, optionally scoped to one category.
    StartQuiz {
        category: Option<Category>,
        question_count: u32,
    },
}

/// A coach answer: the text to show plus an optional parsed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoachReply {
    pub message: String,
    pub action: Option<CoachAction>,
}

/// Pull an inline action directive out of a coach response.
///
/// The coach signals actions with a bracketed directive such as
/// `[[start_quiz category=road-signs count=15]]`. A well-formed directive
/// is removed from the visible text and returned as a [`CoachAction`];
/// anything malformed is left in the text and yields no action. Counts
/// are clamped to `1..=50` and default to 10; `category=mixed` (or no
/// category) means all topics.
#[must_use]
pub fn extract_directive(text: &str) -> (String, Option<CoachAction>) {
    let Some(open) = text.find("[[") else {
        return (text.trim().to_string(), None);
    };
    let Some(close_offset) = text[open + 2..].find("]]") else {
        return (text.trim().to_string(), None);
    };
    let close = open + 2 + close_offset;

    let body = &text[open + 2..close];
    let Some(action) = parse_directive(body) else {
        return (text.trim().to_string(), None);
    };

    let mut message = String::with_capacity(text.len());
    message.push_str(&text[..open]);
    message.push_str(&text[close + 2..]);
    (message.trim().to_string(), Some(action))
}

/// Parse the inside of a `[[...]]` directive.
///
/// Returns `None` for anything that is not exactly a `start_quiz`
/// directive with recognised arguments.
fn parse_directive(body: &str) -> Option<CoachAction> {
    let mut tokens = body.split_whitespace();
    if tokens.next()? != "start_quiz" {
        return None;
    }

    let mut category: Option<Category> = None;
    let mut question_count = DEFAULT_REQUEST_COUNT;

    for token in tokens {
        let (key, value) = token.split_once('=')?;
        match key {
            "category" => {
                if value != "mixed" {
                    category = Some(Category::parse(value).ok()?);
                }
            }
            "count" => {
                let count: u32 = value.parse().ok()?;
                question_count = count.clamp(1, MAX_REQUEST_COUNT);
            }
            _ => return None,
        }
    }

    Some(CoachAction::StartQuiz {
        category,
        question_count,
    })
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_has_no_action() {
        let (message, action) = extract_directive("Keep practising road signs!");
        assert_eq!(message, "Keep practising road signs!");
        assert_eq!(action, None);
    }

    #[test]
    fn extracts_full_directive() {
        let (message, action) = extract_directive(
            "Let's drill your weakest topic. [[start_quiz category=road-signs count=15]] Good luck!",
        );
        assert_eq!(message, "Let's drill your weakest topic.  Good luck!");
        assert_eq!(
            action,
            Some(CoachAction::StartQuiz {
                category: Some(Category::RoadSigns),
                question_count: 15,
            })
        );
    }

    #[test]
    fn bare_directive_uses_defaults() {
        let (message, action) = extract_directive("[[start_quiz]]");
        assert_eq!(message, "");
        assert_eq!(
            action,
            Some(CoachAction::StartQuiz {
                category: None,
                question_count: 10,
            })
        );
    }

    #[test]
    fn mixed_category_means_all_topics() {
        let (_, action) = extract_directive("[[start_quiz category=mixed count=20]]");
        assert_eq!(
            action,
            Some(CoachAction::StartQuiz {
                category: None,
                question_count: 20,
            })
        );
    }

    #[test]
    fn count_is_clamped() {
        let (_, action) = extract_directive("[[start_quiz count=500]]");
        assert_eq!(
            action,
            Some(CoachAction::StartQuiz {
                category: None,
                question_count: 50,
            })
        );

        let (_, action) = extract_directive("[[start_quiz count=0]]");
        assert_eq!(
            action,
            Some(CoachAction::StartQuiz {
                category: None,
                question_count: 1,
            })
        );
    }

    #[test]
    fn malformed_directives_are_left_in_place() {
        for raw in [
            "[[start_quiz category=night-driving]]",
            "[[start_quiz count=soon]]",
            "[[start_quiz volume=11]]",
            "[[launch_quiz]]",
            "[[start_quiz count=5",
        ] {
            let (message, action) = extract_directive(raw);
            assert_eq!(action, None, "{raw} should not parse");
            assert_eq!(message, raw);
        }
    }

    #[test]
    fn only_first_directive_is_parsed() {
        let (message, action) =
            extract_directive("[[start_quiz count=5]] and also [[start_quiz count=9]]");
        assert_eq!(
            action,
            Some(CoachAction::StartQuiz {
                category: None,
                question_count: 5,
            })
        );
        assert_eq!(message, "and also [[start_quiz count=9]]");
    }
}
