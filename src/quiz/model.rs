//! Quiz questions and answer attempts

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four multiple-choice options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChoiceKey {
    A,
    B,
    C,
    D,
}

impl ChoiceKey {
    /// All choices in display order
    pub fn all() -> &'static [ChoiceKey] {
        &[Self::A, Self::B, Self::C, Self::D]
    }

    /// Parse a letter choice (`a`..`d`, case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "a" => Some(Self::A),
            "b" => Some(Self::B),
            "c" => Some(Self::C),
            "d" => Some(Self::D),
            _ => None,
        }
    }

    /// Parse a stored correct answer, which is an ordinal `"1"`..`"4"`
    pub fn from_ordinal(s: &str) -> Option<Self> {
        match s.trim() {
            "1" => Some(Self::A),
            "2" => Some(Self::B),
            "3" => Some(Self::C),
            "4" => Some(Self::D),
            _ => None,
        }
    }

    /// Ordinal form used by stored answers (a→1, b→2, c→3, d→4)
    pub fn ordinal(&self) -> &'static str {
        match self {
            Self::A => "1",
            Self::B => "2",
            Self::C => "3",
            Self::D => "4",
        }
    }

    pub fn letter(&self) -> char {
        match self {
            Self::A => 'a',
            Self::B => 'b',
            Self::C => 'c',
            Self::D => 'd',
        }
    }
}

impl fmt::Display for ChoiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A quiz question attached to a lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: u32,
    /// Ordinal key of the lesson this question belongs to
    pub lesson_id: String,
    pub prompt: String,
    /// Correct answer as an ordinal string, `"1"`..`"4"`
    pub correct_answer: String,
    /// Choice texts keyed by letter
    pub choices: BTreeMap<ChoiceKey, String>,
}

impl QuestionRecord {
    /// The correct choice, if the stored answer is a valid ordinal
    pub fn correct_choice(&self) -> Option<ChoiceKey> {
        ChoiceKey::from_ordinal(&self.correct_answer)
    }

    /// Compare a letter choice against the stored ordinal answer
    pub fn is_correct(&self, choice: ChoiceKey) -> bool {
        choice.ordinal() == self.correct_answer.trim()
    }

    /// Text of a choice, empty when the question omits it
    pub fn choice_text(&self, choice: ChoiceKey) -> &str {
        self.choices.get(&choice).map(String::as_str).unwrap_or("")
    }
}

/// One submitted answer; the log of these is append-only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerAttempt {
    pub question_id: u32,
    pub chosen_key: ChoiceKey,
    pub is_correct: bool,
    /// Unix milliseconds
    pub timestamp: i64,
}

/// Quiz state of the current lesson session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionSessionState {
    /// Questions answered in this or earlier sessions
    pub answered_question_ids: HashSet<u32>,
    /// Whether a question was already triggered since the lesson loaded
    pub triggered_this_session: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct: &str) -> QuestionRecord {
        QuestionRecord {
            id: 1,
            lesson_id: "1".to_string(),
            prompt: "Qual é a resposta?".to_string(),
            correct_answer: correct.to_string(),
            choices: ChoiceKey::all().iter().map(|k| (*k, format!("opção {}", k))).collect(),
        }
    }

    #[test]
    fn letter_maps_to_ordinal_before_comparison() {
        let q = question("2");
        assert!(q.is_correct(ChoiceKey::B));
        assert!(!q.is_correct(ChoiceKey::A));
        assert!(!q.is_correct(ChoiceKey::C));
        assert!(!q.is_correct(ChoiceKey::D));
        assert_eq!(q.correct_choice(), Some(ChoiceKey::B));
    }

    #[test]
    fn letter_answer_never_matches() {
        // stored answers are ordinals; a letter in the store is bad data
        let q = question("b");
        assert!(ChoiceKey::all().iter().all(|k| !q.is_correct(*k)));
        assert_eq!(q.correct_choice(), None);
    }

    #[test]
    fn parse_choice_keys() {
        assert_eq!(ChoiceKey::parse(" C "), Some(ChoiceKey::C));
        assert_eq!(ChoiceKey::parse("e"), None);
        assert_eq!(ChoiceKey::parse("1"), None);
    }

    #[test]
    fn choice_key_serializes_lowercase() {
        let json = serde_json::to_string(&ChoiceKey::D).unwrap();
        assert_eq!(json, "\"d\"");
        let q = question("4");
        assert_eq!(q.choice_text(ChoiceKey::D), "opção d");
    }
}
