//! Course catalog model
//!
//! A course is a list of modules, each holding lessons ("aulas") that are
//! ordered by the number in their ordinal key. Quiz questions reference a
//! lesson through that same key.

use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::quiz::QuestionRecord;

/// First run of digits in an ordinal key such as "Aula 10" (compiled once)
static ORDINAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Extract the lesson number from an ordinal key; non-numeric keys yield `None`
pub fn parse_ordinal(key: &str) -> Option<u32> {
    ORDINAL_RE.find(key).and_then(|m| m.as_str().parse().ok())
}

/// A single video lesson
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    /// Unique lesson identifier (used as the progress key)
    pub id: String,
    /// Ordinal key, e.g. "1" or "Aula 10"
    pub ordinal: String,
    /// Display title
    pub title: String,
    /// Video location
    #[serde(default)]
    pub video_url: Option<String>,
    /// Expected length in seconds, when known ahead of playback
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    /// Short description, also passed to the chat service as lesson context
    #[serde(default)]
    pub description: Option<String>,
}

impl Lesson {
    /// Lesson number parsed from the ordinal key
    pub fn number(&self) -> Option<u32> {
        parse_ordinal(&self.ordinal)
    }

    /// Numeric ordering; lessons without a number sort last, then by id
    pub fn cmp_ordinal(&self, other: &Lesson) -> Ordering {
        match (self.number(), other.number()) {
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.id.cmp(&other.id)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.id.cmp(&other.id),
        }
    }

    /// Whether a question belongs to this lesson
    pub fn owns_question(&self, question: &QuestionRecord) -> bool {
        match (self.number(), parse_ordinal(&question.lesson_id)) {
            (Some(a), Some(b)) => a == b,
            _ => self.ordinal.trim() == question.lesson_id.trim(),
        }
    }
}

/// A group of lessons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

impl Module {
    /// Sort lessons by their numeric ordinal
    pub fn sort_lessons(&mut self) {
        self.lessons.sort_by(Lesson::cmp_ordinal);
    }

    /// Position of a lesson within this module
    pub fn position_of(&self, lesson_id: &str) -> Option<usize> {
        self.lessons.iter().position(|l| l.id == lesson_id)
    }
}

/// Modules plus the question bank
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub modules: Vec<Module>,
    #[serde(default)]
    pub questions: Vec<QuestionRecord>,
}

impl Catalog {
    /// Parse a catalog from JSON, sorting every module's lessons
    pub fn from_json(json: &str) -> Result<Self> {
        let mut catalog: Catalog =
            serde_json::from_str(json).with_context(|| "Failed to parse course catalog")?;
        for module in &mut catalog.modules {
            module.sort_lessons();
        }
        Ok(catalog)
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog from {:?}", path))?;
        Self::from_json(&contents)
    }

    /// Find a lesson by id
    pub fn find_lesson(&self, lesson_id: &str) -> Option<&Lesson> {
        self.modules.iter().flat_map(|m| m.lessons.iter()).find(|l| l.id == lesson_id)
    }

    /// Questions attached to a lesson
    pub fn questions_for(&self, lesson: &Lesson) -> Vec<QuestionRecord> {
        self.questions.iter().filter(|q| lesson.owns_question(q)).cloned().collect()
    }

    /// Total lesson count across modules
    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}
