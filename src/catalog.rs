//! Line parser for quiz data files.
//!
//! One group per line: `<category> "<question1>" "<question2>" ...`. Only
//! complete `"…"` spans count as questions; there is no escape syntax for a
//! quote inside a question, so an odd number of quotes silently drops the
//! trailing unmatched text.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A category paired with its ordered questions. Immutable once parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGroup")]
pub struct QuestionGroup {
    category: String,
    questions: Vec<String>,
}

impl QuestionGroup {
    /// Build a group directly. Returns `None` when the trimmed category is
    /// empty or there are no questions.
    pub fn new(category: &str, questions: Vec<String>) -> Option<Self> {
        let category = category.trim();
        if category.is_empty() || questions.is_empty() {
            return None;
        }
        Some(Self {
            category: category.to_string(),
            questions,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Question at `idx`, if any.
    pub fn question(&self, idx: usize) -> Option<&str> {
        self.questions.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    // Never true for parsed groups; kept for clippy's len_without_is_empty.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

#[derive(Deserialize)]
struct RawGroup {
    category: String,
    questions: Vec<String>,
}

impl TryFrom<RawGroup> for QuestionGroup {
    type Error = String;

    fn try_from(raw: RawGroup) -> Result<Self, Self::Error> {
        let category = raw.category;
        QuestionGroup::new(&category, raw.questions)
            .ok_or_else(|| format!("group {:?} needs a category and a question", category))
    }
}

/// Ordered, parsed groups from one load.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    groups: Vec<QuestionGroup>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&QuestionGroup> {
        self.groups.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QuestionGroup> {
        self.groups.iter()
    }

    /// Category labels in catalog order.
    pub fn categories(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.category.clone()).collect()
    }
}

impl From<Vec<QuestionGroup>> for Catalog {
    fn from(groups: Vec<QuestionGroup>) -> Self {
        Self { groups }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a QuestionGroup;
    type IntoIter = std::slice::Iter<'a, QuestionGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

static RE_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]*)""#).unwrap());

/// Parse a single data line. Blank lines, lines without any quoted question
/// and lines whose category label is empty yield `None`.
pub fn parse_line(raw: &str) -> Option<QuestionGroup> {
    let line = raw.trim();
    if line.is_empty() {
        return None;
    }

    let questions: Vec<String> = RE_QUOTED
        .captures_iter(line)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    if questions.is_empty() {
        return None;
    }

    let category = line.split('"').next().unwrap_or_default().trim();
    if category.is_empty() {
        return None;
    }

    Some(QuestionGroup {
        category: category.to_string(),
        questions,
    })
}

/// Parse a whole data file, keeping valid lines in order and truncating to
/// `max_groups` when given. Never fails: an empty result is for the caller to
/// report.
pub fn parse_catalog(text: &str, max_groups: Option<usize>) -> Catalog {
    let mut lines = 0usize;
    let mut groups: Vec<QuestionGroup> = text
        .split('\n')
        .inspect(|_| lines += 1)
        .filter_map(parse_line)
        .collect();
    let parsed = groups.len();
    if let Some(max) = max_groups {
        groups.truncate(max);
    }
    log::debug!(
        "parsed catalog: {} lines, {} skipped, {} truncated",
        lines,
        lines - parsed,
        parsed - groups.len()
    );
    Catalog { groups }
}

/// Write a group back in the data-file format. Questions containing `"` cannot
/// be represented and will not parse back identically.
pub fn serialize_line(group: &QuestionGroup) -> String {
    let mut out = group.category.clone();
    for q in &group.questions {
        out.push_str(" \"");
        out.push_str(q);
        out.push('"');
    }
    out
}
