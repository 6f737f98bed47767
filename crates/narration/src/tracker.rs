//! Turns the stream of program pointer lines into narration.

use crate::{NarrationTable, VerbosityTier};
use std::collections::HashSet;
use std::sync::Arc;

/// Why a line did or did not produce narration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Same line as the previous one.
    Repeat,
    /// Line is in the silent set.
    Silent,
    /// First line seen of a movement group this session.
    Group { name: String, text: String },
    /// Movement group was already narrated this session.
    GroupDone { name: String },
    /// Line has its own table entry.
    Line { text: String },
    /// Line is not in the table.
    Unknown,
}

impl Resolution {
    pub fn into_text(self) -> Option<String> {
        match self {
            Resolution::Group { text, .. } | Resolution::Line { text } => Some(text),
            _ => None,
        }
    }
}

/// De-duplicates pointer lines and resolves them against a narration table.
///
/// State is per monitoring session: call [`reset`](LineTracker::reset) when a
/// new session starts. Movement groups are narrated once per session even if
/// the program loops back into them.
#[derive(Debug)]
pub struct LineTracker {
    table: Arc<NarrationTable>,
    last_line: Option<i64>,
    processed_groups: HashSet<String>,
}

impl LineTracker {
    pub fn new(table: Arc<NarrationTable>) -> Self {
        Self {
            table,
            last_line: None,
            processed_groups: HashSet::new(),
        }
    }

    /// Narration for `line` at `tier`, if any.
    pub fn resolve(&mut self, line: i64, tier: VerbosityTier) -> Option<String> {
        self.step(line, tier).into_text()
    }

    /// Resolve `line` and report which rule applied.
    pub fn step(&mut self, line: i64, tier: VerbosityTier) -> Resolution {
        if self.last_line == Some(line) {
            return Resolution::Repeat;
        }
        self.last_line = Some(line);

        if self.table.is_silent(line) {
            return Resolution::Silent;
        }

        if let Some(group) = self.table.group_for(line) {
            if self.processed_groups.insert(group.name.clone()) {
                return Resolution::Group {
                    name: group.name.clone(),
                    text: group.text.get(tier).to_string(),
                };
            }
            return Resolution::GroupDone {
                name: group.name.clone(),
            };
        }

        match self.table.text_for(line, tier) {
            Some(text) => Resolution::Line {
                text: text.to_string(),
            },
            None => Resolution::Unknown,
        }
    }

    pub fn last_line(&self) -> Option<i64> {
        self.last_line
    }

    pub fn processed_groups(&self) -> impl Iterator<Item = &str> {
        self.processed_groups.iter().map(String::as_str)
    }

    /// Start a new monitoring session.
    pub fn reset(&mut self) {
        self.last_line = None;
        self.processed_groups.clear();
    }

    pub fn table(&self) -> &NarrationTable {
        &self.table
    }
}
