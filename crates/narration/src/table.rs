use crate::{NarrationError, VerbosityTier};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::Path;

const BUILTIN_TABLE: &str = include_str!("../assets/pick_and_place.yaml");

/// One literal string per verbosity tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierText {
    pub level1: String,
    pub level2: String,
    pub level3: String,
}

impl TierText {
    pub fn get(&self, tier: VerbosityTier) -> &str {
        match tier {
            VerbosityTier::Level1 => &self.level1,
            VerbosityTier::Level2 => &self.level2,
            VerbosityTier::Level3 => &self.level3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationEntry {
    pub line: i64,
    #[serde(flatten)]
    pub text: TierText,
}

/// Program lines that together form one sub-operation, narrated as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementGroup {
    pub name: String,
    pub lines: BTreeSet<i64>,
    #[serde(flatten)]
    pub text: TierText,
}

impl MovementGroup {
    pub fn contains(&self, line: i64) -> bool {
        self.lines.contains(&line)
    }
}

/// On-disk layout of a narration table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NarrationTableFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub entries: Vec<NarrationEntry>,
    #[serde(default)]
    pub groups: Vec<MovementGroup>,
    #[serde(default)]
    pub silent: BTreeSet<i64>,
}

/// Immutable narration data for one robot program.
#[derive(Debug, Clone)]
pub struct NarrationTable {
    name: String,
    entries: HashMap<i64, NarrationEntry>,
    groups: Vec<MovementGroup>,
    silent: BTreeSet<i64>,
}

impl NarrationTable {
    /// Validate a parsed table file.
    ///
    /// Duplicate lines, duplicate group names, empty groups and lines claimed by
    /// two groups are rejected. A line that is both silent and grouped is
    /// accepted (silence wins at resolve time) but logged.
    pub fn from_file(file: NarrationTableFile) -> Result<Self, NarrationError> {
        let mut entries = HashMap::with_capacity(file.entries.len());
        for entry in file.entries {
            let line = entry.line;
            if entries.insert(line, entry).is_some() {
                return Err(NarrationError::DuplicateLine(line));
            }
        }

        let mut owner: HashMap<i64, &str> = HashMap::new();
        for (i, group) in file.groups.iter().enumerate() {
            if group.lines.is_empty() {
                return Err(NarrationError::EmptyGroup(group.name.clone()));
            }
            if file.groups[..i].iter().any(|g| g.name == group.name) {
                return Err(NarrationError::DuplicateGroup(group.name.clone()));
            }
            for line in &group.lines {
                if let Some(first) = owner.insert(*line, &group.name) {
                    return Err(NarrationError::OverlappingGroups {
                        line: *line,
                        first: first.to_string(),
                        second: group.name.clone(),
                    });
                }
                if file.silent.contains(line) {
                    tracing::warn!(
                        line,
                        group = %group.name,
                        "line is both silent and grouped; it will stay silent"
                    );
                }
            }
        }

        Ok(Self {
            name: file.name,
            entries,
            groups: file.groups,
            silent: file.silent,
        })
    }

    pub fn from_yaml_str(raw: &str) -> anyhow::Result<Self> {
        let file: NarrationTableFile =
            serde_yaml::from_str(raw).context("parsing narration table yaml")?;
        Ok(Self::from_file(file)?)
    }

    /// Table for the shape pick-and-place program shipped with the cell.
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_yaml_str(BUILTIN_TABLE).context("loading built-in narration table")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text_for(&self, line: i64, tier: VerbosityTier) -> Option<&str> {
        self.entries.get(&line).map(|e| e.text.get(tier))
    }

    /// Group owning `line`, in declaration order.
    pub fn group_for(&self, line: i64) -> Option<&MovementGroup> {
        self.groups.iter().find(|g| g.contains(line))
    }

    pub fn groups(&self) -> &[MovementGroup] {
        &self.groups
    }

    pub fn is_silent(&self, line: i64) -> bool {
        self.silent.contains(&line)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All narrated lines in ascending order.
    pub fn lines(&self) -> Vec<i64> {
        let mut lines: Vec<i64> = self.entries.keys().copied().collect();
        lines.sort_unstable();
        lines
    }
}

pub fn load_table_file(path: impl AsRef<Path>) -> anyhow::Result<NarrationTable> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading narration table: {}", path.display()))?;
    NarrationTable::from_yaml_str(&raw)
        .with_context(|| format!("decoding narration table: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_table() {
        let table = NarrationTable::builtin().unwrap();
        assert_eq!(table.name(), "pick_and_place");
        assert_eq!(
            table.text_for(15, VerbosityTier::Level3),
            Some("Move to p10")
        );
        assert_eq!(table.groups().len(), 11);
        assert_eq!(
            table.group_for(62).map(|g| g.name.as_str()),
            Some("circle_place")
        );
        assert!(table.is_silent(95));
        assert!(!table.is_silent(89));
        assert!(table.text_for(18, VerbosityTier::Level1).is_none());
    }

    #[test]
    fn test_rejects_duplicate_lines() {
        let raw = r#"
entries:
  - { line: 1, level1: a, level2: b, level3: c }
  - { line: 1, level1: d, level2: e, level3: f }
"#;
        let err = NarrationTable::from_yaml_str(raw).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<NarrationError>(),
            Some(NarrationError::DuplicateLine(1))
        ));
    }

    #[test]
    fn test_rejects_overlapping_groups() {
        let raw = r#"
groups:
  - { name: a, lines: [1, 2], level1: x, level2: y, level3: z }
  - { name: b, lines: [2, 3], level1: x, level2: y, level3: z }
"#;
        assert!(NarrationTable::from_yaml_str(raw).is_err());
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "name: demo\nentries:\n  - {{ line: 7, level1: one, level2: two, level3: three }}\nsilent: [8]"
        )
        .unwrap();
        let table = load_table_file(file.path()).unwrap();
        assert_eq!(table.name(), "demo");
        assert_eq!(table.text_for(7, VerbosityTier::Level2), Some("two"));
        assert_eq!(table.lines(), vec![7]);
        assert!(table.is_silent(8));
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_table_file("/nonexistent/table.yaml").unwrap_err();
        assert!(err.to_string().contains("reading narration table"));
    }
}
