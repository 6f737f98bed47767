use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NarrationError {
    #[error("line {0} is narrated more than once")]
    DuplicateLine(i64),
    #[error("movement group '{0}' is declared more than once")]
    DuplicateGroup(String),
    #[error("movement group '{0}' has no lines")]
    EmptyGroup(String),
    #[error("line {line} belongs to both '{first}' and '{second}'")]
    OverlappingGroups {
        line: i64,
        first: String,
        second: String,
    },
}
