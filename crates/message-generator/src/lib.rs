//! Status messages for robot actions
//!
//! Program pointer narration comes from fixed tables. Everything else (named
//! actions reported by the cell, operator announcements) is described here:
//! the action is classified by keyword and rendered from per-tier templates.

mod category;
mod templates;

pub use category::{classify, Category, RULES};
pub use templates::{templates, MessageRenderer, StepDetails};
