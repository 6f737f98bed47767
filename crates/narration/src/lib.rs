//! narration: tiered narration of robot program execution
//!
//! A [`NarrationTable`] maps program pointer lines to one message per
//! [`VerbosityTier`], groups runs of lines into movement groups that are
//! narrated as one unit, and lists lines that stay silent. The
//! [`LineTracker`] applies the table to a live stream of pointer values.

mod error;
pub use error::NarrationError;

mod tier;
pub use tier::{UnknownTier, VerbosityTier};

mod table;
pub use table::{
    load_table_file, MovementGroup, NarrationEntry, NarrationTable, NarrationTableFile, TierText,
};

pub mod tracker;
pub use tracker::{LineTracker, Resolution};
