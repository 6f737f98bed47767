//! Action categories and keyword classification

use core::fmt;
use serde::{Deserialize, Serialize};

/// Semantic category of a robot action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Movement,
    Tool,
    Vision,
    Manufacturing,
    MaterialHandling,
    Safety,
    System,
    Connection,
    General,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Movement => "movement",
            Category::Tool => "tool",
            Category::Vision => "vision",
            Category::Manufacturing => "manufacturing",
            Category::MaterialHandling => "material_handling",
            Category::Safety => "safety",
            Category::System => "system",
            Category::Connection => "connection",
            Category::General => "general",
        };
        f.write_str(name)
    }
}

/// Classification rules, evaluated top to bottom. The order decides ties: an
/// action matching keywords of several categories gets the earliest one.
pub const RULES: &[(Category, &[&str])] = &[
    (
        Category::Movement,
        &[
            "move", "position", "motion", "forward", "backward", "left", "right", "up", "down",
        ],
    ),
    (
        Category::Tool,
        &["tool", "gripper", "attach", "release", "change"],
    ),
    (
        Category::Vision,
        &["image", "vision", "camera", "detect", "inspect", "scan"],
    ),
    (
        Category::Manufacturing,
        &["weld", "paint", "glue", "screw", "drill", "cut", "assemble"],
    ),
    (
        Category::MaterialHandling,
        &["pick", "place", "pallet", "conveyor", "load", "unload"],
    ),
    (
        Category::Safety,
        &["stop", "emergency", "safety", "collision", "error"],
    ),
    (Category::System, &["home", "reset", "initialize"]),
    (Category::Connection, &["connect", "link", "establish"]),
];

/// Classify an action name by case-insensitive substring match.
pub fn classify(action: &str) -> Category {
    let action = action.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| action.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::General)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_categories() {
        let cases = [
            ("linear_move", Category::Movement),
            ("Gripper_Open", Category::Tool),
            ("barcode_scan", Category::Vision),
            ("welding", Category::Manufacturing),
            ("pallet_stack", Category::MaterialHandling),
            ("emergency_halt", Category::Safety),
            ("reset", Category::System),
            ("connect", Category::Connection),
            ("wait", Category::General),
        ];
        for (action, expected) in cases {
            assert_eq!(classify(action), expected, "action {action}");
        }
    }

    #[test]
    fn test_order_breaks_ties() {
        // vision is checked before material handling
        assert_eq!(classify("pick_and_inspect"), Category::Vision);
        // "up" hides inside "pickup", and movement comes first
        assert_eq!(classify("pickup"), Category::Movement);
        // "home" is system only because nothing earlier matches
        assert_eq!(classify("home"), Category::System);
        // "release" is a tool keyword, checked before safety's "stop"
        assert_eq!(classify("release_and_stop"), Category::Tool);
    }
}
