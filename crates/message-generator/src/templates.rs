//! Tiered message templates

use crate::{classify, Category};
use narration::VerbosityTier;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Extra context for a rendered message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepDetails {
    /// Robot target (e.g. `p10`) the step moves to.
    pub target: Option<String>,
}

impl StepDetails {
    pub fn with_target(target: impl Into<String>) -> Self {
        Self {
            target: Some(target.into()),
        }
    }
}

const ACTION: &str = "{action}";

/// Templates for one category and tier. Categories without their own wording
/// share the general templates.
pub fn templates(category: Category, tier: VerbosityTier) -> &'static [&'static str] {
    use VerbosityTier::*;
    match (category, tier) {
        (Category::Movement, Level1) => &[
            "Robot is moving to target position with coordinated axis control and continuous path monitoring",
            "Executing movement sequence with smooth trajectory planning and obstacle avoidance",
            "Performing precise positioning with real-time feedback and safety system monitoring",
        ],
        (Category::Movement, Level2) => &[
            "Moving to target position",
            "Executing movement sequence",
            "Positioning robot arm",
        ],
        (Category::Movement, Level3) => &["Moving", "Positioning", "Motion"],

        (Category::Tool, Level1) => &[
            "Robot is operating tool system with interface control and status verification",
            "Executing tool operation with precision control and safety monitoring",
            "Performing tool manipulation with force feedback and alignment checks",
        ],
        (Category::Tool, Level2) => &[
            "Tool operation in progress",
            "Operating end effector",
            "Tool manipulation",
        ],
        (Category::Tool, Level3) => &["Tool ops", "End effector", "Tool control"],

        (Category::Vision, Level1) => &[
            "Robot is performing vision system operation with camera adjustment and image processing",
            "Executing vision inspection with lighting control and defect detection algorithms",
            "Performing optical measurement with calibration checks and quality validation",
        ],
        (Category::Vision, Level2) => &[
            "Vision system operation",
            "Performing image capture",
            "Vision inspection",
        ],
        (Category::Vision, Level3) => &["Vision ops", "Image capture", "Inspection"],

        (Category::Safety, Level1) => &[
            "Robot is executing safety procedure with system monitoring and protection protocols",
            "Performing safety check with comprehensive system scan and risk assessment",
            "Executing safety routine with emergency system verification and hazard prevention",
        ],
        (Category::Safety, Level2) => &[
            "Safety operation",
            "Performing safety check",
            "Safety monitoring",
        ],
        (Category::Safety, Level3) => &["Safety", "Safety check", "Secure"],

        (Category::Connection, Level1) => &[
            "Robot system is establishing secure connection with external controller and verifying communication protocols",
            "Initializing communication interface and performing handshake with control system",
            "Establishing secure connection with robot controller and verifying data exchange",
        ],
        (Category::Connection, Level2) => &[
            "Connecting to system",
            "Establishing connection",
            "Initializing link",
        ],
        (Category::Connection, Level3) => &["Connecting", "Link", "Connect"],

        (_, Level1) => &[
            "Robot is performing {action} operation with system monitoring and safety protocols",
            "Executing {action} procedure with real-time monitoring and quality checks",
            "Performing {action} operation with complete system oversight",
        ],
        (_, Level2) => &[
            "Performing {action}",
            "Executing {action}",
            "Running {action}",
        ],
        (_, Level3) => &["{action}", "Operation", "Task"],
    }
}

/// Renders status messages for actions that have no program table entry.
pub struct MessageRenderer {
    rng: StdRng,
}

impl Default for MessageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRenderer {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic renderer for reproducible output.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick one template for `(category, tier)` and fill it in.
    ///
    /// A target is appended as "towards X" at tier 1 and "to X" at tier 2;
    /// tier 3 never mentions it.
    pub fn render(
        &mut self,
        category: Category,
        tier: VerbosityTier,
        action: &str,
        details: &StepDetails,
    ) -> String {
        let choices = templates(category, tier);
        let template = choices.choose(&mut self.rng).copied().unwrap_or(ACTION);
        let mut message = template.replace(ACTION, &humanize(action));

        if let Some(target) = details.target.as_deref().filter(|t| !t.is_empty()) {
            match tier {
                VerbosityTier::Level1 => message = format!("{message} towards {target}"),
                VerbosityTier::Level2 => message = format!("{message} to {target}"),
                VerbosityTier::Level3 => {}
            }
        }
        message
    }

    /// Classify `action` and render a message for it.
    pub fn generate(&mut self, action: &str, tier: VerbosityTier, details: &StepDetails) -> String {
        let category = classify(action);
        tracing::debug!(action, %category, %tier, "rendering action message");
        self.render(category, tier, action, details)
    }
}

fn humanize(action: &str) -> String {
    action.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_suffix_by_tier() {
        let mut r = MessageRenderer::with_seed(7);
        let details = StepDetails::with_target("p10");

        let l1 = r.render(Category::Movement, VerbosityTier::Level1, "move", &details);
        assert!(l1.ends_with("towards p10"), "{l1}");

        let l2 = r.render(Category::Movement, VerbosityTier::Level2, "move", &details);
        assert!(l2.ends_with(" to p10"), "{l2}");

        let l3 = r.render(Category::Movement, VerbosityTier::Level3, "move", &details);
        assert!(!l3.contains("p10"));
        assert!(templates(Category::Movement, VerbosityTier::Level3).contains(&l3.as_str()));
    }

    #[test]
    fn test_empty_target_ignored() {
        let mut r = MessageRenderer::with_seed(1);
        let msg = r.render(
            Category::Tool,
            VerbosityTier::Level2,
            "gripper_open",
            &StepDetails::with_target(""),
        );
        assert!(templates(Category::Tool, VerbosityTier::Level2).contains(&msg.as_str()));
    }

    #[test]
    fn test_general_templates_name_the_action() {
        let mut r = MessageRenderer::with_seed(3);
        for _ in 0..10 {
            let msg = r.generate("wait_signal", VerbosityTier::Level2, &StepDetails::default());
            assert!(msg.ends_with("wait signal"), "{msg}");
        }
    }

    #[test]
    fn test_categories_without_wording_share_general() {
        assert_eq!(
            templates(Category::Manufacturing, VerbosityTier::Level3),
            templates(Category::General, VerbosityTier::Level3)
        );
        let mut r = MessageRenderer::with_seed(9);
        let msg = r.generate("welding", VerbosityTier::Level1, &StepDetails::default());
        assert!(msg.contains("welding"), "{msg}");
    }

    #[test]
    fn test_every_pair_has_choices() {
        for category in [
            Category::Movement,
            Category::Tool,
            Category::Vision,
            Category::Manufacturing,
            Category::MaterialHandling,
            Category::Safety,
            Category::System,
            Category::Connection,
            Category::General,
        ] {
            for tier in VerbosityTier::ALL {
                let n = templates(category, tier).len();
                assert!((2..=3).contains(&n));
            }
        }
    }
}
