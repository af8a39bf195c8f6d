//! Configuration types shared by the orchestrator and the agent

use serde::{Deserialize, Serialize};

/// Colours used for the per-tab match counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorStyle {
    /// Badge background, `#RRGGBB`
    pub background: String,
    /// Badge text colour, `#RRGGBB`
    pub foreground: String,
}

impl Default for IndicatorStyle {
    fn default() -> Self {
        Self {
            background: "#FFFFFF".to_string(),
            foreground: "#000000".to_string(),
        }
    }
}

impl IndicatorStyle {
    /// Check that both colours are `#RRGGBB` hex strings
    pub fn validate(&self) -> Result<(), String> {
        for (name, colour) in [("background", &self.background), ("foreground", &self.foreground)] {
            if !is_hex_colour(colour) {
                return Err(format!("{} colour must look like #RRGGBB, got {:?}", name, colour));
            }
        }
        Ok(())
    }
}

fn is_hex_colour(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}
