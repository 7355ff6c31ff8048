//! Screen positions for the manual-save interaction.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{RuleStore, resolve};

/// Default click position when no domain entry applies.
pub const DEFAULT_CLICK_TARGET: ClickTarget = ClickTarget::At { x: 700, y: 150 };

/// Where the save helper should click before saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ClickTargetRepr", into = "ClickTargetRepr")]
pub enum ClickTarget {
    /// Centre of the screen.
    ScreenCenter,
    /// Absolute screen coordinates.
    At {
        /// Horizontal position in pixels.
        x: i32,
        /// Vertical position in pixels.
        y: i32,
    },
}

impl fmt::Display for ClickTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScreenCenter => write!(f, "center"),
            Self::At { x, y } => write!(f, "{x},{y}"),
        }
    }
}

/// Persisted form: `"center"` or `{"x": .., "y": ..}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClickTargetRepr {
    /// Named position.
    Named(String),
    /// Coordinates.
    Point {
        /// Horizontal position in pixels.
        x: i32,
        /// Vertical position in pixels.
        y: i32,
    },
}

impl TryFrom<ClickTargetRepr> for ClickTarget {
    type Error = String;

    fn try_from(repr: ClickTargetRepr) -> Result<Self, Self::Error> {
        match repr {
            ClickTargetRepr::Named(name) if name.eq_ignore_ascii_case("center") => {
                Ok(Self::ScreenCenter)
            }
            ClickTargetRepr::Named(name) => Err(format!("unknown click target: {name}")),
            ClickTargetRepr::Point { x, y } => Ok(Self::At { x, y }),
        }
    }
}

impl From<ClickTarget> for ClickTargetRepr {
    fn from(target: ClickTarget) -> Self {
        match target {
            ClickTarget::ScreenCenter => Self::Named("center".to_string()),
            ClickTarget::At { x, y } => Self::Point { x, y },
        }
    }
}

/// `ClickTargets.json`: domain to click target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClickTargets {
    targets: BTreeMap<String, ClickTarget>,
}

impl ClickTargets {
    /// Resolves the click target for `domain`.
    #[must_use]
    pub fn target_for(&self, domain: &str) -> ClickTarget {
        *resolve(domain, &self.targets, &DEFAULT_CLICK_TARGET)
    }
}

impl RuleStore for ClickTargets {
    const CATEGORY: &'static str = "click targets";

    fn builtin() -> Self {
        let mut targets = BTreeMap::new();
        targets.insert("oiccpress.com".to_string(), ClickTarget::ScreenCenter);
        targets.insert("ieeexplore.ieee.org".to_string(), ClickTarget::ScreenCenter);
        Self { targets }
    }
}
