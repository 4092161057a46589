use polyviz_core::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How polygons are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderMode {
    /// One connected strip per polygon
    #[default]
    Lines,
    /// Flat colored point cloud
    Points,
}

impl RenderMode {
    pub const LABELS: [&'static str; 2] = ["Lines", "Points"];

    pub fn label(&self) -> &'static str {
        match self {
            RenderMode::Lines => "Lines",
            RenderMode::Points => "Points",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Lines" => Some(RenderMode::Lines),
            "Points" => Some(RenderMode::Points),
            _ => None,
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Everything the geometry builder and sync controller read
///
/// Only mutated through the display's property setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub topic: String,
    pub color: Color,
    pub override_color: bool,
    pub mode: RenderMode,
    pub point_size: f32,
    pub z_offset: f32,
    pub alpha: f32,
    /// Close polylines back to their first point (lines mode only)
    pub close_loop: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            topic: String::new(),
            color: Color::new(0.1, 1.0, 0.0),
            override_color: false,
            mode: RenderMode::Lines,
            point_size: 0.05,
            z_offset: 0.0,
            alpha: 1.0,
            close_loop: false,
        }
    }
}
