//! Command line of the headless runner

use clap::Parser;
use polyviz_core::{DisplayEntry, ViewerConfig};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "polyviz")]
#[command(about = "Headless polyviz viewer driven by a synthetic publisher")]
#[command(version)]
pub struct Cli {
    /// Viewer configuration (YAML); a built-in layout is used when omitted
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds to run before exiting
    #[arg(short = 'd', long = "duration", default_value_t = 5.0)]
    pub duration: f64,

    /// Update tick rate in Hz (overrides the configuration)
    #[arg(short = 'r', long = "rate")]
    pub rate: Option<f64>,

    /// Rate of the synthetic polygon publisher in Hz
    #[arg(long = "publish-rate", default_value_t = 10.0)]
    pub publish_rate: f64,

    /// Write the final viewer layout to this file
    #[arg(long = "save", value_name = "FILE")]
    pub save: Option<PathBuf>,
}

/// Topic the synthetic publisher sends polygonal maps on
pub const OBSTACLES_TOPIC: &str = "obstacles";
/// Topic the synthetic publisher sends polylines on
pub const PATH_TOPIC: &str = "path";

/// Layout used when no configuration file is given
pub fn default_layout() -> ViewerConfig {
    ViewerConfig {
        fixed_frame: "odom".to_string(),
        update_rate_hz: 30.0,
        displays: vec![
            DisplayEntry::new("PolygonalMap", "obstacles")
                .with_property("Topic", OBSTACLES_TOPIC)
                .with_property("Alpha", 0.8),
            DisplayEntry::new("Polyline", "path")
                .with_property("Topic", PATH_TOPIC)
                .with_property("Loop", true)
                .with_property("Color", json!([1.0, 1.0, 0.0])),
            DisplayEntry::new("Axes", "base")
                .with_property("Reference Frame", "base_link")
                .with_property("Length", 0.5),
        ],
    }
}
