//! Geometry builder
//!
//! Converts decoded polygons into a [`PrimitiveBatch`]. The batch is
//! rebuilt in full on every pass; there is no incremental diffing.

use super::config::{RenderConfig, RenderMode};
use crate::messages::{Polygon, PolygonalMap, Polyline};
use polyviz_core::{Color, ColorRgba, ColoredVertex, LineStrip, PrimitiveBatch, VizError};
use std::borrow::Cow;
use thiserror::Error;

/// Message content the builder cannot turn into geometry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("polygon {polygon}, point {point} has a non-finite coordinate")]
    NonFinitePoint { polygon: usize, point: usize },
}

impl From<GeometryError> for VizError {
    fn from(err: GeometryError) -> Self {
        VizError::Geometry(err.to_string())
    }
}

/// A message that can be viewed as a list of polygons
pub trait PolygonSource {
    /// The polygons to draw; `close_loop` asks for closed outlines where the message supports it
    fn polygons(&self, close_loop: bool) -> Cow<'_, [Polygon]>;
}

impl PolygonSource for PolygonalMap {
    fn polygons(&self, _close_loop: bool) -> Cow<'_, [Polygon]> {
        Cow::Borrowed(&self.polygons)
    }
}

impl PolygonSource for Polyline {
    fn polygons(&self, close_loop: bool) -> Cow<'_, [Polygon]> {
        Cow::Owned(vec![self.to_polygon(close_loop)])
    }
}

/// Color of every vertex coming from a polygon with `source` color
///
/// The configured alpha always replaces the source alpha. A polygon
/// without a color of its own takes the configured color.
pub fn effective_color(source: Option<Color>, config: &RenderConfig) -> ColorRgba {
    let rgb = if config.override_color {
        config.color
    } else {
        source.unwrap_or(config.color)
    };
    rgb.with_alpha(config.alpha)
}

fn validate(polygons: &[Polygon]) -> Result<(), GeometryError> {
    for (polygon, p) in polygons.iter().enumerate() {
        if let Some(point) = p.points.iter().position(|pt| !pt.is_finite()) {
            return Err(GeometryError::NonFinitePoint { polygon, point });
        }
    }
    Ok(())
}

/// Build the primitive batch for `polygons` under `config`
///
/// Lines mode yields exactly one strip per polygon (empty polygons give an
/// empty strip). Points mode yields every point in polygon-major order.
pub fn build(polygons: &[Polygon], config: &RenderConfig) -> Result<PrimitiveBatch, GeometryError> {
    validate(polygons)?;

    let batch = match config.mode {
        RenderMode::Lines => PrimitiveBatch::LineStrips(
            polygons
                .iter()
                .map(|polygon| {
                    let color = effective_color(polygon.color, config);
                    LineStrip {
                        vertices: polygon
                            .points
                            .iter()
                            .map(|&p| ColoredVertex::new(p.into(), color))
                            .collect(),
                    }
                })
                .collect(),
        ),
        RenderMode::Points => PrimitiveBatch::Points {
            points: polygons
                .iter()
                .flat_map(|polygon| {
                    polygon
                        .points
                        .iter()
                        .map(move |&p| ColoredVertex::new(p.into(), effective_color(polygon.color, config)))
                })
                .collect(),
            point_size: config.point_size,
        },
    };
    Ok(batch)
}
