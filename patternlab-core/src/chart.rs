//! Renderer-agnostic chart overlays.
//!
//! Strategies describe what to draw over a price chart: horizontal levels,
//! segments, polylines through pattern points, shaded rectangles, indicator
//! lines, and text annotations. The JSON form (tagged by `type`) is the only
//! contract with any renderer.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A dated price coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl ChartPoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Green,
    Red,
    Blue,
    Orange,
    Purple,
    Gold,
    Gray,
    DarkRed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dash {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineStyle {
    pub color: Color,
    pub width: u32,
    pub dash: Dash,
}

impl LineStyle {
    pub fn solid(color: Color, width: u32) -> Self {
        Self {
            color,
            width,
            dash: Dash::Solid,
        }
    }

    pub fn dashed(color: Color, width: u32) -> Self {
        Self {
            color,
            width,
            dash: Dash::Dashed,
        }
    }

    pub fn dotted(color: Color, width: u32) -> Self {
        Self {
            color,
            width,
            dash: Dash::Dotted,
        }
    }

    pub fn dash_dot(color: Color, width: u32) -> Self {
        Self {
            color,
            width,
            dash: Dash::DashDot,
        }
    }
}

/// One drawing primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Overlay {
    /// Full-width level.
    HorizontalLine {
        price: f64,
        style: LineStyle,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Straight line between two dated prices.
    Segment {
        from: ChartPoint,
        to: ChartPoint,
        style: LineStyle,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Line through pattern points, optionally marking each vertex.
    Polyline {
        points: Vec<ChartPoint>,
        style: LineStyle,
        markers: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Shaded zone between two corners.
    Rectangle {
        from: ChartPoint,
        to: ChartPoint,
        fill: Color,
        opacity: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        border: Option<LineStyle>,
    },
    /// Per-bar indicator line (warmup bars omitted).
    Series {
        name: String,
        points: Vec<ChartPoint>,
        style: LineStyle,
    },
}

/// Text pinned to a chart coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub at: ChartPoint,
    pub text: String,
    pub color: Color,
}

/// Everything a strategy wants drawn for one series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverlayDescriptor {
    pub overlays: Vec<Overlay>,
    pub annotations: Vec<Annotation>,
}

impl OverlayDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.overlays.is_empty() && self.annotations.is_empty()
    }

    pub fn push(&mut self, overlay: Overlay) -> &mut Self {
        self.overlays.push(overlay);
        self
    }

    pub fn level(&mut self, price: f64, style: LineStyle, label: impl Into<String>) -> &mut Self {
        self.push(Overlay::HorizontalLine {
            price,
            style,
            label: Some(label.into()),
        })
    }

    pub fn segment(&mut self, from: ChartPoint, to: ChartPoint, style: LineStyle) -> &mut Self {
        self.push(Overlay::Segment {
            from,
            to,
            style,
            label: None,
        })
    }

    pub fn annotate(&mut self, at: ChartPoint, text: impl Into<String>, color: Color) -> &mut Self {
        self.annotations.push(Annotation {
            at,
            text: text.into(),
            color,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, price: f64) -> ChartPoint {
        ChartPoint::new(NaiveDate::from_ymd_opt(2024, 3, day).unwrap(), price)
    }

    #[test]
    fn overlay_json_is_type_tagged() {
        let overlay = Overlay::HorizontalLine {
            price: 100.0,
            style: LineStyle::dashed(Color::Purple, 2),
            label: None,
        };
        let json = serde_json::to_value(&overlay).unwrap();
        assert_eq!(json["type"], "horizontal_line");
        assert_eq!(json["style"]["dash"], "dashed");
        assert_eq!(json["style"]["color"], "purple");
        assert!(json.get("label").is_none());
    }

    #[test]
    fn builder_collects_primitives() {
        let mut d = OverlayDescriptor::new();
        assert!(d.is_empty());
        d.level(120.0, LineStyle::dotted(Color::Green, 2), "Target")
            .segment(point(1, 100.0), point(5, 90.0), LineStyle::solid(Color::Red, 3))
            .annotate(point(5, 90.0), "Low", Color::Red);
        assert_eq!(d.overlays.len(), 2);
        assert_eq!(d.annotations.len(), 1);

        let json = serde_json::to_string(&d).unwrap();
        let back: OverlayDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn rectangle_variant_tag() {
        let rect = Overlay::Rectangle {
            from: point(1, 90.0),
            to: point(9, 110.0),
            fill: Color::Gray,
            opacity: 0.1,
            border: Some(LineStyle::dotted(Color::Gray, 1)),
        };
        let json = serde_json::to_value(&rect).unwrap();
        assert_eq!(json["type"], "rectangle");
        assert_eq!(json["border"]["dash"], "dotted");
    }
}
