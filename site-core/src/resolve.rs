//! Responsive style resolution.
//!
//! An element's effective properties for a viewport are computed as:
//!
//! ```text
//! descriptor.default_props  <  element.props  <  element.responsive_overrides[viewport]
//! ```
//!
//! Each override map stands alone: resolving for mobile never consults the
//! tablet overrides. Everything here is a pure function of
//! `(element, descriptor, viewport)`.

use serde::Serialize;
use serde_json::Value;

use crate::{ComponentDescriptor, Element, Props, RenderKind, Viewport};

/// Columns a container may be split into.
pub const MAX_COLUMNS: u32 = 12;

/// Shallow-merge `partial` into `base`; keys in `partial` win.
pub fn merge_props(base: &mut Props, partial: &Props) {
    for (key, value) in partial {
        base.insert(key.clone(), value.clone());
    }
}

/// Compute the effective property set of an element for a viewport.
#[must_use]
pub fn resolve_props(
    element: &Element,
    descriptor: &ComponentDescriptor,
    viewport: Viewport,
) -> Props {
    let mut props = descriptor.default_props.clone();
    merge_props(&mut props, &element.props);
    if let Some(overrides) = element.responsive_overrides.get(&viewport) {
        merge_props(&mut props, overrides);
    }
    props
}

/// Resolve an element fully: effective props plus derived layout.
#[must_use]
pub fn resolve(element: &Element, descriptor: &ComponentDescriptor, viewport: Viewport) -> Resolved {
    let props = resolve_props(element, descriptor, viewport);
    let layout = descriptor
        .accepts_children
        .then(|| LayoutSpec::derive(descriptor.render, &props));
    Resolved {
        kind: descriptor.render,
        viewport,
        props,
        layout,
    }
}

/// Categorical spacing scale shared by `gap`, `padding` and spacer heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    /// No space.
    None,
    /// Tight spacing.
    Small,
    /// Default spacing.
    Medium,
    /// Loose spacing.
    Large,
    /// Extra loose spacing.
    Xl,
}

impl Spacing {
    /// Parse a categorical value; anything unrecognized is `Medium`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" => Self::None,
            "small" | "sm" => Self::Small,
            "large" | "lg" => Self::Large,
            "xl" | "x-large" => Self::Xl,
            _ => Self::Medium,
        }
    }

    /// Gap in pixels.
    #[must_use]
    pub const fn gap_px(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Small => 8,
            Self::Medium => 16,
            Self::Large => 24,
            Self::Xl => 32,
        }
    }

    /// Padding in pixels.
    #[must_use]
    pub const fn padding_px(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Small => 8,
            Self::Medium => 16,
            Self::Large => 32,
            Self::Xl => 48,
        }
    }
}

/// Main-axis distribution of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Justify {
    /// Pack at the start.
    Start,
    /// Center.
    Center,
    /// Pack at the end.
    End,
    /// Space between.
    Between,
    /// Space around.
    Around,
    /// Space evenly.
    Evenly,
}

impl Justify {
    /// Parse a categorical value; anything unrecognized is `Start`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "center" => Self::Center,
            "end" | "right" => Self::End,
            "between" | "space-between" => Self::Between,
            "around" | "space-around" => Self::Around,
            "evenly" | "space-evenly" => Self::Evenly,
            _ => Self::Start,
        }
    }

    /// CSS `justify-content` value.
    #[must_use]
    pub const fn css(self) -> &'static str {
        match self {
            Self::Start => "flex-start",
            Self::Center => "center",
            Self::End => "flex-end",
            Self::Between => "space-between",
            Self::Around => "space-around",
            Self::Evenly => "space-evenly",
        }
    }
}

/// Cross-axis alignment of children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    /// Align to the start.
    Start,
    /// Center.
    Center,
    /// Align to the end.
    End,
    /// Fill the cross axis.
    Stretch,
}

impl Align {
    /// Parse a categorical value; anything unrecognized is `Stretch`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "start" | "top" | "left" => Self::Start,
            "center" | "middle" => Self::Center,
            "end" | "bottom" | "right" => Self::End,
            _ => Self::Stretch,
        }
    }

    /// CSS `align-items` value.
    #[must_use]
    pub const fn css(self) -> &'static str {
        match self {
            Self::Start => "flex-start",
            Self::Center => "center",
            Self::End => "flex-end",
            Self::Stretch => "stretch",
        }
    }
}

/// How a container arranges its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Side by side.
    Horizontal,
    /// Stacked.
    Vertical,
    /// Two-dimensional grid.
    Grid,
}

/// Layout quantities derived from a container's effective props.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayoutSpec {
    /// Arrangement of children.
    pub direction: Direction,
    /// Effective column count, 1..=12.
    pub columns: u32,
    /// Space between children in pixels.
    pub gap_px: u32,
    /// Inner padding in pixels.
    pub padding_px: u32,
    /// Main-axis distribution.
    pub justify: Justify,
    /// Cross-axis alignment.
    pub align: Align,
}

impl LayoutSpec {
    /// Derive the layout of a container from its effective props.
    #[must_use]
    pub fn derive(kind: RenderKind, props: &Props) -> Self {
        let direction = match kind {
            RenderKind::Row => Direction::Horizontal,
            RenderKind::Grid => Direction::Grid,
            _ => Direction::Vertical,
        };
        Self {
            direction,
            columns: columns(props.get("columns")),
            gap_px: spacing_px(props.get("gap"), Spacing::gap_px),
            padding_px: spacing_px(props.get("padding"), Spacing::padding_px),
            justify: props
                .get("justify")
                .and_then(Value::as_str)
                .map_or(Justify::Start, Justify::parse),
            align: props
                .get("align")
                .and_then(Value::as_str)
                .map_or(Align::Stretch, Align::parse),
        }
    }
}

/// Column count from a number or numeric string, clamped to `1..=12`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn columns(value: Option<&Value>) -> u32 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match raw {
        Some(n) if n.is_finite() => (n.round().max(1.0) as u32).min(MAX_COLUMNS),
        _ => 1,
    }
}

/// Pixels for a spacing prop: numbers are pixels, strings use the categorical scale.
#[must_use]
pub fn spacing_px(value: Option<&Value>, scale: fn(Spacing) -> u32) -> u32 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .map_or_else(|| scale(Spacing::Medium), |px| u32::try_from(px).unwrap_or(u32::MAX)),
        Some(Value::String(s)) => scale(Spacing::parse(s)),
        _ => scale(Spacing::Medium),
    }
}

/// An element resolved for one viewport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    /// Rendering contract of the element's type.
    pub kind: RenderKind,
    /// Viewport this resolution targets.
    pub viewport: Viewport,
    /// Effective properties.
    pub props: Props,
    /// Derived layout, present for container-capable types.
    pub layout: Option<LayoutSpec>,
}

impl Resolved {
    /// A string prop, if present and a string.
    #[must_use]
    pub fn str_prop(&self, name: &str) -> Option<&str> {
        self.props.get(name).and_then(Value::as_str)
    }

    /// An integer prop; numeric strings are accepted.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn i64_prop(&self, name: &str) -> Option<i64> {
        match self.props.get(name)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// A boolean prop.
    #[must_use]
    pub fn bool_prop(&self, name: &str) -> Option<bool> {
        self.props.get(name).and_then(Value::as_bool)
    }

    /// A list prop, empty when absent or not an array.
    #[must_use]
    pub fn list_prop(&self, name: &str) -> &[Value] {
        self.props
            .get(name)
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }
}
