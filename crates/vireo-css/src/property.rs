//! Dense property id space plus per-property classification tables.
//!
//! The animator, transition manager, and paint bundle all address styles by
//! [`CssPropertyId`]. Classification here decides how a property is
//! interpolated, whether it is valid as a transition endpoint, and which
//! layout axis it resolves percent lengths against.

use serde::{Deserialize, Serialize};

use crate::interpolate::PropertyValueType;
use crate::value::{CssValue, LengthUnit};

/// Identifier of a CSS property the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CssPropertyId {
    Opacity,
    Width,
    Height,
    MinWidth,
    MinHeight,
    MaxWidth,
    MaxHeight,
    Left,
    Top,
    Right,
    Bottom,
    Padding,
    PaddingTop,
    PaddingRight,
    PaddingBottom,
    PaddingLeft,
    Margin,
    MarginTop,
    MarginRight,
    MarginBottom,
    MarginLeft,
    BorderWidth,
    BorderTopWidth,
    BorderRightWidth,
    BorderBottomWidth,
    BorderLeftWidth,
    BorderColor,
    BorderTopColor,
    BorderRightColor,
    BorderBottomColor,
    BorderLeftColor,
    BorderRadius,
    BackgroundColor,
    Color,
    FontSize,
    LineHeight,
    ZIndex,
    Position,
    Display,
    Visibility,
    Overflow,
    OverflowX,
    OverflowY,
    FlexGrow,
    FlexShrink,
    FlexBasis,
    FlexDirection,
    Transform,
    Filter,
    Content,
    AnimationName,
    AnimationDuration,
    AnimationDelay,
    AnimationIterationCount,
    AnimationDirection,
    AnimationFillMode,
    AnimationPlayState,
    AnimationTimingFunction,
    TransitionProperty,
    TransitionDuration,
    TransitionDelay,
    TransitionTimingFunction,
}

/// The full enumerated set a `transition-property: all` expands to.
pub const ALL_TRANSITIONABLE: &[CssPropertyId] = &[
    CssPropertyId::Opacity,
    CssPropertyId::Width,
    CssPropertyId::Height,
    CssPropertyId::MinWidth,
    CssPropertyId::MinHeight,
    CssPropertyId::MaxWidth,
    CssPropertyId::MaxHeight,
    CssPropertyId::Left,
    CssPropertyId::Top,
    CssPropertyId::Right,
    CssPropertyId::Bottom,
    CssPropertyId::PaddingTop,
    CssPropertyId::PaddingRight,
    CssPropertyId::PaddingBottom,
    CssPropertyId::PaddingLeft,
    CssPropertyId::MarginTop,
    CssPropertyId::MarginRight,
    CssPropertyId::MarginBottom,
    CssPropertyId::MarginLeft,
    CssPropertyId::BorderTopWidth,
    CssPropertyId::BorderRightWidth,
    CssPropertyId::BorderBottomWidth,
    CssPropertyId::BorderLeftWidth,
    CssPropertyId::BorderTopColor,
    CssPropertyId::BorderRightColor,
    CssPropertyId::BorderBottomColor,
    CssPropertyId::BorderLeftColor,
    CssPropertyId::BorderRadius,
    CssPropertyId::BackgroundColor,
    CssPropertyId::Color,
    CssPropertyId::FontSize,
    CssPropertyId::FlexGrow,
    CssPropertyId::Transform,
    CssPropertyId::Filter,
];

impl CssPropertyId {
    /// Per-side expansion for polymeric shorthands. Returns `None` for plain
    /// properties.
    pub fn expand_polymeric(self) -> Option<&'static [CssPropertyId]> {
        use CssPropertyId::*;
        Some(match self {
            Padding => &[PaddingTop, PaddingRight, PaddingBottom, PaddingLeft],
            Margin => &[MarginTop, MarginRight, MarginBottom, MarginLeft],
            BorderWidth => &[
                BorderTopWidth,
                BorderRightWidth,
                BorderBottomWidth,
                BorderLeftWidth,
            ],
            BorderColor => &[
                BorderTopColor,
                BorderRightColor,
                BorderBottomColor,
                BorderLeftColor,
            ],
            _ => return None,
        })
    }

    /// How values of this property interpolate.
    pub fn value_type(self) -> PropertyValueType {
        use CssPropertyId::*;
        match self {
            Opacity => PropertyValueType::Opacity,
            FlexGrow | FlexShrink | ZIndex => PropertyValueType::Float,
            BackgroundColor | Color | BorderColor | BorderTopColor | BorderRightColor
            | BorderBottomColor | BorderLeftColor => PropertyValueType::Color,
            Transform | Filter => PropertyValueType::Filter,
            _ => PropertyValueType::Length,
        }
    }

    /// Whether percent lengths of this property resolve against the parent's
    /// width (as opposed to its height).
    pub fn is_x_axis(self) -> bool {
        use CssPropertyId::*;
        matches!(
            self,
            Width
                | MinWidth
                | MaxWidth
                | Left
                | Right
                | PaddingLeft
                | PaddingRight
                | MarginLeft
                | MarginRight
                | BorderLeftWidth
                | BorderRightWidth
        )
    }

    /// Whether the property participates in transitions at all.
    pub fn is_transitionable(self) -> bool {
        ALL_TRANSITIONABLE.contains(&self)
    }

    /// Whether the property feeds the layout engine (as opposed to being
    /// paint-only).
    pub fn affects_layout(self) -> bool {
        use CssPropertyId::*;
        !matches!(
            self,
            Opacity
                | BackgroundColor
                | Color
                | BorderColor
                | BorderTopColor
                | BorderRightColor
                | BorderBottomColor
                | BorderLeftColor
                | BorderRadius
                | Visibility
                | Transform
                | Filter
                | ZIndex
        )
    }

    /// Validity check for transition endpoints. An invalid endpoint stops any
    /// running transition on the property and commits the raw value.
    pub fn is_valid_endpoint(self, value: &CssValue) -> bool {
        use PropertyValueType::*;
        match self.value_type() {
            Opacity => matches!(value.as_number(), Some(n) if (0.0..=1.0).contains(&n))
                && matches!(value, CssValue::Number { .. }),
            Float => matches!(value, CssValue::Number { .. }),
            Color => value.as_color().is_some(),
            Filter => matches!(value, CssValue::Array { .. }),
            Length => matches!(
                value,
                CssValue::Length {
                    unit: LengthUnit::Px | LengthUnit::Auto,
                    ..
                } | CssValue::Percent { .. }
                    | CssValue::Calc { .. }
            ),
        }
    }
}
