//! Per-property-type interpolation between resolved style values.
//!
//! The animator calls [`interpolate`] once per animated property per frame.
//! Length math never produces NaN: a zero-size parent resolves percent
//! lengths to 0.

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::value::{CssValue, LengthUnit};

/// Float tolerance for endpoint snapping and degenerate segments.
pub const EPSILON: f64 = 1e-6;

/// Default gamma for color interpolation. Linear-RGB declarations use 1.0.
pub const DEFAULT_COLOR_GAMMA: f64 = 2.2;

/// Interpolation class of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValueType {
    Opacity,
    Float,
    Color,
    Length,
    /// Transform/filter function lists: `[function, amount, …]`.
    Filter,
}

/// Ambient sizes and options needed to resolve lengths during interpolation.
#[derive(Debug, Clone, Copy)]
pub struct LengthEnv {
    pub parent_width: f64,
    pub parent_height: f64,
    /// The element's own box, used to re-resolve `auto` endpoints.
    pub self_width: f64,
    pub self_height: f64,
    /// The element's font size in px, resolving `em` lengths.
    pub font_size: f64,
    /// The root font size in px, resolving `rem` lengths.
    pub root_font_size: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// 2.2 by default; 1.0 when the declaration asks for linear-RGB mixing
    /// or the platform overrides it.
    pub color_gamma: f64,
}

impl Default for LengthEnv {
    fn default() -> Self {
        Self {
            parent_width: 0.0,
            parent_height: 0.0,
            self_width: 0.0,
            self_height: 0.0,
            font_size: 14.0,
            root_font_size: 14.0,
            viewport_width: 0.0,
            viewport_height: 0.0,
            color_gamma: DEFAULT_COLOR_GAMMA,
        }
    }
}

/// Interpolate `start → end` at eased progress `t`.
///
/// `x_axis` picks the parent dimension percent/calc lengths resolve against.
/// Progress within [`EPSILON`] of an endpoint returns that endpoint value
/// exactly to avoid rounding drift.
pub fn interpolate(
    ty: PropertyValueType,
    start: &CssValue,
    end: &CssValue,
    t: f64,
    x_axis: bool,
    env: &LengthEnv,
) -> CssValue {
    if t.abs() < EPSILON {
        return start.clone();
    }
    if (t - 1.0).abs() < EPSILON {
        return end.clone();
    }
    match ty {
        PropertyValueType::Opacity => interpolate_opacity(start, end, t),
        PropertyValueType::Float => interpolate_float(start, end, t),
        PropertyValueType::Color => interpolate_color(start, end, t, env.color_gamma),
        PropertyValueType::Length => interpolate_length(start, end, t, x_axis, env),
        PropertyValueType::Filter => interpolate_filter(start, end, t),
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn interpolate_float(start: &CssValue, end: &CssValue, t: f64) -> CssValue {
    let (Some(a), Some(b)) = (start.as_number(), end.as_number()) else {
        return start.clone();
    };
    CssValue::number(lerp(a, b, t))
}

/// Opacity interpolates linearly but snaps to an exact 0.0/1.0 when the
/// result lands within epsilon of an endpoint it is heading toward. This
/// prevents a one-frame shimmer at the end of fades.
fn interpolate_opacity(start: &CssValue, end: &CssValue, t: f64) -> CssValue {
    let (Some(a), Some(b)) = (start.as_number(), end.as_number()) else {
        return start.clone();
    };
    let mut r = lerp(a, b, t);
    if r.abs() < EPSILON && b <= a {
        r = 0.0;
    } else if (r - 1.0).abs() < EPSILON && b >= a {
        r = 1.0;
    }
    CssValue::number(r)
}

/// Gamma-correct ARGB interpolation: RGB channels are raised to `gamma`,
/// mixed linearly, then raised back by `1/gamma`. Alpha mixes linearly.
pub fn mix_colors(start: Color, end: Color, t: f64, gamma: f64) -> Color {
    let a = start.channels();
    let b = end.channels();
    let mix_rgb = |x: f64, y: f64| lerp(x.powf(gamma), y.powf(gamma), t).powf(1.0 / gamma);
    Color::from_channels([
        lerp(a[0], b[0], t),
        mix_rgb(a[1], b[1]),
        mix_rgb(a[2], b[2]),
        mix_rgb(a[3], b[3]),
    ])
}

fn interpolate_color(start: &CssValue, end: &CssValue, t: f64, gamma: f64) -> CssValue {
    let (Some(a), Some(b)) = (start.as_color(), end.as_color()) else {
        return start.clone();
    };
    CssValue::color(mix_colors(a, b, t, gamma))
}

fn resolve_px(value: &CssValue, x_axis: bool, env: &LengthEnv) -> f64 {
    match value {
        CssValue::Length { value, unit } => match unit {
            LengthUnit::Px => *value,
            LengthUnit::Em => *value * env.font_size,
            LengthUnit::Rem => *value * env.root_font_size,
            LengthUnit::Vw => *value / 100.0 * env.viewport_width,
            LengthUnit::Vh => *value / 100.0 * env.viewport_height,
            LengthUnit::Auto => {
                if x_axis {
                    env.self_width
                } else {
                    env.self_height
                }
            }
        },
        CssValue::Percent { value } => {
            let base = if x_axis {
                env.parent_width
            } else {
                env.parent_height
            };
            if base <= 0.0 {
                // Zero-size parent resolves to 0, never NaN.
                0.0
            } else {
                base * value / 100.0
            }
        }
        CssValue::Calc { px, .. } => *px,
        other => other.as_number().unwrap_or(0.0),
    }
}

fn interpolate_length(
    start: &CssValue,
    end: &CssValue,
    t: f64,
    x_axis: bool,
    env: &LengthEnv,
) -> CssValue {
    let length_like =
        |v: &CssValue| matches!(v, CssValue::Length { unit, .. } if *unit != LengthUnit::Auto);
    let percent_like = |v: &CssValue| matches!(v, CssValue::Percent { .. });
    let calc_like = |v: &CssValue| matches!(v, CssValue::Calc { .. });

    // Auto on either side re-resolves both endpoints against the element box.
    if start.is_auto() || end.is_auto() {
        let a = resolve_px(start, x_axis, env);
        let b = resolve_px(end, x_axis, env);
        return CssValue::px(lerp(a, b, t));
    }

    // Same-pattern fast paths; the result pattern follows the start side.
    if let (
        CssValue::Length { value: a, unit: ua },
        CssValue::Length { value: b, unit: ub },
    ) = (start, end)
    {
        if ua == ub {
            return CssValue::Length {
                value: lerp(*a, *b, t),
                unit: *ua,
            };
        }
    }
    if percent_like(start) && percent_like(end) {
        let (Some(a), Some(b)) = (start.as_number(), end.as_number()) else {
            return start.clone();
        };
        return CssValue::percent(lerp(a, b, t));
    }

    // Mixed units, unit/percent, or calc on either side: resolve both
    // endpoints to pixels against the environment.
    if (length_like(start) || percent_like(start) || calc_like(start))
        && (length_like(end) || percent_like(end) || calc_like(end))
    {
        let a = resolve_px(start, x_axis, env);
        let b = resolve_px(end, x_axis, env);
        return CssValue::px(lerp(a, b, t));
    }

    start.clone()
}

/// Filter values are `[function, amount, …]` arrays. If either side is empty
/// or the function kinds differ, the start value is returned unchanged;
/// otherwise the amount interpolates linearly.
fn interpolate_filter(start: &CssValue, end: &CssValue, t: f64) -> CssValue {
    let (CssValue::Array { items: a }, CssValue::Array { items: b }) = (start, end) else {
        return start.clone();
    };
    if a.is_empty() || b.is_empty() || a.first() != b.first() {
        return start.clone();
    }
    let (Some(from), Some(to)) = (
        a.get(1).and_then(CssValue::as_number),
        b.get(1).and_then(CssValue::as_number),
    ) else {
        return start.clone();
    };
    let mut items = a.clone();
    items[1] = CssValue::number(lerp(from, to, t));
    CssValue::Array { items }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_progress_returns_exact_values() {
        let a = CssValue::px(0.0);
        let b = CssValue::px(10.0);
        let env = LengthEnv::default();
        assert_eq!(
            interpolate(PropertyValueType::Length, &a, &b, 0.0, true, &env),
            a
        );
        assert_eq!(
            interpolate(PropertyValueType::Length, &a, &b, 1.0 - 1e-9, true, &env),
            b
        );
    }

    #[test]
    fn opacity_snaps_toward_endpoint() {
        let env = LengthEnv::default();
        let from = CssValue::number(1.0);
        let to = CssValue::number(0.0);
        let got = interpolate(PropertyValueType::Opacity, &from, &to, 0.999_999_9, true, &env);
        assert_eq!(got, to);
    }

    #[test]
    fn color_midpoint_matches_gamma_formula() {
        // Scenario from the engine contract: red to blue at γ=2.2, t=0.5.
        let start = Color(0xFFFF_0000);
        let end = Color(0xFF00_00FF);
        let got = mix_colors(start, end, 0.5, 2.2);
        let mixed = |x: f64, y: f64| -> u8 {
            let g = 2.2;
            ((x.powf(g) * 0.5 + y.powf(g) * 0.5).powf(1.0 / g) * 255.0).round() as u8
        };
        let expect_r = mixed(1.0, 0.0);
        let expect_b = mixed(0.0, 1.0);
        assert_eq!(got.a(), 255);
        assert_eq!(got.r(), expect_r);
        assert_eq!(got.b(), expect_b);
        assert_eq!(got.g(), 0);
    }

    #[test]
    fn linear_gamma_is_plain_lerp() {
        let start = Color(0xFF00_0000);
        let end = Color(0xFFFF_0000);
        let got = mix_colors(start, end, 0.5, 1.0);
        assert_eq!(got.r(), 128); // round(0.5 * 255)
    }

    #[test]
    fn percent_against_zero_parent_is_zero_not_nan() {
        let env = LengthEnv {
            parent_width: 0.0,
            ..Default::default()
        };
        let a = CssValue::percent(50.0);
        let b = CssValue::px(10.0);
        let got = interpolate(PropertyValueType::Length, &a, &b, 0.5, true, &env);
        assert_eq!(got, CssValue::px(5.0));
    }

    #[test]
    fn mixed_unit_percent_resolves_to_pixels() {
        let env = LengthEnv {
            parent_width: 200.0,
            ..Default::default()
        };
        let a = CssValue::percent(50.0); // 100px
        let b = CssValue::px(0.0);
        let got = interpolate(PropertyValueType::Length, &a, &b, 0.5, true, &env);
        assert_eq!(got, CssValue::px(50.0));
    }

    #[test]
    fn em_endpoints_interpolate_in_their_unit() {
        let a = CssValue::Length { value: 1.0, unit: LengthUnit::Em };
        let b = CssValue::Length { value: 3.0, unit: LengthUnit::Em };
        let got = interpolate(PropertyValueType::Length, &a, &b, 0.5, true, &LengthEnv::default());
        assert_eq!(got, CssValue::Length { value: 2.0, unit: LengthUnit::Em });
    }

    #[test]
    fn mixed_em_and_px_resolve_via_font_size() {
        let env = LengthEnv {
            font_size: 10.0,
            ..Default::default()
        };
        let a = CssValue::Length { value: 2.0, unit: LengthUnit::Em }; // 20px
        let b = CssValue::px(0.0);
        let got = interpolate(PropertyValueType::Length, &a, &b, 0.5, true, &env);
        assert_eq!(got, CssValue::px(10.0));
    }

    #[test]
    fn viewport_units_resolve_against_the_viewport() {
        let env = LengthEnv {
            viewport_width: 400.0,
            ..Default::default()
        };
        let a = CssValue::Length { value: 50.0, unit: LengthUnit::Vw }; // 200px
        let b = CssValue::px(0.0);
        let got = interpolate(PropertyValueType::Length, &a, &b, 0.5, true, &env);
        assert_eq!(got, CssValue::px(100.0));
    }

    #[test]
    fn auto_resolves_against_element_box() {
        let env = LengthEnv {
            self_height: 80.0,
            ..Default::default()
        };
        let a = CssValue::auto();
        let b = CssValue::px(0.0);
        let got = interpolate(PropertyValueType::Length, &a, &b, 0.5, false, &env);
        assert_eq!(got, CssValue::px(40.0));
    }

    #[test]
    fn filter_mismatched_functions_keep_start() {
        let blur4 = CssValue::Array {
            items: vec![CssValue::keyword("blur"), CssValue::number(4.0)],
        };
        let gray1 = CssValue::Array {
            items: vec![CssValue::keyword("grayscale"), CssValue::number(1.0)],
        };
        let got = interpolate(
            PropertyValueType::Filter,
            &blur4,
            &gray1,
            0.5,
            true,
            &LengthEnv::default(),
        );
        assert_eq!(got, blur4);
    }

    #[test]
    fn filter_same_function_interpolates_amount() {
        let blur0 = CssValue::Array {
            items: vec![CssValue::keyword("blur"), CssValue::number(0.0)],
        };
        let blur8 = CssValue::Array {
            items: vec![CssValue::keyword("blur"), CssValue::number(8.0)],
        };
        let got = interpolate(
            PropertyValueType::Filter,
            &blur0,
            &blur8,
            0.25,
            true,
            &LengthEnv::default(),
        );
        let CssValue::Array { items } = got else { panic!() };
        assert_eq!(items[1], CssValue::number(2.0));
    }
}
