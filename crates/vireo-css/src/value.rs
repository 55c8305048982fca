//! Resolved style values.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Unit carried by a length value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    /// Device-independent pixels.
    #[default]
    Px,
    /// Relative to the element's font size.
    Em,
    /// Relative to the root font size.
    Rem,
    /// Percent of the viewport width.
    Vw,
    /// Percent of the viewport height.
    Vh,
    /// Resolved against the element/parent box at use time.
    Auto,
}

/// A resolved CSS value. Comparison is by pattern tag plus payload.
///
/// The `Variable` pattern carries an unresolved `var(--token)` reference: a
/// format string with `{{token}}` holes plus an optional per-token default
/// map. It must be substituted against an ambient scope before it can take
/// part in numeric interpolation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum CssValue {
    #[default]
    Empty,
    Number {
        value: f64,
    },
    String {
        value: String,
    },
    /// Keyword value (`fixed`, `hidden`, `row`, …).
    Enum {
        value: String,
    },
    Color {
        value: Color,
    },
    Length {
        value: f64,
        unit: LengthUnit,
    },
    Percent {
        value: f64,
    },
    /// A calc() expression pre-resolved by the CSS front end. `px` is the
    /// resolution against the parent box at resolve time.
    Calc {
        expression: String,
        px: f64,
    },
    Array {
        items: Vec<CssValue>,
    },
    Object {
        value: serde_json::Value,
    },
    Variable {
        format: String,
        #[serde(default)]
        #[serde(skip_serializing_if = "Option::is_none")]
        defaults: Option<HashMap<String, String>>,
    },
}

impl CssValue {
    pub fn number(value: f64) -> Self {
        CssValue::Number { value }
    }

    pub fn px(value: f64) -> Self {
        CssValue::Length {
            value,
            unit: LengthUnit::Px,
        }
    }

    pub fn percent(value: f64) -> Self {
        CssValue::Percent { value }
    }

    pub fn auto() -> Self {
        CssValue::Length {
            value: 0.0,
            unit: LengthUnit::Auto,
        }
    }

    pub fn color(value: Color) -> Self {
        CssValue::Color { value }
    }

    pub fn keyword(value: impl Into<String>) -> Self {
        CssValue::Enum {
            value: value.into(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        CssValue::String {
            value: value.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CssValue::Empty)
    }

    pub fn is_auto(&self) -> bool {
        matches!(
            self,
            CssValue::Length {
                unit: LengthUnit::Auto,
                ..
            }
        )
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, CssValue::Variable { .. })
    }

    /// Numeric payload for number/length/percent/calc patterns.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CssValue::Number { value } => Some(*value),
            CssValue::Length { value, unit } if *unit != LengthUnit::Auto => Some(*value),
            CssValue::Percent { value } => Some(*value),
            CssValue::Calc { px, .. } => Some(*px),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            CssValue::Color { value } => Some(*value),
            // Colors arriving from the wire as raw ARGB numbers.
            CssValue::Number { value } => Some(Color(*value as u32)),
            _ => None,
        }
    }

    pub fn as_keyword(&self) -> Option<&str> {
        match self {
            CssValue::Enum { value } => Some(value),
            CssValue::String { value } => Some(value),
            _ => None,
        }
    }

    /// Tokens referenced by a `Variable` pattern, in order of appearance.
    pub fn variable_tokens(&self) -> Vec<String> {
        let CssValue::Variable { format, .. } = self else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut rest = format.as_str();
        while let Some(open) = rest.find("{{") {
            let tail = &rest[open + 2..];
            let Some(close) = tail.find("}}") else { break };
            out.push(tail[..close].to_string());
            rest = &tail[close + 2..];
        }
        out
    }

    /// Substitute `{{token}}` holes using `lookup`, falling back to the
    /// value's own default map, then to the literal default string.
    pub fn substitute_variables(
        &self,
        mut lookup: impl FnMut(&str) -> Option<String>,
    ) -> Option<String> {
        let CssValue::Variable { format, defaults } = self else {
            return None;
        };
        let mut out = String::with_capacity(format.len());
        let mut rest = format.as_str();
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            let tail = &rest[open + 2..];
            let Some(close) = tail.find("}}") else {
                out.push_str(&rest[open..]);
                return Some(out);
            };
            let token = &tail[..close];
            let resolved = lookup(token)
                .or_else(|| defaults.as_ref().and_then(|d| d.get(token).cloned()))
                .unwrap_or_else(|| token.to_string());
            out.push_str(&resolved);
            rest = &tail[close + 2..];
        }
        out.push_str(rest);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_tag_plus_payload() {
        assert_eq!(CssValue::px(4.0), CssValue::px(4.0));
        assert_ne!(CssValue::px(4.0), CssValue::number(4.0));
        assert_ne!(CssValue::percent(50.0), CssValue::number(50.0));
    }

    #[test]
    fn variable_tokens_and_substitution() {
        let v = CssValue::Variable {
            format: "1px solid {{accent}}".into(),
            defaults: Some(HashMap::from([("accent".to_string(), "red".to_string())])),
        };
        assert_eq!(v.variable_tokens(), vec!["accent".to_string()]);
        // Scope wins over the default map.
        assert_eq!(
            v.substitute_variables(|t| (t == "accent").then(|| "blue".to_string())),
            Some("1px solid blue".to_string())
        );
        // Default map used when the scope has no binding.
        assert_eq!(
            v.substitute_variables(|_| None),
            Some("1px solid red".to_string())
        );
    }

    #[test]
    fn serde_round_trip() {
        let values = vec![
            CssValue::px(12.0),
            CssValue::percent(50.0),
            CssValue::color(Color::argb(255, 0, 128, 255)),
            CssValue::Calc {
                expression: "calc(100% - 8px)".into(),
                px: 312.0,
            },
            CssValue::Array {
                items: vec![CssValue::keyword("blur"), CssValue::number(4.0)],
            },
        ];
        for v in values {
            let json = serde_json::to_string(&v).expect("serialize css value");
            let back: CssValue = serde_json::from_str(&json).expect("deserialize css value");
            assert_eq!(v, back);
        }
    }
}
