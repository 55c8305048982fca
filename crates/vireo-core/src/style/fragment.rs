//! Parsed stylesheet fragment shared across a page.
//!
//! A fragment is immutable after parse and shared by `Arc`; the CSS front
//! end fills it, the element core only reads. Selector support is the
//! engine's subset: tag, class, id, and pseudo-element buckets.

use std::collections::HashMap;
use std::sync::Arc;

use vireo_css::keyframes::KeyframesToken;
use vireo_css::StyleMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoElement {
    Before,
    After,
    Placeholder,
    Selection,
}

#[derive(Debug, Default)]
pub struct CssFragment {
    pub tag_styles: HashMap<String, StyleMap>,
    pub class_styles: HashMap<String, StyleMap>,
    pub id_styles: HashMap<String, StyleMap>,
    /// Keyed by `(class selector, pseudo element)`.
    pub pseudo_styles: HashMap<(String, PseudoElement), StyleMap>,
    pub keyframes: HashMap<String, Arc<KeyframesToken>>,
}

impl CssFragment {
    pub fn keyframes(&self, name: &str) -> Option<Arc<KeyframesToken>> {
        self.keyframes.get(name).cloned()
    }

    /// Upper bound on the number of declarations that can match, used to
    /// reserve the merged map before resolution.
    pub fn matched_capacity(&self, tag: &str, classes: &[String], id: Option<&str>) -> usize {
        let mut n = self.tag_styles.get(tag).map_or(0, StyleMap::len);
        for class in classes {
            n += self.class_styles.get(class).map_or(0, StyleMap::len);
        }
        if let Some(id) = id {
            n += self.id_styles.get(id).map_or(0, StyleMap::len);
        }
        n
    }

    /// Merge selector-derived styles in specificity order: tag, then classes
    /// in declaration order, then the id selector.
    pub fn merge_for(&self, tag: &str, classes: &[String], id: Option<&str>) -> StyleMap {
        let mut merged = StyleMap::default();
        merged.reserve(self.matched_capacity(tag, classes, id));
        if let Some(styles) = self.tag_styles.get(tag) {
            merged.extend(styles.iter().map(|(k, v)| (*k, v.clone())));
        }
        for class in classes {
            if let Some(styles) = self.class_styles.get(class) {
                merged.extend(styles.iter().map(|(k, v)| (*k, v.clone())));
            }
        }
        if let Some(styles) = id.and_then(|id| self.id_styles.get(id)) {
            merged.extend(styles.iter().map(|(k, v)| (*k, v.clone())));
        }
        merged
    }

    /// Pseudo-element styles matched by any of the element's classes.
    pub fn pseudo_for(&self, classes: &[String], pseudo: PseudoElement) -> Option<&StyleMap> {
        classes
            .iter()
            .find_map(|class| self.pseudo_styles.get(&(class.clone(), pseudo)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vireo_css::{CssPropertyId, CssValue};

    #[test]
    fn specificity_order_tag_class_id() {
        let mut fragment = CssFragment::default();
        fragment.tag_styles.insert(
            "view".into(),
            StyleMap::from([(CssPropertyId::Opacity, CssValue::number(0.1))]),
        );
        fragment.class_styles.insert(
            "card".into(),
            StyleMap::from([
                (CssPropertyId::Opacity, CssValue::number(0.5)),
                (CssPropertyId::Width, CssValue::px(100.0)),
            ]),
        );
        fragment.id_styles.insert(
            "hero".into(),
            StyleMap::from([(CssPropertyId::Opacity, CssValue::number(0.9))]),
        );

        let merged = fragment.merge_for("view", &["card".into()], Some("hero"));
        assert_eq!(merged.get(&CssPropertyId::Opacity), Some(&CssValue::number(0.9)));
        assert_eq!(merged.get(&CssPropertyId::Width), Some(&CssValue::px(100.0)));

        let no_id = fragment.merge_for("view", &["card".into()], None);
        assert_eq!(no_id.get(&CssPropertyId::Opacity), Some(&CssValue::number(0.5)));
    }
}
