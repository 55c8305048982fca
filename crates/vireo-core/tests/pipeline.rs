//! End-to-end pipeline tests: element mutations in, ordered paint commands
//! out.

use std::sync::Arc;

use anyhow::Result;

use vireo_core::element::manager::{ElementManager, EngineConfig};
use vireo_core::element::NodeKind;
use vireo_core::list::{DequeueAction, ListComponentInfo};
use vireo_core::paint::ops::{PaintBackend, PropBundle};
use vireo_core::pipeline::PipelineOptions;
use vireo_core::style::CssFragment;
use vireo_core::ElementId;
use vireo_css::{CssPropertyId, CssValue, StyleMap};

/// Records the command stream the way a platform shell would see it.
#[derive(Debug, Default)]
struct RecordingBackend {
    log: Vec<String>,
    patch_finishes: Vec<PipelineOptions>,
}

impl PaintBackend for RecordingBackend {
    fn create_painting_node(
        &mut self,
        id: ElementId,
        platform_tag: &str,
        _props: &PropBundle,
        _tend_to_flatten: bool,
        _create_async: bool,
        _node_index: u32,
    ) {
        self.log.push(format!("create {id} <{platform_tag}>"));
    }

    fn insert_painting_node(&mut self, parent_id: ElementId, child_id: ElementId, index: i32) {
        self.log.push(format!("insert {child_id} into {parent_id} at {index}"));
    }

    fn remove_painting_node(
        &mut self,
        parent_id: ElementId,
        child_id: ElementId,
        _index: i32,
        is_move: bool,
    ) {
        self.log.push(format!("remove {child_id} from {parent_id} move={is_move}"));
    }

    fn destroy_painting_node(&mut self, _parent_id: ElementId, child_id: ElementId, _index: i32) {
        self.log.push(format!("destroy {child_id}"));
    }

    fn update_layout(
        &mut self,
        id: ElementId,
        left: f64,
        top: f64,
        width: f64,
        height: f64,
        _paddings: [f64; 4],
        _margins: [f64; 4],
        _borders: [f64; 4],
        _sticky: Option<[f64; 4]>,
        _max_height: f64,
        _node_index: u32,
    ) {
        self.log
            .push(format!("layout {id} ({left},{top}) {width}x{height}"));
    }

    fn update_props(&mut self, id: ElementId, props: &PropBundle) {
        let mut keys: Vec<&str> = props.keys().map(String::as_str).collect();
        keys.sort_unstable();
        self.log.push(format!("props {id} [{}]", keys.join(",")));
    }

    fn on_node_ready(&mut self, id: ElementId) {
        self.log.push(format!("ready {id}"));
    }

    fn list_reuse_painting_node(&mut self, id: ElementId, item_key: &str) {
        self.log.push(format!("reuse {id} as {item_key}"));
    }

    fn invoke_ui_method(
        &mut self,
        id: ElementId,
        method: &str,
        _params: &serde_json::Value,
        _callback_id: u64,
    ) {
        self.log.push(format!("invoke {id}.{method}"));
    }

    fn flush_immediately(&mut self) {
        self.log.push("flush".into());
    }

    fn update_layout_patching(&mut self) {
        self.log.push("layout-patching".into());
    }

    fn on_patch_finish(&mut self, options: &PipelineOptions) {
        self.patch_finishes.push(options.clone());
        self.log.push(format!("patch-finish {}", options.pipeline_id));
    }
}

fn manager(config: EngineConfig) -> ElementManager {
    ElementManager::new(Arc::new(CssFragment::default()), config)
}

#[test]
fn first_screen_emits_creates_before_inserts_and_finishes_last() -> Result<()> {
    let mut m = manager(EngineConfig::default());
    let page = m.create_page();
    let text = m.create_element("text", NodeKind::Text);
    let image = m.create_element("image", NodeKind::Image);
    m.insert_node(page, text, None)?;
    m.insert_node(page, image, None)?;
    m.apply_layout_result(
        text,
        vireo_core::layout::LayoutResult {
            left: 0.0,
            top: 0.0,
            width: 120.0,
            height: 20.0,
            ..Default::default()
        },
    )?;
    m.finish_patch();

    let mut backend = RecordingBackend::default();
    m.drain_paint_ops(&mut backend);

    let first_insert = backend.log.iter().position(|l| l.starts_with("insert"));
    let last_create = backend.log.iter().rposition(|l| l.starts_with("create"));
    assert!(last_create < first_insert, "creates precede inserts: {:?}", backend.log);
    assert_eq!(backend.log.last().map(String::as_str), Some("patch-finish 1"));
    assert!(backend.patch_finishes[0].is_first_screen);
    assert!(backend
        .log
        .iter()
        .any(|l| l == &format!("layout {text} (0,0) 120x20")));
    Ok(())
}

#[test]
fn second_patch_is_incremental() -> Result<()> {
    let mut m = manager(EngineConfig::default());
    let page = m.create_page();
    let text = m.create_element("text", NodeKind::Text);
    m.insert_node(page, text, None)?;
    m.finish_patch();
    let mut backend = RecordingBackend::default();
    m.drain_paint_ops(&mut backend);
    backend.log.clear();

    // An attribute-only change produces props, ready, and the patch finish;
    // no structural commands.
    m.set_attribute(text, "text", vireo_value::Value::string("hello"))?;
    m.finish_patch();
    m.drain_paint_ops(&mut backend);
    assert!(backend.log.iter().any(|l| l == &format!("props {text} [text]")));
    assert!(backend.log.iter().any(|l| l == &format!("ready {text}")));
    assert!(!backend.log.iter().any(|l| l.starts_with("create") || l.starts_with("insert")));
    assert!(!backend.patch_finishes.last().is_some_and(|o| o.is_first_screen));
    Ok(())
}

#[test]
fn platform_list_receives_info_payload_and_skips_eager_flush() -> Result<()> {
    let mut m = manager(EngineConfig {
        page_config_platform_list: true,
        ..EngineConfig::default()
    });
    let page = m.create_page();
    let list = m.create_element("list", NodeKind::List(Box::default()));
    m.insert_node(page, list, None)?;

    let mut rows: Vec<ListComponentInfo> = (0..3)
        .map(|i| ListComponentInfo::new("row", format!("row-{i}")))
        .collect();
    rows[0].is_sticky_top = true;
    m.update_list_components(list, rows)?;

    let action = m.list_component_at_index(list, 2, 77, 5.0)?;
    assert_eq!(action, DequeueAction::Create);

    let mut backend = RecordingBackend::default();
    m.drain_paint_ops(&mut backend);
    assert!(backend
        .log
        .iter()
        .any(|l| l == &format!("props {list} [list-platform-info]")));
    // The platform list drives its own flush cadence.
    assert!(!backend.log.contains(&"flush".to_string()));
    assert_eq!(backend.patch_finishes.len(), 1);
    assert_eq!(backend.patch_finishes[0].operation_id, Some(77));
    assert_eq!(
        backend.patch_finishes[0].list_item_key.as_deref(),
        Some("row-2")
    );
    Ok(())
}

#[test]
fn class_styles_drive_the_prop_stream() -> Result<()> {
    let mut fragment = CssFragment::default();
    fragment.class_styles.insert(
        "card".into(),
        StyleMap::from([
            (CssPropertyId::Width, CssValue::px(100.0)),
            (CssPropertyId::BackgroundColor, CssValue::text("#fff")),
        ]),
    );
    let mut m = ElementManager::new(Arc::new(fragment), EngineConfig::default());
    let page = m.create_page();
    let view = m.create_element("view", NodeKind::View);
    m.insert_node(page, view, None)?;
    m.set_classes(view, vec!["card".into()])?;
    m.finish_patch();

    let mut backend = RecordingBackend::default();
    m.drain_paint_ops(&mut backend);
    // Background color forces the view out of layout-only; the create op
    // carries the resolved styles and the node settles at patch close.
    assert!(backend.log.iter().any(|l| l == &format!("create {view} <view>")));
    assert!(backend.log.iter().any(|l| l == &format!("ready {view}")));
    assert!(!backend.log.iter().any(|l| l.starts_with(&format!("props {view}"))));
    Ok(())
}
