//! The built-in canvas plugin.
//!
//! Each route maps to a short sequence of beats. Data shaping is done by
//! `pure` beats; everything that touches the stage is a `stage-crew` beat.
//! The geometry helpers at the bottom are shared with the engine's fallback
//! path so both produce identical results.

use crate::dispatch::{
    Handler, KEY_ATTRIBUTE, KEY_COMPONENT, KEY_CSS_CLASSES, KEY_DX, KEY_DY, KEY_PATH, KEY_VALUE,
    Route, Sequence, StepContext, payload_str,
};
use crate::error::{CanvasError, CanvasResult};
use crate::overlay::gesture_baseline;
use crate::stage::Stage;
use crate::svg_edit::set_svg_attribute;
use sc_core::hierarchy::{
    ATTR_COMPONENT_TYPE, ComponentSpec, CssClassDef, instance_class, style_value_to_css,
};
use sc_core::{
    Beat, CoreError, Handle, NodeId, Rect, ResizeConfig, StageCrew, VisualNode, compute_resize,
    snap_resize,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const PLUGIN_ID: &str = "canvas-component";

const SCRATCH_PLAN: &str = "mountPlan";

/// Every route of the canvas plugin with its sequence.
pub fn canvas_plugin() -> Vec<(Route, Sequence)> {
    vec![
        (
            Route::ComponentCreate,
            Sequence::new(PLUGIN_ID, "create")
                .beat(Beat::pure("create.resolve-template"), Handler::pure(resolve_template))
                .beat(Beat::stage_crew("create.mount"), Handler::stage_crew(mount)),
        ),
        (
            Route::ComponentSelect,
            Sequence::new(PLUGIN_ID, "select")
                .beat(Beat::stage_crew("select.bind-overlay"), Handler::stage_crew(bind_overlay)),
        ),
        (
            Route::ComponentDeselect,
            Sequence::new(PLUGIN_ID, "deselect").beat(
                Beat::stage_crew("select.unbind-overlay"),
                Handler::stage_crew(|cap, stage, _| {
                    stage.overlay.hide(cap);
                    Ok(())
                }),
            ),
        ),
        (
            Route::ResizeStart,
            Sequence::new(PLUGIN_ID, "resize-start")
                .beat(Beat::stage_crew("resize.capture"), Handler::stage_crew(capture_resize)),
        ),
        (
            Route::ResizeMove,
            Sequence::new(PLUGIN_ID, "resize-move").beat(
                Beat::stage_crew("resize.apply"),
                Handler::stage_crew(|cap, stage, ctx| {
                    let (id, handle, baseline) = (ctx.id()?, ctx.handle()?, ctx.baseline()?);
                    apply_resize(cap, stage, id, handle, baseline, ctx.delta(KEY_DX), ctx.delta(KEY_DY))
                        .map(drop)
                }),
            ),
        ),
        (
            Route::ResizeEnd,
            Sequence::new(PLUGIN_ID, "resize-end").beat(
                Beat::stage_crew("resize.finalize"),
                Handler::stage_crew(|cap, stage, ctx| finish_gesture(cap, stage, ctx.id()?).map(drop)),
            ),
        ),
        (
            Route::DragMove,
            Sequence::new(PLUGIN_ID, "drag-move").beat(
                Beat::stage_crew("drag.apply"),
                Handler::stage_crew(|cap, stage, ctx| {
                    let (id, baseline) = (ctx.id()?, ctx.baseline()?);
                    apply_move(cap, stage, id, baseline, ctx.delta(KEY_DX), ctx.delta(KEY_DY)).map(drop)
                }),
            ),
        ),
        (
            Route::SvgSetAttribute,
            Sequence::new(PLUGIN_ID, "svg-set-attribute").beat(
                Beat::stage_crew("svg.set-attribute"),
                Handler::stage_crew(|cap, stage, ctx| {
                    let id = ctx.id()?;
                    let path = payload_str(&ctx.payload, KEY_PATH).unwrap_or("");
                    let attribute = ctx.str(KEY_ATTRIBUTE)?;
                    let value = svg_value(ctx.payload.get(KEY_VALUE));
                    set_svg_attribute(cap, stage, id, path, attribute, value.as_deref()).map(drop)
                }),
            ),
        ),
    ]
}

// ─── Create ──────────────────────────────────────────────────────────────

/// What the mount beat needs to build one component, resolved from its
/// template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountPlan {
    pub id: String,
    pub tag: String,
    pub classes: Vec<String>,
    pub style: Vec<(String, String)>,
    pub attributes: BTreeMap<String, String>,
    pub content: Option<String>,
    pub layout: Rect,
    /// Stylesheet entries referenced by the template.
    pub css: Vec<CssClassDef>,
}

impl MountPlan {
    pub fn from_component(component: &ComponentSpec, css_classes: &BTreeMap<String, CssClassDef>) -> Self {
        let mut classes = component.template.class_refs.clone();
        classes.push(instance_class(&component.component_type, &component.id));

        let style = component
            .template
            .style
            .iter()
            .filter_map(|(name, value)| style_value_to_css(value).map(|v| (name.clone(), v)))
            .collect();

        let mut attributes = component.template.attributes.clone();
        if !component.component_type.is_empty() {
            attributes.insert(ATTR_COMPONENT_TYPE.to_string(), component.component_type.clone());
        }

        let css = component
            .template
            .class_refs
            .iter()
            .filter_map(|name| css_classes.get(name).cloned())
            .collect();

        Self {
            id: component.id.clone(),
            tag: component.template.tag.clone(),
            classes,
            style,
            attributes,
            content: component.content.clone().filter(|c| !c.is_empty()),
            layout: component.layout.to_rect(),
            css,
        }
    }
}

fn resolve_template(ctx: &mut StepContext) -> CanvasResult<()> {
    let component: ComponentSpec = ctx
        .payload
        .get(KEY_COMPONENT)
        .cloned()
        .map(serde_json::from_value)
        .ok_or(CanvasError::Payload(KEY_COMPONENT))?
        .map_err(CoreError::from)?;
    if component.id.trim().is_empty() {
        return Err(CanvasError::Payload(KEY_COMPONENT));
    }
    let css_classes: BTreeMap<String, CssClassDef> = match ctx.payload.get(KEY_CSS_CLASSES) {
        Some(Value::Null) | None => BTreeMap::new(),
        Some(v) => serde_json::from_value(v.clone()).map_err(CoreError::from)?,
    };
    let plan = MountPlan::from_component(&component, &css_classes);
    ctx.scratch
        .insert(SCRATCH_PLAN.into(), serde_json::to_value(plan).map_err(CoreError::from)?);
    Ok(())
}

fn mount(cap: &StageCrew, stage: &mut Stage, ctx: &mut StepContext) -> CanvasResult<()> {
    let plan: MountPlan = ctx
        .scratch
        .get(SCRATCH_PLAN)
        .cloned()
        .map(serde_json::from_value)
        .ok_or(CanvasError::Payload(SCRATCH_PLAN))?
        .map_err(CoreError::from)?;
    mount_plan(cap, stage, plan)?;
    Ok(())
}

/// Create the node described by `plan` as the last child of the canvas.
pub fn mount_plan(cap: &StageCrew, stage: &mut Stage, plan: MountPlan) -> CanvasResult<NodeId> {
    let id = NodeId::intern(&plan.id);
    let mut node = VisualNode::element(id, &plan.tag);
    node.classes.extend(plan.classes);
    for (name, value) in &plan.style {
        node.style.set(name, value);
    }
    node.attributes = plan.attributes;

    let root = stage.tree.root();
    let idx = stage.tree.add_node(cap, root, node)?;
    stage.tree.set_inline_box(cap, idx, plan.layout);
    if let Some(text) = plan.content {
        stage.tree.add_node(cap, idx, VisualNode::text(&text))?;
    }
    for def in plan.css {
        stage.inject_css(cap, def);
    }
    log::debug!("mounted `{id}`");
    Ok(id)
}

// ─── Select / resize ─────────────────────────────────────────────────────

fn bind_overlay(cap: &StageCrew, stage: &mut Stage, ctx: &mut StepContext) -> CanvasResult<()> {
    let id = ctx.id()?;
    if stage.overlay.show(cap, &stage.tree, id) {
        Ok(())
    } else {
        Err(CoreError::NodeNotFound(id).into())
    }
}

fn capture_resize(_cap: &StageCrew, stage: &mut Stage, ctx: &mut StepContext) -> CanvasResult<()> {
    let id = ctx.id()?;
    let handle = ctx.handle()?;
    let idx = stage.tree.require(id)?;
    let baseline = gesture_baseline(&stage.tree, idx).ok_or(CoreError::NodeNotFound(id))?;
    log::trace!("resize `{id}` from {handle}: baseline {baseline:?}");
    Ok(())
}

/// Resize `id` by dragging `handle` from `baseline`, write the rounded box
/// into inline style and resync the overlay. Returns the box now in effect.
///
/// A disabled node, a disallowed handle or a non-finite delta leaves the
/// node untouched and returns `baseline`.
pub fn apply_resize(
    cap: &StageCrew,
    stage: &mut Stage,
    id: NodeId,
    handle: Handle,
    baseline: Rect,
    dx: f32,
    dy: f32,
) -> CanvasResult<Rect> {
    let idx = stage.tree.require(id)?;
    let config = stage
        .tree
        .get(idx)
        .map(|n| ResizeConfig::from_attributes(&n.attributes))
        .unwrap_or_default();
    if !config.allows(handle) {
        log::debug!("resize of `{id}` via {handle} rejected by its resize config");
        return Ok(baseline);
    }
    if !dx.is_finite() || !dy.is_finite() {
        log::debug!("resize of `{id}`: ignoring non-finite delta ({dx}, {dy})");
        return Ok(baseline);
    }
    let rect = snap_resize(handle, baseline, compute_resize(handle, baseline, dx, dy, &config), &config);
    stage.tree.set_inline_box(cap, idx, rect);
    stage.overlay.resync(cap, &stage.tree, id);
    Ok(rect)
}

/// Translate `id` from `baseline` by the delta, keeping its size.
pub fn apply_move(
    cap: &StageCrew,
    stage: &mut Stage,
    id: NodeId,
    baseline: Rect,
    dx: f32,
    dy: f32,
) -> CanvasResult<Rect> {
    let idx = stage.tree.require(id)?;
    if !dx.is_finite() || !dy.is_finite() {
        log::debug!("move of `{id}`: ignoring non-finite delta ({dx}, {dy})");
        return Ok(baseline);
    }
    let rect = baseline.translate(dx, dy).round();
    stage.tree.set_inline_box(cap, idx, rect);
    stage.overlay.resync(cap, &stage.tree, id);
    Ok(rect)
}

/// Final overlay resync after a gesture, re-reading the node's inline style
/// rather than trusting gesture state. Returns the final inline box.
pub fn finish_gesture(cap: &StageCrew, stage: &mut Stage, id: NodeId) -> CanvasResult<Option<Rect>> {
    let idx = stage.tree.require(id)?;
    stage.overlay.resync(cap, &stage.tree, id);
    Ok(stage.tree.get(idx).and_then(VisualNode::inline_box))
}

/// `null`, absent and `""` all mean "remove". Anything else is stringified.
fn svg_value(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
