//! Frame Scheduling Integration Tests
//!
//! Drives the renderer through a manual scheduler and a recording surface:
//! - Repaint requests coalesce into one frame
//! - Skipped frames are retried, bad geometry is refused
//! - Layer and priority paint order
//! - One failing drawable does not stop the frame
//! - Explicit render data and overlays

use std::cell::RefCell;
use std::rc::Rc;

use flowchart_core::{Point, Rect, Size, Viewport, ViewportPatch};
use flowchart_renderer::{
    DrawCommand, Drawable, FrameOutcome, Guides, ManualScheduler, RecordingContext, RenderContext,
    RenderData, RenderError, RenderLayer, RenderObject, RenderObjectId, RenderObjectPatch,
    RendererConfig, SceneRenderer, TempConnection,
};

type PaintLog = Rc<RefCell<Vec<String>>>;

/// Drawable that appends its name to a shared log, or fails.
struct Probe {
    name: &'static str,
    log: PaintLog,
    fail: bool,
}

impl Drawable for Probe {
    fn draw(&self, ctx: &mut dyn RenderContext, _viewport: &Viewport) -> anyhow::Result<()> {
        ctx.set_fill_style("red");
        if self.fail {
            anyhow::bail!("{} exploded", self.name);
        }
        self.log.borrow_mut().push(self.name.to_string());
        Ok(())
    }
}

fn probe(name: &'static str, log: &PaintLog) -> Probe {
    Probe {
        name,
        log: Rc::clone(log),
        fail: false,
    }
}

fn setup() -> (SceneRenderer, RecordingContext, ManualScheduler) {
    let ctx = RecordingContext::new(800, 600);
    let scheduler = ManualScheduler::new();
    let config = RendererConfig {
        show_grid: false,
        ..RendererConfig::default()
    };
    let renderer = SceneRenderer::new(Box::new(ctx.clone()), Box::new(scheduler.clone()), config);
    (renderer, ctx, scheduler)
}

/// Play the browser: fire the pending frame and run the callback.
fn fire(renderer: &mut SceneRenderer, scheduler: &ManualScheduler) -> Option<FrameOutcome> {
    scheduler.take_frame()?;
    renderer.on_animation_frame()
}

// ============================================================================
// Coalescing
// ============================================================================

#[test]
fn test_two_dirty_marks_paint_once_with_union() {
    let (mut renderer, _ctx, scheduler) = setup();

    renderer.mark_dirty(Rect::new(10.0, 10.0, 20.0, 20.0));
    renderer.mark_dirty(Rect::new(100.0, 50.0, 10.0, 10.0));

    assert_eq!(scheduler.requests(), 1);
    let report = fire(&mut renderer, &scheduler)
        .and_then(FrameOutcome::report)
        .unwrap();

    assert_eq!(renderer.frame_count(), 1);
    assert_eq!(report.damage, Some(Rect::new(10.0, 10.0, 100.0, 50.0)));
    assert!(renderer.dirty().is_empty());
    assert!(fire(&mut renderer, &scheduler).is_none());
    assert_eq!(renderer.frame_count(), 1);
}

#[test]
fn test_many_mutations_before_frame_are_one_request() {
    let (mut renderer, _ctx, scheduler) = setup();
    let log = PaintLog::default();

    for (name, offset) in [("a", 0.0), ("b", 30.0), ("c", 60.0), ("d", 90.0)] {
        renderer.add_render_object(
            name,
            RenderObject::new(RenderLayer::Nodes, probe(name, &log))
                .with_bounds(Rect::new(offset, 0.0, 20.0, 20.0)),
        );
    }
    renderer.set_selection_box(Some(Rect::new(0.0, 0.0, 50.0, 50.0)));

    assert_eq!(scheduler.requests(), 1);
    assert!(fire(&mut renderer, &scheduler).is_some());
    assert_eq!(log.borrow().len(), 4);

    renderer
        .update_render_object(&RenderObjectId::new("a"), &RenderObjectPatch::visible(false))
        .unwrap();
    assert_eq!(scheduler.requests(), 2);
}

#[test]
fn test_frame_with_nothing_dirty_does_not_paint() {
    let (mut renderer, ctx, scheduler) = setup();
    renderer.request_render();
    assert_eq!(scheduler.pending(), 1);

    assert!(fire(&mut renderer, &scheduler).is_none());
    assert!(ctx.is_empty());
    assert!(!renderer.has_pending_frame());
}

#[test]
fn test_refused_frame_is_retried_on_next_mark() {
    let (mut renderer, _ctx, scheduler) = setup();
    scheduler.set_refuse(true);
    renderer.mark_dirty(Rect::new(0.0, 0.0, 5.0, 5.0));
    assert!(!renderer.has_pending_frame());

    scheduler.set_refuse(false);
    renderer.mark_dirty(Rect::new(5.0, 5.0, 5.0, 5.0));
    let report = fire(&mut renderer, &scheduler)
        .and_then(FrameOutcome::report)
        .unwrap();
    assert_eq!(report.damage, Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
}

#[test]
fn test_busy_frame_requests_another() {
    let (mut renderer, _ctx, scheduler) = setup();
    renderer.mark_dirty(Rect::new(0.0, 0.0, 5.0, 5.0));

    let token = renderer.render_guard().try_enter();
    assert!(token.is_some());
    let outcome = fire(&mut renderer, &scheduler).unwrap();
    assert!(matches!(outcome, FrameOutcome::Busy));
    assert_eq!(renderer.dirty().len(), 1);
    assert!(renderer.has_pending_frame());
    assert_eq!(scheduler.pending(), 1);

    drop(token);
    let report = fire(&mut renderer, &scheduler)
        .and_then(FrameOutcome::report)
        .unwrap();
    assert_eq!(report.damage, Some(Rect::new(0.0, 0.0, 5.0, 5.0)));
    assert!(renderer.dirty().is_empty());
    assert!(!renderer.has_pending_frame());
}

#[test]
fn test_non_finite_geometry_never_reaches_a_frame() {
    let scheduler = ManualScheduler::new();
    let mut renderer = SceneRenderer::new(
        Box::new(RecordingContext::new(800, 600)),
        Box::new(scheduler.clone()),
        RendererConfig::default(),
    );

    let change = renderer.set_viewport(&ViewportPatch::offset(f64::NAN, 0.0));
    assert!(change.is_empty());
    let change = renderer.set_viewport(&ViewportPatch::size(f64::INFINITY, 100.0));
    assert!(change.is_empty());
    assert!(matches!(
        renderer.set_size(Size::new(f64::NAN, 100.0)),
        Err(RenderError::Surface(_))
    ));

    renderer.mark_dirty(Rect::new(0.0, 0.0, 10.0, 10.0));
    assert!(fire(&mut renderer, &scheduler).is_some_and(|o| o.is_painted()));
    assert_eq!(renderer.viewport().offset, Point::default());
}

// ============================================================================
// Paint order and isolation
// ============================================================================

#[test]
fn test_objects_paint_by_layer_then_priority() {
    let (mut renderer, _ctx, _scheduler) = setup();
    let log = PaintLog::default();

    renderer.add_render_object(
        "ui",
        RenderObject::new(RenderLayer::Ui, probe("ui", &log)),
    );
    renderer.add_render_object(
        "node-high",
        RenderObject::new(RenderLayer::Nodes, probe("node-high", &log)).with_priority(10),
    );
    renderer.add_render_object(
        "edge",
        RenderObject::new(RenderLayer::Edges, probe("edge", &log)).with_priority(99),
    );
    renderer.add_render_object(
        "node-low",
        RenderObject::new(RenderLayer::Nodes, probe("node-low", &log)).with_priority(-1),
    );
    renderer.add_render_object(
        "background",
        RenderObject::new(RenderLayer::Background, probe("background", &log)),
    );
    renderer.add_render_object(
        "hidden",
        RenderObject::new(RenderLayer::Nodes, probe("hidden", &log)).hidden(),
    );

    assert!(renderer.render(None, None).is_painted());

    assert_eq!(
        *log.borrow(),
        vec!["background", "edge", "node-low", "node-high", "ui"]
    );
}

#[test]
fn test_failing_object_is_isolated() {
    let (mut renderer, ctx, _scheduler) = setup();
    let log = PaintLog::default();

    renderer.add_render_object("a", RenderObject::new(RenderLayer::Nodes, probe("a", &log)));
    renderer.add_render_object(
        "broken",
        RenderObject::new(
            RenderLayer::Nodes,
            Probe {
                name: "broken",
                log: Rc::clone(&log),
                fail: true,
            },
        )
        .with_priority(1),
    );
    renderer.add_render_object(
        "c",
        RenderObject::new(RenderLayer::Nodes, probe("c", &log)).with_priority(2),
    );

    let report = renderer.render(None, None).report().unwrap();

    assert_eq!(*log.borrow(), vec!["a", "c"]);
    assert_eq!(report.painted, 2);
    assert_eq!(report.failures.len(), 1);
    match &report.failures[0] {
        RenderError::Object { id, message } => {
            assert_eq!(id, "broken");
            assert!(message.contains("broken exploded"));
        }
        other => panic!("unexpected failure {other:?}"),
    }
    assert_eq!(ctx.save_depth(), 0);
    assert_eq!(ctx.unbalanced_restores(), 0);

    // Only that frame is affected; the object stays registered.
    assert_eq!(renderer.object_count(), 3);
}

#[test]
fn test_offscreen_objects_are_culled() {
    let (mut renderer, _ctx, _scheduler) = setup();
    let log = PaintLog::default();
    renderer.add_render_object(
        "near",
        RenderObject::new(RenderLayer::Nodes, probe("near", &log))
            .with_bounds(Rect::new(10.0, 10.0, 10.0, 10.0)),
    );
    renderer.add_render_object(
        "far",
        RenderObject::new(RenderLayer::Nodes, probe("far", &log))
            .with_bounds(Rect::new(5000.0, 5000.0, 10.0, 10.0)),
    );

    let report = renderer.render(None, None).report().unwrap();

    assert_eq!(*log.borrow(), vec!["near"]);
    assert_eq!(report.culled, 1);
}

#[test]
fn test_remove_render_object_invalidates_its_bounds() {
    let (mut renderer, _ctx, _scheduler) = setup();
    let log = PaintLog::default();
    renderer.add_render_object(
        "a",
        RenderObject::new(RenderLayer::Nodes, probe("a", &log))
            .with_bounds(Rect::new(10.0, 10.0, 10.0, 10.0)),
    );
    let _ = renderer.render(None, None);

    assert!(renderer.remove_render_object(&RenderObjectId::new("a")).is_some());
    assert_eq!(
        renderer.dirty().union(),
        Some(Rect::new(10.0, 10.0, 10.0, 10.0))
    );
    assert!(renderer.remove_render_object(&RenderObjectId::new("a")).is_none());
}

// ============================================================================
// Render data and overlays
// ============================================================================

#[test]
fn test_render_data_paints_edges_then_nodes() {
    let (mut renderer, _ctx, _scheduler) = setup();
    let log = PaintLog::default();
    renderer.add_render_object(
        "registered",
        RenderObject::new(RenderLayer::Nodes, probe("registered", &log)),
    );

    let n1 = probe("n1", &log);
    let n2 = probe("n2", &log);
    let e1 = probe("e1", &log);
    let data = RenderData {
        nodes: vec![&n1 as &dyn Drawable, &n2],
        edges: vec![&e1 as &dyn Drawable],
        ..RenderData::default()
    };
    let report = renderer.render(None, Some(&data)).report().unwrap();

    assert_eq!(*log.borrow(), vec!["e1", "n1", "n2"]);
    assert_eq!(report.painted, 3);
}

#[test]
fn test_explicit_viewport_is_applied_and_clamped() {
    let (mut renderer, ctx, _scheduler) = setup();
    let viewport = Viewport {
        scale: 0.01,
        offset: Point::new(5.0, 7.0),
        ..Viewport::default()
    };

    let _ = renderer.render(Some(&viewport), None);

    assert!((renderer.viewport().scale - 0.1).abs() < f64::EPSILON);
    let commands = ctx.commands();
    assert!(commands.contains(&DrawCommand::Translate { x: 5.0, y: 7.0 }));
    assert!(commands.contains(&DrawCommand::Scale { x: 0.1, y: 0.1 }));
}

#[test]
fn test_overlays_each_wrapped_in_save_restore() {
    let (mut renderer, ctx, _scheduler) = setup();
    renderer.set_selection_box(Some(Rect::new(0.0, 0.0, 40.0, 40.0)));
    renderer.set_guides(Some(Guides {
        vertical: vec![100.0],
        horizontal: vec![],
    }));
    renderer.set_temp_connection(Some(TempConnection {
        start: Point::new(0.0, 0.0),
        end: Point::new(30.0, 30.0),
    }));

    let _ = renderer.render(None, None);

    // One for the viewport transform, one per overlay.
    assert_eq!(ctx.count(|c| matches!(c, DrawCommand::Save)), 4);
    assert_eq!(ctx.save_depth(), 0);
    assert_eq!(ctx.max_save_depth(), 2);
    assert_eq!(ctx.count(|c| matches!(c, DrawCommand::StrokeRect { .. })), 1);
}

#[test]
fn test_render_data_overlays_take_precedence() {
    let (mut renderer, ctx, _scheduler) = setup();
    renderer.set_selection_box(Some(Rect::new(0.0, 0.0, 40.0, 40.0)));

    let data = RenderData {
        selection_box: Some(Rect::new(1.0, 2.0, 3.0, 4.0)),
        ..RenderData::default()
    };
    let _ = renderer.render(None, Some(&data));

    assert!(ctx
        .commands()
        .contains(&DrawCommand::StrokeRect {
            rect: Rect::new(1.0, 2.0, 3.0, 4.0)
        }));
    assert_eq!(ctx.count(|c| matches!(c, DrawCommand::StrokeRect { .. })), 1);
}
