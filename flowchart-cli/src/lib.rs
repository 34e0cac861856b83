//! # Flowchart CLI
//!
//! Validate, inspect and headlessly render flowchart documents.
//!
//! ## Architecture
//!
//! - `CliArgs` / `Command` - command-line arguments parsed with clap
//! - [`validate_file`], [`inspect_document`], [`render_document`] - one
//!   function per subcommand, returning serializable summaries
//! - [`shapes`] - minimal node and edge drawables for the headless renderer

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod shapes;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use flowchart_core::{
    validate, Document, FlowchartData, Rect, Size, ValidationReport, ViewportPatch,
};
use flowchart_renderer::{
    FrameOutcome, ManualScheduler, RecordingContext, RenderLayer, RenderObject, RendererConfig,
    SceneRenderer,
};
use serde::Serialize;

use crate::shapes::{EdgeShape, NodeShape};

/// Command-line arguments for `flowchart`.
#[derive(Debug, Clone, Parser)]
#[command(name = "flowchart")]
#[command(about = "Validate, inspect and render flowchart documents")]
#[command(version)]
pub struct CliArgs {
    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check a document's referential integrity; exits non-zero if invalid.
    Validate {
        /// Document to check.
        file: PathBuf,
    },
    /// Print node, edge and metadata statistics.
    Inspect {
        /// Document to inspect.
        file: PathBuf,
    },
    /// Render a document headlessly and report the frame.
    Render(RenderArgs),
}

/// Arguments for `flowchart render`.
#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// Document to render.
    pub file: PathBuf,

    /// Canvas width in logical pixels
    #[arg(long, env = "FLOWCHART_WIDTH", default_value = "1280")]
    pub width: u32,

    /// Canvas height in logical pixels
    #[arg(long, env = "FLOWCHART_HEIGHT", default_value = "720")]
    pub height: u32,

    /// Device pixel ratio
    #[arg(long, env = "FLOWCHART_PIXEL_RATIO", default_value = "1.0")]
    pub pixel_ratio: f64,

    /// Do not draw the background grid
    #[arg(long, env = "FLOWCHART_NO_GRID")]
    pub no_grid: bool,

    /// Screen padding around the content when fitting the view
    #[arg(long, default_value = "40")]
    pub padding: f64,

    /// Write the recorded draw calls to this file as JSON
    #[arg(long)]
    pub draw_log: Option<PathBuf>,
}

/// Read a file as a raw document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a flowchart
/// document.
pub fn read_data(path: &Path) -> anyhow::Result<FlowchartData> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid flowchart data in {}", path.display()))
}

/// Read and import a document; integrity is enforced.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the import is rejected.
pub fn load_document(path: &Path) -> anyhow::Result<Document> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut doc = Document::new();
    doc.import_data(&json)
        .with_context(|| format!("Failed to import {}", path.display()))?;
    Ok(doc)
}

/// Integrity audit of a file, without rejecting invalid documents.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn validate_file(path: &Path) -> anyhow::Result<ValidationReport> {
    let data = read_data(path)?;
    let report = validate(&data.nodes, &data.edges);
    tracing::debug!(
        file = %path.display(),
        valid = report.valid,
        issues = report.errors.len(),
        "validated"
    );
    Ok(report)
}

/// Document statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Node count.
    pub nodes: usize,
    /// Edge count.
    pub edges: usize,
    /// Nodes per `type`.
    pub node_kinds: BTreeMap<String, usize>,
    /// Edges per `type`.
    pub edge_kinds: BTreeMap<String, usize>,
    /// Union of node rectangles.
    pub content_bounds: Option<Rect>,
    /// Format version.
    pub version: String,
    /// Creation time, ms since epoch.
    pub created_at: u64,
    /// Last modification time, ms since epoch.
    pub updated_at: u64,
}

/// Collect statistics for a loaded document.
#[must_use]
pub fn inspect_document(doc: &Document) -> Summary {
    let mut node_kinds = BTreeMap::new();
    for node in doc.nodes() {
        *node_kinds.entry(node.kind.clone()).or_insert(0) += 1;
    }
    let mut edge_kinds = BTreeMap::new();
    for edge in doc.edges() {
        *edge_kinds.entry(edge.kind.clone()).or_insert(0) += 1;
    }
    let metadata = doc.metadata();
    Summary {
        nodes: doc.nodes().len(),
        edges: doc.edges().len(),
        node_kinds,
        edge_kinds,
        content_bounds: doc.content_bounds(),
        version: metadata.version.clone(),
        created_at: metadata.created_at,
        updated_at: metadata.updated_at,
    }
}

/// Settings for a headless render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    /// Logical canvas size.
    pub size: Size,
    /// Device pixel ratio.
    pub pixel_ratio: f64,
    /// Draw the grid.
    pub show_grid: bool,
    /// Fit padding in screen pixels.
    pub padding: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            size: Size::new(1280.0, 720.0),
            pixel_ratio: 1.0,
            show_grid: true,
            padding: 40.0,
        }
    }
}

impl From<&RenderArgs> for RenderSettings {
    fn from(args: &RenderArgs) -> Self {
        Self {
            size: Size::new(f64::from(args.width), f64::from(args.height)),
            pixel_ratio: args.pixel_ratio,
            show_grid: !args.no_grid,
            padding: args.padding,
        }
    }
}

/// What a headless render produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSummary {
    /// Drawables painted.
    pub painted: usize,
    /// Drawables skipped as off screen.
    pub culled: usize,
    /// Failure messages, one per failed drawable.
    pub failures: Vec<String>,
    /// Damage area of the frame.
    pub damage: Option<Rect>,
    /// Scale after fitting.
    pub scale: f64,
    /// Recorded draw calls.
    pub draw_calls: usize,
}

/// Register every node and edge, fit the view and paint one frame.
///
/// Returns the summary and the recording surface for further inspection.
///
/// # Errors
///
/// Returns an error if the surface cannot be sized or no frame is painted.
pub fn render_document(
    doc: &Document,
    settings: &RenderSettings,
) -> anyhow::Result<(RenderSummary, RecordingContext)> {
    let ctx = RecordingContext::new(1, 1);
    let scheduler = ManualScheduler::new();
    let config = RendererConfig {
        show_grid: settings.show_grid,
        pixel_ratio: settings.pixel_ratio,
        background_color: Some("#fafafa".to_string()),
        ..RendererConfig::default()
    };
    let mut renderer = SceneRenderer::new(
        Box::new(ctx.clone()),
        Box::new(scheduler.clone()),
        config,
    );
    renderer.set_size(settings.size)?;

    if let Some(bounds) = doc.content_bounds() {
        let mut fitted = *renderer.viewport();
        fitted.fit_to(&bounds, settings.padding);
        renderer.set_viewport(&ViewportPatch {
            scale: Some(fitted.scale),
            offset: Some(fitted.offset),
            size: None,
        });
    }

    for (i, edge) in doc.edges().iter().enumerate() {
        if let Some(shape) = EdgeShape::new(doc, edge) {
            let bounds = shape.bounds();
            renderer.add_render_object(
                format!("edge:{}", edge.id),
                RenderObject::new(RenderLayer::Edges, shape)
                    .with_priority(i32::try_from(i).unwrap_or(i32::MAX))
                    .with_bounds(bounds),
            );
        }
    }
    for (i, node) in doc.nodes().iter().enumerate() {
        let shape = NodeShape::new(node.clone());
        let bounds = shape.bounds();
        renderer.add_render_object(
            format!("node:{}", node.id),
            RenderObject::new(RenderLayer::Nodes, shape)
                .with_priority(i32::try_from(i).unwrap_or(i32::MAX))
                .with_bounds(bounds),
        );
    }

    if scheduler.take_frame().is_none() {
        anyhow::bail!("no frame was requested");
    }
    let report = match renderer.on_animation_frame() {
        Some(FrameOutcome::Painted(report)) => report,
        Some(other) => anyhow::bail!("frame not painted: {other:?}"),
        None => anyhow::bail!("frame fired with nothing to paint"),
    };

    let summary = RenderSummary {
        painted: report.painted,
        culled: report.culled,
        failures: report.failures.iter().map(ToString::to_string).collect(),
        damage: report.damage,
        scale: renderer.viewport().scale,
        draw_calls: ctx.len(),
    };
    tracing::info!(
        painted = summary.painted,
        failures = summary.failures.len(),
        draw_calls = summary.draw_calls,
        "rendered"
    );
    renderer.destroy();
    Ok((summary, ctx))
}
