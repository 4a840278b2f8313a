//! Headless split layout simulation.
//!
//! Builds a window whose content area is split into side-by-side panes, binds
//! one hosted view to each pane's placeholder through a [`PortalRegistry`],
//! drains the turn queue and reports the portal's snapshot. An optional
//! pointer location is routed through the hit tester as well.

use std::rc::Rc;

use clap::Args;
use serde::Serialize;

use crate::cli::output::print_highlighted_json;
use crate::config::{self, PortalConfig};
use crate::error::{PortalError, PortalResult};
use crate::geometry::{Point, Rect};
use crate::platform::headless::{HeadlessHostedView, HeadlessWindow};
use crate::platform::turn::TurnQueue;
use crate::platform::{HostedView, SplitAxis, SplitDivider, TurnDispatcher, ViewNode};
use crate::portal::{HitTarget, PortalRegistry, PortalSnapshot};

/// Upper bound on turns drained per simulation.
const MAX_TURNS: usize = 32;

/// Width of the divider drawn between neighbouring panes.
const DIVIDER_WIDTH: f64 = 1.0;

/// Arguments of `surface-portal simulate`.
#[derive(Args, Debug, Clone)]
pub struct SimulateArgs {
    /// Number of side-by-side panes.
    #[arg(long, short, default_value_t = 2, value_parser = clap::value_parser!(u16).range(1..=64))]
    pub panes: u16,

    /// Window width.
    #[arg(long, default_value_t = 1200.0)]
    pub width: f64,

    /// Window height.
    #[arg(long, default_value_t = 800.0)]
    pub height: f64,

    /// Width of a sidebar to the left of the panes. The content area starts after it.
    #[arg(long, default_value_t = 0.0)]
    pub sidebar: f64,

    /// Backing scale factor.
    #[arg(long, default_value_t = 2.0)]
    pub scale: f64,

    /// Route a pointer at X,Y (window space) after the passes have run.
    #[arg(long, value_name = "X,Y", value_parser = parse_point)]
    pub hit: Option<Point>,

    /// Print plain JSON without highlighting.
    #[arg(long)]
    pub raw: bool,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            panes: 2,
            width: 1200.0,
            height: 800.0,
            sidebar: 0.0,
            scale: 2.0,
            hit: None,
            raw: false,
        }
    }
}

/// Outcome of a simulation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Turns that ran at least one task.
    pub turns: usize,
    pub snapshot: PortalSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit: Option<HitTarget>,
}

fn parse_point(value: &str) -> Result<Point, String> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y but got `{value}`"))?;
    let x: f64 = x.trim().parse().map_err(|err| format!("invalid X `{x}`: {err}"))?;
    let y: f64 = y.trim().parse().map_err(|err| format!("invalid Y `{y}`: {err}"))?;
    Ok(Point::new(x, y))
}

fn validate(args: &SimulateArgs) -> PortalResult<f64> {
    let dimensions = [args.width, args.height, args.scale];
    if dimensions.iter().any(|value| !value.is_finite() || *value <= 0.0) {
        return Err(PortalError::InvalidArguments(
            "--width, --height and --scale must be positive numbers".to_string(),
        ));
    }
    if !args.sidebar.is_finite() || args.sidebar < 0.0 || args.sidebar >= args.width {
        return Err(PortalError::InvalidArguments(
            "--sidebar must be at least 0 and narrower than the window".to_string(),
        ));
    }

    let panes = f64::from(args.panes);
    let pane_width = (args.width - args.sidebar - (panes - 1.0) * DIVIDER_WIDTH) / panes;
    if pane_width <= 0.0 {
        return Err(PortalError::InvalidArguments(format!(
            "{} panes do not fit in {} points",
            args.panes,
            args.width - args.sidebar
        )));
    }
    Ok(pane_width)
}

/// Runs one simulation with `config`.
///
/// # Errors
///
/// Returns [`PortalError::InvalidArguments`] when the layout does not fit and
/// [`PortalError::UnknownWindow`] if no portal was created.
pub fn run_simulation(args: &SimulateArgs, config: PortalConfig) -> PortalResult<SimulationReport> {
    let pane_width = validate(args)?;

    let queue = TurnQueue::new();
    let dispatcher: Rc<dyn TurnDispatcher> = Rc::new(queue.clone());
    let mut registry = PortalRegistry::new(dispatcher, config);

    let content_frame = Rect::new(args.sidebar, 0.0, args.width - args.sidebar, args.height);
    let window = HeadlessWindow::new(1, content_frame, args.scale);
    let content = window.content();

    let mut dividers = Vec::new();
    let mut hosted_views = Vec::new();
    for index in 0..args.panes {
        let x = f64::from(index) * (pane_width + DIVIDER_WIDTH);
        let is_last = index + 1 == args.panes;
        // A leading pane's placeholder extends under the divider that follows it.
        let width = if is_last { pane_width } else { pane_width + DIVIDER_WIDTH };
        let anchor = content.new_child(Rect::new(x, 0.0, width, args.height));
        let hosted = HeadlessHostedView::new();

        let hosted_dyn: Rc<dyn HostedView> = hosted.clone();
        let anchor_dyn: Rc<dyn ViewNode> = anchor;
        registry.bind(hosted_dyn, anchor_dyn, true, 0);
        hosted_views.push(hosted);

        if !is_last {
            dividers.push(SplitDivider {
                axis: SplitAxis::Horizontal,
                frame: Rect::new(args.sidebar + x + pane_width, 0.0, DIVIDER_WIDTH, args.height),
                leading_extent: pane_width,
                trailing_extent: pane_width,
            });
        }
    }
    window.set_split_dividers(dividers);

    let turns = queue.run_until_idle(MAX_TURNS);
    tracing::debug!(panes = args.panes, turns, "portal: simulation settled");

    let window_id = window.window_id();
    let snapshot = registry.snapshot(window_id)?;
    let hit = args.hit.map(|point| registry.hit_test(window_id, point, None));

    // The portal holds hosted views weakly.
    drop(hosted_views);

    Ok(SimulationReport { turns, snapshot, hit })
}

/// Execute `surface-portal simulate`.
///
/// # Errors
///
/// See [`run_simulation`].
pub fn execute(args: &SimulateArgs) -> PortalResult<()> {
    let report = run_simulation(args, config::get_config().clone())?;
    let value = serde_json::to_value(&report)?;
    if args.raw {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print_highlighted_json(&value);
    }
    Ok(())
}
