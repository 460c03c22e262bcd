use std::time::Duration;

use clap::Parser;

use crate::device::DeviceId;
use crate::geometry::CanvasSize;

pub const DEVICE_VAR: &str = "TRACKPAD_VIEW_DEVICE";
pub const CANVAS_VAR: &str = "TRACKPAD_VIEW_CANVAS";
pub const COLUMNS_VAR: &str = "TRACKPAD_VIEW_COLUMNS";
pub const ROWS_VAR: &str = "TRACKPAD_VIEW_ROWS";
pub const INTERVAL_VAR: &str = "TRACKPAD_VIEW_INTERVAL_MS";

/// Largest terminal grid side accepted from the command line or environment.
pub const MAX_GRID_SIDE: u16 = 1000;

/// Settings for the diagnostic viewer.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "trackpad-view")]
#[command(about = "Live view of multitouch trackpad contacts", long_about = None)]
pub struct ViewerConfig {
    /// Device to listen on; the first enumerated device when unset
    #[arg(short, long, env = DEVICE_VAR)]
    pub device: Option<DeviceId>,

    /// Logical canvas the samples are projected onto, as WIDTHxHEIGHT
    #[arg(long, env = CANVAS_VAR, default_value = "600x400", value_parser = parse_canvas)]
    pub canvas: CanvasSize,

    /// Terminal grid columns
    #[arg(long, env = COLUMNS_VAR, default_value_t = 60,
          value_parser = clap::value_parser!(u16).range(1..=MAX_GRID_SIDE as i64))]
    pub columns: u16,

    /// Terminal grid rows
    #[arg(long, env = ROWS_VAR, default_value_t = 20,
          value_parser = clap::value_parser!(u16).range(1..=MAX_GRID_SIDE as i64))]
    pub rows: u16,

    /// Redraw poll interval in milliseconds
    #[arg(long = "interval-ms", env = INTERVAL_VAR, default_value_t = 50,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            device: None,
            canvas: CanvasSize::default(),
            columns: 60,
            rows: 20,
            interval_ms: 50,
        }
    }
}

impl ViewerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Grid size as (columns, rows).
    pub fn grid(&self) -> (usize, usize) {
        (usize::from(self.columns), usize::from(self.rows))
    }
}

/// Parses `WIDTHxHEIGHT`.
fn parse_canvas(v: &str) -> Result<CanvasSize, String> {
    let (w, h) = v
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_owned())?;
    let width: f64 = w.trim().parse().map_err(|e| format!("width: {e}"))?;
    let height: f64 = h.trim().parse().map_err(|e| format!("height: {e}"))?;
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err("canvas dimensions must be positive".to_owned());
    }
    Ok(CanvasSize::new(width, height))
}
