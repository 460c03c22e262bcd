use std::io::{self, Write};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use trackpad_view::{DeviceSource, SessionController, SessionState, TerminalCanvas, ViewerConfig};

#[cfg(target_os = "macos")]
fn platform_source() -> Result<Arc<dyn DeviceSource>> {
    Ok(Arc::new(trackpad_view::MultitouchSource::new()))
}

#[cfg(not(target_os = "macos"))]
fn platform_source() -> Result<Arc<dyn DeviceSource>> {
    anyhow::bail!("no multitouch backend is available on this platform")
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewerConfig::parse();
    let mut controller = SessionController::new(platform_source()?);

    if controller.list_devices().is_empty() {
        warn!("no multitouch devices found");
    }
    for device in controller.list_devices() {
        info!("{device} [{:?}]", device.kind);
    }

    if let Some(id) = config.device {
        controller.select_by_id(id)?;
    }
    controller.start().context("starting trackpad session")?;

    let (columns, rows) = config.grid();
    let mut grid = TerminalCanvas::new(columns, rows)?;
    info!(
        "projecting onto {}x{} canvas, {:?} grid",
        config.canvas.width,
        config.canvas.height,
        grid.dimensions()
    );

    let stdout = io::stdout();
    while let SessionState::Listening(device) = controller.state() {
        grid.paint(&controller.projected(config.canvas), config.canvas);
        let mut out = stdout.lock();
        write!(out, "\x1b[H\x1b[2J{device}\n{grid}")?;
        out.flush()?;
        drop(out);
        thread::sleep(config.interval());
    }

    warn!("session ended");
    Ok(())
}
