//! Diagnostic viewer core for multitouch trackpads: device enumeration, a
//! listening session that keeps the latest contact frame, and projection of
//! contacts into canvas-space ellipses.

pub mod config;
pub mod device;
pub mod error;
pub mod geometry;
#[cfg(target_os = "macos")]
pub mod mt;
pub mod render;
pub mod session;
pub mod source;

pub use config::ViewerConfig;
pub use device::{Device, DeviceId, DeviceKind, DeviceRegistry};
pub use error::{Error, Result};
pub use geometry::{
    project, project_all, CanvasSize, Point, ProjectedEllipse, TouchPhase, TouchSample,
};
#[cfg(target_os = "macos")]
pub use mt::MultitouchSource;
pub use render::TerminalCanvas;
pub use session::{SessionController, SessionState};
pub use source::{DeviceSource, FrameSink, ManualSource, Subscription};
