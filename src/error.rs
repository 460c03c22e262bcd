use crate::device::DeviceId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No device was selected and none could be enumerated
    #[error("no multitouch device available")]
    DeviceUnavailable,

    #[error("failed to subscribe to device {device}: {reason}")]
    Subscribe { device: DeviceId, reason: String },

    #[error("device {0} is not among the enumerated devices")]
    UnknownDevice(DeviceId),

    #[error("terminal grid of {columns}x{rows} cells is too large")]
    GridTooLarge { columns: usize, rows: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
