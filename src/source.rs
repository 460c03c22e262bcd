//! The seam between the session and whatever produces touch frames.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::device::{Device, DeviceId};
use crate::error::{Error, Result};
use crate::geometry::TouchSample;
use crate::session::LatestBatch;

/// A driver that can enumerate devices and stream their contact frames.
pub trait DeviceSource: Send + Sync {
    /// Currently enumerable devices. Enumeration failures yield an empty list.
    fn devices(&self) -> Vec<Device>;

    /// Starts streaming frames from `device` into `sink` until the returned
    /// subscription is closed.
    fn subscribe(&self, device: &Device, sink: FrameSink) -> Result<Box<dyn Subscription>>;
}

pub trait Subscription: Send + Sync {
    /// Tears the stream down. Once this returns the source must not call into
    /// the sink again.
    fn close(self: Box<Self>);
}

/// Write half of a session, handed to the source on subscribe.
///
/// Every sink is bound to the session generation it was created for. Frames
/// delivered through a sink from an ended session are dropped.
#[derive(Clone)]
pub struct FrameSink {
    cell: Arc<LatestBatch>,
    generation: u64,
}

impl FrameSink {
    pub(crate) fn new(cell: Arc<LatestBatch>, generation: u64) -> Self {
        Self { cell, generation }
    }

    /// Replaces the latest batch. Returns false if the session has ended.
    pub fn deliver(&self, batch: Vec<TouchSample>) -> bool {
        let accepted = self.cell.store(self.generation, Arc::from(batch));
        if !accepted {
            debug!("dropped frame for ended session {}", self.generation);
        }
        accepted
    }

    /// Signals that the device went away. The session ends and its batch is cleared.
    pub fn disconnect(&self) {
        if self.cell.end(self.generation) {
            warn!("device disconnected, session {} ended", self.generation);
        }
    }

    pub fn is_live(&self) -> bool {
        self.cell.is_live(self.generation)
    }
}

#[derive(Default)]
struct ManualInner {
    devices: Vec<Device>,
    listeners: HashMap<u64, (DeviceId, FrameSink)>,
    next_token: u64,
    refuse: bool,
}

/// A source driven by hand: frames are pushed by the caller instead of a
/// driver. Useful for replaying recorded traces and for tests.
#[derive(Clone, Default)]
pub struct ManualSource {
    inner: Arc<Mutex<ManualInner>>,
}

impl ManualSource {
    pub fn new(devices: Vec<Device>) -> Self {
        let source = Self::default();
        source.lock().devices = devices;
        source
    }

    fn lock(&self) -> MutexGuard<'_, ManualInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_devices(&self, devices: Vec<Device>) {
        self.lock().devices = devices;
    }

    /// Makes subsequent subscribe calls fail.
    pub fn refuse_subscriptions(&self, refuse: bool) {
        self.lock().refuse = refuse;
    }

    /// Sinks currently subscribed to `device`.
    pub fn sinks(&self, device: DeviceId) -> Vec<FrameSink> {
        self.lock()
            .listeners
            .values()
            .filter(|(id, _)| *id == device)
            .map(|(_, sink)| sink.clone())
            .collect()
    }

    pub fn is_subscribed(&self, device: DeviceId) -> bool {
        !self.sinks(device).is_empty()
    }

    /// Delivers `batch` to every subscriber of `device`, returning how many accepted it.
    pub fn push(&self, device: DeviceId, batch: Vec<TouchSample>) -> usize {
        self.sinks(device)
            .into_iter()
            .filter(|sink| sink.deliver(batch.clone()))
            .count()
    }

    /// Signals disconnect to every subscriber of `device` and forgets them.
    pub fn disconnect(&self, device: DeviceId) {
        let mut sinks = vec![];
        self.lock().listeners.retain(|_, (id, sink)| {
            if *id == device {
                sinks.push(sink.clone());
            }
            *id != device
        });
        sinks.iter().for_each(FrameSink::disconnect);
    }
}

impl DeviceSource for ManualSource {
    fn devices(&self) -> Vec<Device> {
        self.lock().devices.clone()
    }

    fn subscribe(&self, device: &Device, sink: FrameSink) -> Result<Box<dyn Subscription>> {
        let mut inner = self.lock();
        if inner.refuse {
            return Err(Error::Subscribe {
                device: device.id,
                reason: "subscriptions refused".to_owned(),
            });
        }
        let token = inner.next_token;
        inner.next_token += 1;
        inner.listeners.insert(token, (device.id, sink));
        Ok(Box::new(ManualSubscription {
            inner: Arc::clone(&self.inner),
            token,
        }))
    }
}

struct ManualSubscription {
    inner: Arc<Mutex<ManualInner>>,
    token: u64,
}

impl Subscription for ManualSubscription {
    fn close(self: Box<Self>) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .remove(&self.token);
    }
}
