use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::device::{Device, DeviceId, DeviceRegistry};
use crate::error::{Error, Result};
use crate::geometry::{project_all, CanvasSize, ProjectedEllipse, TouchSample};
use crate::source::{DeviceSource, FrameSink, Subscription};

fn empty_batch() -> Arc<[TouchSample]> {
    Arc::from(Vec::new())
}

struct Slot {
    generation: u64,
    live: bool,
    batch: Arc<[TouchSample]>,
}

/// Single-slot "latest value" cell shared between the source callback and
/// readers. Batches are swapped in whole, so a reader sees either the previous
/// or the newest complete batch. Each session owns one generation; writes
/// tagged with any other generation are rejected.
pub(crate) struct LatestBatch {
    slot: Mutex<Slot>,
}

impl LatestBatch {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                generation: 0,
                live: false,
                batch: empty_batch(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        // the slot holds plain data, a panicking writer cannot leave it torn
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Begins a new session and returns its generation.
    pub(crate) fn open(&self) -> u64 {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.live = true;
        slot.batch = empty_batch();
        slot.generation
    }

    /// Ends whatever session is current.
    pub(crate) fn close(&self) {
        let mut slot = self.lock();
        slot.generation += 1;
        slot.live = false;
        slot.batch = empty_batch();
    }

    pub(crate) fn store(&self, generation: u64, batch: Arc<[TouchSample]>) -> bool {
        let mut slot = self.lock();
        if !slot.live || slot.generation != generation {
            return false;
        }
        slot.batch = batch;
        true
    }

    /// Ends the session `generation` if it is still current.
    pub(crate) fn end(&self, generation: u64) -> bool {
        let mut slot = self.lock();
        if !slot.live || slot.generation != generation {
            return false;
        }
        slot.live = false;
        slot.batch = empty_batch();
        true
    }

    pub(crate) fn is_live(&self, generation: u64) -> bool {
        let slot = self.lock();
        slot.live && slot.generation == generation
    }

    pub(crate) fn snapshot(&self) -> Arc<[TouchSample]> {
        let slot = self.lock();
        if slot.live {
            Arc::clone(&slot.batch)
        } else {
            empty_batch()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening(Device),
}

struct Session {
    device: Device,
    generation: u64,
    subscription: Box<dyn Subscription>,
}

/// Owns the listening session against the selected device and exposes the
/// latest received batch for polling.
pub struct SessionController {
    source: Arc<dyn DeviceSource>,
    registry: DeviceRegistry,
    cell: Arc<LatestBatch>,
    session: Option<Session>,
}

impl SessionController {
    /// Creates an idle controller, enumerating the source's devices once.
    pub fn new(source: Arc<dyn DeviceSource>) -> Self {
        let registry = DeviceRegistry::new(source.devices());
        Self {
            source,
            registry,
            cell: Arc::new(LatestBatch::new()),
            session: None,
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn list_devices(&self) -> &[Device] {
        self.registry.list_devices()
    }

    pub fn current_device(&self) -> Option<&Device> {
        self.registry.current_device()
    }

    /// Re-enumerates devices from the source.
    pub fn refresh_devices(&mut self) {
        let devices = self.source.devices();
        self.registry.refresh(devices);
    }

    /// Selects `device`. A session listening on another device is moved over to it.
    pub fn select(&mut self, device: Device) -> Result<()> {
        let relisten = matches!(self.state(), SessionState::Listening(ref d) if *d != device);
        self.registry.select(device);
        if relisten {
            self.start()
        } else {
            Ok(())
        }
    }

    pub fn select_by_id(&mut self, id: DeviceId) -> Result<()> {
        let device = self
            .registry
            .find(id)
            .cloned()
            .ok_or(Error::UnknownDevice(id))?;
        self.select(device)
    }

    pub fn state(&self) -> SessionState {
        match &self.session {
            Some(session) if self.cell.is_live(session.generation) => {
                SessionState::Listening(session.device.clone())
            }
            _ => SessionState::Idle,
        }
    }

    pub fn is_listening(&self) -> bool {
        matches!(self.state(), SessionState::Listening(_))
    }

    /// Starts listening on the selected device, or the first enumerated one.
    ///
    /// Already listening on that device is a no-op; listening on another
    /// device stops that session before the new subscription opens.
    pub fn start(&mut self) -> Result<()> {
        let device = self
            .registry
            .resolve()
            .cloned()
            .ok_or(Error::DeviceUnavailable)?;

        if let SessionState::Listening(current) = self.state() {
            if current == device {
                debug!("already listening on {device}");
                return Ok(());
            }
        }
        self.stop();

        let generation = self.cell.open();
        let sink = FrameSink::new(Arc::clone(&self.cell), generation);
        let subscription = match self.source.subscribe(&device, sink) {
            Ok(subscription) => subscription,
            Err(e) => {
                self.cell.close();
                warn!("could not start session on {device}: {e}");
                return Err(e);
            }
        };

        info!("listening on {device}");
        self.session = Some(Session {
            device,
            generation,
            subscription,
        });
        Ok(())
    }

    /// Stops the session and clears the latest batch. No-op when idle.
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            session.subscription.close();
            self.cell.close();
            info!("stopped listening on {}", session.device);
        }
    }

    /// The most recent batch in delivery order; empty when idle.
    pub fn latest_batch(&self) -> Arc<[TouchSample]> {
        self.cell.snapshot()
    }

    /// The latest batch projected onto `canvas`, in paint order.
    pub fn projected(&self, canvas: CanvasSize) -> Vec<ProjectedEllipse> {
        project_all(&self.latest_batch(), canvas)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}
