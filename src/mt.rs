//! MultitouchSupport backend (macOS only).
//!
//! Contact frames are routed to sinks through a process wide listener table
//! keyed by device pointer. Closing a subscription removes its route and frees
//! the sink, which a refcon pointer handed to the framework could not do
//! without leaking the boxed callback.

use core_foundation::array::{CFArrayGetCount, CFArrayGetValueAtIndex, CFArrayRef};
use core_foundation::base::{CFRelease, CFRetain, CFTypeRef};
use lazy_static::lazy_static;
use log::{debug, warn};
use std::{
    collections::HashMap,
    ffi::c_void,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::device::{Device, DeviceId, DeviceKind};
use crate::error::{Error, Result};
use crate::geometry::{TouchPhase, TouchSample};
use crate::source::{DeviceSource, FrameSink, Subscription};

#[link(name = "MultitouchSupport", kind = "framework")]
extern "C" {
    fn MTDeviceCreateList() -> CFArrayRef;
    fn MTRegisterContactFrameCallback(_: MTDeviceRef, _: MTContactCallbackFunction);
    fn MTUnregisterContactFrameCallback(_: MTDeviceRef, _: MTContactCallbackFunction);
    fn MTDeviceStart(_: MTDeviceRef, _: i32);
    fn MTDeviceStop(_: MTDeviceRef);
    fn MTDeviceIsBuiltIn(_: MTDeviceRef) -> bool;
    fn MTDeviceGetFamilyID(_: MTDeviceRef, _: *mut i32);
    fn MTDeviceGetDeviceID(_: MTDeviceRef, _: *mut u64);
    fn MTDeviceIsRunning(_: MTDeviceRef) -> bool;
    /// Divide x and y by 100 to get the value in centimeters
    fn MTDeviceGetSensorSurfaceDimensions(device: MTDeviceRef, x: *mut i32, y: *mut i32);
}

type MTDeviceRef = *mut c_void;
type MTContactCallbackFunction = extern "C" fn(MTDeviceRef, *const MTTouch, i32, f64, i32) -> i32;

#[derive(Debug, Copy, Clone)]
#[repr(C)]
struct MTPoint {
    x: f32,
    y: f32,
}

#[allow(dead_code)]
#[derive(Debug, Copy, Clone)]
#[repr(C)]
struct MTVector {
    pos: MTPoint,
    vel: MTPoint,
}

/// https://gist.github.com/rmhsilva/61cc45587ed34707da34818a76476e11
/// https://web.archive.org/web/20151012175118/http://steike.com/code/multitouch/
#[allow(dead_code)]
#[derive(Debug, Copy, Clone)]
#[repr(C)]
struct MTTouch {
    frame: i32,
    timestamp: f64,
    identifier: i32, // unique for the life of a touch
    state: i32,
    finger_id: i32,
    hand_id: i32,
    normalized: MTVector, // (0,0) to (1,1), origin bottom left
    z_total: f32,
    unknown3: i32,
    angle: f32, // radians
    major_axis: f32,
    minor_axis: f32,
    absolute: MTVector,
    unknown4: i32,
    unknown5: i32,
    z_density: f32,
}

/// Maps the driver's touch state machine onto touch phases.
fn phase(state: i32) -> TouchPhase {
    match state {
        1 | 2 | 6 => TouchPhase::Hovering, // start in range, hover, linger
        3 => TouchPhase::Began,            // make touch
        4 => TouchPhase::Moved,            // touching
        5 | 7 => TouchPhase::Ended,        // break touch, out of range
        _ => TouchPhase::Other,
    }
}

impl From<&MTTouch> for TouchSample {
    fn from(touch: &MTTouch) -> Self {
        TouchSample {
            x: touch.normalized.pos.x,
            y: touch.normalized.pos.y,
            axis_major: touch.major_axis,
            axis_minor: touch.minor_axis,
            angle: touch.angle,
            total: touch.z_total,
            id: Some(touch.identifier),
            phase: Some(phase(touch.state)),
        }
    }
}

lazy_static! {
    static ref LISTENERS: Mutex<HashMap<usize, FrameSink>> = Mutex::new(HashMap::new());
}

fn listeners() -> MutexGuard<'static, HashMap<usize, FrameSink>> {
    LISTENERS.lock().unwrap_or_else(PoisonError::into_inner)
}

extern "C" fn contact_frame(
    device: MTDeviceRef,
    data: *const MTTouch,
    fingers: i32,
    _timestamp: f64,
    _frame: i32,
) -> i32 {
    match catch_unwind(AssertUnwindSafe(|| {
        let sink = match listeners().get(&(device as usize)) {
            Some(sink) => sink.clone(),
            None => return,
        };
        // an empty frame means every finger lifted
        let touches = if data.is_null() || fingers <= 0 {
            &[][..]
        } else {
            unsafe { std::slice::from_raw_parts(data, fingers as usize) }
        };
        sink.deliver(touches.iter().map(TouchSample::from).collect());
    })) {
        Ok(_) => 0,
        Err(_) => -1,
    }
}

/// A retained MTDeviceRef.
struct DeviceHandle {
    inner: MTDeviceRef,
}

// The framework's device objects are CoreFoundation types and safe to use
// from any thread.
unsafe impl Send for DeviceHandle {}
unsafe impl Sync for DeviceHandle {}

impl DeviceHandle {
    fn retain(dev: MTDeviceRef) -> Self {
        unsafe { CFRetain(dev as CFTypeRef) };
        Self { inner: dev }
    }

    fn key(&self) -> usize {
        self.inner as usize
    }

    fn device_id(&self) -> DeviceId {
        let mut dev_id = 0;
        unsafe { MTDeviceGetDeviceID(self.inner, &mut dev_id) };
        dev_id
    }

    fn kind(&self) -> DeviceKind {
        let mut family_id = 0;
        unsafe { MTDeviceGetFamilyID(self.inner, &mut family_id) };
        DeviceKind::classify(unsafe { MTDeviceIsBuiltIn(self.inner) }, family_id)
    }

    /// Physical size of the sensor in centimeters as (x, y)
    fn sensor_surface_dimensions(&self) -> (f32, f32) {
        let (mut x, mut y) = (0, 0);
        unsafe { MTDeviceGetSensorSurfaceDimensions(self.inner, &mut x, &mut y) };
        (x as f32 / 100.0, y as f32 / 100.0)
    }
}

impl Drop for DeviceHandle {
    fn drop(&mut self) {
        unsafe { CFRelease(self.inner as CFTypeRef) }
    }
}

/// Devices exposed by the MultitouchSupport framework.
#[derive(Default)]
pub struct MultitouchSource {
    handles: Mutex<Vec<(Device, Arc<DeviceHandle>)>>,
}

impl MultitouchSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn enumerate() -> Vec<(Device, Arc<DeviceHandle>)> {
        let mut found = vec![];
        unsafe {
            let devices = MTDeviceCreateList();
            if devices.is_null() {
                warn!("MTDeviceCreateList returned no list");
                return found;
            }
            let count = CFArrayGetCount(devices);
            for idx in 0..count {
                let dev: MTDeviceRef = CFArrayGetValueAtIndex(devices, idx).cast_mut();
                let handle = DeviceHandle::retain(dev);
                let device = Device::with_kind_name(handle.device_id(), handle.kind());
                debug!(
                    "found {device}, surface {:?} cm",
                    handle.sensor_surface_dimensions()
                );
                found.push((device, Arc::new(handle)));
            }
            CFRelease(devices as CFTypeRef);
        }
        found
    }

    fn handle(&self, id: DeviceId) -> Option<Arc<DeviceHandle>> {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(device, _)| device.id == id)
            .map(|(_, handle)| Arc::clone(handle))
    }
}

impl DeviceSource for MultitouchSource {
    fn devices(&self) -> Vec<Device> {
        let found = Self::enumerate();
        let devices = found.iter().map(|(device, _)| device.clone()).collect();
        *self.handles.lock().unwrap_or_else(PoisonError::into_inner) = found;
        devices
    }

    fn subscribe(&self, device: &Device, sink: FrameSink) -> Result<Box<dyn Subscription>> {
        let refused = |reason: &str| Error::Subscribe {
            device: device.id,
            reason: reason.to_owned(),
        };
        let handle = self
            .handle(device.id)
            .ok_or_else(|| refused("device is not enumerated"))?;

        {
            let mut listeners = listeners();
            if listeners.contains_key(&handle.key()) {
                return Err(refused("already listening"));
            }
            listeners.insert(handle.key(), sink);
        }

        let running = unsafe {
            MTRegisterContactFrameCallback(handle.inner, contact_frame);
            MTDeviceStart(handle.inner, 0);
            MTDeviceIsRunning(handle.inner)
        };
        let subscription = Box::new(MultitouchSubscription { handle });
        if !running {
            subscription.close();
            return Err(refused("device did not start"));
        }
        Ok(subscription)
    }
}

struct MultitouchSubscription {
    handle: Arc<DeviceHandle>,
}

impl Subscription for MultitouchSubscription {
    fn close(self: Box<Self>) {
        // unroute first so frames racing with the stop find no sink
        listeners().remove(&self.handle.key());
        unsafe {
            MTUnregisterContactFrameCallback(self.handle.inner, contact_frame);
            MTDeviceStop(self.handle.inner);
        }
    }
}
