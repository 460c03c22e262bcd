use std::fmt;

use log::{debug, info};

/// Driver-assigned device identifier. Unique among the currently enumerated
/// devices, not stable across process restarts.
pub type DeviceId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Builtin Internal Trackpad
    InternalTrackpad,
    /// External Trackpad
    ExternalTrackpad,
    /// External Magic Mouse
    MagicMouse,
    Unknown(i32),
}

impl DeviceKind {
    /// Classifies a device from its builtin flag and driver family id.
    pub fn classify(builtin: bool, family_id: i32) -> Self {
        // Builtin trackpads report a family id that changes with every
        // hardware generation, so the builtin flag wins.
        if builtin {
            DeviceKind::InternalTrackpad
        } else if [112, 113].contains(&family_id) {
            DeviceKind::MagicMouse
        } else if (128..=130).contains(&family_id) {
            DeviceKind::ExternalTrackpad
        } else {
            DeviceKind::Unknown(family_id)
        }
    }

    pub fn label(&self) -> String {
        match self {
            DeviceKind::InternalTrackpad => "Internal Trackpad".to_owned(),
            DeviceKind::ExternalTrackpad => "External Trackpad".to_owned(),
            DeviceKind::MagicMouse => "Magic Mouse".to_owned(),
            DeviceKind::Unknown(family_id) => format!("Multitouch Device (family {family_id})"),
        }
    }
}

/// A physical touch source as reported by device enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    pub kind: DeviceKind,
}

impl Device {
    pub fn new(id: DeviceId, name: impl Into<String>, kind: DeviceKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    /// A device named after its kind, for drivers that expose no product name.
    pub fn with_kind_name(id: DeviceId, kind: DeviceKind) -> Self {
        Self::new(id, kind.label(), kind)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ID: {})", self.name, self.id)
    }
}

/// Enumerated devices plus the active selection. Holds no session state.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    current: Option<Device>,
}

impl DeviceRegistry {
    pub fn new(devices: Vec<Device>) -> Self {
        debug!("registry created with {} device(s)", devices.len());
        Self {
            devices,
            current: None,
        }
    }

    pub fn list_devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn current_device(&self) -> Option<&Device> {
        self.current.as_ref()
    }

    pub fn select(&mut self, device: Device) {
        info!("selected {device}");
        self.current = Some(device);
    }

    pub fn find(&self, id: DeviceId) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Replaces the enumerated list. A selection that vanished is dropped.
    pub fn refresh(&mut self, devices: Vec<Device>) {
        if let Some(current) = &self.current {
            if !devices.contains(current) {
                info!("{current} is no longer enumerated, clearing selection");
                self.current = None;
            }
        }
        debug!("registry refreshed with {} device(s)", devices.len());
        self.devices = devices;
    }

    /// The selected device, falling back to the first enumerated one.
    pub fn resolve(&self) -> Option<&Device> {
        self.current.as_ref().or_else(|| self.devices.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trackpads() -> Vec<Device> {
        vec![
            Device::with_kind_name(1, DeviceKind::InternalTrackpad),
            Device::with_kind_name(2, DeviceKind::ExternalTrackpad),
        ]
    }

    #[test]
    fn classify_family_ids() {
        assert_eq!(DeviceKind::classify(true, 113), DeviceKind::InternalTrackpad);
        assert_eq!(DeviceKind::classify(false, 112), DeviceKind::MagicMouse);
        assert_eq!(DeviceKind::classify(false, 129), DeviceKind::ExternalTrackpad);
        assert_eq!(DeviceKind::classify(false, 98), DeviceKind::Unknown(98));
    }

    #[test]
    fn display_matches_picker_label() {
        let device = Device::with_kind_name(42, DeviceKind::MagicMouse);
        assert_eq!(device.to_string(), "Magic Mouse (ID: 42)");
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = DeviceRegistry::new(vec![]);
        assert!(registry.list_devices().is_empty());
        assert!(registry.current_device().is_none());
        assert!(registry.resolve().is_none());
    }

    #[test]
    fn resolve_prefers_selection_over_first() {
        let mut registry = DeviceRegistry::new(trackpads());
        assert_eq!(registry.resolve().map(|d| d.id), Some(1));

        let second = registry.find(2).cloned().unwrap();
        registry.select(second.clone());
        assert_eq!(registry.current_device(), Some(&second));
        assert_eq!(registry.resolve(), Some(&second));
    }

    #[test]
    fn refresh_drops_vanished_selection() {
        let mut registry = DeviceRegistry::new(trackpads());
        registry.select(trackpads()[1].clone());

        registry.refresh(trackpads());
        assert_eq!(registry.current_device().map(|d| d.id), Some(2));

        registry.refresh(vec![trackpads()[0].clone()]);
        assert!(registry.current_device().is_none());
        assert_eq!(registry.resolve().map(|d| d.id), Some(1));
    }
}
