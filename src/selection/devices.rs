//! Device filtering and cyclic switching.

use crate::capture::{CameraDevice, FacingMode};

/// Returns the devices that may serve `facing_mode`, in enumeration order.
///
/// Devices that report no capability set are kept.
pub fn devices_for_facing_mode(
    devices: &[CameraDevice],
    facing_mode: FacingMode,
) -> Vec<&CameraDevice> {
    devices
        .iter()
        .filter(|device| device.supports_facing_mode(facing_mode))
        .collect()
}

/// Returns the device after `current` in `devices`, wrapping around.
///
/// `None` means no distinct device is available: `current` is unknown,
/// or it is the only entry.
pub fn next_device_id<'a>(devices: &[&'a CameraDevice], current: &str) -> Option<&'a str> {
    let index = devices.iter().position(|d| d.device_id == current)?;
    let next = devices.get((index + 1) % devices.len())?;
    if next.device_id == current {
        return None;
    }
    Some(next.device_id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::DeviceCapabilities;
    use proptest::prelude::*;

    fn facing(id: &str, modes: &[FacingMode]) -> CameraDevice {
        CameraDevice::new(id).with_capabilities(DeviceCapabilities {
            facing_modes: modes.to_vec(),
            ..Default::default()
        })
    }

    #[test]
    fn test_filter_keeps_order_and_unknowns() {
        let devices = vec![
            facing("rear-wide", &[FacingMode::Environment]),
            CameraDevice::new("usb"),
            facing("front", &[FacingMode::User]),
            facing("rear-tele", &[FacingMode::Environment]),
        ];

        let rear: Vec<_> = devices_for_facing_mode(&devices, FacingMode::Environment)
            .iter()
            .map(|d| d.device_id.as_str())
            .collect();
        assert_eq!(rear, vec!["rear-wide", "usb", "rear-tele"]);

        let front: Vec<_> = devices_for_facing_mode(&devices, FacingMode::User)
            .iter()
            .map(|d| d.device_id.as_str())
            .collect();
        assert_eq!(front, vec!["usb", "front"]);
    }

    #[test]
    fn test_next_device_cycles() {
        let devices = vec![
            CameraDevice::new("a"),
            CameraDevice::new("b"),
            CameraDevice::new("c"),
        ];
        let refs: Vec<_> = devices.iter().collect();

        assert_eq!(next_device_id(&refs, "b"), Some("c"));
        assert_eq!(next_device_id(&refs, "c"), Some("a"));
    }

    #[test]
    fn test_next_device_single_entry() {
        let devices = vec![CameraDevice::new("only")];
        let refs: Vec<_> = devices.iter().collect();
        assert_eq!(next_device_id(&refs, "only"), None);
    }

    #[test]
    fn test_next_device_unknown_current() {
        let devices = vec![CameraDevice::new("a"), CameraDevice::new("b")];
        let refs: Vec<_> = devices.iter().collect();
        assert_eq!(next_device_id(&refs, "gone"), None);
        assert_eq!(next_device_id(&[], "a"), None);
    }

    proptest! {
        #[test]
        fn prop_next_device_visits_all(count in 2usize..8, start in 0usize..8) {
            let devices: Vec<_> = (0..count).map(|i| CameraDevice::new(format!("cam-{i}"))).collect();
            let refs: Vec<_> = devices.iter().collect();
            let start = start % count;

            let mut current = devices[start].device_id.clone();
            let mut seen = std::collections::HashSet::new();
            for _ in 0..count {
                seen.insert(current.clone());
                current = next_device_id(&refs, &current).unwrap().to_string();
            }
            prop_assert_eq!(seen.len(), count);
            prop_assert_eq!(current, devices[start].device_id.clone());
        }
    }
}
