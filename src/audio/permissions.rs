use cpal::traits::{DeviceTrait, HostTrait};
use log::{info, warn};

/// Asks the host platform for microphone access.
pub trait PermissionGate: Send + Sync {
    fn request_microphone(&self) -> bool;
}

/// Desktop hosts have no prompt; access counts as granted when an input device
/// can be opened.
pub struct DevicePermissionGate;

impl PermissionGate for DevicePermissionGate {
    fn request_microphone(&self) -> bool {
        match cpal::default_host().default_input_device() {
            Some(device) => {
                let name = device.name().unwrap_or_else(|_| "unknown".to_string());
                info!("Microphone available: {name}");
                true
            }
            None => {
                warn!("No microphone available; recording is not permitted");
                false
            }
        }
    }
}
