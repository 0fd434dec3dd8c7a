//! Output device enumeration through cpal.
//!
//! Device ids are `"{host}:{name}"`. cpal offers no stable per-device
//! identifier on every host, so the id is rebuilt from the name when a
//! device is reopened.

use cpal::traits::{DeviceTrait, HostTrait};
use voicecast_core::{DeviceCatalog, DeviceDescriptor, VoiceError};

use crate::error::OutputError;

/// Lists the default host's output devices.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalDeviceCatalog;

impl DeviceCatalog for CpalDeviceCatalog {
    fn output_devices(&self) -> Result<Vec<DeviceDescriptor>, VoiceError> {
        let host = cpal::default_host();
        let devices = host.output_devices().map_err(OutputError::from)?;

        let listed: Vec<DeviceDescriptor> = devices
            .enumerate()
            .map(|(index, device)| {
                let name = device_name(&device);
                DeviceDescriptor {
                    index,
                    id: device_id(host.id().name(), &name),
                    name,
                }
            })
            .collect();

        tracing::debug!(host = host.id().name(), count = listed.len(), "Output devices enumerated");
        Ok(listed)
    }
}

fn device_name(device: &cpal::Device) -> String {
    device
        .name()
        .map(|name| name.trim().to_string())
        .unwrap_or_else(|_| "unknown device".to_string())
}

fn device_id(host: &str, name: &str) -> String {
    format!("{host}:{name}")
}

/// Reopen a previously enumerated device by id.
pub(crate) fn find_output_device(id: &str) -> Result<cpal::Device, OutputError> {
    let host = cpal::default_host();
    let host_name = host.id().name();
    host.output_devices()?
        .find(|device| device_id(host_name, &device_name(device)) == id)
        .ok_or_else(|| OutputError::NoDevice(id.to_string()))
}
