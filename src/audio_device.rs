use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, HostId};

fn get_host_from_id(host_id: HostId) -> Result<Host> {
    cpal::host_from_id(host_id).map_err(|e| anyhow::anyhow!("Failed to get audio host: {}", e))
}

pub fn default_host_id() -> HostId {
    cpal::default_host().id()
}

pub fn get_output_devices(host_id: HostId) -> Result<Vec<(String, Device)>> {
    let host = get_host_from_id(host_id)?;
    let devices = host.output_devices()?;
    let mut result = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            result.push((name, device));
        }
    }
    Ok(result)
}

/// Named output device, or the host default when `name` is `None`.
pub fn find_output_device(host_id: HostId, name: Option<&str>) -> Result<Device> {
    match name {
        Some(name) => get_output_devices(host_id)?
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, device)| device)
            .ok_or_else(|| anyhow::anyhow!("Output device not found: {}", name)),
        None => get_host_from_id(host_id)?
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("No default output device")),
    }
}

pub fn default_output_device_name(host_id: HostId) -> Option<String> {
    get_host_from_id(host_id)
        .ok()?
        .default_output_device()?
        .name()
        .ok()
}
