//! Robot device implementations

pub mod mock;

use crate::config::DeviceConfig;
use crate::core::driver::Device;
use crate::error::{Error, Result};

/// Create the device named by `config.device_type`
pub fn create_device(config: &DeviceConfig) -> Result<Device> {
    match config.device_type.as_str() {
        "mock" => {
            let (device, _inspector) = mock::create_mock_device(config)?;
            Ok(device)
        }
        other => Err(Error::UnknownDevice(other.to_string())),
    }
}
