/// HID transport for the pump.
///
/// The session only needs two things from the transport: a way to open a
/// handle and a fixed-size block write. Both are traits so the session can
/// be driven without hardware.
use hidapi::{HidApi, HidDevice};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{GalahadError, Result};

use super::profile::{DeviceProfile, PumpModel, GALAHAD_PIDS, GALAHAD_VID};
use super::protocol::Packet;
use super::validate::{accepts_endpoint, Endpoint};

/// An open handle that accepts whole frames.
pub trait Transport {
    /// Write one frame. The pump sends no acknowledgement.
    fn write(&mut self, packet: &Packet) -> Result<()>;

    /// Product id of the opened device, if known.
    fn product_id(&self) -> Option<u16> {
        None
    }
}

/// Acquires a [`Transport`] handle.
pub trait Connector {
    type Transport: Transport;

    fn open(&self) -> Result<Self::Transport>;
}

/// Information about a discovered pump endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct PumpDeviceInfo {
    /// USB Product ID.
    pub pid: u16,
    /// Product name reported by the device (may be empty).
    pub product: String,
    pub endpoint: Endpoint,
}

/// Handle to an open Galahad II lighting endpoint.
///
/// Holds both the `HidApi` (keeps the library alive) and the open
/// `HidDevice`. The device is closed on drop.
pub struct HidTransport {
    device: HidDevice,
    _api: HidApi,
    info: PumpDeviceInfo,
}

impl HidTransport {
    /// Information about the connected device.
    #[must_use]
    pub fn info(&self) -> &PumpDeviceInfo {
        &self.info
    }
}

impl Transport for HidTransport {
    fn write(&mut self, packet: &Packet) -> Result<()> {
        let _ = self
            .device
            .write(packet)
            .map_err(|e| GalahadError::TransportWrite(format!("HID write failed: {e}")))?;
        Ok(())
    }

    fn product_id(&self) -> Option<u16> {
        Some(self.info.pid)
    }
}

/// Opens the first pump endpoint that passes the endpoint predicate.
#[derive(Debug, Clone, Copy)]
pub struct HidConnector {
    /// Restrict discovery to one model; `None` tries every known product id.
    pub model: Option<PumpModel>,
    /// Total LEDs used for the generic profile of unknown products.
    pub led_count: u8,
}

impl HidConnector {
    #[must_use]
    pub const fn new(model: Option<PumpModel>, led_count: u8) -> Self {
        Self { model, led_count }
    }

    fn wanted_pids(&self) -> Vec<u16> {
        self.model
            .map_or_else(|| GALAHAD_PIDS.to_vec(), |m| vec![m.pid()])
    }

    fn profile_for(&self, pid: u16) -> DeviceProfile {
        self.model
            .map(PumpModel::profile)
            .or_else(|| DeviceProfile::for_pid(pid))
            .unwrap_or_else(|| DeviceProfile::generic(self.led_count))
    }
}

impl Connector for HidConnector {
    type Transport = HidTransport;

    fn open(&self) -> Result<HidTransport> {
        let api = HidApi::new().map_err(|e| GalahadError::TransportOpen(e.to_string()))?;
        let pids = self.wanted_pids();

        let candidate = api
            .device_list()
            .filter(|d| d.vendor_id() == GALAHAD_VID && pids.contains(&d.product_id()))
            .find(|d| {
                let endpoint = Endpoint::from(*d);
                let accepted = accepts_endpoint(&self.profile_for(d.product_id()), &endpoint);
                debug!(
                    pid = %format!("0x{:04X}", d.product_id()),
                    interface = endpoint.interface,
                    usage_page = %format!("0x{:04X}", endpoint.usage_page),
                    accepted,
                    "endpoint validation"
                );
                accepted
            })
            .cloned();

        let Some(candidate) = candidate else {
            return Err(GalahadError::TransportOpen(format!(
                "No Galahad II endpoint found. Checked PIDs: [{}]",
                pids.iter()
                    .map(|p| format!("0x{p:04X}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            )));
        };

        let device = candidate
            .open_device(&api)
            .map_err(|e| GalahadError::TransportOpen(e.to_string()))?;
        let product = device
            .get_product_string()
            .ok()
            .flatten()
            .unwrap_or_default();

        let info = PumpDeviceInfo {
            pid: candidate.product_id(),
            product,
            endpoint: Endpoint::from(&candidate),
        };
        info!(?info, "opened pump endpoint");

        Ok(HidTransport {
            device,
            _api: api,
            info,
        })
    }
}

/// One vendor HID endpoint as seen during detection.
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredEndpoint {
    pub pid: u16,
    pub product: String,
    pub path: String,
    pub endpoint: Endpoint,
    /// Known model for this product id, if any.
    pub model: Option<PumpModel>,
    /// Verdict of the endpoint predicate for this product's profile.
    pub accepted: bool,
}

/// Enumerate every HID endpoint with the Lian Li vendor id.
pub fn list_endpoints(led_count: u8) -> Result<Vec<DiscoveredEndpoint>> {
    let api = HidApi::new()?;
    let connector = HidConnector::new(None, led_count);

    Ok(api
        .device_list()
        .filter(|d| d.vendor_id() == GALAHAD_VID)
        .map(|d| {
            let endpoint = Endpoint::from(d);
            DiscoveredEndpoint {
                pid: d.product_id(),
                product: d.product_string().unwrap_or_default().to_string(),
                path: d.path().to_string_lossy().into_owned(),
                endpoint,
                model: PumpModel::from_pid(d.product_id()),
                accepted: accepts_endpoint(&connector.profile_for(d.product_id()), &endpoint),
            }
        })
        .collect())
}
