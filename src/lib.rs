//! Ring lighting driver for Lian Li Galahad II AIO pumps.
//!
//! The host lighting application owns enumeration, frame timing and the
//! pixel canvas. This crate turns canvas samples into the pump's 64-byte
//! HID reports and keeps the device session alive across write failures.

pub mod config;
pub mod error;
pub mod pump;
pub mod state;

pub use config::PluginConfig;
pub use error::{GalahadError, Result};
pub use pump::layout::{LedLayout, Ring, RingMode};
pub use pump::profile::{DeviceProfile, PumpModel};
pub use pump::protocol::{Command, LedColor, Packet, PacketEncoder, RgbColor, Zone};
pub use pump::sampler::Canvas;
pub use pump::session::{Session, SessionState, SessionStatus, Teardown};
pub use pump::transport::{Connector, HidConnector, HidTransport, Transport};
pub use state::PumpPlugin;
