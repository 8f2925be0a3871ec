use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{PluginConfig, LED_COUNT_RANGE, PERCENT_RANGE};
use crate::error::Result;
use crate::pump::layout::{LedLayout, RingMode, GRID_CENTER, GRID_SIZE};
use crate::pump::profile::{DeviceProfile, PumpModel};
use crate::pump::protocol::Effect;
use crate::pump::sampler::Canvas;
use crate::pump::session::{Session, SessionStatus, Teardown};
use crate::pump::transport::{Connector, Transport};

/// Default scale of the device on the host canvas.
pub const DEFAULT_SCALE: f64 = 6.0;
/// Host render cadence the timing constants assume.
pub const REFRESH_RATE_HZ: u32 = 30;

/// Where the plugin is in its lifetime.
enum Slot<T: Transport> {
    Idle,
    Live(Session<T>),
    /// Shutdown writes still pending.
    Closing(Teardown<T>),
}

/// Host-facing adapter for one pump.
///
/// The host calls `initialize` once, `render` at its frame rate and
/// `shutdown` once. Nothing here returns an error to the host: failures
/// are logged and reflected in [`status`](Self::status).
pub struct PumpPlugin<C: Connector> {
    connector: C,
    config: Mutex<PluginConfig>,
    slot: Mutex<Slot<C::Transport>>,
}

impl<C: Connector> PumpPlugin<C> {
    pub fn new(connector: C, config: PluginConfig) -> Self {
        Self {
            connector,
            config: Mutex::new(config),
            slot: Mutex::new(Slot::Idle),
        }
    }

    /// Replace the settings used by the next `initialize`.
    pub fn configure(&self, config: PluginConfig) -> Result<()> {
        config.validate()?;
        *self.config.lock() = config;
        Ok(())
    }

    #[must_use]
    pub fn config(&self) -> PluginConfig {
        self.config.lock().clone()
    }

    /// Open the device and start bring-up. Returns whether a session was started.
    pub fn initialize(&self, now: Instant) -> bool {
        let config = self.config();
        if let Err(e) = config.validate() {
            warn!(error = %e, "rejected configuration");
            return false;
        }

        // Pending shutdown writes go out before the new Reset.
        let previous = std::mem::replace(&mut *self.slot.lock(), Slot::Idle);
        drop(previous);

        let transport = match self.connector.open() {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "could not open pump");
                return false;
            }
        };
        let profile = resolve_profile(&config, transport.product_id());

        let session = Session::start(&config, profile, transport, now);
        *self.slot.lock() = Slot::Live(session);
        true
    }

    /// Fire due deferred work without rendering a frame.
    pub fn tick(&self, now: Instant) {
        let mut slot = self.slot.lock();
        let drained = match &mut *slot {
            Slot::Live(session) => {
                session.poll(now);
                false
            }
            Slot::Closing(teardown) => {
                teardown.poll(now);
                teardown.is_finished()
            }
            Slot::Idle => false,
        };
        if drained {
            *slot = Slot::Idle;
        }
    }

    pub fn render(&self, canvas: &(impl Canvas + ?Sized), now: Instant) {
        let mut slot = self.slot.lock();
        match &mut *slot {
            Slot::Live(session) => session.render(canvas, now),
            Slot::Closing(teardown) => teardown.poll(now),
            Slot::Idle => {}
        }
    }

    /// Turn the LEDs off and reset the pump. No-op if never initialized.
    pub fn shutdown(&self, now: Instant) {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Idle) {
            Slot::Live(session) => *slot = Slot::Closing(session.shutdown(now)),
            other => *slot = other,
        }
        info!("plugin state reset");
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        match &*self.slot.lock() {
            Slot::Live(session) => session.status(),
            Slot::Idle | Slot::Closing(_) => SessionStatus::default(),
        }
    }

    /// Active profile, or the one the current settings would select.
    #[must_use]
    pub fn profile(&self) -> DeviceProfile {
        match &*self.slot.lock() {
            Slot::Live(session) => session.profile().clone(),
            _ => resolve_profile(&self.config(), None),
        }
    }

    #[must_use]
    pub fn layout(&self) -> LedLayout {
        match &*self.slot.lock() {
            Slot::Live(session) => session.layout().clone(),
            _ => {
                let profile = resolve_profile(&self.config(), None);
                LedLayout::build(profile.outer_leds, profile.inner_leds)
            }
        }
    }

    #[must_use]
    pub fn led_names(&self) -> Vec<String> {
        self.layout().names().to_vec()
    }

    #[must_use]
    pub fn led_positions(&self) -> Vec<(i32, i32)> {
        self.layout().positions()
    }

    #[must_use]
    pub fn device_info(&self) -> DeviceInfo {
        let profile = self.profile();
        DeviceInfo {
            model: profile.name.clone(),
            interface: profile.interface,
            led_count: profile.total_leds(),
            has_rings: true,
            supports_per_led: profile.supports_per_led,
            independent_rings: true,
            has_lcd: profile.has_lcd,
            protocol_auto_detection: self.config().protocol_autodetect,
            refresh_rate: REFRESH_RATE_HZ,
            supported_modes: Effect::ALL.iter().map(|e| e.label()).collect(),
        }
    }
}

/// Selected model first, then the opened product id, then the user's LED total.
#[must_use]
pub fn resolve_profile(config: &PluginConfig, pid: Option<u16>) -> DeviceProfile {
    config
        .model
        .map(PumpModel::profile)
        .or_else(|| pid.and_then(DeviceProfile::for_pid))
        .unwrap_or_else(|| DeviceProfile::generic(config.led_count))
}

// ─── Host metadata ───────────────────────────────────────────

/// Summary of the pump shown by the host.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub model: String,
    pub interface: Option<i32>,
    pub led_count: u8,
    pub has_rings: bool,
    pub supports_per_led: bool,
    pub independent_rings: bool,
    #[serde(rename = "hasLCD")]
    pub has_lcd: bool,
    pub protocol_auto_detection: bool,
    pub refresh_rate: u32,
    pub supported_modes: Vec<&'static str>,
}

/// Canvas placement of the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasGeometry {
    pub size: (i32, i32),
    pub default_position: (i32, i32),
    pub default_scale: f64,
}

#[must_use]
pub fn canvas_geometry() -> CanvasGeometry {
    CanvasGeometry {
        size: GRID_SIZE,
        default_position: (GRID_CENTER.0 as i32, GRID_CENTER.1 as i32),
        default_scale: DEFAULT_SCALE,
    }
}

/// One user-facing setting as the host's parameter panel expects it.
#[derive(Debug, Clone, Serialize)]
pub struct ParameterDescriptor {
    pub property: &'static str,
    pub group: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<&'static str>,
    pub default: serde_json::Value,
}

impl ParameterDescriptor {
    fn number(
        property: &'static str,
        group: &'static str,
        label: &'static str,
        range: &std::ops::RangeInclusive<u8>,
        default: u8,
    ) -> Self {
        Self {
            property,
            group,
            label,
            kind: "number",
            min: Some(*range.start()),
            max: Some(*range.end()),
            step: Some(1),
            values: Vec::new(),
            default: default.into(),
        }
    }

    fn choice(
        property: &'static str,
        group: &'static str,
        label: &'static str,
        values: Vec<&'static str>,
        default: &'static str,
    ) -> Self {
        Self {
            property,
            group,
            label,
            kind: "combobox",
            min: None,
            max: None,
            step: None,
            values,
            default: default.into(),
        }
    }
}

/// The settings `PluginConfig` reads, with their ranges and defaults.
#[must_use]
pub fn parameters() -> Vec<ParameterDescriptor> {
    let defaults = PluginConfig::default();
    vec![
        ParameterDescriptor::number(
            "ledCount",
            "lighting",
            "Total LED Count",
            &LED_COUNT_RANGE,
            defaults.led_count,
        ),
        ParameterDescriptor::number(
            "brightness",
            "lighting",
            "Brightness (%)",
            &PERCENT_RANGE,
            defaults.brightness,
        ),
        ParameterDescriptor::choice(
            "ringMode",
            "lighting",
            "Ring Control Mode",
            RingMode::ALL.iter().map(|m| m.label()).collect(),
            defaults.ring_mode.label(),
        ),
        ParameterDescriptor {
            property: "perLedMode",
            group: "advanced",
            label: "Per-LED Control",
            kind: "boolean",
            min: None,
            max: None,
            step: None,
            values: Vec::new(),
            default: defaults.per_led_mode.into(),
        },
        ParameterDescriptor::choice(
            "modelType",
            "hardware",
            "Pump Model",
            PumpModel::ALL.iter().map(|m| m.label()).collect(),
            PumpModel::Trinity.label(),
        ),
        ParameterDescriptor::number(
            "effectSpeed",
            "advanced",
            "Effect Speed",
            &PERCENT_RANGE,
            defaults.effect_speed,
        ),
    ]
}
