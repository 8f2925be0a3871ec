/// Galahad II product table.
///
/// A profile fixes the LED split between the two rings and which HID
/// endpoint carries the lighting reports.
use serde::{Deserialize, Serialize};

// ─── Device Identification ───────────────────────────────────

/// Lian Li (Nuvoton) USB Vendor ID.
pub const GALAHAD_VID: u16 = 0x0416;

/// Known Galahad II pump Product IDs.
pub const GALAHAD_PIDS: &[u16] = &[
    0x7373, // Trinity
    0x7371, // Trinity Performance
    0x7395, // LCD
];

/// Share of the LED total given to the outer ring when no profile is known.
pub const DEFAULT_OUTER_FRACTION: f64 = 0.67;

/// Static description of one pump model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceProfile {
    pub name: String,
    pub pid: Option<u16>,
    pub outer_leds: u8,
    pub inner_leds: u8,
    /// Required HID interface number, if the model pins one.
    pub interface: Option<i32>,
    /// Required HID usage page, if the model pins one.
    pub usage_page: Option<u16>,
    pub supports_per_led: bool,
    pub has_lcd: bool,
}

impl DeviceProfile {
    /// Authoritative LED total for the Set-LED-Count command.
    #[must_use]
    pub const fn total_leds(&self) -> u8 {
        self.outer_leds + self.inner_leds
    }

    /// Look up a known product id.
    #[must_use]
    pub fn for_pid(pid: u16) -> Option<Self> {
        PumpModel::from_pid(pid).map(PumpModel::profile)
    }

    /// Profile for a pump we have no table entry for, split from the user's LED total.
    #[must_use]
    pub fn generic(total_leds: u8) -> Self {
        let outer = (f64::from(total_leds) * DEFAULT_OUTER_FRACTION).ceil() as u8;
        Self {
            name: "Generic".into(),
            pid: None,
            outer_leds: outer.min(total_leds),
            inner_leds: total_leds - outer.min(total_leds),
            interface: None,
            usage_page: None,
            supports_per_led: true,
            has_lcd: false,
        }
    }
}

/// User-selectable pump model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpModel {
    #[serde(rename = "Trinity (0x7373)")]
    Trinity,
    #[serde(rename = "Trinity Performance (0x7371)")]
    TrinityPerformance,
    #[serde(rename = "LCD (0x7395)")]
    Lcd,
}

impl PumpModel {
    pub const ALL: [Self; 3] = [Self::Trinity, Self::TrinityPerformance, Self::Lcd];

    #[must_use]
    pub const fn pid(self) -> u16 {
        match self {
            Self::Trinity => 0x7373,
            Self::TrinityPerformance => 0x7371,
            Self::Lcd => 0x7395,
        }
    }

    #[must_use]
    pub fn from_pid(pid: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.pid() == pid)
    }

    /// Label shown in the host's model selector.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Trinity => "Trinity (0x7373)",
            Self::TrinityPerformance => "Trinity Performance (0x7371)",
            Self::Lcd => "LCD (0x7395)",
        }
    }

    #[must_use]
    pub fn profile(self) -> DeviceProfile {
        let (name, interface, usage_page, has_lcd) = match self {
            Self::Trinity => ("Trinity", 0, None, false),
            Self::TrinityPerformance => ("Trinity Performance", 0, None, false),
            Self::Lcd => ("LCD", 1, Some(0xFF1A), true),
        };
        DeviceProfile {
            name: name.into(),
            pid: Some(self.pid()),
            outer_leds: 16,
            inner_leds: 8,
            interface: Some(interface),
            usage_page,
            supports_per_led: true,
            has_lcd,
        }
    }
}
