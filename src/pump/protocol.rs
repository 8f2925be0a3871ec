/// Galahad II pump USB HID protocol constants and packet building.
///
/// Command codes, zone identifiers and header bytes follow the common
/// Lian Li HID layout. They have not been confirmed by the vendor; check
/// them against hardware captures before treating them as ground truth.
use serde::{Deserialize, Serialize};

// ─── HID Report ──────────────────────────────────────────────

/// Every frame written to the pump is exactly this many bytes, report id included.
pub const PACKET_SIZE: usize = 64;

/// Report ID, always zero.
pub const REPORT_ID: u8 = 0x00;

/// Bytes in front of an individual-colour payload:
/// report id, two header bytes, command, payload length, zone.
pub const HEADER_SIZE: usize = 6;

/// Each LED in an individual-colour payload is `[index, R, G, B]`.
pub const BYTES_PER_LED: usize = 4;

/// Maximum LEDs addressable in a single individual-colour packet.
pub const MAX_LEDS_PER_PACKET: usize = (PACKET_SIZE - HEADER_SIZE) / BYTES_PER_LED;

/// One fixed-size HID frame.
pub type Packet = [u8; PACKET_SIZE];

// ─── Command Bytes ───────────────────────────────────────────

/// Command codes understood by the pump controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Enter RGB mode.
    Initialize,
    /// Tell the controller how many LEDs are chained.
    SetLedCount,
    /// One colour for a whole zone.
    SetZoneColor,
    /// `[index, R, G, B]` tuples for individual LEDs.
    SetIndividualColor,
    SetBrightness,
    /// Latch the colours sent since the last apply.
    Apply,
    /// Hardware effect selection. Reserved, never sent by the session.
    SetEffect,
    /// Return the controller to its power-on state.
    Reset,
}

impl Command {
    pub const ALL: [Self; 8] = [
        Self::Initialize,
        Self::SetLedCount,
        Self::SetZoneColor,
        Self::SetIndividualColor,
        Self::SetBrightness,
        Self::Apply,
        Self::SetEffect,
        Self::Reset,
    ];

    /// Map to the protocol byte sent in the HID report.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            Self::Initialize => 0x01,
            Self::SetLedCount => 0x02,
            Self::SetZoneColor => 0x06,
            Self::SetIndividualColor => 0x07,
            Self::SetBrightness => 0x08,
            Self::Apply => 0x09,
            Self::SetEffect => 0x0A,
            Self::Reset => 0xFF,
        }
    }

    /// Parse from a raw protocol byte.
    #[must_use]
    pub fn from_raw(v: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.to_raw() == v)
    }

    /// Colour commands carry a zone byte at offset 5 and their payload at offset 6.
    #[must_use]
    pub const fn is_zone_command(self) -> bool {
        matches!(self, Self::SetZoneColor | Self::SetIndividualColor)
    }
}

// ─── Zones ───────────────────────────────────────────────────

/// Zone identifier placed at byte 5 of colour commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    All,
    Outer,
    Inner,
    /// Both rings, each addressed separately.
    Independent,
}

impl Zone {
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            Self::All => 0x00,
            Self::Outer => 0x01,
            Self::Inner => 0x02,
            Self::Independent => 0x03,
        }
    }
}

// ─── Header Signatures ───────────────────────────────────────

/// The two bytes following the report id in every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HeaderSignature {
    pub name: &'static str,
    pub bytes: [u8; 2],
}

/// Signature used when auto-detection is off or accepts nothing.
pub const DEFAULT_HEADER: HeaderSignature = HeaderSignature {
    name: "Standard Lian Li",
    bytes: [0x16, 0x16],
};

/// Signatures probed in order by protocol auto-detection.
pub const HEADER_CANDIDATES: [HeaderSignature; 3] = [
    DEFAULT_HEADER,
    HeaderSignature {
        name: "Alternative 1",
        bytes: [0xAA, 0x55],
    },
    HeaderSignature {
        name: "Alternative 2",
        bytes: [0x5A, 0xA5],
    },
];

// ─── Effects ─────────────────────────────────────────────────

/// Hardware effects advertised to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    Static,
    Breathing,
    Rainbow,
    Wave,
}

impl Effect {
    /// All effects, useful for UI enumeration.
    pub const ALL: [Self; 4] = [Self::Static, Self::Breathing, Self::Rainbow, Self::Wave];

    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            Self::Static => 0x00,
            Self::Breathing => 0x01,
            Self::Rainbow => 0x02,
            Self::Wave => 0x03,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Static => "Static",
            Self::Breathing => "Breathing",
            Self::Rainbow => "Rainbow",
            Self::Wave => "Wave",
        }
    }
}

// ─── RGB Color ───────────────────────────────────────────────

/// An RGB colour value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: Self = Self { r: 0, g: 0, b: 0 };
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Scale every channel by `brightness` percent, rounding half away from zero.
    #[must_use]
    pub fn scaled(self, brightness: u8) -> Self {
        let factor = f64::from(brightness) / 100.0;
        let scale = |c: u8| (f64::from(c) * factor).round().clamp(0.0, 255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }

    #[must_use]
    pub const fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// One brightness-scaled colour addressed to a protocol LED index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LedColor {
    pub index: u8,
    pub color: RgbColor,
}

impl LedColor {
    #[must_use]
    pub const fn new(index: u8, color: RgbColor) -> Self {
        Self { index, color }
    }
}

/// Flatten LEDs into the `[index, R, G, B, …]` individual-colour payload.
#[must_use]
pub fn flatten_leds(leds: &[LedColor]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(leds.len() * BYTES_PER_LED);
    for led in leds {
        payload.push(led.index);
        payload.extend_from_slice(&led.color.to_bytes());
    }
    payload
}

// ─── Packet Builders ─────────────────────────────────────────

/// Build a zero-filled frame and fill header, command and payload.
///
/// Zone commands get `zone` (default [`Zone::All`]) at byte 5 and their
/// payload from byte 6; every other command starts its payload at byte 5.
/// Payload that does not fit is dropped and byte 4 records the bytes
/// actually copied.
#[must_use]
pub fn encode(
    header: HeaderSignature,
    cmd: Command,
    payload: &[u8],
    zone: Option<Zone>,
) -> Packet {
    let mut buf = [0u8; PACKET_SIZE];
    buf[0] = REPORT_ID;
    buf[1..3].copy_from_slice(&header.bytes);
    buf[3] = cmd.to_raw();

    let offset = if cmd.is_zone_command() {
        buf[5] = zone.unwrap_or(Zone::All).to_raw();
        6
    } else {
        5
    };

    let n = payload.len().min(PACKET_SIZE - offset);
    buf[offset..offset + n].copy_from_slice(&payload[..n]);
    // n <= 59, always fits
    buf[4] = n as u8;
    buf
}

/// Packet builders bound to the header signature of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketEncoder {
    header: HeaderSignature,
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER)
    }
}

impl PacketEncoder {
    #[must_use]
    pub const fn new(header: HeaderSignature) -> Self {
        Self { header }
    }

    #[must_use]
    pub const fn header(&self) -> HeaderSignature {
        self.header
    }

    #[must_use]
    pub fn encode(&self, cmd: Command, payload: &[u8], zone: Option<Zone>) -> Packet {
        encode(self.header, cmd, payload, zone)
    }

    #[must_use]
    pub fn reset(&self) -> Packet {
        self.encode(Command::Reset, &[], None)
    }

    #[must_use]
    pub fn led_count(&self, total: u8) -> Packet {
        self.encode(Command::SetLedCount, &[total], None)
    }

    /// Enable RGB mode with default settings.
    #[must_use]
    pub fn initialize(&self) -> Packet {
        self.encode(Command::Initialize, &[0x01, 0x00], None)
    }

    /// Minimal initialize frame used to probe a header signature.
    #[must_use]
    pub fn probe(&self) -> Packet {
        self.encode(Command::Initialize, &[0x00], None)
    }

    /// Brightness is clamped to 1–100 here regardless of what the caller validated.
    #[must_use]
    pub fn brightness(&self, percent: u8) -> Packet {
        self.encode(Command::SetBrightness, &[percent.clamp(1, 100)], None)
    }

    #[must_use]
    pub fn apply(&self) -> Packet {
        self.encode(Command::Apply, &[], None)
    }

    #[must_use]
    pub fn zone_color(&self, zone: Zone, color: RgbColor) -> Packet {
        self.encode(Command::SetZoneColor, &color.to_bytes(), Some(zone))
    }

    /// Up to [`MAX_LEDS_PER_PACKET`] LEDs in one report; extra LEDs are ignored.
    #[must_use]
    pub fn individual_colors(&self, zone: Zone, leds: &[LedColor]) -> Packet {
        let count = leds.len().min(MAX_LEDS_PER_PACKET);
        self.encode(
            Command::SetIndividualColor,
            &flatten_leds(&leds[..count]),
            Some(zone),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_leds_per_packet() {
        assert_eq!(MAX_LEDS_PER_PACKET, 14);
    }

    #[test]
    fn test_encode_plain_command_layout() {
        let packet = encode(DEFAULT_HEADER, Command::SetLedCount, &[24], None);
        assert_eq!(packet.len(), PACKET_SIZE);
        assert_eq!(packet[0], REPORT_ID);
        assert_eq!(&packet[1..3], &[0x16, 0x16]);
        assert_eq!(packet[3], 0x02);
        assert_eq!(packet[4], 1);
        assert_eq!(packet[5], 24);
        assert!(packet[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_zone_command_layout() {
        let packet = encode(
            DEFAULT_HEADER,
            Command::SetZoneColor,
            &[10, 20, 30],
            Some(Zone::Inner),
        );
        assert_eq!(packet[3], 0x06);
        assert_eq!(packet[4], 3);
        assert_eq!(packet[5], Zone::Inner.to_raw());
        assert_eq!(&packet[6..9], &[10, 20, 30]);
    }

    #[test]
    fn test_encode_zone_defaults_to_all() {
        let packet = encode(DEFAULT_HEADER, Command::SetZoneColor, &[1, 2, 3], None);
        assert_eq!(packet[5], Zone::All.to_raw());
    }

    #[test]
    fn test_encode_truncates_oversized_payload() {
        let payload = vec![0xEE; 100];
        let plain = encode(DEFAULT_HEADER, Command::Apply, &payload, None);
        assert_eq!(plain[4], 59);
        assert_eq!(plain[63], 0xEE);

        let zoned = encode(DEFAULT_HEADER, Command::SetIndividualColor, &payload, None);
        assert_eq!(zoned[4], 58);
        assert_eq!(zoned[5], 0x00);
        assert_eq!(zoned[63], 0xEE);
    }

    #[test]
    fn test_encode_uses_alternate_header() {
        let packet = PacketEncoder::new(HEADER_CANDIDATES[1]).apply();
        assert_eq!(&packet[1..3], &[0xAA, 0x55]);
        assert_eq!(packet[3], Command::Apply.to_raw());
        assert_eq!(packet[4], 0);
    }

    #[test]
    fn test_brightness_clamped() {
        let enc = PacketEncoder::default();
        assert_eq!(enc.brightness(0)[5], 1);
        assert_eq!(enc.brightness(250)[5], 100);
        assert_eq!(enc.brightness(42)[5], 42);
    }

    #[test]
    fn test_individual_colors_payload() {
        let enc = PacketEncoder::default();
        let leds = [
            LedColor::new(3, RgbColor::new(1, 2, 3)),
            LedColor::new(17, RgbColor::new(4, 5, 6)),
        ];
        let packet = enc.individual_colors(Zone::Outer, &leds);
        assert_eq!(packet[3], 0x07);
        assert_eq!(packet[4], 8);
        assert_eq!(packet[5], 0x01);
        assert_eq!(&packet[6..14], &[3, 1, 2, 3, 17, 4, 5, 6]);
    }

    #[test]
    fn test_individual_colors_caps_led_count() {
        let leds: Vec<_> = (0..20)
            .map(|i| LedColor::new(i, RgbColor::WHITE))
            .collect();
        let packet = PacketEncoder::default().individual_colors(Zone::All, &leds);
        assert_eq!(packet[4] as usize, MAX_LEDS_PER_PACKET * BYTES_PER_LED);
        // last LED in the frame is index 13
        assert_eq!(packet[6 + 13 * BYTES_PER_LED], 13);
    }

    #[test]
    fn test_probe_matches_minimal_initialize() {
        let packet = PacketEncoder::new(HEADER_CANDIDATES[2]).probe();
        assert_eq!(&packet[..6], &[0x00, 0x5A, 0xA5, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn test_command_raw_round_trip() {
        assert_eq!(Command::from_raw(0xFF), Some(Command::Reset));
        assert_eq!(Command::from_raw(0x0A), Some(Command::SetEffect));
        assert_eq!(Command::from_raw(0x42), None);
    }

    #[test]
    fn test_color_scaled() {
        assert_eq!(
            RgbColor::new(200, 100, 0).scaled(50),
            RgbColor::new(100, 50, 0)
        );
        assert_eq!(RgbColor::new(255, 1, 3).scaled(50), RgbColor::new(128, 1, 2));
    }
}
