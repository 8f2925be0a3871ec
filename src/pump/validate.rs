/// Endpoint matching and packet self-checks.
///
/// The endpoint predicate runs at discovery time. The packet checks are
/// for offline tooling only and never gate a production write.
use serde::Serialize;

use super::profile::DeviceProfile;
use super::protocol::{
    Command, HeaderSignature, Packet, PacketEncoder, RgbColor, Zone, PACKET_SIZE, REPORT_ID,
};

/// Vendor-defined HID usage pages.
pub const VENDOR_USAGE_PAGES: std::ops::RangeInclusive<u16> = 0xFF00..=0xFFFF;

/// The parts of a HID endpoint the predicate looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub interface: i32,
    pub usage: u16,
    pub usage_page: u16,
}

impl From<&hidapi::DeviceInfo> for Endpoint {
    fn from(info: &hidapi::DeviceInfo) -> Self {
        Self {
            interface: info.interface_number(),
            usage: info.usage(),
            usage_page: info.usage_page(),
        }
    }
}

/// Whether `endpoint` is the lighting interface of a pump described by `profile`.
///
/// A profile that pins an interface or usage page only accepts an exact
/// match. Otherwise any vendor usage page or interface 0/1 is accepted.
#[must_use]
pub fn accepts_endpoint(profile: &DeviceProfile, endpoint: &Endpoint) -> bool {
    if profile.interface.is_some() || profile.usage_page.is_some() {
        let interface_ok = profile.interface.map_or(true, |i| i == endpoint.interface);
        let page_ok = profile.usage_page.map_or(true, |p| p == endpoint.usage_page);
        return interface_ok && page_ok;
    }

    VENDOR_USAGE_PAGES.contains(&endpoint.usage_page) || matches!(endpoint.interface, 0 | 1)
}

// ─── Packet Self-Check ───────────────────────────────────────

/// One reason a frame is malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "fault", rename_all = "snake_case")]
pub enum PacketFault {
    Size { actual: usize },
    ReportId { actual: u8 },
    Header { actual: [u8; 2], expected: [u8; 2] },
    Command { actual: u8, expected: u8 },
}

impl std::fmt::Display for PacketFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Size { actual } => {
                write!(f, "invalid packet size {actual}, expected {PACKET_SIZE}")
            }
            Self::ReportId { actual } => write!(f, "invalid report id 0x{actual:02X}"),
            Self::Header { actual, expected } => write!(
                f,
                "invalid header {:02X} {:02X}, expected {:02X} {:02X}",
                actual[0], actual[1], expected[0], expected[1]
            ),
            Self::Command { actual, expected } => {
                write!(f, "invalid command 0x{actual:02X}, expected 0x{expected:02X}")
            }
        }
    }
}

/// Check length, report id, header pair and (optionally) the command byte.
/// Returns every fault found, not just the first.
#[must_use]
pub fn check_packet(
    packet: &[u8],
    header: HeaderSignature,
    expected: Option<Command>,
) -> Vec<PacketFault> {
    let mut faults = Vec::new();

    if packet.len() != PACKET_SIZE {
        faults.push(PacketFault::Size {
            actual: packet.len(),
        });
    }
    if let Some(&id) = packet.first() {
        if id != REPORT_ID {
            faults.push(PacketFault::ReportId { actual: id });
        }
    }
    let actual = [
        packet.get(1).copied().unwrap_or_default(),
        packet.get(2).copied().unwrap_or_default(),
    ];
    if actual != header.bytes {
        faults.push(PacketFault::Header {
            actual,
            expected: header.bytes,
        });
    }
    if let Some(cmd) = expected {
        let actual = packet.get(3).copied().unwrap_or_default();
        if actual != cmd.to_raw() {
            faults.push(PacketFault::Command {
                actual,
                expected: cmd.to_raw(),
            });
        }
    }

    faults
}

// ─── Self-Test Suite ─────────────────────────────────────────

/// One named frame of the protocol self-test.
#[derive(Debug, Clone)]
pub struct SelfTestCase {
    pub group: &'static str,
    pub name: String,
    pub command: Command,
    pub packet: [u8; PACKET_SIZE],
}

impl SelfTestCase {
    fn new(
        group: &'static str,
        name: impl Into<String>,
        command: Command,
        packet: [u8; PACKET_SIZE],
    ) -> Self {
        Self {
            group,
            name: name.into(),
            command,
            packet,
        }
    }

    #[must_use]
    pub fn check(&self, header: HeaderSignature) -> Vec<PacketFault> {
        check_packet(&self.packet, header, Some(self.command))
    }
}

/// Frames covering bring-up, colours, ring zones, brightness and an oversized payload.
#[must_use]
pub fn self_test_suite(encoder: &PacketEncoder, total_leds: u8) -> Vec<SelfTestCase> {
    let mut cases = vec![
        SelfTestCase::new("init", "Reset", Command::Reset, encoder.reset()),
        SelfTestCase::new(
            "init",
            "Set LED Count",
            Command::SetLedCount,
            encoder.led_count(total_leds),
        ),
        SelfTestCase::new(
            "init",
            "Initialize RGB",
            Command::Initialize,
            encoder.initialize(),
        ),
    ];

    let colors = [
        ("Red", RgbColor::new(255, 0, 0)),
        ("Green", RgbColor::new(0, 255, 0)),
        ("Blue", RgbColor::new(0, 0, 255)),
        ("White", RgbColor::WHITE),
        ("Purple", RgbColor::new(255, 0, 255)),
        ("Off", RgbColor::BLACK),
    ];
    for (name, color) in colors {
        cases.push(SelfTestCase::new(
            "color",
            name,
            Command::SetZoneColor,
            encoder.zone_color(Zone::All, color),
        ));
    }

    let rings = [
        ("All Zones Red", Zone::All, RgbColor::new(255, 0, 0)),
        ("Outer Ring Green", Zone::Outer, RgbColor::new(0, 255, 0)),
        ("Inner Ring Blue", Zone::Inner, RgbColor::new(0, 0, 255)),
        ("Both Rings White", Zone::Independent, RgbColor::WHITE),
    ];
    for (name, zone, color) in rings {
        cases.push(SelfTestCase::new(
            "ring",
            name,
            Command::SetZoneColor,
            encoder.zone_color(zone, color),
        ));
    }

    for level in [25, 50, 75, 100] {
        cases.push(SelfTestCase::new(
            "brightness",
            format!("Brightness {level}%"),
            Command::SetBrightness,
            encoder.brightness(level),
        ));
    }

    cases.push(SelfTestCase::new(
        "edge",
        "Oversized Data",
        Command::SetZoneColor,
        encoder.encode(Command::SetZoneColor, &[0xFF; 60], Some(Zone::All)),
    ));

    cases
}

/// Frames sent after a hardware run: all zones black, latched, then reset.
#[must_use]
pub fn cleanup_frames(encoder: &PacketEncoder) -> [Packet; 3] {
    [
        encoder.zone_color(Zone::All, RgbColor::BLACK),
        encoder.apply(),
        encoder.reset(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::profile::PumpModel;
    use crate::pump::protocol::{DEFAULT_HEADER, HEADER_CANDIDATES};

    fn endpoint(interface: i32, usage_page: u16) -> Endpoint {
        Endpoint {
            interface,
            usage: 0x01,
            usage_page,
        }
    }

    #[test]
    fn test_pinned_interface_must_match() {
        let trinity = PumpModel::Trinity.profile();
        assert!(accepts_endpoint(&trinity, &endpoint(0, 0x0001)));
        assert!(!accepts_endpoint(&trinity, &endpoint(1, 0xFF00)));
    }

    #[test]
    fn test_pinned_usage_page_must_match() {
        let lcd = PumpModel::Lcd.profile();
        assert!(accepts_endpoint(&lcd, &endpoint(1, 0xFF1A)));
        assert!(!accepts_endpoint(&lcd, &endpoint(1, 0xFF00)));
        assert!(!accepts_endpoint(&lcd, &endpoint(0, 0xFF1A)));
    }

    #[test]
    fn test_unpinned_profile_fallback() {
        let generic = DeviceProfile::generic(24);
        assert!(accepts_endpoint(&generic, &endpoint(3, 0xFF42)));
        assert!(accepts_endpoint(&generic, &endpoint(1, 0x0001)));
        assert!(accepts_endpoint(&generic, &endpoint(0, 0x000C)));
        assert!(!accepts_endpoint(&generic, &endpoint(2, 0x0001)));
        assert!(!accepts_endpoint(&generic, &endpoint(-1, 0x0001)));
    }

    #[test]
    fn test_check_packet_accepts_encoded_frames() {
        let enc = PacketEncoder::default();
        assert!(check_packet(&enc.apply(), DEFAULT_HEADER, Some(Command::Apply)).is_empty());
        assert!(check_packet(&enc.reset(), DEFAULT_HEADER, None).is_empty());
    }

    #[test]
    fn test_check_packet_reports_every_fault() {
        let mut packet = PacketEncoder::new(HEADER_CANDIDATES[1]).apply().to_vec();
        packet[0] = 0x05;
        packet.push(0);

        let faults = check_packet(&packet, DEFAULT_HEADER, Some(Command::Reset));
        assert_eq!(
            faults,
            vec![
                PacketFault::Size { actual: 65 },
                PacketFault::ReportId { actual: 0x05 },
                PacketFault::Header {
                    actual: [0xAA, 0x55],
                    expected: [0x16, 0x16],
                },
                PacketFault::Command {
                    actual: 0x09,
                    expected: 0xFF,
                },
            ]
        );
    }

    #[test]
    fn test_check_packet_short_frame() {
        let faults = check_packet(&[], DEFAULT_HEADER, None);
        assert_eq!(faults.len(), 2);
        assert_eq!(faults[0], PacketFault::Size { actual: 0 });
    }

    #[test]
    fn test_self_test_suite_is_well_formed() {
        let enc = PacketEncoder::default();
        let suite = self_test_suite(&enc, 24);
        assert_eq!(suite.len(), 3 + 6 + 4 + 4 + 1);
        assert!(suite.iter().all(|case| case.check(DEFAULT_HEADER).is_empty()));

        let oversized = suite.last().unwrap();
        assert_eq!(oversized.packet[4], 58);
    }

    #[test]
    fn test_cleanup_frames_turn_lights_off() {
        let enc = PacketEncoder::default();
        let frames = cleanup_frames(&enc);

        assert_eq!(frames[0][3], Command::SetZoneColor.to_raw());
        assert_eq!(frames[0][5], Zone::All.to_raw());
        assert_eq!(&frames[0][6..9], &[0, 0, 0]);
        assert!(check_packet(&frames[1], DEFAULT_HEADER, Some(Command::Apply)).is_empty());
        assert!(check_packet(&frames[2], DEFAULT_HEADER, Some(Command::Reset)).is_empty());

        // the suite ends on a bright frame, so cleanup must not start with Apply
        let suite = self_test_suite(&enc, 24);
        assert_ne!(&suite.last().unwrap().packet[6..9], &[0, 0, 0]);
    }
}
