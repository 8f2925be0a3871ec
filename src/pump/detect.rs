/// Header signature auto-detection.
///
/// Some firmware revisions are reported to answer to a different pair of
/// header bytes. Each candidate is probed with a minimal initialize frame;
/// a write that does not fail counts as acceptance.
use tracing::{debug, info};

use super::protocol::{HeaderSignature, PacketEncoder, DEFAULT_HEADER, HEADER_CANDIDATES};
use super::transport::Transport;

/// Upper bound on probe writes per detection run.
pub const MAX_PROBES: usize = 3;

/// Probe the candidate signatures in order and return the first accepted one,
/// or [`DEFAULT_HEADER`] if none is.
pub fn detect_header(transport: &mut impl Transport) -> HeaderSignature {
    debug!("starting protocol auto-detection");

    for candidate in HEADER_CANDIDATES.iter().take(MAX_PROBES) {
        let probe = PacketEncoder::new(*candidate).probe();
        match transport.write(&probe) {
            Ok(()) => {
                info!(protocol = candidate.name, "protocol detected");
                return *candidate;
            }
            Err(e) => debug!(protocol = candidate.name, error = %e, "probe rejected"),
        }
    }

    info!("no protocol detected, using default");
    DEFAULT_HEADER
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GalahadError, Result};
    use crate::pump::protocol::Packet;

    /// Fails the first `reject` writes.
    struct Picky {
        reject: usize,
        seen: Vec<Packet>,
    }

    impl Transport for Picky {
        fn write(&mut self, packet: &Packet) -> Result<()> {
            self.seen.push(*packet);
            if self.seen.len() <= self.reject {
                return Err(GalahadError::TransportWrite("nak".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_first_candidate_accepted() {
        let mut t = Picky {
            reject: 0,
            seen: Vec::new(),
        };
        assert_eq!(detect_header(&mut t), DEFAULT_HEADER);
        assert_eq!(t.seen.len(), 1);
    }

    #[test]
    fn test_falls_through_to_alternate() {
        let mut t = Picky {
            reject: 1,
            seen: Vec::new(),
        };
        assert_eq!(detect_header(&mut t), HEADER_CANDIDATES[1]);
        assert_eq!(&t.seen[1][1..3], &[0xAA, 0x55]);
    }

    #[test]
    fn test_bounded_and_defaults() {
        let mut t = Picky {
            reject: usize::MAX,
            seen: Vec::new(),
        };
        assert_eq!(detect_header(&mut t), DEFAULT_HEADER);
        assert_eq!(t.seen.len(), MAX_PROBES);
    }
}
