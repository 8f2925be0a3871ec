/// Runtime state machine for one pump connection.
///
/// `Closed → Initializing → Ready ⇄ Error → Recovering → Ready`.
///
/// A [`Session`] exists from `initialize` to `shutdown`. Every call takes the
/// current instant and first runs whatever deferred work has come due, so
/// the settling delays of the bring-up sequence never block the host loop.
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::PluginConfig;
use crate::error::{GalahadError, Result};

use super::detect::detect_header;
use super::layout::{LedLayout, Ring, RingMode};
use super::profile::DeviceProfile;
use super::protocol::{
    LedColor, Packet, PacketEncoder, RgbColor, Zone, DEFAULT_HEADER, MAX_LEDS_PER_PACKET,
};
use super::sampler::{average_color, sample_colors, Canvas};
use super::timeline::Timeline;
use super::transport::Transport;

// ─── Timing ──────────────────────────────────────────────────

/// Reset → Set-LED-Count.
pub const RESET_SETTLE: Duration = Duration::from_millis(150);
/// Set-LED-Count → Initialize.
pub const LED_COUNT_SETTLE: Duration = Duration::from_millis(100);
/// Initialize → Set-Brightness.
pub const INIT_SETTLE: Duration = Duration::from_millis(50);
/// Outer-ring write → inner-ring write in independent mode.
pub const RING_GAP: Duration = Duration::from_millis(10);
/// Between the shutdown writes.
pub const TEARDOWN_GAP: Duration = Duration::from_millis(50);

pub const APPLY_EVERY_FRAMES: u64 = 3;
pub const BRIGHTNESS_EVERY_FRAMES: u64 = 30;
/// About ten seconds at 30 Hz.
pub const RECOVERY_EVERY_FRAMES: u64 = 300;

/// Above this many errors rendering stops until a recovery succeeds.
pub const MAX_ERRORS: u32 = 10;
/// Above this many errors a recovery is attempted on the next boundary frame.
pub const RECOVERY_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Closed,
    Initializing,
    Ready,
    Error,
    Recovering,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BringUpStep {
    LedCount,
    Initialize,
    Brightness,
}

impl BringUpStep {
    const fn name(self) -> &'static str {
        match self {
            Self::LedCount => "set led count",
            Self::Initialize => "initialize",
            Self::Brightness => "set brightness",
        }
    }
}

#[derive(Debug)]
enum Task {
    BringUp(BringUpStep),
    /// Inner-ring frame held back by [`RING_GAP`].
    RingWrite(Packet),
}

/// Snapshot of the session counters for logging and the host UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: SessionState,
    pub initialization_complete: bool,
    pub frame_counter: u64,
    pub error_count: u32,
    pub brightness: u8,
    pub ring_mode: RingMode,
    pub per_led: bool,
    pub effect_speed: u8,
    pub protocol: &'static str,
}

impl Default for SessionStatus {
    fn default() -> Self {
        let config = PluginConfig::default();
        Self {
            state: SessionState::Closed,
            initialization_complete: false,
            frame_counter: 0,
            error_count: 0,
            brightness: config.brightness,
            ring_mode: config.ring_mode,
            per_led: config.per_led_mode,
            effect_speed: config.effect_speed,
            protocol: DEFAULT_HEADER.name,
        }
    }
}

/// Live state of one device connection.
pub struct Session<T: Transport> {
    transport: T,
    profile: DeviceProfile,
    layout: LedLayout,
    encoder: PacketEncoder,
    ring_mode: RingMode,
    brightness: u8,
    per_led: bool,
    effect_speed: u8,

    state: SessionState,
    initialization_complete: bool,
    frame_counter: u64,
    error_count: u32,
    /// Fingerprint of the last colour frames written, for skipping repeats.
    last_sent: Option<u64>,
    timeline: Timeline<Task>,
}

impl<T: Transport> Session<T> {
    /// Take ownership of an open transport and start the bring-up sequence.
    ///
    /// The Reset frame goes out immediately; the remaining steps run from
    /// later [`poll`](Self::poll) calls. A failed step leaves the session
    /// in `Initializing` with `initialization_complete == false`.
    pub fn start(
        config: &PluginConfig,
        profile: DeviceProfile,
        mut transport: T,
        now: Instant,
    ) -> Self {
        let header = if config.protocol_autodetect {
            detect_header(&mut transport)
        } else {
            DEFAULT_HEADER
        };
        let layout = LedLayout::build(profile.outer_leds, profile.inner_leds);
        info!(
            model = %profile.name,
            outer = profile.outer_leds,
            inner = profile.inner_leds,
            protocol = header.name,
            "initializing pump"
        );

        let mut session = Self {
            transport,
            per_led: config.per_led_mode && profile.supports_per_led,
            profile,
            layout,
            encoder: PacketEncoder::new(header),
            ring_mode: config.ring_mode,
            brightness: config.brightness,
            effect_speed: config.effect_speed,
            state: SessionState::Initializing,
            initialization_complete: false,
            frame_counter: 0,
            error_count: 0,
            last_sent: None,
            timeline: Timeline::new(),
        };
        session.begin_bring_up(now);
        session
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    #[must_use]
    pub const fn layout(&self) -> &LedLayout {
        &self.layout
    }

    #[must_use]
    pub const fn error_count(&self) -> u32 {
        self.error_count
    }

    #[must_use]
    pub const fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Instant of the next deferred step, if any is pending.
    #[must_use]
    pub fn next_due(&self) -> Option<Instant> {
        self.timeline.next_due()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            initialization_complete: self.initialization_complete,
            frame_counter: self.frame_counter,
            error_count: self.error_count,
            brightness: self.brightness,
            ring_mode: self.ring_mode,
            per_led: self.per_led,
            effect_speed: self.effect_speed,
            protocol: self.encoder.header().name,
        }
    }

    /// Run every deferred step due at `now`.
    pub fn poll(&mut self, now: Instant) {
        while let Some(task) = self.timeline.pop_due(now) {
            match task {
                Task::BringUp(step) => self.run_bring_up(step, now),
                Task::RingWrite(packet) => {
                    if self.state != SessionState::Ready {
                        continue;
                    }
                    if let Err(e) = self.transport.write(&packet) {
                        self.record_error(&e);
                    }
                }
            }
        }
    }

    /// Push one frame of canvas colours to the pump.
    ///
    /// Does nothing unless the session is `Ready`, apart from counting
    /// frames in `Error` so a recovery can be scheduled. Write failures are
    /// counted, never returned.
    pub fn render(&mut self, canvas: &(impl Canvas + ?Sized), now: Instant) {
        self.poll(now);
        if !matches!(self.state, SessionState::Ready | SessionState::Error) {
            return;
        }
        self.frame_counter += 1;

        if self.error_count > RECOVERY_THRESHOLD
            && self.frame_counter % RECOVERY_EVERY_FRAMES == 0
        {
            info!(
                frame = self.frame_counter,
                errors = self.error_count,
                "attempting recovery"
            );
            self.state = SessionState::Recovering;
            self.timeline.retain(|t| !matches!(t, Task::RingWrite(_)));
            self.begin_bring_up(now);
            return;
        }

        if self.state == SessionState::Error {
            return;
        }

        if let Err(e) = self.render_frame(canvas, now) {
            self.record_error(&e);
        }
    }

    /// Turn the LEDs off and hand the transport to the teardown writes.
    ///
    /// Pending bring-up steps and ring writes are dropped with the session.
    pub fn shutdown(self, now: Instant) -> Teardown<T> {
        info!("shutting down pump lighting");
        let Self {
            transport, encoder, ..
        } = self;

        let mut teardown = Teardown {
            transport,
            encoder,
            timeline: Timeline::new(),
        };
        teardown.send("lights off", &encoder.zone_color(Zone::All, RgbColor::BLACK));
        teardown
            .timeline
            .schedule_after(now, TEARDOWN_GAP, TeardownStep::Apply);
        teardown
            .timeline
            .schedule_after(now, TEARDOWN_GAP * 2, TeardownStep::Reset);
        teardown
    }

    // ── Bring-up ─────────────────────────────────────────────

    fn begin_bring_up(&mut self, now: Instant) {
        self.timeline.retain(|t| !matches!(t, Task::BringUp(_)));

        let reset = self.encoder.reset();
        match self.transport.write(&reset) {
            Ok(()) => {
                debug!("sent reset");
                self.timeline.schedule_after(
                    now,
                    RESET_SETTLE,
                    Task::BringUp(BringUpStep::LedCount),
                );
            }
            Err(e) => self.bring_up_failed("reset", &e),
        }
    }

    fn run_bring_up(&mut self, step: BringUpStep, now: Instant) {
        let packet = match step {
            BringUpStep::LedCount => self.encoder.led_count(self.profile.total_leds()),
            BringUpStep::Initialize => self.encoder.initialize(),
            BringUpStep::Brightness => self.encoder.brightness(self.brightness),
        };
        if let Err(e) = self.transport.write(&packet) {
            self.bring_up_failed(step.name(), &e);
            return;
        }
        debug!(step = step.name(), "bring-up step sent");

        match step {
            BringUpStep::LedCount => self.timeline.schedule_after(
                now,
                LED_COUNT_SETTLE,
                Task::BringUp(BringUpStep::Initialize),
            ),
            BringUpStep::Initialize => self.timeline.schedule_after(
                now,
                INIT_SETTLE,
                Task::BringUp(BringUpStep::Brightness),
            ),
            BringUpStep::Brightness => self.bring_up_complete(),
        }
    }

    fn bring_up_complete(&mut self) {
        if self.state == SessionState::Recovering {
            info!(errors = self.error_count, "recovery complete");
            self.error_count = 0;
        } else {
            info!(
                total = self.profile.total_leds(),
                brightness = self.brightness,
                "pump initialized"
            );
        }
        self.initialization_complete = true;
        self.last_sent = None;
        self.state = SessionState::Ready;
    }

    fn bring_up_failed(&mut self, step: &str, cause: &GalahadError) {
        let err = GalahadError::BringUp(format!("{step}: {cause}"));
        self.timeline.retain(|t| !matches!(t, Task::BringUp(_)));

        if self.state == SessionState::Recovering {
            warn!(error = %err, "recovery failed");
            self.state = if self.error_count > MAX_ERRORS {
                SessionState::Error
            } else {
                SessionState::Ready
            };
        } else {
            warn!(error = %err, "initialization failed");
            self.initialization_complete = false;
            self.error_count += 1;
            self.state = SessionState::Initializing;
        }
    }

    // ── Rendering ────────────────────────────────────────────

    fn render_frame(&mut self, canvas: &(impl Canvas + ?Sized), now: Instant) -> Result<()> {
        if self.ring_mode == RingMode::Independent {
            self.render_independent(canvas, now)?;
        } else {
            self.render_combined(canvas)?;
        }

        if self.frame_counter % APPLY_EVERY_FRAMES == 0 {
            let apply = self.encoder.apply();
            self.transport.write(&apply)?;
        }
        if self.frame_counter % BRIGHTNESS_EVERY_FRAMES == 0 {
            let brightness = self.encoder.brightness(self.brightness);
            self.transport.write(&brightness)?;
        }
        Ok(())
    }

    fn render_combined(&mut self, canvas: &(impl Canvas + ?Sized)) -> Result<()> {
        let active = self.layout.active_indices(self.ring_mode);
        let leds = sample_colors(canvas, &self.layout, &active, self.per_led, self.brightness);
        if leds.is_empty() {
            return Ok(());
        }

        let packets = self.color_packets(&leds, self.ring_mode.zone());
        let fingerprint = fingerprint(&packets, &[]);
        if self.last_sent == Some(fingerprint) {
            return Ok(());
        }

        for packet in &packets {
            self.transport.write(packet)?;
        }
        self.last_sent = Some(fingerprint);
        Ok(())
    }

    fn render_independent(&mut self, canvas: &(impl Canvas + ?Sized), now: Instant) -> Result<()> {
        let sample = |ring| {
            sample_colors(
                canvas,
                &self.layout,
                self.layout.ring_indices(ring),
                self.per_led,
                self.brightness,
            )
        };
        let outer = self.color_packets(&sample(Ring::Outer), Zone::Outer);
        let inner = self.color_packets(&sample(Ring::Inner), Zone::Inner);
        if outer.is_empty() && inner.is_empty() {
            return Ok(());
        }

        let fingerprint = fingerprint(&outer, &inner);
        if self.last_sent == Some(fingerprint) {
            return Ok(());
        }

        for packet in &outer {
            self.transport.write(packet)?;
        }
        for packet in inner {
            self.timeline
                .schedule_after(now, RING_GAP, Task::RingWrite(packet));
        }
        self.last_sent = Some(fingerprint);
        Ok(())
    }

    /// Individual-colour chunks in per-LED mode, otherwise one averaged zone frame.
    fn color_packets(&self, leds: &[LedColor], zone: Zone) -> Vec<Packet> {
        if self.per_led && leds.len() > 1 {
            leds.chunks(MAX_LEDS_PER_PACKET)
                .map(|chunk| self.encoder.individual_colors(zone, chunk))
                .collect()
        } else {
            average_color(leds)
                .map(|color| self.encoder.zone_color(zone, color))
                .into_iter()
                .collect()
        }
    }

    fn record_error(&mut self, err: &GalahadError) {
        self.error_count += 1;
        self.last_sent = None;
        warn!(
            frame = self.frame_counter,
            errors = self.error_count,
            error = %err,
            "render error"
        );

        if self.error_count > MAX_ERRORS && self.state == SessionState::Ready {
            warn!("too many errors, rendering suspended until recovery");
            self.state = SessionState::Error;
            self.timeline.retain(|t| !matches!(t, Task::RingWrite(_)));
        }
    }
}

fn fingerprint(first: &[Packet], second: &[Packet]) -> u64 {
    let mut hasher = DefaultHasher::new();
    first.hash(&mut hasher);
    second.hash(&mut hasher);
    hasher.finish()
}

// ─── Teardown ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TeardownStep {
    Apply,
    Reset,
}

/// The tail of the shutdown sequence, still holding the transport.
///
/// Writes are best-effort. Anything still pending when this is dropped is
/// written immediately so the pump always ends on a Reset.
pub struct Teardown<T: Transport> {
    transport: T,
    encoder: PacketEncoder,
    timeline: Timeline<TeardownStep>,
}

impl<T: Transport> Teardown<T> {
    pub fn poll(&mut self, now: Instant) {
        while let Some(step) = self.timeline.pop_due(now) {
            self.run(step);
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.timeline.is_empty()
    }

    fn run(&mut self, step: TeardownStep) {
        match step {
            TeardownStep::Apply => {
                let apply = self.encoder.apply();
                self.send("apply", &apply);
            }
            TeardownStep::Reset => {
                let reset = self.encoder.reset();
                self.send("reset", &reset);
                info!("shutdown sequence completed");
            }
        }
    }

    fn send(&mut self, what: &str, packet: &Packet) {
        if let Err(e) = self.transport.write(packet) {
            warn!(step = what, error = %e, "shutdown write failed");
        }
    }
}

impl<T: Transport> Drop for Teardown<T> {
    fn drop(&mut self) {
        for step in self.timeline.drain_all() {
            self.run(step);
        }
    }
}
