/// Reads LED colours off the host canvas.
use super::layout::LedLayout;
use super::protocol::{LedColor, RgbColor};

/// The host's pixel canvas. `None` means the host has no colour for that cell.
pub trait Canvas {
    fn sample(&self, x: i32, y: i32) -> Option<RgbColor>;
}

impl<F> Canvas for F
where
    F: Fn(i32, i32) -> Option<RgbColor>,
{
    fn sample(&self, x: i32, y: i32) -> Option<RgbColor> {
        self(x, y)
    }
}

/// Sample the canvas for every index in `indices`.
///
/// In per-LED mode each answered cell yields its own brightness-scaled
/// colour. Otherwise the answered cells are averaged, scaled once, and the
/// result is repeated for every index so both modes return the same shape.
/// An empty result means there is nothing to send this frame.
#[must_use]
pub fn sample_colors(
    canvas: &(impl Canvas + ?Sized),
    layout: &LedLayout,
    indices: &[u8],
    per_led: bool,
    brightness: u8,
) -> Vec<LedColor> {
    let readings = indices.iter().filter_map(|&index| {
        let (x, y) = layout.position(index)?;
        canvas.sample(x, y).map(|color| (index, color))
    });

    if per_led {
        return readings
            .map(|(index, color)| LedColor::new(index, color.scaled(brightness)))
            .collect();
    }

    let mut sum = [0u32; 3];
    let mut count = 0u32;
    for (_, color) in readings {
        sum[0] += u32::from(color.r);
        sum[1] += u32::from(color.g);
        sum[2] += u32::from(color.b);
        count += 1;
    }
    if count == 0 {
        return Vec::new();
    }

    let factor = f64::from(brightness) / 100.0;
    let channel = |total: u32| {
        (f64::from(total) / f64::from(count) * factor)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    let average = RgbColor::new(channel(sum[0]), channel(sum[1]), channel(sum[2]));

    indices
        .iter()
        .map(|&index| LedColor::new(index, average))
        .collect()
}

/// Mean of already-sampled colours, used when a frame falls back to one zone colour.
#[must_use]
pub fn average_color(leds: &[LedColor]) -> Option<RgbColor> {
    if leds.is_empty() {
        return None;
    }
    let n = leds.len() as f64;
    let mean = |pick: fn(&RgbColor) -> u8| {
        let total: u32 = leds.iter().map(|l| u32::from(pick(&l.color))).sum();
        (f64::from(total) / n).round() as u8
    };
    Some(RgbColor::new(mean(|c| c.r), mean(|c| c.g), mean(|c| c.b)))
}
