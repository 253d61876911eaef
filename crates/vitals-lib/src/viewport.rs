use crate::channel::{Channel, ChannelId, Color};
use serde::{Deserialize, Serialize};

/// Half-open visible range on one axis, in sample coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: f64,
    pub end: f64,
}

impl Span {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn center(&self) -> f64 {
        (self.start + self.end) * 0.5
    }
}

/// Visible portion of one channel: `samples[0]` sits at x = `start`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSlice {
    pub id: ChannelId,
    pub name: String,
    pub color: Color,
    pub start: usize,
    pub samples: Vec<f64>,
}

/// One rendered playback frame: the per-channel slices plus the axis
/// ranges a renderer must apply. Frames serialize to JSON for the
/// snapshot/report collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub cursor: usize,
    pub slices: Vec<ChannelSlice>,
    pub x_range: Span,
    pub y_range: Span,
}

/// Derive a frame from session state. Pure: the caller commits the
/// returned `x_range` as the surface's new view.
///
/// The slice reaches `slice_window * zoom_factor` samples back from the
/// cursor and includes the cursor sample itself; the y-range is the
/// exact min/max over the visible samples (`[0, 1]` when nothing is
/// visible); the x-range is centered on the cursor with the surface's
/// current width, shifted left by `x_axis_offset`.
pub fn compute_frame(
    channels: &[Channel],
    cursor: usize,
    zoom_factor: f64,
    view: Span,
    slice_window: usize,
    x_axis_offset: f64,
) -> Frame {
    let reach = (slice_window as f64 * zoom_factor).floor() as usize;
    let slice_start = cursor.saturating_sub(reach);

    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut slices = Vec::new();

    for channel in channels.iter().filter(|c| !c.hidden) {
        let data = channel.samples();
        let end = (cursor + 1).min(data.len());
        let samples: Vec<f64> = if slice_start < end {
            data[slice_start..end].to_vec()
        } else {
            Vec::new()
        };
        for &v in &samples {
            min = min.min(v);
            max = max.max(v);
        }
        slices.push(ChannelSlice {
            id: channel.id,
            name: channel.name.clone(),
            color: channel.color,
            start: slice_start,
            samples,
        });
    }

    let y_range = if min.is_finite() && max.is_finite() {
        Span::new(min, max)
    } else {
        Span::new(0.0, 1.0)
    };

    let half = view.width() * 0.5;
    let c = cursor as f64;
    let x_range = Span::new(c - half - x_axis_offset, c + half - x_axis_offset);

    Frame {
        cursor,
        slices,
        x_range,
        y_range,
    }
}
