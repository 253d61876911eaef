use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Stable handle for a channel. Ids are allocated by the monitor and
/// stay valid across cross-session moves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ChannelId(pub u64);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display color, `0xRRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub const RED: Color = Color(0xFF0000);
    pub const GREEN: Color = Color(0x00FF00);
    pub const BLUE: Color = Color(0x0000FF);
    pub const YELLOW: Color = Color(0xFFFF00);
    pub const MAGENTA: Color = Color(0xFF00FF);
    pub const CYAN: Color = Color(0x00FFFF);

    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

/// Cycling color source for newly added channels. Each lane seeds its
/// own list so the two graphs stay visually distinct.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: Vec<Color>,
    cursor: usize,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors, cursor: 0 }
    }

    /// Default list for the first graph lane.
    pub fn lane_a() -> Self {
        use Color as C;
        Self::new(vec![
            C::RED,
            C::GREEN,
            C::BLUE,
            C::YELLOW,
            C::MAGENTA,
            C::MAGENTA,
            C::CYAN,
        ])
    }

    /// Default list for the second graph lane.
    pub fn lane_b() -> Self {
        use Color as C;
        Self::new(vec![
            C::MAGENTA,
            C::YELLOW,
            C::CYAN,
            C::YELLOW,
            C::MAGENTA,
            C::RED,
            C::GREEN,
        ])
    }

    /// Next color in the cycle.
    pub fn next(&mut self) -> Color {
        let color = self.colors[self.cursor % self.colors.len()];
        self.cursor += 1;
        color
    }
}

/// One registered channel: identity and display attributes plus the
/// sample buffer, which is immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub color: Color,
    pub hidden: bool,
    buffer: Vec<f64>,
}

impl Channel {
    pub fn new(id: ChannelId, name: impl Into<String>, color: Color, buffer: Vec<f64>) -> Result<Self> {
        validate_buffer(&buffer)?;
        Ok(Self {
            id,
            name: name.into(),
            color,
            hidden: false,
            buffer,
        })
    }

    pub fn samples(&self) -> &[f64] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// A loadable buffer is a non-empty flat sequence of finite samples.
pub fn validate_buffer(buffer: &[f64]) -> Result<()> {
    if buffer.is_empty() {
        return Err(EngineError::InvalidBuffer("buffer is empty"));
    }
    if buffer.iter().any(|v| !v.is_finite()) {
        return Err(EngineError::InvalidBuffer("buffer contains non-finite samples"));
    }
    Ok(())
}
