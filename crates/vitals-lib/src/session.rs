use crate::channel::{validate_buffer, Channel, ChannelId, Color, Palette};
use crate::config::{PlaybackConfig, ScrollMode};
use crate::error::{EngineError, Result};
use crate::viewport::{compute_frame, Frame, Span};
use std::time::Duration;

/// Playback state machine for one graph lane: an ordered channel
/// registry, a play cursor, a zoom level, and a scrollable viewport.
///
/// The session never renders; each tick it produces a [`Frame`] that an
/// external renderer draws.
#[derive(Debug, Clone)]
pub struct GraphSession {
    config: PlaybackConfig,
    palette: Palette,
    channels: Vec<Channel>,
    cursor: usize,
    zoom_steps: i32,
    playing: bool,
    rate: f64,
    tick_interval: Duration,
    view: Span,
    scroll_right_limit: f64,
    previous_scroll: i64,
}

impl GraphSession {
    pub fn new(config: &PlaybackConfig, palette: Palette) -> Self {
        Self {
            config: config.clone(),
            palette,
            channels: Vec::new(),
            cursor: 0,
            zoom_steps: 0,
            playing: false,
            rate: 1.0,
            tick_interval: config.base_interval(),
            view: Span::new(0.0, config.initial_view_width),
            scroll_right_limit: 0.0,
            previous_scroll: 100,
        }
    }

    /// Register a loaded buffer as a new channel. The channel takes the
    /// palette's next color, and the whole session's timeline restarts
    /// from sample zero with playback running.
    pub fn add_channel(
        &mut self,
        id: ChannelId,
        name: impl Into<String>,
        buffer: Vec<f64>,
    ) -> Result<()> {
        let name = name.into();
        validate_buffer(&buffer)?;
        self.ensure_name_free(&name, None)?;
        let color = self.palette.next();
        self.channels.push(Channel::new(id, name, color, buffer)?);
        self.cursor = 0;
        self.playing = true;
        Ok(())
    }

    /// Insert a channel that already exists (cross-session move),
    /// keeping its color and buffer. The caller has already checked the
    /// name against this session's registry.
    pub(crate) fn adopt_channel(&mut self, channel: Channel) {
        self.channels.push(channel);
    }

    pub(crate) fn has_name(&self, name: &str) -> bool {
        self.channels.iter().any(|c| c.name == name)
    }

    /// Remove and return a channel (cross-session move).
    pub(crate) fn take_channel(&mut self, id: ChannelId) -> Result<Channel> {
        let idx = self.index_of(id)?;
        Ok(self.channels.remove(idx))
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, id: ChannelId) -> Result<&Channel> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .ok_or(EngineError::ChannelNotFound(id))
    }

    pub fn has_channel(&self, id: ChannelId) -> bool {
        self.channels.iter().any(|c| c.id == id)
    }

    pub fn rename_channel(&mut self, id: ChannelId, new_name: impl Into<String>) -> Result<()> {
        let new_name = new_name.into();
        let idx = self.index_of(id)?;
        self.ensure_name_free(&new_name, Some(id))?;
        self.channels[idx].name = new_name;
        Ok(())
    }

    /// Toggle visibility. The registry entry (name, color, buffer) is
    /// untouched; the next frame simply stops including the channel.
    pub fn set_hidden(&mut self, id: ChannelId, hidden: bool) -> Result<()> {
        let idx = self.index_of(id)?;
        self.channels[idx].hidden = hidden;
        Ok(())
    }

    pub fn set_color(&mut self, id: ChannelId, color: Color) -> Result<()> {
        let idx = self.index_of(id)?;
        self.channels[idx].color = color;
        Ok(())
    }

    /// Start or stop cursor advance. Idempotent; on the transition into
    /// pause the cursor position becomes the scroll right limit, so
    /// manual scrolling cannot run past the pause point.
    pub fn set_playing(&mut self, playing: bool) {
        if self.playing == playing {
            return;
        }
        self.playing = playing;
        if !playing {
            self.scroll_right_limit = self.cursor as f64;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Set the playback-rate multiplier. The derived tick interval is
    /// picked up by the scheduler at its next firing.
    pub fn set_rate(&mut self, rate: f64) {
        self.rate = self.config.clamp_rate(rate);
        self.tick_interval =
            Duration::from_secs_f64(self.config.base_interval_ms as f64 / self.rate / 1000.0);
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.playing = true;
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Current zoom factor, derived from the press counter so that N
    /// zoom-ins followed by N zoom-outs restore it exactly.
    pub fn zoom_factor(&self) -> f64 {
        self.config.zoom_step.powi(self.zoom_steps)
    }

    pub fn zoom_in(&mut self) {
        if self.zoom_steps >= self.config.max_zoom_steps {
            return;
        }
        self.zoom_steps += 1;
        self.rescale_view();
    }

    pub fn zoom_out(&mut self) {
        if self.zoom_steps <= -self.config.max_zoom_steps {
            return;
        }
        self.zoom_steps -= 1;
        self.rescale_view();
    }

    fn rescale_view(&mut self) {
        let center = self.view.center();
        let half = self.config.initial_view_width * self.zoom_factor() * 0.5;
        self.view = Span::new(center - half, center + half);
    }

    /// Pan the viewport from a raw scrollbar value. The visible width
    /// is preserved; the right edge is clamped to the last pause point
    /// and the left edge to the start of the buffer.
    pub fn scroll(&mut self, raw: i64) {
        let width = self.view.width();
        let delta = match self.config.scroll_mode {
            ScrollMode::Signed => (raw - self.previous_scroll) as f64,
            ScrollMode::Legacy => {
                if raw > self.previous_scroll {
                    (raw - self.previous_scroll) as f64
                } else {
                    -(raw.abs() as f64)
                }
            }
        };

        let mut end = self.view.end + delta;
        if end > self.scroll_right_limit {
            end = self.scroll_right_limit;
        }
        let mut start = end - width;
        if start < 0.0 {
            start = 0.0;
            end = start + width;
        }
        self.view = Span::new(start, end);
        self.previous_scroll = raw;
    }

    pub fn view(&self) -> Span {
        self.view
    }

    pub(crate) fn set_view(&mut self, view: Span) {
        self.view = view;
    }

    /// Link bookkeeping: back to the scrollbar's initial raw value and
    /// a zeroed pause limit.
    pub(crate) fn reset_scroll_state(&mut self) {
        self.previous_scroll = 100;
        self.scroll_right_limit = 0.0;
    }

    pub fn scroll_right_limit(&self) -> f64 {
        self.scroll_right_limit
    }

    /// Compute the current frame and commit its x-range as the new
    /// surface view.
    pub fn frame(&mut self) -> Frame {
        let frame = compute_frame(
            &self.channels,
            self.cursor,
            self.zoom_factor(),
            self.view,
            self.config.slice_window,
            self.config.x_axis_offset,
        );
        self.view = frame.x_range;
        frame
    }

    /// One playback step: render, then advance. Returns `None` while
    /// paused (the renderer keeps its last frame).
    pub fn tick(&mut self) -> Option<Frame> {
        if !self.playing {
            return None;
        }
        let frame = self.frame();
        self.cursor += 1;
        Some(frame)
    }

    fn index_of(&self, id: ChannelId) -> Result<usize> {
        self.channels
            .iter()
            .position(|c| c.id == id)
            .ok_or(EngineError::ChannelNotFound(id))
    }

    fn ensure_name_free(&self, name: &str, except: Option<ChannelId>) -> Result<()> {
        if self
            .channels
            .iter()
            .any(|c| c.name == name && Some(c.id) != except)
        {
            return Err(EngineError::DuplicateName(name.to_string()));
        }
        Ok(())
    }
}
