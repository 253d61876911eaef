use crate::channel::{ChannelId, Color, Palette};
use crate::config::PlaybackConfig;
use crate::error::{EngineError, Result};
use crate::session::GraphSession;
use crate::viewport::Frame;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// The two graph lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionId {
    A,
    B,
}

impl SessionId {
    pub const ALL: [SessionId; 2] = [SessionId::A, SessionId::B];

    pub fn other(self) -> SessionId {
        match self {
            SessionId::A => SessionId::B,
            SessionId::B => SessionId::A,
        }
    }

    pub fn index(self) -> usize {
        match self {
            SessionId::A => 0,
            SessionId::B => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionId::A => "Graph A",
            SessionId::B => "Graph B",
        }
    }
}

/// Owns both graph sessions and the link state, and exposes the
/// engine's control surface to the UI layer.
///
/// Selection is explicit rather than ambient UI state: operations that
/// need "the current graph" go through [`Monitor::active`] and fail
/// with `NoSessionSelected` when nothing is selected.
#[derive(Debug)]
pub struct Monitor {
    config: PlaybackConfig,
    sessions: [GraphSession; 2],
    linked: bool,
    active: Option<SessionId>,
    next_channel_id: u64,
    clock_epoch: u64,
}

impl Default for Monitor {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

impl Monitor {
    pub fn new(config: PlaybackConfig) -> Self {
        let sessions = [
            GraphSession::new(&config, Palette::lane_a()),
            GraphSession::new(&config, Palette::lane_b()),
        ];
        Self {
            config,
            sessions,
            linked: false,
            active: None,
            next_channel_id: 1,
            clock_epoch: 0,
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn session(&self, id: SessionId) -> &GraphSession {
        &self.sessions[id.index()]
    }

    pub fn select(&mut self, session: Option<SessionId>) {
        self.active = session;
    }

    pub fn selected(&self) -> Option<SessionId> {
        self.active
    }

    /// The session targeted by selection-driven operations.
    pub fn active(&self) -> Result<SessionId> {
        self.active.ok_or(EngineError::NoSessionSelected)
    }

    /// Register a parsed signal buffer as a new channel of `session`.
    /// Restarts that session's timeline and its playback clock.
    pub fn load_channel(
        &mut self,
        session: SessionId,
        buffer: Vec<f64>,
        name: impl Into<String>,
    ) -> Result<ChannelId> {
        let id = ChannelId(self.next_channel_id);
        self.sessions[session.index()].add_channel(id, name, buffer)?;
        self.next_channel_id += 1;
        self.clock_epoch += 1;
        info!("{}: loaded channel {:?}", session.label(), id);
        Ok(id)
    }

    /// Load into the currently selected session.
    pub fn load_into_active(
        &mut self,
        buffer: Vec<f64>,
        name: impl Into<String>,
    ) -> Result<ChannelId> {
        let session = self.active()?;
        self.load_channel(session, buffer, name)
    }

    pub fn set_playing(&mut self, session: SessionId, playing: bool) {
        if self.control_is_inert(session) {
            return;
        }
        if self.linked {
            self.sessions[0].set_playing(playing);
            self.sessions[1].set_playing(playing);
        } else {
            self.sessions[session.index()].set_playing(playing);
        }
    }

    pub fn toggle_playing(&mut self, session: SessionId) {
        let target = !self.sessions[session.index()].is_playing();
        self.set_playing(session, target);
    }

    /// Raw 0..=100 speed-slider value, mapped linearly onto the
    /// configured rate range.
    pub fn set_rate_slider(&mut self, session: SessionId, raw: u8) {
        let rate = self.config.rate_for_slider(raw);
        self.set_rate_multiplier(session, rate);
    }

    pub fn set_rate_multiplier(&mut self, session: SessionId, rate: f64) {
        if self.control_is_inert(session) {
            return;
        }
        if self.linked {
            self.sessions[0].set_rate(rate);
            self.sessions[1].set_rate(rate);
        } else {
            self.sessions[session.index()].set_rate(rate);
        }
    }

    pub fn rewind(&mut self, session: SessionId) {
        if self.control_is_inert(session) {
            return;
        }
        if self.linked {
            self.sessions[0].rewind();
            self.sessions[1].rewind();
        } else {
            self.sessions[session.index()].rewind();
        }
    }

    pub fn zoom_in(&mut self, session: SessionId) {
        if self.control_is_inert(session) {
            return;
        }
        if self.linked {
            self.sessions[0].zoom_in();
            self.sessions[1].zoom_in();
        } else {
            self.sessions[session.index()].zoom_in();
        }
    }

    pub fn zoom_out(&mut self, session: SessionId) {
        if self.control_is_inert(session) {
            return;
        }
        if self.linked {
            self.sessions[0].zoom_out();
            self.sessions[1].zoom_out();
        } else {
            self.sessions[session.index()].zoom_out();
        }
    }

    /// Manual horizontal pan. When linked, Graph A's scrollbar drives
    /// both lanes to the identical x-range.
    pub fn scroll(&mut self, session: SessionId, raw: i64) {
        if self.control_is_inert(session) {
            return;
        }
        if self.linked {
            self.sessions[0].scroll(raw);
            let view = self.sessions[0].view();
            self.sessions[1].set_view(view);
        } else {
            self.sessions[session.index()].scroll(raw);
        }
    }

    pub fn set_hidden(&mut self, session: SessionId, id: ChannelId, hidden: bool) -> Result<()> {
        self.sessions[session.index()].set_hidden(id, hidden)
    }

    pub fn rename_channel(
        &mut self,
        session: SessionId,
        id: ChannelId,
        new_name: impl Into<String>,
    ) -> Result<()> {
        self.sessions[session.index()].rename_channel(id, new_name)
    }

    pub fn set_color(&mut self, session: SessionId, id: ChannelId, color: Color) -> Result<()> {
        self.sessions[session.index()].set_color(id, color)
    }

    /// Transfer a channel between sessions. Validated up front so a
    /// failure leaves both registries untouched, and completed in one
    /// step so no tick ever observes the channel in neither or both.
    /// Buffer and display color travel with the channel.
    pub fn move_channel(&mut self, id: ChannelId, from: SessionId, to: SessionId) -> Result<()> {
        let name = self.sessions[from.index()].channel(id)?.name.clone();
        if from == to {
            return Ok(());
        }
        if self.sessions[to.index()].has_name(&name) {
            return Err(EngineError::DuplicateName(name));
        }
        let channel = self.sessions[from.index()].take_channel(id)?;
        self.sessions[to.index()].adopt_channel(channel);
        info!("moved channel {:?}: {} -> {}", id, from.label(), to.label());
        Ok(())
    }

    /// Couple or decouple the two lanes.
    ///
    /// Enabling resets both sessions to a shared neutral state: rate
    /// 1.0, cursor 0, playing, clocks restarted at the base interval.
    /// Disabling touches no play state, so each lane resumes whatever
    /// its own `playing` flag says.
    pub fn set_linked(&mut self, linked: bool) {
        if self.linked == linked {
            return;
        }
        self.linked = linked;
        self.sessions[0].reset_scroll_state();
        if linked {
            for session in &mut self.sessions {
                session.set_rate(1.0);
                session.rewind();
            }
            self.clock_epoch += 1;
            info!("graphs linked; shared clock restarted");
        } else {
            debug!("graphs unlinked");
        }
    }

    pub fn linked(&self) -> bool {
        self.linked
    }

    /// True while the link suppresses this session's independent
    /// playback controls (for UI graying).
    pub fn controls_locked(&self, session: SessionId) -> bool {
        self.linked && session == SessionId::B
    }

    fn control_is_inert(&self, session: SessionId) -> bool {
        self.controls_locked(session)
    }

    /// On-demand frame snapshot; report tooling consumes the
    /// serialized result.
    pub fn frame(&mut self, session: SessionId) -> Frame {
        self.sessions[session.index()].frame()
    }

    /// Bumped by operations that restart playback clocks (channel
    /// load, link enable). The scheduler re-arms when it changes.
    pub fn clock_epoch(&self) -> u64 {
        self.clock_epoch
    }

    /// One independent-clock step for a single session.
    pub fn tick_session(&mut self, session: SessionId) -> Option<Frame> {
        self.sessions[session.index()].tick()
    }

    /// One shared-clock step. Cursors advance together, and only when
    /// both sessions are individually playing: linking forces the rate
    /// and pan to match, it does not force-start playback.
    pub fn tick_linked(&mut self) -> Vec<(SessionId, Frame)> {
        if !(self.sessions[0].is_playing() && self.sessions[1].is_playing()) {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(2);
        for id in SessionId::ALL {
            if let Some(frame) = self.sessions[id.index()].tick() {
                out.push((id, frame));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    fn loaded_monitor() -> Monitor {
        let mut m = Monitor::default();
        m.load_channel(SessionId::A, ramp(5000), "ECG").unwrap();
        m.load_channel(SessionId::B, ramp(5000), "PPG").unwrap();
        m
    }

    #[test]
    fn channel_ids_are_unique_across_sessions() {
        let mut m = Monitor::default();
        let a = m.load_channel(SessionId::A, ramp(10), "ECG").unwrap();
        let b = m.load_channel(SessionId::B, ramp(10), "PPG").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn selector_gates_selection_driven_loads() {
        let mut m = Monitor::default();
        assert_eq!(
            m.load_into_active(ramp(10), "ECG"),
            Err(EngineError::NoSessionSelected)
        );
        m.select(Some(SessionId::B));
        let id = m.load_into_active(ramp(10), "ECG").unwrap();
        assert!(m.session(SessionId::B).has_channel(id));
    }

    #[test]
    fn failed_load_burns_no_channel_id() {
        let mut m = Monitor::default();
        assert!(m.load_channel(SessionId::A, vec![], "ECG").is_err());
        let id = m.load_channel(SessionId::A, ramp(10), "ECG").unwrap();
        assert_eq!(id, ChannelId(1));
    }

    #[test]
    fn linking_resets_rates_and_cursors() {
        let mut m = loaded_monitor();
        m.set_rate_slider(SessionId::A, 75);
        m.set_rate_slider(SessionId::B, 20);
        for _ in 0..100 {
            m.tick_session(SessionId::A);
        }
        assert_eq!(m.session(SessionId::A).cursor(), 100);

        m.set_linked(true);
        assert_eq!(m.session(SessionId::A).rate(), 1.0);
        assert_eq!(m.session(SessionId::B).rate(), 1.0);
        assert_eq!(m.session(SessionId::A).cursor(), 0);
        assert_eq!(m.session(SessionId::B).cursor(), 0);
        assert!(m.session(SessionId::A).is_playing());
        assert!(m.session(SessionId::B).is_playing());
    }

    #[test]
    fn linking_is_idempotent_and_bumps_the_clock_epoch() {
        let mut m = loaded_monitor();
        let before = m.clock_epoch();
        m.set_linked(true);
        let after = m.clock_epoch();
        assert_eq!(after, before + 1);
        m.set_linked(true);
        assert_eq!(m.clock_epoch(), after);
    }

    #[test]
    fn linked_b_lane_controls_are_inert() {
        let mut m = loaded_monitor();
        m.set_linked(true);
        assert!(m.controls_locked(SessionId::B));

        m.set_rate_slider(SessionId::B, 0);
        assert_eq!(m.session(SessionId::B).rate(), 1.0);
        m.set_playing(SessionId::B, false);
        assert!(m.session(SessionId::B).is_playing());
        m.zoom_in(SessionId::B);
        assert_eq!(m.session(SessionId::B).zoom_factor(), 1.0);
        let view = m.session(SessionId::B).view();
        m.scroll(SessionId::B, 40);
        assert_eq!(m.session(SessionId::B).view(), view);
    }

    #[test]
    fn linked_a_lane_controls_drive_both() {
        let mut m = loaded_monitor();
        m.set_linked(true);
        m.set_rate_slider(SessionId::A, 100);
        assert_eq!(m.session(SessionId::A).rate(), 2.0);
        assert_eq!(m.session(SessionId::B).rate(), 2.0);
        m.zoom_in(SessionId::A);
        assert_eq!(
            m.session(SessionId::A).zoom_factor(),
            m.session(SessionId::B).zoom_factor()
        );
        m.set_playing(SessionId::A, false);
        assert!(!m.session(SessionId::A).is_playing());
        assert!(!m.session(SessionId::B).is_playing());
    }

    #[test]
    fn linked_scroll_mirrors_the_view_onto_b() {
        let mut m = loaded_monitor();
        m.set_linked(true);
        for _ in 0..400 {
            m.tick_linked();
        }
        m.set_playing(SessionId::A, false);
        m.scroll(SessionId::A, 50);
        assert_eq!(
            m.session(SessionId::A).view(),
            m.session(SessionId::B).view()
        );
    }

    #[test]
    fn unlinking_preserves_each_lanes_play_state() {
        let mut m = loaded_monitor();
        m.set_linked(true);
        m.set_playing(SessionId::A, false); // pauses both while linked
        m.set_linked(false);
        assert!(!m.session(SessionId::A).is_playing());
        assert!(!m.session(SessionId::B).is_playing());

        // B's own controls work again.
        m.set_playing(SessionId::B, true);
        assert!(m.session(SessionId::B).is_playing());
        assert!(!m.session(SessionId::A).is_playing());
    }

    #[test]
    fn linked_ticks_advance_only_when_both_lanes_play() {
        let mut m = loaded_monitor();
        m.set_linked(true);
        let events = m.tick_linked();
        assert_eq!(events.len(), 2);
        assert_eq!(m.session(SessionId::A).cursor(), 1);
        assert_eq!(m.session(SessionId::B).cursor(), 1);

        m.set_playing(SessionId::A, false);
        assert!(m.tick_linked().is_empty());
        assert_eq!(m.session(SessionId::A).cursor(), 1);
        assert_eq!(m.session(SessionId::B).cursor(), 1);
    }

    #[test]
    fn move_channel_is_a_complete_transfer() {
        let mut m = Monitor::default();
        let id = m.load_channel(SessionId::A, ramp(64), "ECG").unwrap();
        let color = m.session(SessionId::A).channel(id).unwrap().color;

        m.move_channel(id, SessionId::A, SessionId::B).unwrap();
        assert!(!m.session(SessionId::A).has_channel(id));
        let moved = m.session(SessionId::B).channel(id).unwrap();
        assert_eq!(moved.name, "ECG");
        assert_eq!(moved.color, color);
        assert_eq!(moved.len(), 64);
        let copies = SessionId::ALL
            .iter()
            .filter(|s| m.session(**s).has_channel(id))
            .count();
        assert_eq!(copies, 1);
    }

    #[test]
    fn move_between_ticks_never_doubles_or_drops_the_channel() {
        let mut m = loaded_monitor();
        let id = m.load_channel(SessionId::A, ramp(64), "Resp").unwrap();
        for step in 0..20 {
            let frames: Vec<Frame> = SessionId::ALL
                .iter()
                .filter_map(|&s| m.tick_session(s))
                .collect();
            let copies: usize = frames
                .iter()
                .flat_map(|f| &f.slices)
                .filter(|s| s.id == id)
                .count();
            assert_eq!(copies, 1, "tick {} saw {} copies", step, copies);
            if step == 9 {
                let (from, to) = if m.session(SessionId::A).has_channel(id) {
                    (SessionId::A, SessionId::B)
                } else {
                    (SessionId::B, SessionId::A)
                };
                m.move_channel(id, from, to).unwrap();
            }
        }
    }

    #[test]
    fn move_channel_failures_leave_both_sessions_untouched() {
        let mut m = Monitor::default();
        let a = m.load_channel(SessionId::A, ramp(8), "ECG").unwrap();
        m.load_channel(SessionId::B, ramp(8), "ECG").unwrap();

        assert_eq!(
            m.move_channel(a, SessionId::A, SessionId::B),
            Err(EngineError::DuplicateName("ECG".into()))
        );
        assert!(m.session(SessionId::A).has_channel(a));
        assert_eq!(m.session(SessionId::B).channels().len(), 1);

        assert_eq!(
            m.move_channel(ChannelId(99), SessionId::A, SessionId::B),
            Err(EngineError::ChannelNotFound(ChannelId(99)))
        );
    }

    #[test]
    fn move_to_same_session_is_a_checked_no_op() {
        let mut m = Monitor::default();
        let a = m.load_channel(SessionId::A, ramp(8), "ECG").unwrap();
        assert!(m.move_channel(a, SessionId::A, SessionId::A).is_ok());
        assert_eq!(m.session(SessionId::A).channels().len(), 1);
        assert!(m
            .move_channel(ChannelId(42), SessionId::A, SessionId::A)
            .is_err());
    }
}
