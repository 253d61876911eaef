use crate::monitor::{Monitor, SessionId};
use crate::viewport::Frame;
use log::trace;
use std::time::Instant;

/// One delivered advance-and-render cycle.
#[derive(Debug, Clone)]
pub struct TickEvent {
    pub session: SessionId,
    pub frame: Frame,
}

/// Cooperative playback clocks: one per session, or one shared clock
/// while the graphs are linked.
///
/// The scheduler never sleeps; the host loop calls [`poll`] with the
/// current instant and may sleep until [`next_deadline`]. Each firing
/// re-reads the owning session's tick interval, so a live rate change
/// takes effect on the next wake-up without restarting the clock.
/// Paused sessions' clocks keep firing but deliver nothing.
///
/// [`poll`]: TickScheduler::poll
/// [`next_deadline`]: TickScheduler::next_deadline
#[derive(Debug)]
pub struct TickScheduler {
    deadlines: [Instant; 2],
    epoch: u64,
}

impl TickScheduler {
    pub fn new(monitor: &Monitor, now: Instant) -> Self {
        let mut scheduler = Self {
            deadlines: [now, now],
            epoch: monitor.clock_epoch(),
        };
        scheduler.rearm(monitor, now);
        scheduler
    }

    /// Fire any clock whose deadline has passed. At most one firing per
    /// clock per poll; after a host stall the clock re-arms from `now`
    /// instead of replaying missed ticks.
    pub fn poll(&mut self, monitor: &mut Monitor, now: Instant) -> Vec<TickEvent> {
        if monitor.clock_epoch() != self.epoch {
            // A load or link restarted the timers; fresh clocks fire
            // one full interval from now.
            self.epoch = monitor.clock_epoch();
            self.rearm(monitor, now);
            return Vec::new();
        }

        let mut events = Vec::new();
        if monitor.linked() {
            if now >= self.deadlines[0] {
                for (session, frame) in monitor.tick_linked() {
                    events.push(TickEvent { session, frame });
                }
                let next = now + monitor.session(SessionId::A).tick_interval();
                self.deadlines = [next, next];
                trace!("shared clock fired; {} frame(s)", events.len());
            }
        } else {
            for session in SessionId::ALL {
                let slot = session.index();
                if now >= self.deadlines[slot] {
                    if let Some(frame) = monitor.tick_session(session) {
                        events.push(TickEvent { session, frame });
                    }
                    self.deadlines[slot] = now + monitor.session(session).tick_interval();
                }
            }
        }
        events
    }

    /// Earliest upcoming deadline; the host loop may sleep until then.
    pub fn next_deadline(&self, monitor: &Monitor) -> Instant {
        if monitor.linked() {
            self.deadlines[0]
        } else {
            self.deadlines[0].min(self.deadlines[1])
        }
    }

    fn rearm(&mut self, monitor: &Monitor, now: Instant) {
        for session in SessionId::ALL {
            self.deadlines[session.index()] = now + monitor.session(session).tick_interval();
        }
    }
}
