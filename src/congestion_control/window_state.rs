// Copyright (c) 2023 The TQUIC Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Reno style window state machine.
//!
//! The runtime reports events with a timestamp, and several events may share
//! one timestamp. Events are grouped into time steps:
//!
//! * Only the first loss of a time step counts. If an acknowledgement of the
//!   same time step already grew the window, the growth is undone before the
//!   window is reduced.
//! * An acknowledgement is only accepted if it is strictly newer than the
//!   last processed event, so duplicated and stale acknowledgements are
//!   ignored.
//! * Fast recovery recomputes the slow start threshold and falls through to
//!   congestion avoidance within the same event, and is never observed
//!   between two events.

use log::*;
use strum_macros::Display;

use super::CongestionEvent;
use super::GrowthPolicy;
use crate::rtt::RttEstimator;

/// Congestion control state.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Display)]
pub enum CongestionState {
    /// The window doubles every round trip.
    #[strum(serialize = "slow_start")]
    SlowStart,

    /// The window grows by one packet every round trip.
    #[strum(serialize = "congestion_avoidance")]
    CongestionAvoidance,

    /// A loss was detected and the window is about to be reduced.
    #[strum(serialize = "fast_recovery")]
    FastRecovery,
}

/// What an event did to the window state.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum EventOutcome {
    /// The acknowledgement was accepted.
    Acked,

    /// The loss entered fast recovery and the window was reduced.
    Recovered,

    /// The loss was counted but absorbed by the growth policy.
    Absorbed,

    /// The event was a duplicate or stale and changed nothing.
    Ignored,

    /// The event carries no congestion signal.
    Other,
}

/// Congestion window state of a flow.
#[derive(Debug, Clone)]
pub struct WindowState {
    /// Congestion window in packets.
    pub(crate) cwnd: u64,

    /// Slow start threshold in packets.
    pub(crate) ssthresh: u64,

    /// Upper limit of the congestion window in packets.
    pub(crate) max_cwnd: u64,

    /// Current state.
    pub(crate) state: CongestionState,

    /// Acknowledgements counted towards the next window increase.
    pub(crate) ack_count: u64,

    /// Losses that were not deduplicated.
    pub(crate) drop_count: u64,

    /// Window before the first acknowledgement of the current time step.
    last_cwnd: Option<u64>,

    /// Whether a loss was already handled in the current time step.
    step_dropped: bool,

    /// Time of the last processed acknowledgement or loss.
    last_event_time: Option<f64>,
}

impl WindowState {
    pub fn new(initial_cwnd: u64, ssthresh: u64, max_cwnd: u64) -> Self {
        let max_cwnd = max_cwnd.max(1);
        Self {
            cwnd: initial_cwnd.clamp(1, max_cwnd),
            ssthresh: ssthresh.max(1),
            max_cwnd,
            state: CongestionState::SlowStart,
            ack_count: 0,
            drop_count: 0,
            last_cwnd: None,
            step_dropped: false,
            last_event_time: None,
        }
    }

    /// Current congestion window in packets.
    pub fn congestion_window(&self) -> u64 {
        self.cwnd
    }

    /// Current slow start threshold in packets.
    pub fn slow_start_thresh(&self) -> u64 {
        self.ssthresh
    }

    /// Upper limit of the congestion window in packets.
    pub fn max_congestion_window(&self) -> u64 {
        self.max_cwnd
    }

    /// Current state.
    pub fn state(&self) -> CongestionState {
        self.state
    }

    /// Acknowledgements counted towards the next window increase.
    pub fn ack_count(&self) -> u64 {
        self.ack_count
    }

    /// Losses counted so far.
    pub fn drop_count(&self) -> u64 {
        self.drop_count
    }

    /// Check if in slow start.
    pub fn in_slow_start(&self) -> bool {
        self.state == CongestionState::SlowStart
    }

    /// Process an event reported at `now`.
    pub fn on_event(
        &mut self,
        now: f64,
        event: &CongestionEvent,
        rtt: &mut RttEstimator,
        policy: &mut dyn GrowthPolicy,
    ) -> EventOutcome {
        if self.last_event_time.map_or(true, |t| t < now) {
            // A new time step.
            self.last_cwnd = None;
            self.step_dropped = false;
        }

        let outcome = match *event {
            CongestionEvent::Drop => self.on_drop(now, policy),
            CongestionEvent::Finished { latency } => self.on_ack(now, latency, rtt, policy),
            CongestionEvent::Temporary => EventOutcome::Other,
        };

        if self.state == CongestionState::FastRecovery {
            self.ssthresh = (self.cwnd / 2).max(1);
            self.cwnd = self.ssthresh;
            self.state = CongestionState::CongestionAvoidance;

            debug!(
                "{}. fast recovery at {}, cwnd={}, ssthresh={}",
                policy.name(),
                now,
                self.cwnd,
                self.ssthresh
            );
        }

        outcome
    }

    fn on_drop(&mut self, now: f64, policy: &mut dyn GrowthPolicy) -> EventOutcome {
        // Losses reported together are one congestion signal.
        if self.step_dropped {
            return EventOutcome::Ignored;
        }
        self.step_dropped = true;
        self.drop_count += 1;
        self.advance(now);

        // Undo the growth of an acknowledgement in the same time step.
        if let Some(last_cwnd) = self.last_cwnd.take() {
            if last_cwnd != self.cwnd {
                trace!(
                    "{}. roll back cwnd from {} to {}",
                    policy.name(),
                    self.cwnd,
                    last_cwnd
                );
                self.cwnd = last_cwnd;
            }
        }

        if !policy.on_drop(self) {
            return EventOutcome::Absorbed;
        }

        self.state = CongestionState::FastRecovery;
        self.ack_count = 0;
        EventOutcome::Recovered
    }

    fn on_ack(
        &mut self,
        now: f64,
        latency: f64,
        rtt: &mut RttEstimator,
        policy: &mut dyn GrowthPolicy,
    ) -> EventOutcome {
        if self.last_event_time.map_or(false, |t| now <= t) {
            return EventOutcome::Ignored;
        }
        self.advance(now);
        self.last_cwnd = Some(self.cwnd);
        self.ack_count += 1;

        rtt.update(latency, now);

        match self.state {
            CongestionState::SlowStart | CongestionState::CongestionAvoidance => {
                policy.on_ack(self, rtt.smoothed_rtt());
            }
            CongestionState::FastRecovery => (),
        }
        self.cwnd = self.cwnd.clamp(1, self.max_cwnd);

        if self.state == CongestionState::SlowStart && self.cwnd >= self.ssthresh {
            self.state = CongestionState::CongestionAvoidance;

            debug!(
                "{}. exit slow start at {}, cwnd={}, ssthresh={}",
                policy.name(),
                now,
                self.cwnd,
                self.ssthresh
            );
        }

        trace!(
            "{}. ack at {}, cwnd={}, ack_count={}, state={}",
            policy.name(),
            now,
            self.cwnd,
            self.ack_count,
            self.state
        );

        EventOutcome::Acked
    }

    /// Never move the step clock backwards, even if the runtime does.
    fn advance(&mut self, now: f64) {
        self.last_event_time = Some(match self.last_event_time {
            Some(t) if t > now => t,
            _ => now,
        });
    }
}
