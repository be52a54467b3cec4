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

//! Per-flow engine.
//!
//! An `Engine` owns the congestion window, the RTT estimate and the block
//! scheduler of a single flow. The runtime drives it with three calls:
//! `on_packet_sent()`, `on_congestion_event()` and `select_block()`. All of
//! them take the current time in seconds as provided by the runtime; the
//! engine never reads a clock itself.

use log::*;
use serde::Serialize;

use crate::congestion_control::build_growth_policy;
use crate::congestion_control::CongestionEvent;
use crate::congestion_control::CongestionState;
use crate::congestion_control::EventOutcome;
use crate::congestion_control::GrowthPolicy;
use crate::congestion_control::WindowState;
use crate::rtt::RttEstimator;
use crate::scheduler::build_block_scheduler;
use crate::scheduler::BlockScheduler;
use crate::scheduler::SchedulingContext;
use crate::scheduler::Selection;
use crate::Block;
use crate::Config;
use crate::Result;

/// The sending parameters returned to the runtime after each event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlDecision {
    /// Congestion window in packets.
    pub cwnd: u64,

    /// Send rate in bits per second. `None` means uncapped.
    pub send_rate: Option<f64>,
}

/// Statistics about a flow.
#[derive(Debug, Clone, Default)]
pub struct EngineStats {
    /// The number of packets sent.
    pub sent_count: u64,

    /// The number of acknowledgements accepted.
    pub acked_count: u64,

    /// The number of duplicate or stale events ignored.
    pub ignored_count: u64,

    /// The number of drops counted, at most one per time step.
    pub lost_count: u64,

    /// The number of drops absorbed without reducing the window.
    pub absorbed_lost_count: u64,

    /// The number of fast recoveries.
    pub recovery_count: u64,

    /// The number of blocks selected.
    pub selected_count: u64,

    /// Time of the last packet sent.
    pub last_sent_time: Option<f64>,

    /// Identifier of the last selected block.
    pub last_selected_block: Option<u64>,
}

/// Congestion control and block scheduling engine of a flow.
#[derive(Debug)]
pub struct Engine {
    /// Window state machine.
    window: WindowState,

    /// Window growth algorithm.
    growth: Box<dyn GrowthPolicy + Send>,

    /// Block scheduling algorithm.
    scheduler: Box<dyn BlockScheduler + Send>,

    /// RTT estimation.
    rtt: RttEstimator,

    /// Configured send rate, `None` if uncapped.
    send_rate: Option<f64>,

    /// Send rate in use.
    cur_send_rate: Option<f64>,

    /// Flow statistics.
    stats: EngineStats,

    /// Unique trace id for debug logging.
    trace_id: String,
}

impl Engine {
    /// Create a new engine.
    pub fn new(conf: &Config) -> Engine {
        let growth = build_growth_policy(conf);
        let window = WindowState::new(
            growth.initial_window(),
            conf.slow_start_thresh,
            conf.max_congestion_window,
        );

        Engine {
            window,
            growth,
            scheduler: build_block_scheduler(conf),
            rtt: RttEstimator::new(),
            send_rate: conf.send_rate,
            cur_send_rate: conf.send_rate,
            stats: EngineStats::default(),
            trace_id: String::from(""),
        }
    }

    /// Set trace id.
    pub fn set_trace_id(&mut self, trace_id: &str) {
        self.trace_id = trace_id.to_string();
    }

    /// Handle packet sent event.
    pub fn on_packet_sent(&mut self, now: f64) {
        self.stats.sent_count += 1;
        self.stats.last_sent_time = Some(now);

        trace!(
            "now={} {} {} ON_SENT cwnd={}",
            now,
            self.trace_id,
            self.growth.name(),
            self.window.cwnd
        );
    }

    /// Handle a congestion event and return the parameters to send with.
    ///
    /// Duplicate and stale events leave the state untouched, but a decision
    /// is returned all the same.
    pub fn on_congestion_event(&mut self, now: f64, event: CongestionEvent) -> ControlDecision {
        let outcome = self
            .window
            .on_event(now, &event, &mut self.rtt, self.growth.as_mut());

        match outcome {
            EventOutcome::Acked => self.stats.acked_count += 1,
            EventOutcome::Recovered => {
                self.stats.lost_count += 1;
                self.stats.recovery_count += 1;
            }
            EventOutcome::Absorbed => {
                self.stats.lost_count += 1;
                self.stats.absorbed_lost_count += 1;
            }
            EventOutcome::Ignored => self.stats.ignored_count += 1,
            EventOutcome::Other => (),
        }
        self.cur_send_rate = self.send_rate;

        trace!(
            "now={} {} {} ON_EVENT {} {:?} cwnd={} ssthresh={} state={}",
            now,
            self.trace_id,
            self.growth.name(),
            event.event_type(),
            outcome,
            self.window.cwnd,
            self.window.ssthresh,
            self.window.state
        );

        self.decision()
    }

    /// Select the next block to send from a snapshot of the send queue.
    ///
    /// `blocks` is only read. The returned index refers to it.
    pub fn select_block(&mut self, now: f64, blocks: &[Block]) -> Result<Selection> {
        let ctx = SchedulingContext {
            rtt: self.rtt.current(now),
            send_rate: self.cur_send_rate,
        };

        let selection = self.scheduler.on_select(now, blocks, &ctx)?;
        if let Selection::Selected(ref b) = selection {
            self.stats.selected_count += 1;
            self.stats.last_selected_block = Some(b.id);
        }

        trace!(
            "now={} {} {} ON_SELECT blocks={} rtt={:?} {:?}",
            now,
            self.trace_id,
            self.scheduler.name(),
            blocks.len(),
            ctx.rtt,
            selection
        );

        Ok(selection)
    }

    /// Return the current sending parameters.
    pub fn decision(&self) -> ControlDecision {
        ControlDecision {
            cwnd: self.window.cwnd,
            send_rate: self.cur_send_rate,
        }
    }

    /// Congestion window in packets.
    pub fn congestion_window(&self) -> u64 {
        self.window.congestion_window()
    }

    /// Slow start threshold in packets.
    pub fn slow_start_thresh(&self) -> u64 {
        self.window.slow_start_thresh()
    }

    /// Congestion control state.
    pub fn state(&self) -> CongestionState {
        self.window.state()
    }

    /// Smoothed RTT in seconds, if any.
    pub fn smoothed_rtt(&self) -> Option<f64> {
        self.rtt.smoothed_rtt()
    }

    /// Send rate in bits per second, `None` if uncapped.
    pub fn send_rate(&self) -> Option<f64> {
        self.cur_send_rate
    }

    /// Statistics about the flow.
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Name of the congestion control algorithm.
    pub fn congestion_control_name(&self) -> &str {
        self.growth.name()
    }

    /// Name of the block scheduling algorithm.
    pub fn block_scheduler_name(&self) -> &str {
        self.scheduler.name()
    }
}
