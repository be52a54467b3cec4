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

//! DTPCC is a per-flow congestion control and block scheduling engine for
//! deadline-aware transport.
//!
//! The runtime owns the network and the clock. For each flow it keeps an
//! [`Engine`] and calls it back:
//!
//! * On every congestion event (a packet acknowledged, a packet lost, or any
//!   other notification), the engine updates its RTT estimate and congestion
//!   window, and returns a [`ControlDecision`] with the window and the send
//!   rate to use.
//! * Whenever the sender can transmit, the engine picks the next block from a
//!   snapshot of the send queue. Blocks that can no longer meet their deadline
//!   are never picked, the others are weighed by their remaining slack and
//!   their priority.
//!
//! ## Congestion control
//!
//! * **Reno**: doubles the window every round trip in slow start, grows it by
//!   one packet per round trip afterwards, and halves it on loss.
//! * **Hybla**: scales the Reno growth by the ratio between the flow's RTT and
//!   a reference RTT, and absorbs isolated losses.
//!
//! ## Block scheduling
//!
//! * **Deadline**: the smallest weighted slack among feasible blocks.
//! * **FIFO**: the oldest block that has not expired yet.
//!
//! ## Get started
//!
//! ```
//! use dtpcc::{Block, CongestionEvent, Config, Engine};
//!
//! let mut engine = Engine::new(&Config::new()?);
//! let decision = engine.on_congestion_event(1.0, CongestionEvent::Finished { latency: 0.1 });
//! assert_eq!(decision.cwnd, 2);
//!
//! let blocks = vec![Block::new(1, 0.9, 0.5, 1200, 0)];
//! assert_eq!(engine.select_block(1.0, &blocks)?.index(), Ok(0));
//! # Ok::<(), dtpcc::Error>(())
//! ```

use std::cmp;
use std::time::Duration;

/// Number of priority levels. Valid priorities are `0..MAX_PRIORITY`, lower
/// is more urgent.
pub const MAX_PRIORITY: u32 = 3;

/// Default upper limit of the congestion window in packets.
pub const MAX_CONGESTION_WINDOW: u64 = 65535;

/// Default reference RTT of Hybla.
pub const DEFAULT_REFERENCE_RTT: Duration = Duration::from_millis(25);

/// Default number of consecutive losses Hybla absorbs.
pub const DEFAULT_BACK_OFF_BUDGET: u64 = 10;

/// Default initial congestion window of Reno in packets.
pub const DEFAULT_RENO_INITIAL_WINDOW: u64 = 1;

/// Default initial congestion window of Hybla in packets.
pub const DEFAULT_HYBLA_INITIAL_WINDOW: u64 = 2;

/// Lower bound of configured durations.
const TIMER_GRANULARITY: Duration = Duration::from_millis(1);

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configurations about a flow.
#[derive(Debug, Clone)]
pub struct Config {
    /// The congestion control algorithm used for a flow.
    pub(crate) congestion_control_algorithm: CongestionControlAlgorithm,

    /// The block scheduling algorithm used for a flow.
    pub(crate) block_scheduling_algorithm: BlockSchedulingAlgorithm,

    /// The initial congestion window in packets. The algorithm's default
    /// is used if not set.
    pub(crate) initial_congestion_window: Option<u64>,

    /// The upper limit of the congestion window in packets.
    pub(crate) max_congestion_window: u64,

    /// The threshold for slow start in packets.
    pub(crate) slow_start_thresh: u64,

    /// The send rate in bits per second, `None` if uncapped.
    pub(crate) send_rate: Option<f64>,

    /// The reference RTT of Hybla.
    pub(crate) reference_rtt: Duration,

    /// The number of consecutive losses Hybla absorbs.
    pub(crate) hybla_back_off_budget: u64,

    /// The number of priority levels.
    pub(crate) max_priority: u32,
}

impl Config {
    /// Create default configuration.
    pub fn new() -> Result<Self> {
        Ok(Self::default())
    }

    /// Set congestion control algorithm that the flow would use.
    /// The default value is Reno.
    pub fn set_congestion_control_algorithm(&mut self, cca: CongestionControlAlgorithm) {
        self.congestion_control_algorithm = cca;
    }

    /// Set block scheduling algorithm that the flow would use.
    /// The default value is Deadline.
    pub fn set_block_scheduling_algorithm(&mut self, bsa: BlockSchedulingAlgorithm) {
        self.block_scheduling_algorithm = bsa;
    }

    /// Set the initial congestion window in packets.
    /// The default value is 1 for Reno and 2 for Hybla.
    pub fn set_initial_congestion_window(&mut self, packets: u64) {
        self.initial_congestion_window = Some(cmp::max(packets, 1));
    }

    /// Set the upper limit of the congestion window in packets.
    /// The default value is 65535.
    pub fn set_max_congestion_window(&mut self, packets: u64) {
        self.max_congestion_window = cmp::max(packets, 1);
    }

    /// Set the threshold for slow start in packets.
    /// The default value is the maximum value of u64.
    pub fn set_slow_start_thresh(&mut self, packets: u64) {
        self.slow_start_thresh = cmp::max(packets, 1);
    }

    /// Set the send rate in bits per second. An infinite rate means uncapped.
    /// The default is uncapped.
    pub fn set_send_rate(&mut self, bps: f64) -> Result<()> {
        if bps.is_nan() || bps <= 0.0 {
            return Err(Error::InvalidConfig(format!("send rate {}", bps)));
        }

        self.send_rate = if bps.is_infinite() { None } else { Some(bps) };
        Ok(())
    }

    /// Set the reference RTT of Hybla in milliseconds.
    /// The default value is 25ms.
    pub fn set_reference_rtt(&mut self, millis: u64) {
        self.reference_rtt = cmp::max(Duration::from_millis(millis), TIMER_GRANULARITY);
    }

    /// Set the number of consecutive losses Hybla absorbs before reducing
    /// the congestion window. Zero disables the back-off.
    /// The default value is 10.
    pub fn set_hybla_back_off_budget(&mut self, v: u64) {
        self.hybla_back_off_budget = v;
    }

    /// Set the number of priority levels. Blocks must carry a priority
    /// lower than this value.
    /// The default value is 3.
    pub fn set_max_priority(&mut self, v: u32) -> Result<()> {
        if v == 0 {
            return Err(Error::InvalidConfig("max priority 0".into()));
        }

        self.max_priority = v;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            congestion_control_algorithm: CongestionControlAlgorithm::default(),
            block_scheduling_algorithm: BlockSchedulingAlgorithm::default(),
            initial_congestion_window: None,
            max_congestion_window: MAX_CONGESTION_WINDOW,
            slow_start_thresh: u64::MAX,
            send_rate: None,
            reference_rtt: DEFAULT_REFERENCE_RTT,
            hybla_back_off_budget: DEFAULT_BACK_OFF_BUDGET,
            max_priority: MAX_PRIORITY,
        }
    }
}


pub use crate::block::Block;
pub use crate::congestion_control::CongestionControlAlgorithm;
pub use crate::congestion_control::CongestionEvent;
pub use crate::congestion_control::CongestionState;
pub use crate::congestion_control::EventType;
pub use crate::engine::ControlDecision;
pub use crate::engine::Engine;
pub use crate::engine::EngineStats;
pub use crate::error::Error;
pub use crate::scheduler::BlockSchedulingAlgorithm;
pub use crate::scheduler::SelectedBlock;
pub use crate::scheduler::Selection;

#[path = "congestion_control/congestion_control.rs"]
pub mod congestion_control;

#[path = "scheduler/scheduler.rs"]
pub mod scheduler;

mod block;
pub mod engine;
pub mod error;
pub mod rtt;
