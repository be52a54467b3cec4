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

#![allow(unused_variables)]

use core::str::FromStr;
use std::fmt;

use strum_macros::AsRefStr;
use strum_macros::Display;
use strum_macros::EnumString;

use crate::Config;
use crate::Error;
use crate::Result;
pub use hybla::Hybla;
pub use hybla::HyblaConfig;
pub use reno::Reno;
pub use window_state::CongestionState;
pub use window_state::EventOutcome;
pub use window_state::WindowState;

/// Available congestion control algorithm
#[repr(C)]
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum CongestionControlAlgorithm {
    /// Reno doubles the window every round trip in slow start, grows it by one
    /// packet per round trip in congestion avoidance, and halves it on loss.
    #[default]
    Reno,

    /// Hybla scales the Reno growth by the ratio between the flow's RTT and a
    /// reference RTT, so that long RTT flows open their window as fast, in
    /// time, as a flow on the reference path would. Isolated losses are
    /// absorbed by a back-off budget before the window is reduced.
    Hybla,
}

impl FromStr for CongestionControlAlgorithm {
    type Err = Error;

    fn from_str(algor: &str) -> Result<CongestionControlAlgorithm> {
        if algor.eq_ignore_ascii_case("reno") {
            Ok(CongestionControlAlgorithm::Reno)
        } else if algor.eq_ignore_ascii_case("hybla") {
            Ok(CongestionControlAlgorithm::Hybla)
        } else {
            Err(Error::InvalidConfig("unknown".into()))
        }
    }
}

/// Event type tags used by the runtime.
#[derive(Eq, PartialEq, Debug, Clone, Copy, EnumString, Display, AsRefStr)]
pub enum EventType {
    /// A packet was acknowledged.
    #[strum(serialize = "F")]
    Finished,

    /// A packet was lost.
    #[strum(serialize = "D")]
    Drop,

    /// Any other notification.
    #[strum(serialize = "T")]
    Temporary,
}

/// A congestion event reported by the runtime.
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum CongestionEvent {
    /// A packet was acknowledged after `latency` seconds.
    ///
    /// The latency must be a positive number to count as an RTT sample.
    Finished { latency: f64 },

    /// A packet was lost.
    Drop,

    /// Any other notification. It does not change the window.
    Temporary,
}

impl CongestionEvent {
    /// Build an event from a runtime type tag and an optional latency sample.
    pub fn from_parts(tag: &str, latency: Option<f64>) -> Result<CongestionEvent> {
        let event_type = EventType::from_str(tag)
            .map_err(|_| Error::InvalidEvent(format!("unknown event type {:?}", tag)))?;

        match event_type {
            EventType::Finished => match latency {
                Some(latency) if latency.is_finite() && latency > 0.0 => {
                    Ok(CongestionEvent::Finished { latency })
                }
                Some(latency) => Err(Error::InvalidEvent(format!("bad latency {}", latency))),
                None => Err(Error::InvalidEvent("missing latency".into())),
            },
            EventType::Drop => Ok(CongestionEvent::Drop),
            EventType::Temporary => Ok(CongestionEvent::Temporary),
        }
    }

    /// Type tag of the event.
    pub fn event_type(&self) -> EventType {
        match self {
            CongestionEvent::Finished { .. } => EventType::Finished,
            CongestionEvent::Drop => EventType::Drop,
            CongestionEvent::Temporary => EventType::Temporary,
        }
    }
}

/// Window growth interfaces shared by different algorithms.
///
/// The window state machine owns the transitions between slow start,
/// congestion avoidance and fast recovery. A growth policy only decides how
/// much the window grows on an acknowledgement, and whether a loss is worth
/// entering fast recovery.
pub trait GrowthPolicy {
    /// Name of congestion control algorithm.
    fn name(&self) -> &str;

    /// Initial congestion window in packets.
    fn initial_window(&self) -> u64;

    /// Grow the window for an accepted acknowledgement.
    ///
    /// Called in slow start and congestion avoidance only, after the ack was
    /// counted and its latency fed to the RTT estimator. `rtt` is the
    /// smoothed RTT in seconds, if any.
    fn on_ack(&mut self, window: &mut WindowState, rtt: Option<f64>);

    /// Decide whether the first loss of a time step enters fast recovery.
    fn on_drop(&mut self, window: &WindowState) -> bool {
        true
    }
}

impl fmt::Debug for dyn GrowthPolicy + Send {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "growth policy {}.", self.name())
    }
}

/// Build a growth policy.
pub fn build_growth_policy(conf: &Config) -> Box<dyn GrowthPolicy + Send> {
    match conf.congestion_control_algorithm {
        CongestionControlAlgorithm::Reno => Box::new(Reno::new(
            conf.initial_congestion_window
                .unwrap_or(crate::DEFAULT_RENO_INITIAL_WINDOW),
        )),
        CongestionControlAlgorithm::Hybla => Box::new(Hybla::new(HyblaConfig::from(conf))),
    }
}


mod hybla;
mod reno;
mod window_state;
