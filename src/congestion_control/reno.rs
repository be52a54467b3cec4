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

use super::CongestionState;
use super::GrowthPolicy;
use super::WindowState;

/// Reno window growth.
///
/// The window grows once per window worth of acknowledgements: it doubles in
/// slow start, and grows by one packet in congestion avoidance.
#[derive(Debug)]
pub struct Reno {
    /// Initial congestion window in packets.
    initial_cwnd: u64,
}

impl Reno {
    pub fn new(initial_cwnd: u64) -> Self {
        Self {
            initial_cwnd: initial_cwnd.max(1),
        }
    }
}

impl GrowthPolicy for Reno {
    fn name(&self) -> &str {
        "RENO"
    }

    fn initial_window(&self) -> u64 {
        self.initial_cwnd
    }

    fn on_ack(&mut self, window: &mut WindowState, rtt: Option<f64>) {
        if window.ack_count < window.cwnd {
            return;
        }

        match window.state {
            CongestionState::SlowStart => {
                window.cwnd = window.cwnd.saturating_mul(2);
            }
            CongestionState::CongestionAvoidance => {
                window.cwnd = window.cwnd.saturating_add(1);
            }
            CongestionState::FastRecovery => return,
        }
        window.ack_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reno_init() {
        let r = Reno::new(0);
        assert_eq!(r.name(), "RENO");
        assert_eq!(r.initial_window(), 1);
        assert_eq!(Reno::new(10).initial_window(), 10);
    }

    #[test]
    fn reno_slow_start() {
        let mut r = Reno::new(2);
        let mut w = WindowState::new(2, u64::MAX, 65535);

        w.ack_count = 1;
        r.on_ack(&mut w, None);
        assert_eq!(w.cwnd, 2);
        assert_eq!(w.ack_count, 1);

        w.ack_count = 2;
        r.on_ack(&mut w, Some(0.1));
        assert_eq!(w.cwnd, 4);
        assert_eq!(w.ack_count, 0);
    }

    #[test]
    fn reno_congestion_avoidance() {
        let mut r = Reno::new(2);
        let mut w = WindowState::new(4, 4, 65535);
        w.state = CongestionState::CongestionAvoidance;

        for _ in 0..3 {
            w.ack_count += 1;
            r.on_ack(&mut w, None);
            assert_eq!(w.cwnd, 4);
        }
        w.ack_count += 1;
        r.on_ack(&mut w, None);
        assert_eq!(w.cwnd, 5);
        assert_eq!(w.ack_count, 0);
    }

    #[test]
    fn reno_fast_recovery() {
        let mut r = Reno::new(2);
        let mut w = WindowState::new(2, 4, 65535);
        w.state = CongestionState::FastRecovery;
        w.ack_count = 5;

        r.on_ack(&mut w, None);
        assert_eq!(w.cwnd, 2);
        assert_eq!(w.ack_count, 5);
        assert!(r.on_drop(&w));
    }
}
