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

//! TCP Hybla.
//!
//! Hybla removes the dependence of the Reno window growth on the RTT. Let
//! `rho = RTT / RTT0`, where `RTT0` is a reference RTT. A Hybla flow grows
//! its window by `2^rho - 1` packets per acknowledgement in slow start, and by
//! `rho^2 / cwnd` packets per acknowledgement in congestion avoidance, which
//! lets a long RTT flow open its window, in time, as fast as a flow whose RTT
//! is `RTT0`.
//!
//! All arithmetic is in fixed point: `rho` is kept scaled by `2^3`, increments
//! are scaled by `2^7`, and the fractional part of `2^rho` is read from a table
//! in eighths.
//!
//! See <https://doi.org/10.1002/sat.799>.

use std::cmp;
use std::time::Duration;

use log::*;

use super::CongestionState;
use super::GrowthPolicy;
use super::Reno;
use super::WindowState;
use crate::Config;

/// `2^(i/8)` scaled by 128, for `i` in `0..8`.
const HYBLA_FRACTIONS: [u64; 8] = [128, 139, 152, 165, 181, 197, 215, 234];

/// Fixed point `1.0` of the window increment.
const INCREMENT_UNIT: u64 = 128;

/// Largest exponent used for the slow start increment.
const MAX_RHO_EXPONENT: u64 = 16;

/// Hybla Configuration.
#[derive(Debug, Clone)]
pub struct HyblaConfig {
    /// Reference RTT.
    reference_rtt: Duration,

    /// Consecutive losses absorbed before the window is reduced.
    back_off_budget: u64,

    /// Initial congestion window in packets.
    initial_congestion_window: u64,
}

impl HyblaConfig {
    pub fn from(conf: &Config) -> Self {
        Self {
            reference_rtt: conf.reference_rtt,
            back_off_budget: conf.hybla_back_off_budget,
            initial_congestion_window: conf
                .initial_congestion_window
                .unwrap_or(crate::DEFAULT_HYBLA_INITIAL_WINDOW),
        }
    }

    /// Update the reference RTT.
    pub fn set_reference_rtt(&mut self, reference_rtt: Duration) -> &mut Self {
        self.reference_rtt = reference_rtt;
        self
    }

    /// Update the back-off budget.
    pub fn set_back_off_budget(&mut self, back_off_budget: u64) -> &mut Self {
        self.back_off_budget = back_off_budget;
        self
    }
}

impl Default for HyblaConfig {
    fn default() -> Self {
        Self {
            reference_rtt: crate::DEFAULT_REFERENCE_RTT,
            back_off_budget: crate::DEFAULT_BACK_OFF_BUDGET,
            initial_congestion_window: crate::DEFAULT_HYBLA_INITIAL_WINDOW,
        }
    }
}

/// Hybla congestion control algorithm.
///
/// Until the first RTT sample is available, the window grows like Reno.
#[derive(Debug)]
pub struct Hybla {
    /// Configuration.
    config: HyblaConfig,

    /// Growth used while no RTT is known.
    reno: Reno,

    /// Integer part of rho. Zero until the first RTT sample.
    rho: u64,

    /// Rho scaled by `2^3`.
    rho_3ls: u64,

    /// Rho squared scaled by `2^7`.
    rho2_7ls: u64,

    /// Fractional window increments, scaled by `2^7`.
    snd_cwnd_cents: u64,

    /// Acknowledgements whose increment was less than one packet since the
    /// window last grew.
    snd_cwnd_cnt: u64,

    /// Minimum smoothed RTT in microseconds.
    min_rtt_us: u64,

    /// Losses absorbed and not yet paid back by acknowledgements.
    back_off: u64,
}

impl Hybla {
    pub fn new(config: HyblaConfig) -> Self {
        Self {
            reno: Reno::new(config.initial_congestion_window),
            config,
            rho: 0,
            rho_3ls: 0,
            rho2_7ls: 0,
            snd_cwnd_cents: 0,
            snd_cwnd_cnt: 0,
            min_rtt_us: u64::MAX,
            back_off: 0,
        }
    }

    /// Integer part of rho, zero before the first RTT sample.
    pub fn rho(&self) -> u64 {
        self.rho
    }

    /// Losses currently absorbed by the back-off budget.
    pub fn back_off(&self) -> u64 {
        self.back_off
    }

    /// Recompute rho from the given RTT.
    fn recalc_param(&mut self, rtt_us: u64) {
        let reference_us = cmp::max(self.config.reference_rtt.as_micros() as u64, 1);

        // Rho never goes below one.
        self.rho_3ls = cmp::max(rtt_us.saturating_mul(8) / reference_us, 8);
        self.rho = self.rho_3ls >> 3;
        self.rho2_7ls = self.rho_3ls.saturating_mul(self.rho_3ls).saturating_mul(2);
    }

    /// Window increment scaled by `2^7` for the current state.
    fn increment(&mut self, window: &WindowState) -> u64 {
        if window.state == CongestionState::SlowStart {
            // INC = 2^rho - 1
            let rho_fraction = (self.rho_3ls - (self.rho << 3)) as usize;
            let fraction = HYBLA_FRACTIONS
                .get(rho_fraction)
                .copied()
                .unwrap_or(INCREMENT_UNIT);

            ((1_u64 << cmp::min(self.rho, MAX_RHO_EXPONENT)) * fraction)
                .saturating_sub(INCREMENT_UNIT)
        } else {
            // INC = rho^2 / W
            let increment = self.rho2_7ls / cmp::max(window.cwnd, 1);
            if increment < INCREMENT_UNIT {
                self.snd_cwnd_cnt += 1;
            }
            increment
        }
    }

    /// Track the minimum RTT and update rho accordingly.
    fn on_rtt(&mut self, window: &mut WindowState, srtt: f64) {
        let rtt_us = cmp::max((srtt * 1_000_000.0).round() as u64, 1);

        if self.rho == 0 {
            // First RTT sample, open the window to rho packets.
            self.recalc_param(rtt_us);
            self.min_rtt_us = rtt_us;
            window.cwnd = cmp::max(window.cwnd, self.rho).min(window.max_cwnd);

            debug!(
                "{}. rho={}, rho_3ls={}, rtt={}us, cwnd={}",
                self.name(),
                self.rho,
                self.rho_3ls,
                rtt_us,
                window.cwnd
            );
        } else if rtt_us < self.min_rtt_us {
            self.recalc_param(rtt_us);
            self.min_rtt_us = rtt_us;

            trace!(
                "{}. min rtt {}us, rho={}, rho_3ls={}",
                self.name(),
                rtt_us,
                self.rho,
                self.rho_3ls
            );
        }
    }
}

impl GrowthPolicy for Hybla {
    fn name(&self) -> &str {
        "HYBLA"
    }

    fn initial_window(&self) -> u64 {
        self.config.initial_congestion_window
    }

    fn on_ack(&mut self, window: &mut WindowState, rtt: Option<f64>) {
        self.back_off = self.back_off.saturating_sub(1);

        match rtt {
            Some(srtt) => self.on_rtt(window, srtt),
            None if self.rho == 0 => return self.reno.on_ack(window, rtt),
            // Keep the last rho until a new sample arrives.
            None => (),
        }

        // Growth is driven by rho, not by counting a window of acks.
        window.ack_count = 0;

        let is_slow_start = window.state == CongestionState::SlowStart;
        let increment = self.increment(window);
        let odd = increment % INCREMENT_UNIT;

        window.cwnd = window.cwnd.saturating_add(increment >> 7);
        self.snd_cwnd_cents += odd;
        while self.snd_cwnd_cents >= INCREMENT_UNIT {
            window.cwnd = window.cwnd.saturating_add(1);
            self.snd_cwnd_cents -= INCREMENT_UNIT;
            self.snd_cwnd_cnt = 0;
        }

        // The increment rounds down to zero once cwnd exceeds rho^2, so keep
        // growing by one packet per window.
        if increment == 0 && self.snd_cwnd_cnt >= window.cwnd {
            window.cwnd = window.cwnd.saturating_add(1);
            self.snd_cwnd_cnt = 0;
        }

        if is_slow_start {
            window.cwnd = cmp::min(window.cwnd, window.ssthresh);
        }
        window.cwnd = cmp::min(window.cwnd, window.max_cwnd);

        trace!(
            "{}. increment={}, cents={}, cnt={}, cwnd={}",
            self.name(),
            increment,
            self.snd_cwnd_cents,
            self.snd_cwnd_cnt,
            window.cwnd
        );
    }

    fn on_drop(&mut self, window: &WindowState) -> bool {
        if self.back_off < self.config.back_off_budget {
            self.back_off += 1;
            debug!(
                "{}. absorb loss {}/{}, cwnd={}",
                self.name(),
                self.back_off,
                self.config.back_off_budget,
                window.cwnd
            );
            return false;
        }

        self.back_off = 0;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slow_start_window(cwnd: u64) -> WindowState {
        WindowState::new(cwnd, u64::MAX, crate::MAX_CONGESTION_WINDOW)
    }

    fn avoidance_window(cwnd: u64) -> WindowState {
        let mut w = WindowState::new(cwnd, cwnd, crate::MAX_CONGESTION_WINDOW);
        w.state = CongestionState::CongestionAvoidance;
        w
    }

    #[test]
    fn hybla_init() {
        let h = Hybla::new(HyblaConfig::default());
        assert_eq!(h.name(), "HYBLA");
        assert_eq!(h.initial_window(), 2);
        assert_eq!(h.rho(), 0);
        assert_eq!(h.back_off(), 0);
    }

    #[test]
    fn hybla_new_config() {
        let mut conf = HyblaConfig::default();
        assert_eq!(conf.reference_rtt, Duration::from_millis(25));
        assert_eq!(conf.back_off_budget, 10);

        conf.set_reference_rtt(Duration::from_millis(50));
        assert_eq!(conf.reference_rtt, Duration::from_millis(50));

        conf.set_back_off_budget(3);
        assert_eq!(conf.back_off_budget, 3);
    }

    #[test]
    fn hybla_recalc_param() {
        let mut h = Hybla::new(HyblaConfig::default());

        h.recalc_param(100_000);
        assert_eq!(h.rho_3ls, 32);
        assert_eq!(h.rho, 4);
        assert_eq!(h.rho2_7ls, 2048);

        h.recalc_param(110_000);
        assert_eq!(h.rho_3ls, 35);
        assert_eq!(h.rho, 4);
        assert_eq!(h.rho2_7ls, 2450);

        // Shorter than the reference RTT, rho stays one.
        h.recalc_param(5_000);
        assert_eq!(h.rho_3ls, 8);
        assert_eq!(h.rho, 1);
        assert_eq!(h.rho2_7ls, 128);
    }

    #[test]
    fn hybla_slow_start() {
        let mut h = Hybla::new(HyblaConfig::default());
        let mut w = slow_start_window(2);

        // rho = 4, increment = 2^4 * 128 - 128 = 15 packets.
        h.on_ack(&mut w, Some(0.1));
        assert_eq!(h.rho(), 4);
        assert_eq!(w.cwnd, 4 + 15);
        assert_eq!(h.snd_cwnd_cents, 0);

        h.on_ack(&mut w, Some(0.1));
        assert_eq!(w.cwnd, 4 + 30);
        assert_eq!(h.snd_cwnd_cents, 0);
    }

    #[test]
    fn hybla_slow_start_fraction() {
        let mut h = Hybla::new(HyblaConfig::default());
        let mut w = slow_start_window(2);

        // rho_3ls = 35, increment = 2^4 * 165 - 128 = 2512, that is 19
        // packets and 80/128.
        for (cwnd, cents) in [(23, 80), (43, 32), (62, 112), (82, 64)] {
            h.on_ack(&mut w, Some(0.11));
            assert_eq!((w.cwnd, h.snd_cwnd_cents), (cwnd, cents));
        }
    }

    #[test]
    fn hybla_slow_start_clamp() {
        let mut h = Hybla::new(HyblaConfig::default());
        let mut w = WindowState::new(2, 10, crate::MAX_CONGESTION_WINDOW);

        h.on_ack(&mut w, Some(0.1));
        assert_eq!(w.cwnd, 10);

        let mut w = WindowState::new(2, u64::MAX, 12);
        h.on_ack(&mut w, Some(0.1));
        assert_eq!(w.cwnd, 12);
    }

    #[test]
    fn hybla_congestion_avoidance() {
        let mut h = Hybla::new(HyblaConfig::default());
        let mut w = slow_start_window(2);
        h.on_ack(&mut w, Some(0.1));

        // rho^2 / cwnd = 16 / 32, half a packet per acknowledgement.
        let mut w = avoidance_window(32);
        h.on_ack(&mut w, Some(0.1));
        assert_eq!(w.cwnd, 32);
        assert_eq!(h.snd_cwnd_cents, 64);
        assert_eq!(h.snd_cwnd_cnt, 1);

        h.on_ack(&mut w, Some(0.1));
        assert_eq!(w.cwnd, 33);
        assert_eq!(h.snd_cwnd_cents, 0);
        assert_eq!(h.snd_cwnd_cnt, 0);

        // Below rho^2, more than one packet per acknowledgement.
        let mut w = avoidance_window(8);
        h.on_ack(&mut w, Some(0.1));
        assert_eq!(w.cwnd, 10);
        assert_eq!(h.snd_cwnd_cnt, 0);
    }

    #[test]
    fn hybla_stalled_increment() {
        let mut h = Hybla::new(HyblaConfig::default());
        let mut w = slow_start_window(1);
        h.on_ack(&mut w, Some(0.02));
        assert_eq!(h.rho(), 1);

        // rho^2 / cwnd rounds down to zero, one packet per window anyway.
        let mut w = avoidance_window(200);
        for _ in 0..199 {
            h.on_ack(&mut w, Some(0.02));
            assert_eq!(w.cwnd, 200);
        }
        h.on_ack(&mut w, Some(0.02));
        assert_eq!(w.cwnd, 201);
        assert_eq!(h.snd_cwnd_cnt, 0);
    }

    #[test]
    fn hybla_min_rtt() {
        let mut h = Hybla::new(HyblaConfig::default());
        let mut w = slow_start_window(2);
        h.on_ack(&mut w, Some(0.2));
        assert_eq!(h.rho(), 8);

        // A larger RTT does not change rho.
        h.on_ack(&mut w, Some(0.4));
        assert_eq!(h.rho(), 8);

        // A smaller one does.
        h.on_ack(&mut w, Some(0.05));
        assert_eq!(h.rho(), 2);
        assert_eq!(h.min_rtt_us, 50_000);
    }

    #[test]
    fn hybla_without_rtt() {
        let mut h = Hybla::new(HyblaConfig::default());
        let mut w = slow_start_window(2);

        // Reno growth until an RTT is known.
        w.ack_count = 2;
        h.on_ack(&mut w, None);
        assert_eq!(w.cwnd, 4);
        assert_eq!(h.rho(), 0);
    }

    #[test]
    fn hybla_keeps_rho_without_rtt() {
        let mut h = Hybla::new(HyblaConfig::default());
        let mut w = slow_start_window(2);
        w.ack_count = 1;
        h.on_ack(&mut w, Some(0.1));
        assert_eq!(w.cwnd, 19);
        assert_eq!(w.ack_count, 0);

        // Once rho is known, a missing estimate does not fall back to Reno.
        w.ack_count = 1000;
        h.on_ack(&mut w, None);
        assert_eq!(h.rho(), 4);
        assert_eq!(w.cwnd, 34);
        assert_eq!(w.ack_count, 0);
    }

    #[test]
    fn hybla_back_off() {
        let mut h = Hybla::new(HyblaConfig::default());
        let w = slow_start_window(2);

        for i in 1..=10 {
            assert!(!h.on_drop(&w));
            assert_eq!(h.back_off(), i);
        }
        assert!(h.on_drop(&w));
        assert_eq!(h.back_off(), 0);

        // Acknowledgements pay back the budget.
        for _ in 0..10 {
            h.on_drop(&w);
        }
        let mut w = slow_start_window(2);
        for _ in 0..3 {
            h.on_ack(&mut w, Some(0.1));
        }
        assert_eq!(h.back_off(), 7);
        for _ in 0..3 {
            assert!(!h.on_drop(&w));
        }
        assert!(h.on_drop(&w));
    }

    #[test]
    fn hybla_no_back_off() {
        let mut conf = HyblaConfig::default();
        conf.set_back_off_budget(0);
        let mut h = Hybla::new(conf);
        let w = slow_start_window(2);
        assert!(h.on_drop(&w));
        assert!(h.on_drop(&w));
    }
}
