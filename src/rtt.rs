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

use log::*;

/// Weight of the previous estimate in the moving average.
pub const RTT_HISTORY_WEIGHT: f64 = 0.8;

/// Weight of a new sample in the moving average.
pub const RTT_SAMPLE_WEIGHT: f64 = 0.2;

/// RTT estimation for a flow.
///
/// All times are in seconds, as supplied by the runtime driving the engine.
#[derive(Debug, Clone, Default)]
pub struct RttEstimator {
    /// The most recent RTT sample.
    latest_rtt: Option<f64>,

    /// Exponentially weighted moving average of the RTT samples. `None` until
    /// the first sample, or after the estimate went stale.
    smoothed_rtt: Option<f64>,

    /// Time of the last accepted sample.
    update_time: f64,

    /// Number of accepted samples.
    samples: u64,
}

impl RttEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the smoothed RTT without checking its freshness.
    pub fn smoothed_rtt(&self) -> Option<f64> {
        self.smoothed_rtt
    }

    /// Return the latest rtt sample
    pub fn latest_rtt(&self) -> Option<f64> {
        self.latest_rtt
    }

    /// Return the time of the last accepted sample.
    pub fn update_time(&self) -> f64 {
        self.update_time
    }

    /// Return the number of samples accepted so far.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Return the current estimate as seen at `now`.
    ///
    /// If no sample arrived within one estimated RTT, the estimate is no
    /// longer trusted and is reset to unset.
    pub fn current(&mut self, now: f64) -> Option<f64> {
        if let Some(srtt) = self.smoothed_rtt {
            if self.update_time + srtt < now {
                trace!(
                    "rtt estimate {} expired, last update {}, now {}",
                    srtt,
                    self.update_time,
                    now
                );
                self.smoothed_rtt = None;
                self.update_time = now;
            }
        }

        self.smoothed_rtt
    }

    /// Update estimator with the given latency sample observed at `now`.
    pub fn update(&mut self, sample: f64, now: f64) {
        if !sample.is_finite() || sample <= 0.0 {
            warn!("ignore invalid rtt sample {} at {}", sample, now);
            return;
        }

        self.latest_rtt = Some(sample);
        self.smoothed_rtt = Some(match self.smoothed_rtt {
            Some(srtt) => srtt * RTT_HISTORY_WEIGHT + sample * RTT_SAMPLE_WEIGHT,
            None => sample,
        });
        self.update_time = now;
        self.samples += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Option<f64>, b: f64) {
        let a = a.unwrap();
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn initial() {
        let mut r = RttEstimator::new();
        assert_eq!(r.smoothed_rtt(), None);
        assert_eq!(r.latest_rtt(), None);
        assert_eq!(r.current(10.0), None);
        assert_eq!(r.samples(), 0);
    }

    #[test]
    fn update() {
        let mut r = RttEstimator::new();

        // First rtt sample
        r.update(0.1, 1.0);
        assert_close(r.smoothed_rtt(), 0.1);
        assert_close(r.latest_rtt(), 0.1);
        assert_eq!(r.update_time(), 1.0);

        // Second rtt sample
        r.update(0.2, 1.05);
        assert_close(r.smoothed_rtt(), 0.12);
        assert_close(r.latest_rtt(), 0.2);

        // Third rtt sample
        r.update(0.02, 1.1);
        assert_close(r.smoothed_rtt(), 0.1);
        assert_eq!(r.samples(), 3);
    }

    #[test]
    fn invalid_sample() {
        let mut r = RttEstimator::new();
        r.update(0.0, 1.0);
        r.update(-1.0, 1.0);
        r.update(f64::NAN, 1.0);
        r.update(f64::INFINITY, 1.0);
        assert_eq!(r.smoothed_rtt(), None);
        assert_eq!(r.samples(), 0);

        r.update(0.05, 2.0);
        r.update(f64::NAN, 2.01);
        assert_close(r.smoothed_rtt(), 0.05);
    }

    #[test]
    fn staleness() {
        let mut r = RttEstimator::new();
        r.update(0.1, 1.0);

        // Still within one rtt of the last sample.
        assert_close(r.current(1.05), 0.1);
        assert_close(r.current(1.09), 0.1);

        // No sample for more than one rtt.
        assert_eq!(r.current(1.2), None);
        assert_eq!(r.smoothed_rtt(), None);
        assert_eq!(r.latest_rtt(), Some(0.1));

        // A new sample restarts the average.
        r.update(0.3, 2.0);
        assert_close(r.current(2.0), 0.3);
    }
}
