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

use crate::scheduler::BlockScheduler;
use crate::scheduler::SchedulingContext;
use crate::scheduler::SelectedBlock;
use crate::scheduler::Selection;
use crate::Block;
use crate::Result;

/// DeadlineScheduler sends the block whose remaining slack is the smallest
/// share of its deadline, scaled by its priority.
///
/// For each block, the slack is what remains of its deadline once the time
/// already spent in the queue, one RTT and the time to transmit it at the
/// current rate are deducted. Blocks with negative slack cannot arrive in
/// time and are never selected. The weight of a feasible block is
///
/// ```text
/// weight = (slack / deadline) / (1 - priority / max_priority)
/// ```
///
/// The smallest weight wins, then the smaller block, then the earlier one in
/// the queue.
pub struct DeadlineScheduler {
    max_priority: u32,
}

impl DeadlineScheduler {
    pub fn new(max_priority: u32) -> DeadlineScheduler {
        DeadlineScheduler { max_priority }
    }

    fn weight(&self, block: &Block, slack: f64) -> f64 {
        let priority_factor = 1.0 - block.priority as f64 / self.max_priority as f64;
        (slack / block.deadline) / priority_factor
    }
}

impl BlockScheduler for DeadlineScheduler {
    fn name(&self) -> &str {
        "DEADLINE"
    }

    fn on_select(
        &mut self,
        now: f64,
        blocks: &[Block],
        ctx: &SchedulingContext,
    ) -> Result<Selection> {
        if blocks.is_empty() {
            return Ok(Selection::Empty);
        }

        // An unknown rtt adds no delay.
        let rtt = ctx.rtt.unwrap_or(0.0);
        let mut best: Option<SelectedBlock> = None;

        for (idx, block) in blocks.iter().enumerate() {
            block.validate(self.max_priority)?;

            let slack = block.deadline
                - block.passed_time(now)
                - rtt
                - block.transmit_time(ctx.send_rate);
            if slack.is_nan() || slack < 0.0 {
                continue;
            }

            let weight = self.weight(block, slack);
            let better = match &best {
                None => true,
                Some(b) => weight < b.weight || (weight == b.weight && block.size < b.size),
            };
            if better {
                best = Some(SelectedBlock::new(idx, block, weight));
            }
        }

        match best {
            Some(b) => {
                trace!(
                    "{}. select block {} at {}, weight={}, deadline={}, size={}, priority={}",
                    self.name(),
                    b.id,
                    b.index,
                    b.weight,
                    b.deadline,
                    b.size,
                    b.priority
                );
                Ok(Selection::Selected(b))
            }
            None => {
                trace!(
                    "{}. none of {} blocks can meet its deadline at {}",
                    self.name(),
                    blocks.len(),
                    now
                );
                Ok(Selection::Infeasible)
            }
        }
    }
}
