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

/// FifoScheduler sends blocks in creation order, skipping the expired ones.
///
/// Among blocks created at the same time, the one with the smaller fraction
/// of its lifetime left goes first. It ignores rtt and send rate, and serves
/// as a baseline for the deadline scheduler.
pub struct FifoScheduler {
    max_priority: u32,
}

impl FifoScheduler {
    pub fn new(max_priority: u32) -> FifoScheduler {
        FifoScheduler { max_priority }
    }
}

impl BlockScheduler for FifoScheduler {
    fn name(&self) -> &str {
        "FIFO"
    }

    fn on_select(
        &mut self,
        now: f64,
        blocks: &[Block],
        _ctx: &SchedulingContext,
    ) -> Result<Selection> {
        if blocks.is_empty() {
            return Ok(Selection::Empty);
        }

        let mut best: Option<(f64, SelectedBlock)> = None;

        for (idx, block) in blocks.iter().enumerate() {
            block.validate(self.max_priority)?;

            let remaining = block.deadline - block.passed_time(now);
            if remaining.is_nan() || remaining < 0.0 {
                continue;
            }

            let ratio = remaining / block.deadline;
            let better = match &best {
                None => true,
                Some((create_time, b)) => {
                    block.create_time < *create_time
                        || (block.create_time == *create_time && ratio < b.weight)
                }
            };
            if better {
                best = Some((block.create_time, SelectedBlock::new(idx, block, ratio)));
            }
        }

        match best {
            Some((_, b)) => {
                trace!("{}. select block {} at {}", self.name(), b.id, b.index);
                Ok(Selection::Selected(b))
            }
            None => Ok(Selection::Infeasible),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select(blocks: &[Block], now: f64) -> Result<Selection> {
        FifoScheduler::new(crate::MAX_PRIORITY).on_select(
            now,
            blocks,
            &SchedulingContext::default(),
        )
    }

    #[test]
    fn fifo_oldest_first() -> Result<()> {
        let blocks = [
            Block::new(1, 0.3, 1.0, 100, 0),
            Block::new(2, 0.1, 1.0, 100, 2),
            Block::new(3, 0.2, 1.0, 100, 0),
        ];
        assert_eq!(select(&blocks, 0.5)?.index()?, 1);
        assert_eq!(select(&[], 0.5)?, Selection::Empty);
        Ok(())
    }

    #[test]
    fn fifo_skip_expired() -> Result<()> {
        let blocks = [
            Block::new(1, 0.0, 0.2, 100, 0),
            Block::new(2, 0.1, 1.0, 100, 0),
        ];
        assert_eq!(select(&blocks, 0.5)?.index()?, 1);
        assert_eq!(select(&blocks, 2.0)?, Selection::Infeasible);
        Ok(())
    }

    #[test]
    fn fifo_same_create_time() -> Result<()> {
        let blocks = [
            Block::new(1, 0.0, 2.0, 100, 0),
            Block::new(2, 0.0, 1.0, 100, 0),
        ];

        // Remaining lifetime ratios at t=0.5 are 0.75 and 0.5.
        let s = select(&blocks, 0.5)?;
        assert_eq!(s.index()?, 1);
        assert_eq!(s.selected().unwrap().weight, 0.5);
        Ok(())
    }
}
