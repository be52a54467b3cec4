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

use core::str::FromStr;
use std::fmt;

pub use self::scheduler_deadline::DeadlineScheduler;
pub use self::scheduler_fifo::FifoScheduler;
use crate::Block;
use crate::Config;
use crate::Error;
use crate::Result;

/// BlockScheduler decides which pending block is transmitted next.
pub trait BlockScheduler {
    /// Name of the scheduling algorithm.
    fn name(&self) -> &str;

    /// Select a block from the snapshot of the send queue.
    ///
    /// The scheduler must not assume anything about `blocks` beyond this
    /// call; the returned index refers to this very slice.
    fn on_select(
        &mut self,
        now: f64,
        blocks: &[Block],
        ctx: &SchedulingContext,
    ) -> Result<Selection>;
}

impl fmt::Debug for dyn BlockScheduler + Send {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block scheduler {}.", self.name())
    }
}

/// Flow estimates consumed by the schedulers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SchedulingContext {
    /// Smoothed RTT in seconds, if a fresh estimate exists.
    pub rtt: Option<f64>,

    /// Current send rate in bits per second. `None` means uncapped.
    pub send_rate: Option<f64>,
}

/// The block chosen by a scheduler, along with the values that decided it.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedBlock {
    /// Position of the block in the queue snapshot.
    pub index: usize,

    /// Identifier of the block.
    pub id: u64,

    /// Deadline of the block.
    pub deadline: f64,

    /// Size of the block in bytes.
    pub size: u64,

    /// Priority of the block.
    pub priority: u32,

    /// Scheduler specific score; the smallest score wins.
    pub weight: f64,
}

impl SelectedBlock {
    pub(crate) fn new(index: usize, block: &Block, weight: f64) -> Self {
        Self {
            index,
            id: block.id,
            deadline: block.deadline,
            size: block.size,
            priority: block.priority,
            weight,
        }
    }
}

/// Outcome of a scheduling decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A block was selected.
    Selected(SelectedBlock),

    /// The send queue is empty.
    Empty,

    /// No pending block can be delivered before its deadline.
    Infeasible,
}

impl Selection {
    /// Return the index of the selected block, or `Error::Done` if there is
    /// nothing to send.
    pub fn index(&self) -> Result<usize> {
        match self {
            Selection::Selected(b) => Ok(b.index),
            _ => Err(Error::Done),
        }
    }

    /// Return the selected block, if any.
    pub fn selected(&self) -> Option<&SelectedBlock> {
        match self {
            Selection::Selected(b) => Some(b),
            _ => None,
        }
    }
}

/// Available block scheduling algorithms.
#[repr(C)]
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub enum BlockSchedulingAlgorithm {
    /// The scheduler weighs the remaining slack of each block against its
    /// deadline and priority, and sends the block with the tightest weighted
    /// slack among those that can still meet their deadline.
    #[default]
    Deadline,

    /// The scheduler sends the oldest block that has not expired yet. Ties
    /// go to the block with the smaller share of its lifetime left.
    Fifo,
}

impl FromStr for BlockSchedulingAlgorithm {
    type Err = Error;

    fn from_str(algor: &str) -> Result<BlockSchedulingAlgorithm> {
        if algor.eq_ignore_ascii_case("deadline") {
            Ok(BlockSchedulingAlgorithm::Deadline)
        } else if algor.eq_ignore_ascii_case("fifo") {
            Ok(BlockSchedulingAlgorithm::Fifo)
        } else {
            Err(Error::InvalidConfig("unknown".into()))
        }
    }
}

/// Build a block scheduler.
pub fn build_block_scheduler(conf: &Config) -> Box<dyn BlockScheduler + Send> {
    match conf.block_scheduling_algorithm {
        BlockSchedulingAlgorithm::Deadline => Box::new(DeadlineScheduler::new(conf.max_priority)),
        BlockSchedulingAlgorithm::Fifo => Box::new(FifoScheduler::new(conf.max_priority)),
    }
}


mod scheduler_deadline;
mod scheduler_fifo;
