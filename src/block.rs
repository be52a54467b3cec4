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

use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// An application data unit waiting in the send queue.
///
/// Field names on the wire follow the emulator's `block_info` layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Identifier, unique per block.
    #[serde(rename = "Block_id")]
    pub id: u64,

    /// Time in seconds at which the block became eligible for sending.
    #[serde(rename = "Create_time")]
    pub create_time: f64,

    /// Relative time budget in seconds before the block becomes worthless.
    #[serde(rename = "Deadline")]
    pub deadline: f64,

    /// Payload size in bytes.
    #[serde(rename = "Size")]
    pub size: u64,

    /// Lower is more urgent.
    #[serde(rename = "Priority")]
    pub priority: u32,
}

impl Block {
    pub fn new(id: u64, create_time: f64, deadline: f64, size: u64, priority: u32) -> Self {
        Self {
            id,
            create_time,
            deadline,
            size,
            priority,
        }
    }

    /// Check the block against the scheduler's preconditions.
    pub(crate) fn validate(&self, max_priority: u32) -> Result<()> {
        if self.priority >= max_priority {
            return Err(Error::InvalidPriority(self.priority));
        }

        if !self.deadline.is_finite() || self.deadline <= 0.0 {
            return Err(Error::InvalidBlock(format!(
                "block {} has deadline {}",
                self.id, self.deadline
            )));
        }

        if !self.create_time.is_finite() {
            return Err(Error::InvalidBlock(format!(
                "block {} has create time {}",
                self.id, self.create_time
            )));
        }

        Ok(())
    }

    /// Time elapsed since the block was created.
    pub fn passed_time(&self, now: f64) -> f64 {
        now - self.create_time
    }

    /// Time needed to put the whole block on the wire at `send_rate` bits
    /// per second. An uncapped rate takes no time.
    pub fn transmit_time(&self, send_rate: Option<f64>) -> f64 {
        match send_rate {
            Some(rate) if rate.is_finite() && rate > 0.0 => self.size as f64 * 8.0 / rate,
            _ => 0.0,
        }
    }
}
