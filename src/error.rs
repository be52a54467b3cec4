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

//! Error type for engine operations.

use strum_macros::EnumIter;

/// Engine error.
#[derive(Clone, Debug, Default, PartialEq, Eq, EnumIter)]
pub enum Error {
    /// There is no more work to do.
    #[default]
    Done,

    /// The configuration is invalid.
    InvalidConfig(String),

    /// A block carried a priority outside of `[0, max_priority)`.
    ///
    /// The offending priority is provided as associated data.
    InvalidPriority(u32),

    /// A block is malformed, e.g. its deadline is not a positive number.
    InvalidBlock(String),

    /// A congestion event could not be interpreted.
    InvalidEvent(String),
}

impl Error {
    /// Return the error number used by callers across a C-like boundary.
    pub fn to_errno(&self) -> i32 {
        match self {
            Error::Done => -100,
            Error::InvalidConfig(_) => -106,
            Error::InvalidPriority(_) => -120,
            Error::InvalidBlock(_) => -121,
            Error::InvalidEvent(_) => -122,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
