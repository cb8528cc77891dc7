// Copyright 2025 - Nym Technologies SA <contact@nymtech.net>
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Position at which a submitted action became part of the ordering log.
///
/// Later approvals of the same multisig operation reference the timepoint of the first one,
/// so a timepoint must only ever be constructed from an inclusion that was actually observed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timepoint {
    /// Height of the block that included the action.
    pub height: u64,

    /// Position of the action within that block.
    pub index: u32,
}

impl Timepoint {
    pub const fn new(height: u64, index: u32) -> Self {
        Timepoint { height, index }
    }
}

impl Display for Timepoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.height, self.index)
    }
}
