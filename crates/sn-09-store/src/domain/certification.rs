//! Block certification statements.
//!
//! Each produced block yields a statement a certification chain can sign.
//! Statements are keyed by big-endian block number.

use serde::{Deserialize, Serialize};
use shared_types::{Block, BlockNumber, Hash};

/// What a validator attests about a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockStatement {
    /// Height.
    pub number: BlockNumber,
    /// Block hash.
    pub hash: Hash,
    /// State root after the block.
    pub state_root: Hash,
}

impl BlockStatement {
    /// Statement for `block`.
    pub fn of(block: &Block) -> Self {
        Self {
            number: block.number,
            hash: block.hash,
            state_root: block.state_root,
        }
    }
}

crate::bincode_codec!(BlockStatement);
