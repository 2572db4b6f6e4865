//! Timestamp-to-block search used once at bootstrap to bracket the
//! voter-registration window.

use async_trait::async_trait;
use tracing::debug;

use crate::client::{RpcClient, RpcError};

/// Acceptable distance between a candidate block's timestamp and the target.
pub const BOUNDARY_TOLERANCE_S: u64 = 600;

/// Blocks stepped per correction when a probe lands outside the tolerance.
const CORRECTION_STEP: u64 = 100;

/// Probe cap before giving up on the chain.
const MAX_PROBES: u32 = 5_000;

#[derive(Debug, thiserror::Error)]
pub enum BoundaryError {
    #[error("no block within {BOUNDARY_TOLERANCE_S}s of target timestamp {target_ts} after {MAX_PROBES} probes")]
    BoundaryNotFound { target_ts: u64 },
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Anything that can report the timestamp of a block by number.
#[async_trait]
pub trait BlockTimeSource {
    async fn timestamp_of(&self, number: u64) -> Result<u64, RpcError>;
}

#[async_trait]
impl BlockTimeSource for RpcClient {
    async fn timestamp_of(&self, number: u64) -> Result<u64, RpcError> {
        Ok(self.block_header(number).await?.timestamp)
    }
}

/// Approximate the number of the block whose timestamp is within
/// [`BOUNDARY_TOLERANCE_S`] of `target_ts`.
///
/// Starts from a linear estimate off the anchor block assuming
/// `avg_block_time` seconds per block, then corrects in
/// [`CORRECTION_STEP`]-block moves against the probed timestamps.
pub async fn find_block_near<S: BlockTimeSource + Sync>(
    source: &S,
    anchor_block: u64,
    anchor_ts: u64,
    target_ts: u64,
    avg_block_time: u64,
) -> Result<u64, BoundaryError> {
    let avg_block_time = avg_block_time.max(1);
    let behind = anchor_ts.saturating_sub(target_ts) / avg_block_time;
    let mut candidate = anchor_block.saturating_sub(behind).max(1);

    for probe in 0..MAX_PROBES {
        let ts = source.timestamp_of(candidate).await?;
        let distance = ts.abs_diff(target_ts);
        if distance <= BOUNDARY_TOLERANCE_S {
            debug!(candidate, probes = probe + 1, "boundary search converged");
            return Ok(candidate);
        }
        candidate = if ts > target_ts {
            candidate.saturating_sub(CORRECTION_STEP).max(1)
        } else {
            candidate + CORRECTION_STEP
        };
    }

    Err(BoundaryError::BoundaryNotFound { target_ts })
}
