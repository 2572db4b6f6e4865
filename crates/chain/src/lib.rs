//! Minimal Ethereum JSON-RPC access for the observer.
//!
//! Only the handful of calls the loop needs: chain id, head number, blocks
//! with full transaction bodies, logs by contract address, and `eth_call`
//! for contract-registry lookups.

pub mod boundary;
pub mod client;
pub mod wire;

pub use boundary::{find_block_near, BlockTimeSource, BoundaryError, BOUNDARY_TOLERANCE_S};
pub use client::{RpcClient, RpcError};
pub use wire::{Block, BlockHeader, Log};
