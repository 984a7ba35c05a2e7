//! # Sonic Block-Production Test Suite
//!
//! Cross-subsystem flows that no single crate can exercise alone.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs            # Chains over in-memory stores, event builders
//! └── integration/
//!     ├── transfer_flow.rs   # Fake-net node: pool → emitter → block
//!     ├── proposer_liveness.rs
//!     ├── scrambler_determinism.rs
//!     ├── block_size.rs      # Post-Brio block size ceiling
//!     ├── randao_entropy.rs
//!     └── stake_change.rs    # Driver weight updates across six nodes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sonic-tests
//!
//! # Long statistical runs
//! cargo test -p sonic-tests -- --ignored
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod integration;
