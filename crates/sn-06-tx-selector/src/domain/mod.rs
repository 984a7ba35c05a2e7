//! Pool bookkeeping and the greedy selector.

pub mod pool;
pub mod selector;
