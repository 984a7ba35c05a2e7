//! Table layout and epoch-scoped storage.

pub mod certification;
pub mod epoch_store;
pub mod table;
