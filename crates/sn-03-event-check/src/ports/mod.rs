//! Ports of the event checkers.

pub mod reader;

pub use reader::Reader;
