//! Individual checkers and the calculators they share with the emitter.

pub mod basic;
pub mod epoch;
pub mod frame;
pub mod gas_power;
pub mod heavy;
pub mod parents;
pub mod proposal;
