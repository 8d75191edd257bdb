//! The packet-processing tables: FIB, PIT, Measurements, DeadNonceList, and
//! StrategyChoice.

pub mod dead_nonce_list;
pub mod fib;
pub mod measurements;
pub mod name_tree;
pub mod pit;
pub mod strategy_choice;

pub use dead_nonce_list::DeadNonceList;
pub use fib::Fib;
pub use measurements::{Measurements, MeasurementsAccessor};
pub use pit::Pit;
pub use strategy_choice::StrategyChoice;
