//! NDN forwarding core: FIB, PIT, Measurements, StrategyChoice, the
//! pluggable per-prefix Strategy framework, and the Forwarder pipeline that
//! ties them together.
//!
//! This crate implements the data-plane forwarding semantics of an NDN
//! router, independent of any particular transport. Faces are an abstract
//! `Face` trait; `rust-udcn-quic` supplies the concrete QUIC implementation.

pub mod algorithm;
pub mod error;
pub mod face;
pub mod forwarder;
pub mod scheduler;
pub mod strategies;
pub mod strategy;
pub mod strategy_info;
pub mod table;

pub use error::{Error, Result};
pub use face::{Face, FaceId, FaceTable};
pub use forwarder::Forwarder;
pub use strategy::{Strategy, StrategyApi, StrategyRegistry};
pub use strategy_info::{StrategyInfo, StrategyInfoMap};
