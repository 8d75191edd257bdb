//! Subcommand implementations for the µDCN CLI.

pub mod benchmark;
pub mod fib;
pub mod forward;
pub mod interest;
pub mod publish;
pub mod xdp;
