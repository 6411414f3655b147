//! Membership and incentive core for a proof-of-staked-authority chain.
//!
//! Validators are admitted by majority vote of the sitting set, ranked by
//! aggregate stake, rotated into active and backup sets at epoch boundaries,
//! paid stake-proportional block rewards, and disciplined through decaying
//! missed-block counters that confiscate profit and ultimately jail.
//!
//! [`Congress`] is the single entry point; the host chain drives it with
//! block numbers and moves funds according to the amounts it returns.

pub mod config;
pub mod congress;
pub mod consensus;
pub mod contracts;
pub mod types;

pub use config::CongressConfig;
pub use congress::{Congress, CongressError};

#[cfg(test)]
mod tests;
