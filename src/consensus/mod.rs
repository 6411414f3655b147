// Consensus-layer machinery: ranking, discipline, epochs, set rotation

pub mod coordinator;
pub mod epoch;
pub mod punish;
pub mod ranking;
