// Epoch - Fixed-length block windows driving rotation and decay

use crate::types::{BlockNumber, EpochNumber};
use serde::{Deserialize, Serialize};

/// Fixed-length epoch schedule.
///
/// Epoch `e` covers blocks `[e * length, (e + 1) * length)`. Rotation and
/// counter decay run on the last block of an epoch, so the new set takes
/// effect from the first block of the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSchedule {
    length: BlockNumber,
}

impl EpochSchedule {
    pub fn new(length: BlockNumber) -> Self {
        debug_assert!(length > 0);
        Self { length }
    }

    pub fn length(&self) -> BlockNumber {
        self.length
    }

    pub fn epoch_of(&self, block: BlockNumber) -> EpochNumber {
        block / self.length
    }

    /// Is `block` the last block of its epoch?
    pub fn is_epoch_end(&self, block: BlockNumber) -> bool {
        block % self.length == self.length - 1
    }

    pub fn epoch_start(&self, epoch: EpochNumber) -> BlockNumber {
        epoch * self.length
    }

    /// The first epoch-end strictly after `block`
    pub fn next_epoch_end(&self, block: BlockNumber) -> BlockNumber {
        ((block + 1) / self.length + 1) * self.length - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_of() {
        let schedule = EpochSchedule::new(200);
        assert_eq!(schedule.epoch_of(0), 0);
        assert_eq!(schedule.epoch_of(199), 0);
        assert_eq!(schedule.epoch_of(200), 1);
        assert_eq!(schedule.epoch_of(401), 2);
    }

    #[test]
    fn test_epoch_end() {
        let schedule = EpochSchedule::new(200);
        assert!(schedule.is_epoch_end(199));
        assert!(schedule.is_epoch_end(399));
        assert!(!schedule.is_epoch_end(0));
        assert!(!schedule.is_epoch_end(200));
        assert!(!schedule.is_epoch_end(198));
    }

    #[test]
    fn test_epoch_start_and_next_end() {
        let schedule = EpochSchedule::new(200);
        assert_eq!(schedule.epoch_start(3), 600);
        assert_eq!(schedule.next_epoch_end(0), 199);
        assert_eq!(schedule.next_epoch_end(199), 399);
        assert_eq!(schedule.next_epoch_end(200), 399);
    }
}
