//! Identifier sources for reassignment.

use std::collections::VecDeque;
use uuid::Uuid;

/// Produces candidate identifiers for records that lost an id collision.
///
/// Candidates may repeat existing ids; the reconciler rejects and redraws.
pub trait IdGenerator {
    fn next_id(&mut self) -> Uuid;
}

/// Random UUID v4 source used outside tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn next_id(&mut self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Replays a fixed list of ids, then falls back to random v4 ids.
#[derive(Debug, Clone, Default)]
pub struct SequenceIdGenerator {
    queued: VecDeque<Uuid>,
}

impl SequenceIdGenerator {
    pub fn new(ids: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            queued: ids.into_iter().collect(),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn next_id(&mut self) -> Uuid {
        self.queued.pop_front().unwrap_or_else(Uuid::new_v4)
    }
}

#[cfg(test)]
mod tests {
    use super::{IdGenerator, RandomIdGenerator, SequenceIdGenerator};
    use uuid::Uuid;

    #[test]
    fn sequence_replays_then_falls_back() {
        let mut ids = SequenceIdGenerator::new([Uuid::from_u128(5)]);
        assert_eq!(ids.next_id(), Uuid::from_u128(5));
        assert_ne!(ids.next_id(), Uuid::from_u128(5));
    }

    #[test]
    fn random_ids_differ() {
        let mut ids = RandomIdGenerator;
        assert_ne!(ids.next_id(), ids.next_id());
    }
}
