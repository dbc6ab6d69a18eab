//! Forward definite-assignment flow state.
//!
//! One bit per tracked variable slot; slot 0 is reserved as the unreachable
//! sentinel, so "unreachable" rides in the same vector as the assignment
//! facts and survives merges without a side channel.

pub mod region;

pub use region::{DataFlowResult, DataFlowsInWalker};

/// Growable fixed-width bitset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BitVector {
    words: Vec<u64>,
}

const BITS_PER_WORD: usize = u64::BITS as usize;

impl BitVector {
    pub fn new(bits: usize) -> Self {
        Self { words: vec![0; bits.div_ceil(BITS_PER_WORD)] }
    }

    pub fn get(&self, bit: usize) -> bool {
        self.words
            .get(bit / BITS_PER_WORD)
            .is_some_and(|word| word & (1 << (bit % BITS_PER_WORD)) != 0)
    }

    pub fn set(&mut self, bit: usize) {
        let word = bit / BITS_PER_WORD;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        self.words[word] |= 1 << (bit % BITS_PER_WORD);
    }

    /// Intersects in place; bits beyond `other`'s length clear.
    pub fn intersect(&mut self, other: &Self) {
        for (index, word) in self.words.iter_mut().enumerate() {
            *word &= other.words.get(index).copied().unwrap_or(0);
        }
    }
}

const UNREACHABLE_SLOT: usize = 0;

/// Per-program-point assignment state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowState {
    assigned: BitVector,
}

impl FlowState {
    /// Entry state: nothing assigned, reachable.
    pub fn top(slots: usize) -> Self {
        Self { assigned: BitVector::new(slots) }
    }

    pub fn reachable(&self) -> bool {
        !self.assigned.get(UNREACHABLE_SLOT)
    }

    pub fn set_unreachable(&mut self) {
        self.assigned.set(UNREACHABLE_SLOT);
    }

    pub fn assign(&mut self, slot: usize) {
        debug_assert_ne!(slot, UNREACHABLE_SLOT);
        self.assigned.set(slot);
    }

    pub fn is_assigned(&self, slot: usize) -> bool {
        self.assigned.get(slot)
    }

    /// Join at a control-flow merge: conservative intersection, unassigned
    /// wins. An unreachable input contributes nothing and is absorbed.
    pub fn meet(&self, other: &Self) -> Self {
        if !self.reachable() {
            return other.clone();
        }
        if !other.reachable() {
            return self.clone();
        }
        let mut assigned = self.assigned.clone();
        assigned.intersect(&other.assigned);
        Self { assigned }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meet_is_intersection() {
        let mut a = FlowState::top(8);
        let mut b = FlowState::top(8);
        a.assign(1);
        a.assign(2);
        b.assign(2);
        b.assign(3);

        let joined = a.meet(&b);
        assert!(!joined.is_assigned(1));
        assert!(joined.is_assigned(2));
        assert!(!joined.is_assigned(3));
    }

    #[test]
    fn unreachable_input_is_absorbed() {
        let mut assigned = FlowState::top(8);
        assigned.assign(1);

        let mut dead = FlowState::top(8);
        dead.set_unreachable();

        assert_eq!(assigned.meet(&dead), assigned);
        assert_eq!(dead.meet(&assigned), assigned);
        assert!(!dead.reachable());
    }

    #[test]
    fn bitvector_grows_on_demand() {
        let mut bits = BitVector::new(1);
        bits.set(200);
        assert!(bits.get(200));
        assert!(!bits.get(199));
    }
}
