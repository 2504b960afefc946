// DANS : src/state/seen_signatures.rs

use solana_sdk::signature::Signature;
use std::collections::{HashSet, VecDeque};

/// Ensemble borné des signatures déjà traitées pendant une session.
/// Au-delà de la capacité, la plus ancienne signature est oubliée.
#[derive(Debug)]
pub struct SeenSignatures {
    capacity: usize,
    members: HashSet<Signature>,
    order: VecDeque<Signature>,
}

impl SeenSignatures {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            members: HashSet::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Enregistre la signature. Retourne `false` si elle était déjà connue.
    pub fn insert(&mut self, signature: Signature) -> bool {
        if !self.members.insert(signature) {
            return false;
        }
        self.order.push_back(signature);
        if self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
impl SeenSignatures {
    fn contains(&self, signature: &Signature) -> bool {
        self.members.contains(signature)
    }
}
