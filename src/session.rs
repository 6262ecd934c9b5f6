use std::collections::HashSet;

use crate::card::CardId;

/// What happened since the cards were loaded: every graded card in review
/// order (repeats included), and which of them are currently unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTracker {
    all_seen: Vec<CardId>,
    unknown: HashSet<CardId>,
}

impl SessionTracker {
    /// Records a grade. A `forgot` marks the card unknown, a later `knew`
    /// clears it again.
    pub fn record(&mut self, id: &CardId, knew: bool) {
        self.all_seen.push(id.clone());
        if knew {
            self.unknown.remove(id);
        } else {
            self.unknown.insert(id.clone());
        }
    }

    pub fn all_seen(&self) -> &[CardId] {
        &self.all_seen
    }

    pub fn unknown(&self) -> &HashSet<CardId> {
        &self.unknown
    }

    pub fn is_unknown(&self, id: &CardId) -> bool {
        self.unknown.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.all_seen.is_empty()
    }

    /// Seen ids with repeats collapsed, first occurrence kept.
    pub fn distinct_seen(&self) -> Vec<&CardId> {
        let mut seen = HashSet::new();
        self.all_seen
            .iter()
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Drops cards that no longer exist. The review history keeps its order.
    pub fn prune(&mut self, removed: &HashSet<CardId>) {
        self.all_seen.retain(|id| !removed.contains(id));
        self.unknown.retain(|id| !removed.contains(id));
    }

    pub fn clear(&mut self) {
        self.all_seen.clear();
        self.unknown.clear();
    }
}
