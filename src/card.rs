use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::scheduler::{Scheduler, next_level};

/// Stable card identifier. Derived from the card's content key and how many
/// earlier cards share that key, so reloading the same source text yields the
/// same ids and persisted per-card state stays attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(String);

impl CardId {
    fn derive(key: &str, occurrence: usize) -> Self {
        match occurrence {
            0 => CardId(key.to_string()),
            n => CardId(format!("{key}#{}", n + 1)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CardId {
    fn from(value: &str) -> Self {
        CardId(value.to_string())
    }
}

/// One record as produced by the text parser, before any scheduling state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCard {
    pub sequence: Option<u32>,
    pub term: String,
    pub meaning: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub sequence: Option<u32>,
    pub term: String,
    pub meaning: String,
    /// 0 (new or missed) through [`crate::MAX_LEVEL`].
    pub level: u8,
    pub due: DateTime<Utc>,
}

impl Card {
    pub fn content_key(&self) -> String {
        content_key(&self.term)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.due <= now
    }
}

/// Normalized term used to match a card across reloads: trimmed, lower-cased,
/// internal whitespace collapsed to single spaces.
pub fn content_key(term: &str) -> String {
    term.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scheduling fields that survive a reload, keyed by [`CardId`] when persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub level: u8,
    pub due: DateTime<Utc>,
}

/// Owns every loaded card. Cards are kept in source order; other components
/// hold [`CardId`]s and must treat a failed lookup as "skip".
#[derive(Debug, Default, Clone)]
pub struct CardStore {
    cards: Vec<Card>,
    index: HashMap<CardId, usize>,
}

impl CardStore {
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Card> {
        self.cards.iter()
    }

    /// Ids in source order.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = &CardId> {
        self.cards.iter().map(|card| &card.id)
    }

    pub fn contains(&self, id: &CardId) -> bool {
        self.index.contains_key(id)
    }

    pub fn find_by_id(&self, id: &CardId) -> Option<&Card> {
        self.index.get(id).map(|&i| &self.cards[i])
    }

    fn find_mut(&mut self, id: &CardId) -> Option<&mut Card> {
        self.index.get(id).map(|&i| &mut self.cards[i])
    }

    pub fn due_count(&self, now: DateTime<Utc>) -> usize {
        self.cards.iter().filter(|card| card.is_due(now)).count()
    }

    /// Adds freshly parsed cards after the existing ones. New cards start at
    /// level 0 and are due at `now`. Returns the ids assigned, in order.
    pub fn append(&mut self, parsed: Vec<ParsedCard>, now: DateTime<Utc>) -> Vec<CardId> {
        let mut occurrences: HashMap<String, usize> = HashMap::new();
        for card in &self.cards {
            *occurrences.entry(card.content_key()).or_default() += 1;
        }
        let mut added = Vec::with_capacity(parsed.len());
        for ParsedCard {
            sequence,
            term,
            meaning,
        } in parsed
        {
            let key = content_key(&term);
            let seen = occurrences.entry(key.clone()).or_default();
            let mut id = CardId::derive(&key, *seen);
            // A literal term like `apple#2` may already hold the suffixed id.
            while self.index.contains_key(&id) {
                *seen += 1;
                id = CardId::derive(&key, *seen);
            }
            *seen += 1;
            self.index.insert(id.clone(), self.cards.len());
            self.cards.push(Card {
                id: id.clone(),
                sequence,
                term,
                meaning,
                level: 0,
                due: now,
            });
            added.push(id);
        }
        debug!("appended {} cards, {} total", added.len(), self.cards.len());
        added
    }

    /// Drops every card and loads `parsed` in its place.
    pub fn replace(&mut self, parsed: Vec<ParsedCard>, now: DateTime<Utc>) -> Vec<CardId> {
        self.clear();
        self.append(parsed, now)
    }

    pub fn clear(&mut self) {
        self.cards.clear();
        self.index.clear();
    }

    /// Replaces the card set with a refreshed one while keeping level and due
    /// time of every card whose id (content key + occurrence) is still present.
    /// Returns the ids that vanished.
    pub fn merge_refresh(&mut self, parsed: Vec<ParsedCard>, now: DateTime<Utc>) -> Vec<CardId> {
        let previous = std::mem::take(&mut self.cards);
        self.index.clear();
        self.append(parsed, now);
        let kept: HashSet<&CardId> = self.index.keys().collect();
        let mut removed = Vec::new();
        for old in &previous {
            if !kept.contains(&old.id) {
                removed.push(old.id.clone());
            }
        }
        for old in previous {
            if let Some(card) = self.find_mut(&old.id) {
                card.level = old.level;
                card.due = old.due;
            }
        }
        removed
    }

    /// Applies a grade: `knew` moves one level up (capped), `forgot` resets to
    /// level 0, and the due time follows from the new level.
    pub fn apply_grade(
        &mut self,
        id: &CardId,
        knew: bool,
        scheduler: &Scheduler,
        now: DateTime<Utc>,
    ) -> Option<&Card> {
        let card = self.find_mut(id)?;
        card.level = next_level(card.level, knew);
        card.due = scheduler.next_due(card.level, now);
        Some(card)
    }

    /// Makes every resolvable id due immediately; unknown ids are ignored.
    pub fn force_due_now<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a CardId>,
        now: DateTime<Utc>,
    ) {
        for id in ids {
            if let Some(card) = self.find_mut(id) {
                card.due = now;
            }
        }
    }

    /// Progress of every card, keyed by id.
    pub fn progress(&self) -> HashMap<CardId, Progress> {
        self.cards
            .iter()
            .map(|card| {
                (
                    card.id.clone(),
                    Progress {
                        level: card.level,
                        due: card.due,
                    },
                )
            })
            .collect()
    }

    /// Copies saved progress onto cards with a matching id.
    pub fn restore_progress(&mut self, saved: &HashMap<CardId, Progress>) -> usize {
        let mut restored = 0;
        for card in &mut self.cards {
            if let Some(progress) = saved.get(&card.id) {
                card.level = progress.level.min(crate::MAX_LEVEL);
                card.due = progress.due;
                restored += 1;
            }
        }
        restored
    }
}
