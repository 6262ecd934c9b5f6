use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::card::{CardId, CardStore};

/// How many cards the "top forgotten" run takes by default.
pub const TOP_FORGOTTEN_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum StatField {
    Seen,
    Forgot,
    Knew,
}

/// Counters for one calendar date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub seen: u32,
    pub forgot: u32,
    pub knew: u32,
}

impl DailyStats {
    pub fn get(&self, field: StatField) -> u32 {
        match field {
            StatField::Seen => self.seen,
            StatField::Forgot => self.forgot,
            StatField::Knew => self.knew,
        }
    }

    fn bump(&mut self, field: StatField) {
        let counter = match field {
            StatField::Seen => &mut self.seen,
            StatField::Forgot => &mut self.forgot,
            StatField::Knew => &mut self.knew,
        };
        *counter = counter.saturating_add(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgotEntry {
    pub id: CardId,
    pub count: u32,
}

/// Per-day counters, per-day forgot tallies and the last date each card was
/// counted as seen. Dates are passed in by the caller so the tracker never
/// reads a clock itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsTracker {
    daily: BTreeMap<NaiveDate, DailyStats>,
    /// Entries keep first-forgotten order; ties in the top list rely on it.
    forgot: BTreeMap<NaiveDate, Vec<ForgotEntry>>,
    last_seen: HashMap<CardId, NaiveDate>,
}

impl StatsTracker {
    pub fn from_parts(
        daily: BTreeMap<NaiveDate, DailyStats>,
        forgot: BTreeMap<NaiveDate, Vec<ForgotEntry>>,
        last_seen: HashMap<CardId, NaiveDate>,
    ) -> Self {
        Self {
            daily,
            forgot,
            last_seen,
        }
    }

    pub fn daily(&self) -> &BTreeMap<NaiveDate, DailyStats> {
        &self.daily
    }

    pub fn forgot(&self) -> &BTreeMap<NaiveDate, Vec<ForgotEntry>> {
        &self.forgot
    }

    pub fn last_seen(&self) -> &HashMap<CardId, NaiveDate> {
        &self.last_seen
    }

    pub fn day(&self, date: NaiveDate) -> DailyStats {
        self.daily.get(&date).copied().unwrap_or_default()
    }

    /// Increments one of `date`'s counters, creating the record on first write.
    pub fn bump(&mut self, field: StatField, date: NaiveDate) {
        self.daily.entry(date).or_default().bump(field);
    }

    pub fn bump_forgot(&mut self, id: &CardId, date: NaiveDate) {
        let entries = self.forgot.entry(date).or_default();
        match entries.iter_mut().find(|entry| &entry.id == id) {
            Some(entry) => entry.count = entry.count.saturating_add(1),
            None => entries.push(ForgotEntry {
                id: id.clone(),
                count: 1,
            }),
        }
    }

    pub fn forgot_count(&self, id: &CardId, date: NaiveDate) -> u32 {
        self.forgot
            .get(&date)
            .and_then(|entries| entries.iter().find(|entry| &entry.id == id))
            .map_or(0, |entry| entry.count)
    }

    /// Counts `id` as seen on `date` unless it already was. Returns whether
    /// the seen counter moved.
    pub fn mark_seen_once(&mut self, id: &CardId, date: NaiveDate) -> bool {
        if self.last_seen.get(id) == Some(&date) {
            return false;
        }
        self.last_seen.insert(id.clone(), date);
        self.bump(StatField::Seen, date);
        true
    }

    /// Most-forgotten cards on `date`, highest count first, ties in the order
    /// they were first forgotten. Ids no longer in `store` are passed over.
    pub fn top_forgotten(&self, date: NaiveDate, limit: usize, store: &CardStore) -> Vec<CardId> {
        let Some(entries) = self.forgot.get(&date) else {
            return Vec::new();
        };
        entries
            .iter()
            .sorted_by(|a, b| b.count.cmp(&a.count))
            .filter(|entry| store.contains(&entry.id))
            .take(limit)
            .map(|entry| entry.id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::abcd_store;
    use strum::IntoEnumIterator;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn id(s: &str) -> CardId {
        CardId::from(s)
    }

    #[test]
    fn bump_creates_record_lazily() {
        let mut stats = StatsTracker::default();
        assert!(stats.daily().is_empty());
        for field in StatField::iter() {
            stats.bump(field, day(1));
        }
        stats.bump(StatField::Knew, day(1));
        assert_eq!(
            stats.day(day(1)),
            DailyStats {
                seen: 1,
                forgot: 1,
                knew: 2
            }
        );
        assert_eq!(stats.day(day(2)), DailyStats::default());
        assert_eq!(stats.daily().len(), 1);
    }

    #[test]
    fn top_forgotten_is_descending_and_stable() {
        let store = abcd_store();
        let mut stats = StatsTracker::default();
        let counts = [("a", 3), ("b", 5), ("c", 5), ("d", 1)];
        for (card, n) in counts {
            for _ in 0..n {
                stats.bump_forgot(&id(card), day(1));
            }
        }
        assert_eq!(
            stats.top_forgotten(day(1), TOP_FORGOTTEN_LIMIT, &store),
            [id("b"), id("c"), id("a"), id("d")]
        );
        assert_eq!(stats.top_forgotten(day(1), 2, &store), [id("b"), id("c")]);
        assert!(stats.top_forgotten(day(2), 10, &store).is_empty());
    }

    #[test]
    fn top_forgotten_skips_missing_cards() {
        let store = abcd_store();
        let mut stats = StatsTracker::default();
        stats.bump_forgot(&id("gone"), day(1));
        stats.bump_forgot(&id("gone"), day(1));
        stats.bump_forgot(&id("c"), day(1));
        assert_eq!(stats.top_forgotten(day(1), 1, &store), [id("c")]);
        assert_eq!(stats.forgot_count(&id("gone"), day(1)), 2);
    }

    #[test]
    fn seen_counts_once_per_day() {
        let mut stats = StatsTracker::default();
        assert!(stats.mark_seen_once(&id("a"), day(1)));
        assert!(!stats.mark_seen_once(&id("a"), day(1)));
        assert!(stats.mark_seen_once(&id("b"), day(1)));
        assert_eq!(stats.day(day(1)).seen, 2);

        assert!(stats.mark_seen_once(&id("a"), day(2)));
        assert_eq!(stats.day(day(2)).seen, 1);
        assert_eq!(stats.day(day(1)).seen, 2);
    }

    #[test]
    fn stat_field_names() {
        assert_eq!(StatField::Forgot.to_string(), "forgot");
        assert_eq!("knew".parse::<StatField>().unwrap(), StatField::Knew);
    }
}
