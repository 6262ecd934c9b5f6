use chrono::{DateTime, TimeZone, Utc};

use crate::card::{CardStore, ParsedCard};

pub(crate) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub(crate) fn parsed(pairs: &[(&str, &str)]) -> Vec<ParsedCard> {
    pairs
        .iter()
        .enumerate()
        .map(|(i, (term, meaning))| ParsedCard {
            sequence: Some(i as u32 + 1),
            term: term.to_string(),
            meaning: meaning.to_string(),
        })
        .collect()
}

/// A store with cards `a`, `b`, `c`, `d` loaded at [`start_time`].
pub(crate) fn abcd_store() -> CardStore {
    let mut store = CardStore::default();
    store.append(
        parsed(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]),
        start_time(),
    );
    store
}
