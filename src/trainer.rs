use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::card::{Card, CardId, CardStore, Progress};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, WordMemoError};
use crate::parser::{format_cards, parse};
use crate::persistence::{
    DAILY_STATS_KEY, FORGOT_STATS_KEY, LAST_SEEN_KEY, PREFERENCES_KEY, PROGRESS_KEY, Persistence,
    UNKNOWN_EVER_KEY, load, save,
};
use crate::queue::{ModeKind, OrderDirection, QueueController};
use crate::scheduler::Scheduler;
use crate::session::SessionTracker;
use crate::stats::{DailyStats, StatField, StatsTracker, TOP_FORGOTTEN_LIMIT};

/// Which field of a card is asked; the other one is the answer.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum ShownSide {
    #[default]
    Term,
    Meaning,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub order: OrderDirection,
    pub side: ShownSide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub top_forgotten_limit: usize,
    pub default_source_name: String,
    pub scheduler: Scheduler,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            top_forgotten_limit: TOP_FORGOTTEN_LIMIT,
            default_source_name: "words.txt".to_string(),
            scheduler: Scheduler::default(),
        }
    }
}

/// Snapshot for a status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub cards: usize,
    pub due: usize,
    pub unknown: usize,
    pub remaining: usize,
    pub mode: ModeKind,
    pub source: Option<String>,
    pub message: Option<String>,
}

/// The whole application state behind one owner. A presentation layer asks
/// for the current card, forwards button presses, and reads [`Trainer::status`].
pub struct Trainer<P: Persistence, C: Clock = SystemClock> {
    config: TrainerConfig,
    store: CardStore,
    stats: StatsTracker,
    session: SessionTracker,
    queue: QueueController,
    preferences: Preferences,
    progress: HashMap<CardId, Progress>,
    unknown_ever: Vec<CardId>,
    persistence: P,
    clock: C,
    source: Option<String>,
    message: Option<String>,
}

impl<P: Persistence> Trainer<P> {
    pub fn with_system_clock(config: TrainerConfig, persistence: P) -> Self {
        Self::new(config, persistence, SystemClock)
    }
}

impl<P: Persistence, C: Clock> Trainer<P, C> {
    /// Restores stats, preferences and saved progress from `persistence`.
    /// No cards are loaded yet.
    pub fn new(config: TrainerConfig, persistence: P, clock: C) -> Self {
        let preferences: Preferences = load(&persistence, PREFERENCES_KEY);
        let stats = StatsTracker::from_parts(
            load(&persistence, DAILY_STATS_KEY),
            load(&persistence, FORGOT_STATS_KEY),
            load(&persistence, LAST_SEEN_KEY),
        );
        let store = CardStore::default();
        let queue = QueueController::new(preferences.order, &store);
        Self {
            config,
            store,
            stats,
            session: SessionTracker::default(),
            queue,
            preferences,
            progress: load(&persistence, PROGRESS_KEY),
            unknown_ever: load(&persistence, UNKNOWN_EVER_KEY),
            persistence,
            clock,
            source: None,
            message: None,
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn store(&self) -> &CardStore {
        &self.store
    }

    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    pub fn session(&self) -> &SessionTracker {
        &self.session
    }

    pub fn queue(&self) -> &QueueController {
        &self.queue
    }

    pub fn preferences(&self) -> Preferences {
        self.preferences
    }

    pub fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn into_persistence(self) -> P {
        self.persistence
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    fn fail<T>(&mut self, err: WordMemoError) -> Result<T> {
        info!("{err}");
        self.message = Some(err.to_string());
        Err(err)
    }

    /// Loads the bundled word list unless cards are already present. Returns
    /// whether anything was loaded. A failed fetch leaves the state as it was.
    pub fn load_default<F, E>(&mut self, fetch: F) -> Result<bool>
    where
        F: FnOnce(&str) -> std::result::Result<String, E>,
        E: std::fmt::Display,
    {
        if !self.store.is_empty() {
            debug!("cards already loaded, skipping default load");
            return Ok(false);
        }
        let name = self.config.default_source_name.clone();
        match fetch(&name) {
            Ok(text) => {
                self.import_text(&name, &text);
                Ok(true)
            }
            Err(err) => {
                warn!("loading {name} failed: {err}");
                self.fail(WordMemoError::ContentLoad {
                    source_name: name,
                    message: err.to_string(),
                })
            }
        }
    }

    /// Parses `text` and appends its cards. Saved progress is applied to
    /// cards seen in earlier sessions. Returns how many cards were added.
    pub fn import_text(&mut self, name: &str, text: &str) -> usize {
        let added = self.store.append(parse(text), self.clock.now());
        self.restore_progress_for(&added);
        self.queue.extend_main(&self.store, &added);
        info!("imported {} cards from {name}", added.len());
        self.source = Some(name.to_string());
        self.message = None;
        added.len()
    }

    /// Forgets every card and the session, e.g. before loading another list.
    pub fn clear(&mut self) {
        self.store.clear();
        self.session.clear();
        self.queue.restart_main(&self.store);
        self.source = None;
        self.message = None;
    }

    /// [`Trainer::clear`] followed by a fresh import.
    pub fn replace_text(&mut self, name: &str, text: &str) -> usize {
        self.clear();
        self.import_text(name, text)
    }

    /// Swaps in an updated copy of the current list. Cards that survive keep
    /// their level and due time; vanished cards drop out of the session and
    /// of every run without the runs being rebuilt. Returns the vanished ids.
    pub fn refresh_content(&mut self, text: &str) -> Vec<CardId> {
        let before: HashSet<CardId> = self.store.ids().cloned().collect();
        let removed = self.store.merge_refresh(parse(text), self.clock.now());
        let added: Vec<CardId> = self
            .store
            .ids()
            .filter(|id| !before.contains(*id))
            .cloned()
            .collect();
        self.restore_progress_for(&added);

        let gone: HashSet<CardId> = removed.iter().cloned().collect();
        self.session.prune(&gone);
        self.queue.prune(&self.store, &gone);
        self.queue.append_to_main(&self.store, &added);
        info!(
            "refreshed content: {} added, {} removed",
            added.len(),
            removed.len()
        );
        removed
    }

    fn restore_progress_for(&mut self, ids: &[CardId]) {
        let saved: HashMap<CardId, Progress> = ids
            .iter()
            .filter_map(|id| self.progress.get(id).map(|p| (id.clone(), *p)))
            .collect();
        let restored = self.store.restore_progress(&saved);
        debug!("restored progress for {restored} cards");
    }

    /// Current card, skipping any whose id no longer resolves.
    pub fn current_card(&mut self) -> Option<&Card> {
        self.queue.current_card(&self.store)
    }

    /// `(prompt, answer)` for the current card under the shown-side preference.
    pub fn prompt(&mut self) -> Option<(&str, &str)> {
        let side = self.preferences.side;
        self.queue.current_card(&self.store).map(|card| match side {
            ShownSide::Term => (card.term.as_str(), card.meaning.as_str()),
            ShownSide::Meaning => (card.meaning.as_str(), card.term.as_str()),
        })
    }

    pub fn remaining(&self) -> usize {
        self.queue.remaining()
    }

    pub fn is_answer_revealed(&self) -> bool {
        self.queue.is_answer_revealed()
    }

    pub fn reveal(&mut self) {
        self.queue.reveal();
    }

    /// Grades the current card and moves on. Returns the card as updated, or
    /// `None` when nothing is left to show.
    pub fn grade(&mut self, knew: bool) -> Result<Option<Card>> {
        let Some(id) = self.queue.current_card(&self.store).map(|c| c.id.clone()) else {
            return Ok(None);
        };
        let now = self.clock.now();
        let today = self.clock.today();

        self.stats.mark_seen_once(&id, today);
        if knew {
            self.stats.bump(StatField::Knew, today);
        } else {
            self.stats.bump(StatField::Forgot, today);
            self.stats.bump_forgot(&id, today);
            if !self.unknown_ever.contains(&id) {
                self.unknown_ever.push(id.clone());
            }
        }
        self.session.record(&id, knew);
        let card = self
            .store
            .apply_grade(&id, knew, &self.config.scheduler, now)
            .cloned();
        if let Some(card) = &card {
            debug!("graded {} knew={knew}, level {}", card.id, card.level);
        }
        self.remember_progress(std::slice::from_ref(&id));
        self.queue.advance(&self.store);
        self.message = None;
        self.persist()?;
        Ok(card)
    }

    /// Walks this session's unknown cards, then returns to where Main was.
    /// Returns the run length.
    pub fn enter_repeat_unknown(&mut self) -> Result<usize> {
        if self.session.unknown().is_empty() {
            return self.fail(WordMemoError::NothingToRepeat);
        }
        let now = self.clock.now();
        match self
            .queue
            .enter_repeat_unknown(&self.store, self.session.unknown())
        {
            Ok(ids) => {
                let ids = ids.to_vec();
                self.force_due(&ids, now)?;
                Ok(self.queue.remaining())
            }
            Err(err) => self.fail(err),
        }
    }

    /// Walks today's most-forgotten cards, then returns to where Main was.
    /// Returns the run length.
    pub fn enter_top_forgotten(&mut self) -> Result<usize> {
        let now = self.clock.now();
        let top = self.stats.top_forgotten(
            self.clock.today(),
            self.config.top_forgotten_limit,
            &self.store,
        );
        match self.queue.enter_top_forgotten(&self.store, &top) {
            Ok(ids) => {
                let ids = ids.to_vec();
                self.force_due(&ids, now)?;
                Ok(self.queue.remaining())
            }
            Err(err) => self.fail(err),
        }
    }

    /// Abandons the current run and replays every review of this session in
    /// order. Only runs when `confirm` agrees; returns whether it did.
    pub fn repeat_all_session<F>(&mut self, confirm: F) -> Result<bool>
    where
        F: FnOnce() -> bool,
    {
        if self.session.is_empty() {
            return self.fail(WordMemoError::EmptySession);
        }
        if !confirm() {
            debug!("repeat all declined");
            return Ok(false);
        }
        let now = self.clock.now();
        self.queue.replay(&self.store, self.session.all_seen());
        let seen: Vec<CardId> = self.session.distinct_seen().into_iter().cloned().collect();
        self.force_due(&seen, now)?;
        Ok(true)
    }

    /// Makes `ids` due at `now` and saves their new due times.
    fn force_due(&mut self, ids: &[CardId], now: DateTime<Utc>) -> Result<()> {
        self.store.force_due_now(ids, now);
        self.remember_progress(ids);
        self.message = None;
        self.persist()
    }

    /// Copies the current level and due time of `ids` into the saved progress.
    fn remember_progress(&mut self, ids: &[CardId]) {
        for id in ids {
            if let Some(card) = self.store.find_by_id(id) {
                self.progress.insert(
                    id.clone(),
                    Progress {
                        level: card.level,
                        due: card.due,
                    },
                );
            }
        }
    }

    /// Starts Main over from the first card.
    pub fn restart(&mut self) {
        self.queue.restart_main(&self.store);
    }

    pub fn set_order_direction(&mut self, reversed: bool) -> Result<()> {
        let order = if reversed {
            OrderDirection::Reversed
        } else {
            OrderDirection::Forward
        };
        self.queue.set_direction(order, &self.store);
        self.preferences.order = order;
        save(&mut self.persistence, PREFERENCES_KEY, &self.preferences)
    }

    pub fn set_shown_side(&mut self, side: ShownSide) -> Result<()> {
        self.preferences.side = side;
        save(&mut self.persistence, PREFERENCES_KEY, &self.preferences)
    }

    pub fn status(&self) -> Status {
        Status {
            cards: self.store.len(),
            due: self.store.due_count(self.clock.now()),
            unknown: self.session.unknown().len(),
            remaining: self.queue.remaining(),
            mode: self.queue.kind(),
            source: self.source.clone(),
            message: self.message.clone(),
        }
    }

    pub fn today_stats(&self) -> DailyStats {
        self.stats.day(self.clock.today())
    }

    pub fn daily_stats(&self, date: NaiveDate) -> DailyStats {
        self.stats.day(date)
    }

    /// Every card ever marked forgotten, oldest first.
    pub fn unknown_ever(&self) -> &[CardId] {
        &self.unknown_ever
    }

    /// This session's cards as tab-separated text, each card once.
    pub fn export_session_text(&self) -> String {
        format_cards(
            self.session
                .distinct_seen()
                .into_iter()
                .filter_map(|id| self.store.find_by_id(id)),
        )
    }

    /// The session's still-unknown cards as tab-separated text.
    pub fn export_unknown_text(&self) -> String {
        format_cards(
            self.session
                .distinct_seen()
                .into_iter()
                .filter(|id| self.session.is_unknown(id))
                .filter_map(|id| self.store.find_by_id(id)),
        )
    }

    fn persist(&mut self) -> Result<()> {
        let store = &mut self.persistence;
        save(store, PROGRESS_KEY, &self.progress)?;
        save(store, DAILY_STATS_KEY, self.stats.daily())?;
        save(store, FORGOT_STATS_KEY, self.stats.forgot())?;
        save(store, LAST_SEEN_KEY, self.stats.last_seen())?;
        save(store, UNKNOWN_EVER_KEY, &self.unknown_ever)
    }
}
