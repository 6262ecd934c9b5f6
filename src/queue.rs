use std::collections::HashSet;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumDiscriminants, EnumIter, EnumString};

use crate::card::{Card, CardId, CardStore};
use crate::error::{Result, WordMemoError};

/// Whether Main walks cards in source order or back to front.
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
pub enum OrderDirection {
    #[default]
    Forward,
    Reversed,
}

fn main_order(store: &CardStore, direction: OrderDirection) -> Vec<CardId> {
    match direction {
        OrderDirection::Forward => store.ids().cloned().collect(),
        OrderDirection::Reversed => store.ids().rev().cloned().collect(),
    }
}

/// A cursor over an id list that is frozen for the lifetime of the run.
/// Grading never reorders it; only explicit mode or order changes build a
/// new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    ordered: Vec<CardId>,
    position: usize,
}

impl Run {
    pub fn new(ordered: Vec<CardId>) -> Self {
        Self {
            ordered,
            position: 0,
        }
    }

    /// A run over `ordered` positioned at `id`, or at the start when `id`
    /// is absent.
    fn relocated(ordered: Vec<CardId>, id: Option<&CardId>) -> Self {
        let position = id
            .and_then(|id| ordered.iter().position(|other| other == id))
            .unwrap_or(0);
        Self { ordered, position }
    }

    pub fn ordered_ids(&self) -> &[CardId] {
        &self.ordered
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn current_id(&self) -> Option<&CardId> {
        self.ordered.get(self.position)
    }

    pub fn remaining(&self) -> usize {
        self.ordered.len().saturating_sub(self.position)
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.ordered.len()
    }

    fn step(&mut self) {
        if !self.is_exhausted() {
            self.position += 1;
        }
    }

    /// Drops vanished ids without refilling, keeping the cursor on the same
    /// logical entry.
    fn prune(&mut self, removed: &HashSet<CardId>) {
        let before = self.ordered[..self.position.min(self.ordered.len())]
            .iter()
            .filter(|id| removed.contains(*id))
            .count();
        self.ordered.retain(|id| !removed.contains(id));
        self.position -= before;
    }
}

/// The active run. Special runs carry the membership they were built from.
#[derive(Debug, Clone, Default, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(name(ModeKind), derive(Display, Hash))]
pub enum RunMode {
    #[default]
    Main,
    RepeatUnknown {
        members: HashSet<CardId>,
    },
    TopForgotten {
        members: HashSet<CardId>,
    },
}

impl RunMode {
    pub fn is_special(&self) -> bool {
        !matches!(self, RunMode::Main)
    }

    pub fn members(&self) -> Option<&HashSet<CardId>> {
        match self {
            RunMode::Main => None,
            RunMode::RepeatUnknown { members } | RunMode::TopForgotten { members } => {
                Some(members)
            }
        }
    }

    fn members_mut(&mut self) -> Option<&mut HashSet<CardId>> {
        match self {
            RunMode::Main => None,
            RunMode::RepeatUnknown { members } | RunMode::TopForgotten { members } => {
                Some(members)
            }
        }
    }
}

/// Decides which card is shown next. Main walks every card; a special run
/// suspends Main, walks its subset once and then hands back to the exact
/// Main cursor it interrupted.
#[derive(Debug, Clone, Default)]
pub struct QueueController {
    mode: RunMode,
    run: Run,
    suspended_main: Option<Run>,
    direction: OrderDirection,
    revealed: bool,
}

impl QueueController {
    pub fn new(direction: OrderDirection, store: &CardStore) -> Self {
        let mut queue = Self {
            direction,
            ..Default::default()
        };
        queue.restart_main(store);
        queue
    }

    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    pub fn kind(&self) -> ModeKind {
        ModeKind::from(&self.mode)
    }

    pub fn run(&self) -> &Run {
        &self.run
    }

    pub fn suspended_main(&self) -> Option<&Run> {
        self.suspended_main.as_ref()
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }

    pub fn remaining(&self) -> usize {
        self.run.remaining()
    }

    pub fn is_answer_revealed(&self) -> bool {
        self.revealed
    }

    pub fn reveal(&mut self) {
        if !self.run.is_exhausted() {
            self.revealed = true;
        }
    }

    /// Every card id in the store under the current direction.
    pub fn main_order(&self, store: &CardStore) -> Vec<CardId> {
        main_order(store, self.direction)
    }

    /// Discards any run in progress and starts Main from the top.
    pub fn restart_main(&mut self, store: &CardStore) {
        self.mode = RunMode::Main;
        self.suspended_main = None;
        self.run = Run::new(self.main_order(store));
        self.revealed = false;
        self.settle(store);
    }

    /// The card under the cursor. Ids that no longer resolve are stepped over
    /// first; stepping over them is not a review.
    pub fn current_card<'s>(&mut self, store: &'s CardStore) -> Option<&'s Card> {
        self.settle(store);
        self.run.current_id().and_then(|id| store.find_by_id(id))
    }

    pub fn advance(&mut self, store: &CardStore) {
        self.run.step();
        self.revealed = false;
        self.settle(store);
    }

    /// Skips dangling ids and, once a special run is used up, returns to Main.
    fn settle(&mut self, store: &CardStore) {
        loop {
            while let Some(id) = self.run.current_id() {
                if store.contains(id) {
                    break;
                }
                debug!("skipping missing card {id}");
                self.run.step();
                self.revealed = false;
            }
            if self.run.is_exhausted() && self.mode.is_special() {
                self.finish_special(store);
                continue;
            }
            break;
        }
    }

    fn finish_special(&mut self, store: &CardStore) {
        info!("{} run finished, resuming main", self.kind());
        self.resume_main(store);
    }

    fn resume_main(&mut self, store: &CardStore) {
        self.mode = RunMode::Main;
        self.revealed = false;
        self.run = match self.suspended_main.take() {
            Some(run) => run,
            None => Run::new(self.main_order(store)),
        };
    }

    /// The Main run: the active one, or the suspended one during a special run.
    fn main_mut(&mut self) -> Option<&mut Run> {
        if self.mode.is_special() {
            self.suspended_main.as_mut()
        } else {
            Some(&mut self.run)
        }
    }

    /// Leaves a special run immediately, restoring the suspended Main cursor.
    fn leave_special(&mut self, store: &CardStore) {
        if self.mode.is_special() {
            info!(
                "leaving {} run with {} cards left, resuming main",
                self.kind(),
                self.run.remaining()
            );
            self.resume_main(store);
        }
    }

    fn subset_of_main(&self, store: &CardStore, members: &HashSet<CardId>) -> Vec<CardId> {
        self.main_order(store)
            .into_iter()
            .filter(|id| members.contains(id))
            .collect()
    }

    /// Starts a run over the `unknown` cards, in Main order. Any special run
    /// in progress is left first. Returns the ids of the new run so the
    /// caller can bring them due.
    pub fn enter_repeat_unknown(
        &mut self,
        store: &CardStore,
        unknown: &HashSet<CardId>,
    ) -> Result<&[CardId]> {
        let ordered = self.subset_of_main(store, unknown);
        if ordered.is_empty() {
            return Err(WordMemoError::NothingToRepeat);
        }
        self.leave_special(store);
        self.suspended_main = Some(std::mem::take(&mut self.run));
        self.start_special(
            RunMode::RepeatUnknown {
                members: ordered.iter().cloned().collect(),
            },
            ordered,
        );
        Ok(self.run.ordered_ids())
    }

    /// Starts a run over today's most-forgotten cards, in Main order. A Main
    /// cursor that is already suspended stays the one to return to.
    pub fn enter_top_forgotten(&mut self, store: &CardStore, top: &[CardId]) -> Result<&[CardId]> {
        let members: HashSet<CardId> = top.iter().cloned().collect();
        let ordered = self.subset_of_main(store, &members);
        if ordered.is_empty() {
            return Err(WordMemoError::NoForgottenToday);
        }
        if self.suspended_main.is_none() {
            self.suspended_main = Some(std::mem::take(&mut self.run));
        }
        self.start_special(
            RunMode::TopForgotten {
                members: ordered.iter().cloned().collect(),
            },
            ordered,
        );
        Ok(self.run.ordered_ids())
    }

    fn start_special(&mut self, mode: RunMode, ordered: Vec<CardId>) {
        self.mode = mode;
        info!("entering {} run with {} cards", self.kind(), ordered.len());
        self.run = Run::new(ordered);
        self.revealed = false;
    }

    /// Replaces whatever is running with a replay of `seen`, repeats and all.
    /// The suspended Main cursor is discarded.
    pub fn replay(&mut self, store: &CardStore, seen: &[CardId]) {
        info!("replaying {} session reviews", seen.len());
        self.mode = RunMode::Main;
        self.suspended_main = None;
        self.run = Run::new(seen.to_vec());
        self.revealed = false;
        self.settle(store);
    }

    /// Switches Main's direction. The card on screen stays on screen; a
    /// suspended Main is re-derived the same way for when it resumes.
    pub fn set_direction(&mut self, direction: OrderDirection, store: &CardStore) {
        if self.direction == direction {
            return;
        }
        self.direction = direction;
        if let Some(run) = self.main_mut() {
            *run = Run::relocated(main_order(store, direction), run.current_id());
        }
        self.settle(store);
    }

    /// Adds newly imported ids to the end of Main, leaving any special run.
    /// The cursor does not move.
    pub fn extend_main(&mut self, store: &CardStore, added: &[CardId]) {
        self.leave_special(store);
        self.append_to_main(store, added);
    }

    /// Adds ids to the end of Main without touching a special run in
    /// progress; a suspended Main receives them instead.
    pub fn append_to_main(&mut self, store: &CardStore, added: &[CardId]) {
        let direction = self.direction;
        if let Some(main) = self.main_mut() {
            let added = added.iter().cloned();
            match direction {
                OrderDirection::Forward => main.ordered.extend(added),
                OrderDirection::Reversed => main.ordered.extend(added.rev()),
            }
        }
        self.settle(store);
    }

    /// Shrinks every run in place after cards vanished. Special runs are not
    /// refilled; one that empties hands back to Main.
    pub fn prune(&mut self, store: &CardStore, removed: &HashSet<CardId>) {
        self.run.prune(removed);
        if let Some(run) = self.suspended_main.as_mut() {
            run.prune(removed);
        }
        if let Some(members) = self.mode.members_mut() {
            members.retain(|id| !removed.contains(id));
        }
        self.settle(store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{abcd_store, parsed, start_time};

    fn ids(names: &[&str]) -> Vec<CardId> {
        names.iter().map(|&n| CardId::from(n)).collect()
    }

    fn set(names: &[&str]) -> HashSet<CardId> {
        ids(names).into_iter().collect()
    }

    fn current(queue: &mut QueueController, store: &CardStore) -> Option<String> {
        queue.current_card(store).map(|card| card.term.clone())
    }

    #[test]
    fn main_walks_source_order() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        assert_eq!(queue.run().ordered_ids(), ids(&["a", "b", "c", "d"]));
        let mut shown = vec![];
        while let Some(term) = current(&mut queue, &store) {
            shown.push(term);
            queue.advance(&store);
        }
        assert_eq!(shown, ["a", "b", "c", "d"]);
        assert_eq!(queue.remaining(), 0);
        queue.advance(&store);
        assert_eq!(queue.run().position(), 4);
    }

    #[test]
    fn reversed_main() {
        let store = abcd_store();
        let queue = QueueController::new(OrderDirection::Reversed, &store);
        assert_eq!(queue.run().ordered_ids(), ids(&["d", "c", "b", "a"]));
    }

    #[test]
    fn remaining_tracks_position() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        for expected in (0..=4).rev() {
            assert_eq!(
                queue.remaining(),
                queue.run().ordered_ids().len() - queue.run().position()
            );
            assert_eq!(queue.remaining(), expected);
            queue.advance(&store);
        }
    }

    #[test]
    fn repeat_unknown_returns_to_captured_main() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.advance(&store);
        queue.advance(&store);
        let captured = queue.run().clone();

        let run = queue
            .enter_repeat_unknown(&store, &set(&["c", "a"]))
            .unwrap()
            .to_vec();
        assert_eq!(run, ids(&["a", "c"]));
        assert_eq!(queue.kind(), ModeKind::RepeatUnknown);
        assert_eq!(queue.suspended_main(), Some(&captured));
        assert_eq!(queue.run().position(), 0);

        queue.advance(&store);
        assert_eq!(queue.kind(), ModeKind::RepeatUnknown);
        queue.advance(&store);
        assert_eq!(queue.kind(), ModeKind::Main);
        assert_eq!(queue.run(), &captured);
        assert!(queue.suspended_main().is_none());
        assert_eq!(current(&mut queue, &store).as_deref(), Some("c"));
    }

    #[test]
    fn empty_special_runs_change_nothing() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.advance(&store);
        assert!(matches!(
            queue.enter_repeat_unknown(&store, &HashSet::new()),
            Err(WordMemoError::NothingToRepeat)
        ));
        assert!(matches!(
            queue.enter_top_forgotten(&store, &ids(&["gone"])),
            Err(WordMemoError::NoForgottenToday)
        ));
        assert_eq!(queue.kind(), ModeKind::Main);
        assert_eq!(queue.run().position(), 1);
    }

    #[test]
    fn top_forgotten_keeps_pending_suspension() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.advance(&store);
        let captured = queue.run().clone();
        queue.enter_repeat_unknown(&store, &set(&["b", "d"])).unwrap();
        queue.advance(&store);

        let run = queue
            .enter_top_forgotten(&store, &ids(&["d", "a"]))
            .unwrap()
            .to_vec();
        assert_eq!(run, ids(&["a", "d"]));
        assert_eq!(queue.kind(), ModeKind::TopForgotten);
        assert_eq!(queue.suspended_main(), Some(&captured));

        queue.advance(&store);
        queue.advance(&store);
        assert_eq!(queue.kind(), ModeKind::Main);
        assert_eq!(queue.run(), &captured);
    }

    #[test]
    fn repeat_unknown_leaves_top_forgotten_first() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.advance(&store);
        queue.advance(&store);
        queue.advance(&store);
        let captured = queue.run().clone();
        queue.enter_top_forgotten(&store, &ids(&["b"])).unwrap();
        queue.enter_repeat_unknown(&store, &set(&["a"])).unwrap();
        assert_eq!(queue.suspended_main(), Some(&captured));
        queue.advance(&store);
        assert_eq!(queue.run(), &captured);
        assert_eq!(current(&mut queue, &store).as_deref(), Some("d"));
    }

    #[test]
    fn replay_uses_history_verbatim() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.enter_repeat_unknown(&store, &set(&["b"])).unwrap();
        let history = ids(&["b", "a", "b"]);
        queue.replay(&store, &history);
        assert_eq!(queue.kind(), ModeKind::Main);
        assert!(queue.suspended_main().is_none());
        assert_eq!(queue.run().ordered_ids(), history);
        assert_eq!(queue.run().position(), 0);
    }

    #[test]
    fn direction_change_keeps_current_card() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.advance(&store);
        queue.reveal();
        queue.set_direction(OrderDirection::Reversed, &store);
        assert_eq!(queue.run().ordered_ids(), ids(&["d", "c", "b", "a"]));
        assert_eq!(current(&mut queue, &store).as_deref(), Some("b"));
        assert_eq!(queue.run().position(), 2);
        assert!(queue.is_answer_revealed());
    }

    #[test]
    fn direction_change_during_special_run_reorders_suspended_main() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.advance(&store);
        queue.enter_repeat_unknown(&store, &set(&["a", "d"])).unwrap();
        queue.set_direction(OrderDirection::Reversed, &store);
        assert_eq!(queue.run().ordered_ids(), ids(&["a", "d"]));
        assert_eq!(
            queue.suspended_main().unwrap().ordered_ids(),
            ids(&["d", "c", "b", "a"])
        );
        assert_eq!(
            queue.suspended_main().unwrap().current_id(),
            Some(&CardId::from("b"))
        );
    }

    #[test]
    fn dangling_ids_are_skipped() {
        let mut store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        store.merge_refresh(parsed(&[("a", "1"), ("d", "4")]), start_time());
        assert_eq!(current(&mut queue, &store).as_deref(), Some("a"));
        queue.advance(&store);
        assert_eq!(current(&mut queue, &store).as_deref(), Some("d"));
        assert_eq!(queue.run().position(), 3);
    }

    #[test]
    fn prune_shrinks_in_place() {
        let mut store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.advance(&store);
        queue.advance(&store);
        queue.enter_repeat_unknown(&store, &set(&["b", "d"])).unwrap();

        let removed: HashSet<CardId> = store
            .merge_refresh(parsed(&[("b", "2"), ("c", "3")]), start_time())
            .into_iter()
            .collect();
        queue.prune(&store, &removed);

        assert_eq!(queue.run().ordered_ids(), ids(&["b"]));
        assert_eq!(queue.mode().members(), Some(&set(&["b"])));
        let main = queue.suspended_main().unwrap();
        assert_eq!(main.ordered_ids(), ids(&["b", "c"]));
        assert_eq!(main.current_id(), Some(&CardId::from("c")));
    }

    #[test]
    fn special_run_emptied_by_prune_returns_to_main() {
        let mut store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.enter_repeat_unknown(&store, &set(&["d"])).unwrap();
        let removed: HashSet<CardId> = store
            .merge_refresh(parsed(&[("a", "1"), ("b", "2")]), start_time())
            .into_iter()
            .collect();
        queue.prune(&store, &removed);
        assert_eq!(queue.kind(), ModeKind::Main);
        assert_eq!(queue.run().ordered_ids(), ids(&["a", "b"]));
    }

    #[test]
    fn switching_special_runs_keeps_main_cursor() {
        let store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Forward, &store);
        queue.advance(&store);
        queue.advance(&store);
        queue
            .enter_top_forgotten(&store, &ids(&["a", "b", "d"]))
            .unwrap();
        queue.advance(&store);

        queue.enter_repeat_unknown(&store, &set(&["a"])).unwrap();
        assert_eq!(queue.kind(), ModeKind::RepeatUnknown);
        assert_eq!(queue.run().ordered_ids(), ids(&["a"]));
        let main = queue.suspended_main().unwrap();
        assert_eq!(main.current_id(), Some(&CardId::from("c")));

        queue.advance(&store);
        assert_eq!(queue.kind(), ModeKind::Main);
        assert_eq!(current(&mut queue, &store).as_deref(), Some("c"));
    }

    #[test]
    fn extend_main_appends_after_cursor() {
        let mut store = abcd_store();
        let mut queue = QueueController::new(OrderDirection::Reversed, &store);
        queue.advance(&store);
        queue.enter_repeat_unknown(&store, &set(&["a"])).unwrap();
        let added = store.append(parsed(&[("e", "5"), ("f", "6")]), start_time());
        queue.extend_main(&store, &added);
        assert_eq!(queue.kind(), ModeKind::Main);
        assert_eq!(
            queue.run().ordered_ids(),
            ids(&["d", "c", "b", "a", "f", "e"])
        );
        assert_eq!(current(&mut queue, &store).as_deref(), Some("c"));
    }
}
