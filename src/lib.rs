mod card;
mod clock;
mod error;
mod parser;
mod persistence;
mod queue;
mod scheduler;
mod session;
mod stats;
#[cfg(test)]
mod test_helpers;
mod trainer;

pub use card::{Card, CardId, CardStore, ParsedCard, Progress, content_key};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Result, WordMemoError};
pub use parser::{format_cards, parse};
pub use persistence::{
    DAILY_STATS_KEY, FORGOT_STATS_KEY, LAST_SEEN_KEY, MemoryPersistence, PREFERENCES_KEY,
    PROGRESS_KEY, Persistence, UNKNOWN_EVER_KEY,
};
pub use queue::{ModeKind, OrderDirection, QueueController, Run, RunMode};
pub use scheduler::{DEFAULT_INTERVALS, DEFAULT_RELEARN_MINUTES, MAX_LEVEL, Scheduler, next_level};
pub use session::SessionTracker;
pub use stats::{DailyStats, ForgotEntry, StatField, StatsTracker, TOP_FORGOTTEN_LIMIT};
pub use trainer::{Preferences, ShownSide, Status, Trainer, TrainerConfig};
