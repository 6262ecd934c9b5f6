use snafu::Snafu;

#[derive(Snafu, Debug)]
#[snafu(visibility(pub(crate)))]
pub enum WordMemoError {
    #[snafu(display("interval table must hold 5 increasing, non-zero day counts"))]
    InvalidParameters,
    #[snafu(display("No unknown cards in this session yet."))]
    NothingToRepeat,
    #[snafu(display("No 'I forgot' records for today yet."))]
    NoForgottenToday,
    #[snafu(display("Nothing studied in this session yet."))]
    EmptySession,
    #[snafu(display("Failed to load {source_name}: {message}"))]
    ContentLoad {
        source_name: String,
        message: String,
    },
    #[snafu(display("could not persist {key}"))]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
}

pub type Result<T, E = WordMemoError> = std::result::Result<T, E>;
