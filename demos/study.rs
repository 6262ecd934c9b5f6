use std::collections::HashMap;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use wordmemo::{ModeKind, Persistence, ShownSide, Trainer, TrainerConfig};

/// Keeps every key in one JSON file next to the word list.
struct FilePersistence {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl FilePersistence {
    fn open(path: PathBuf) -> Self {
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Self { path, entries }
    }
}

impl Persistence for FilePersistence {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
        match serde_json::to_string_pretty(&self.entries) {
            Ok(raw) => {
                if let Err(err) = fs::write(&self.path, raw) {
                    log::warn!("could not write {}: {err}", self.path.display());
                }
            }
            Err(err) => log::warn!("could not encode state: {err}"),
        }
    }
}

fn setup_logging() -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(io::stderr())
        .apply()?;
    Ok(())
}

fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_logging()?;

    let words = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("words.txt"));
    let persistence = FilePersistence::open(words.with_extension("state.json"));
    let config = TrainerConfig {
        default_source_name: words.display().to_string(),
        ..Default::default()
    };
    let mut trainer = Trainer::with_system_clock(config, persistence);
    if let Err(err) = trainer.load_default(|name: &str| fs::read_to_string(name)) {
        eprintln!("{err}");
    }

    println!("[enter] show  [k] knew  [f] forgot  [u] repeat unknown  [t] top forgotten");
    println!("[a] repeat all  [r] reverse order  [m] swap sides  [x] export unknown  [q] quit");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    loop {
        let status = trainer.status();
        let revealed = trainer.is_answer_revealed();
        match trainer.prompt() {
            Some((prompt, answer)) => {
                print!(
                    "\n[{} | due {} | unknown {} | left {}] {prompt}",
                    status.mode, status.due, status.unknown, status.remaining
                );
                if revealed {
                    print!("  =>  {answer}");
                }
                println!();
            }
            None => println!("\nNo cards due"),
        }
        print!("> ");
        io::stdout().flush()?;

        let Some(command) = read_line(&mut input)? else {
            break;
        };
        let outcome = match command.as_str() {
            "" => {
                trainer.reveal();
                Ok(())
            }
            "k" => trainer.grade(true).map(|_| ()),
            "f" => trainer.grade(false).map(|_| ()),
            "u" => trainer.enter_repeat_unknown().map(|_| ()),
            "t" => trainer.enter_top_forgotten().map(|_| ()),
            "a" => trainer
                .repeat_all_session(|| {
                    print!("Repeat all (session)? [y/N] ");
                    let _ = io::stdout().flush();
                    matches!(read_line(&mut input), Ok(Some(answer)) if answer == "y")
                })
                .map(|_| ()),
            "r" => {
                let reversed = trainer.queue().direction() == wordmemo::OrderDirection::Forward;
                trainer.set_order_direction(reversed)
            }
            "m" => {
                let side = match trainer.preferences().side {
                    ShownSide::Term => ShownSide::Meaning,
                    ShownSide::Meaning => ShownSide::Term,
                };
                trainer.set_shown_side(side)
            }
            "x" => {
                print!("{}", trainer.export_unknown_text());
                Ok(())
            }
            "q" => break,
            other => {
                println!("unknown command {other:?}");
                Ok(())
            }
        };
        if let Err(err) = outcome {
            println!("{err}");
        }
        if trainer.status().mode == ModeKind::Main && trainer.remaining() == 0 {
            let today = trainer.today_stats();
            println!(
                "today: seen {} / knew {} / forgot {}",
                today.seen, today.knew, today.forgot
            );
        }
    }
    Ok(())
}
