use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::card::{Card, ParsedCard};

/// A leading list number such as `12.`, `7)`, `3:` or a bare `5 `.
static LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:[.):]|\s)\s*").expect("label pattern is valid")
});

const TAB: char = '\t';
const DASH: &str = " - ";

/// Parses word-list text: one card per non-blank line, term and meaning
/// separated by a tab or by ` - `. Lines with neither separator, or with an
/// empty term or meaning, are skipped.
pub fn parse(text: &str) -> Vec<ParsedCard> {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<ParsedCard> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (sequence, body) = strip_label(line);
    let (term, meaning) = split_fields(body)?;
    let (term, meaning) = (term.trim(), meaning.trim());
    if term.is_empty() || meaning.is_empty() {
        return None;
    }
    Some(ParsedCard {
        sequence,
        term: term.to_string(),
        meaning: meaning.to_string(),
    })
}

/// Removes a leading number, but only when what remains is still a valid
/// record; `100\thundred` keeps `100` as its term.
fn strip_label(line: &str) -> (Option<u32>, &str) {
    let Some(captures) = LABEL.captures(line) else {
        return (None, line);
    };
    let rest = &line[captures[0].len()..];
    if split_fields(rest).is_none() {
        return (None, line);
    }
    (captures[1].parse().ok(), rest)
}

/// First two fields of a record. Anything after a second separator is dropped.
fn split_fields(body: &str) -> Option<(&str, &str)> {
    if body.contains(TAB) {
        let mut fields = body.split(TAB);
        Some((fields.next()?, fields.next()?))
    } else if body.contains(DASH) {
        let mut fields = body.split(DASH);
        Some((fields.next()?, fields.next()?))
    } else {
        None
    }
}

/// Renders cards back into tab-separated source text, one line per card.
pub fn format_cards<'a>(cards: impl IntoIterator<Item = &'a Card>) -> String {
    cards
        .into_iter()
        .map(|card| format!("{}{TAB}{}\n", card.term, card.meaning))
        .join("")
}
