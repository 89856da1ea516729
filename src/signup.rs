//! Pasted signup lists, as posted in a group chat:
//!
//! ```text
//! Sunday 7:30 at Hollow Lane Park
//! 1. Ann
//! 2. Bobby
//! ```
//!
//! Numbered lines are players. The first line mentioning a park, lane or cove
//! is taken as the venue, and a clock time is picked up from the venue line or
//! a standalone line.

use rand::Rng;

use crate::error::Result;
use crate::store::ClubBook;

const VENUE_WORDS: [&str; 3] = ["park", "lane", "cove"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignupList {
    pub location: Option<String>,
    pub time: Option<String>,
    pub names: Vec<String>,
}

pub fn parse_signup_text(text: &str) -> SignupList {
    let mut list = SignupList::default();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with(|c: char| c.is_ascii_digit()) {
            let name = line.split_once('.').map_or(line, |(_, rest)| rest).trim();
            if !name.is_empty() {
                list.names.push(name.to_string());
            }
            continue;
        }
        let lower = line.to_lowercase();
        if list.location.is_none() && VENUE_WORDS.iter().any(|w| lower.contains(w)) {
            list.location = Some(line.to_string());
            if list.time.is_none() {
                list.time = find_time(line);
            }
            continue;
        }
        if list.time.is_none() {
            list.time = find_time(line);
        }
    }
    list
}

/// First `H:MM`, `HH:MM` or bare `HMM`/`HHMM` token in the line.
fn find_time(line: &str) -> Option<String> {
    line.split(|c: char| !(c.is_ascii_digit() || c == ':'))
        .map(|tok| tok.trim_matches(':'))
        .find(|tok| match tok.split_once(':') {
            Some((h, m)) => (1..=2).contains(&h.len()) && m.len() == 2 && !m.contains(':'),
            None => (3..=4).contains(&tok.len()),
        })
        .map(str::to_string)
}

/// Creates a player for every listed name that nobody in the club answers to.
pub fn import_players<R: Rng + ?Sized>(
    book: &mut ClubBook,
    text: &str,
    club_id: Option<u32>,
    rng: &mut R,
) -> Result<usize> {
    let list = parse_signup_text(text);
    let clubs: Vec<u32> = club_id.into_iter().collect();
    let mut imported = 0;
    for name in &list.names {
        if book
            .find_player_by_name_or_alias(name, Some(clubs.as_slice()))
            .is_some()
        {
            continue;
        }
        book.add_player(name, club_id, None, rng)?;
        imported += 1;
    }
    tracing::info!(imported, listed = list.names.len(), "signup import");
    Ok(imported)
}

/// Imports unknown names, then signs every listed player up for the match.
/// Returns how many signups were added.
pub fn sign_up_from_text<R: Rng + ?Sized>(
    book: &mut ClubBook,
    match_id: u32,
    text: &str,
    club_id: Option<u32>,
    rng: &mut R,
) -> Result<usize> {
    book.sheet(match_id)?;
    import_players(book, text, club_id, rng)?;

    let clubs: Vec<u32> = club_id.into_iter().collect();
    let ids: Vec<u32> = parse_signup_text(text)
        .names
        .iter()
        .filter_map(|name| book.find_player_by_name_or_alias(name, Some(clubs.as_slice())))
        .map(|player| player.id)
        .collect();

    let sheet = book.sheet_mut(match_id)?;
    let mut added = 0;
    for player_id in ids {
        if sheet.entry_for(player_id).is_none() {
            sheet.add_signup(player_id)?;
            added += 1;
        }
    }
    tracing::info!(match_id, added, "signups added");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_lines_become_names() {
        let list = parse_signup_text("Footy!\n1. Ann\n2.  Bobby \n3.\n\n4 Cat\nnot a player");
        assert_eq!(list.names, vec!["Ann", "Bobby", "4 Cat"]);
    }

    #[test]
    fn venue_and_time_picked_up() {
        let list = parse_signup_text("Sunday 7:30 at Hollow Lane Park\n1. Ann");
        assert_eq!(list.location.as_deref(), Some("Sunday 7:30 at Hollow Lane Park"));
        assert_eq!(list.time.as_deref(), Some("7:30"));

        let list = parse_signup_text("Kick off 930\nRiverside Cove\n1. Ann");
        assert_eq!(list.time.as_deref(), Some("930"));
        assert_eq!(list.location.as_deref(), Some("Riverside Cove"));
    }

    #[test]
    fn no_venue_no_time() {
        let list = parse_signup_text("Who's in?\n1. Ann");
        assert_eq!(list.location, None);
        assert_eq!(list.time, None);
    }
}
