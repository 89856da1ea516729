use std::path::PathBuf;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;

use matchday::allocation::allocate_match;
use matchday::error::MatchdayError;
use matchday::model::Role;
use matchday::signup::{import_players, sign_up_from_text};
use matchday::store::{ClubBook, NewMatch, Scope};

const SIGNUP: &str = "Sunday footy
Hollow Lane Park 7:30
1. Ann
2. Bobby
3. Cat
4. Dev
5. Ann
";

fn scratch_path(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    std::env::temp_dir()
        .join(format!("matchday-{name}-{}-{nanos}", std::process::id()))
        .join("club_book.json")
}

fn sunday(book: &mut ClubBook) -> u32 {
    book.create_match(NewMatch {
        league_id: None,
        date: NaiveDate::from_ymd_opt(2026, 10, 25).expect("date"),
        start_time: None,
        end_time: None,
        location: "Hollow Lane Park".to_string(),
        num_teams: 2,
        max_players_per_team: None,
    })
    .expect("match")
}

#[test]
fn missing_book_loads_empty() {
    let path = scratch_path("missing");
    let book = ClubBook::load(&path).expect("load");
    assert!(book.players.is_empty());
    assert!(book.matches.is_empty());
}

#[test]
fn save_then_load_round_trips() {
    let mut rng = StdRng::seed_from_u64(21);
    let mut book = ClubBook::default();
    let club = book.add_club("Rovers", Some("Sunday side")).expect("club");
    let match_id = sunday(&mut book);
    sign_up_from_text(&mut book, match_id, SIGNUP, Some(club), &mut rng).expect("signup");
    let (sheet, roster) = book.sheet_and_roster(match_id).expect("sheet");
    allocate_match(sheet, roster, &mut rng).expect("allocate");

    let path = scratch_path("round-trip");
    book.save(&path).expect("save");
    let loaded = ClubBook::load(&path).expect("load");
    assert_eq!(loaded, book);
    assert!(!path.with_extension("json.tmp").exists());

    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn corrupt_book_is_an_error() {
    let path = scratch_path("corrupt");
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).expect("dir");
    }
    std::fs::write(&path, "{ not json").expect("write");
    assert!(ClubBook::load(&path).is_err());
    if let Some(dir) = path.parent() {
        let _ = std::fs::remove_dir_all(dir);
    }
}

#[test]
fn import_skips_known_names_and_aliases() {
    let mut rng = StdRng::seed_from_u64(22);
    let mut book = ClubBook::default();
    let club = book.add_club("Rovers", None).expect("club");
    book.add_player("Robert", Some(club), Some("Bobby"), &mut rng)
        .expect("player");

    let imported = import_players(&mut book, SIGNUP, Some(club), &mut rng).expect("import");
    assert_eq!(imported, 3);
    assert_eq!(book.players.len(), 4);
    assert_eq!(import_players(&mut book, SIGNUP, Some(club), &mut rng), Ok(0));
}

#[test]
fn signing_up_twice_adds_nobody_new() {
    let mut rng = StdRng::seed_from_u64(23);
    let mut book = ClubBook::default();
    let match_id = sunday(&mut book);
    assert_eq!(
        sign_up_from_text(&mut book, match_id, SIGNUP, None, &mut rng),
        Ok(4)
    );
    assert_eq!(
        sign_up_from_text(&mut book, match_id, SIGNUP, None, &mut rng),
        Ok(0)
    );
    assert_eq!(book.sheet(match_id).expect("sheet").signups().len(), 4);
    assert!(matches!(
        sign_up_from_text(&mut book, 999, SIGNUP, None, &mut rng),
        Err(MatchdayError::NotFound { .. })
    ));
}

#[test]
fn deleting_a_club_detaches_players() {
    let mut rng = StdRng::seed_from_u64(24);
    let mut book = ClubBook::default();
    let club = book.add_club("Rovers", None).expect("club");
    let user = book.add_user("sam", None, false).expect("user");
    book.set_membership(user, club, Role::Admin).expect("membership");
    let player = book.add_player("Ann", Some(club), None, &mut rng).expect("player");

    book.delete_club(club).expect("delete");
    assert_eq!(book.player(player).map(|p| p.club_id), Ok(None));
    assert_eq!(book.role_in(user, club), None);
}

#[test]
fn player_score_edits_stay_in_range() {
    let mut book = ClubBook::default();
    let id = book.add_player_with_score("Ann", None, 150).expect("player");
    assert!((book.player(id).expect("player").overall() - 150).abs() <= 1);
    let overall = book.set_player_overall(id, 500).expect("overall");
    assert_eq!(overall, 200);
    assert!(book.set_player_attribute(id, "finishing", 0).is_ok());
    assert!(book.set_player_overall(999, 50).is_err());
}

#[test]
fn viewers_cannot_edit_a_saved_book() {
    let mut book = ClubBook::default();
    let club = book.add_club("Rovers", None).expect("club");
    let league = book.add_league("Sunday League", None).expect("league");
    book.link_club_league(club, league).expect("link");
    let match_id = sunday(&mut book);
    let mut update = book.match_details(match_id).expect("details");
    update.league_id = Some(league);
    book.update_match(match_id, update).expect("update");

    let fan = book.add_user("fan", None, false).expect("user");
    let coach = book.add_user("coach", None, false).expect("user");
    book.set_membership(fan, club, Role::Viewer).expect("member");
    book.set_membership(coach, club, Role::Manager).expect("member");

    let path = scratch_path("roles");
    book.save(&path).expect("save");
    let book = ClubBook::load(&path).expect("load");

    let err = book
        .authorize(Some(fan), Scope::Match(match_id), "allocate")
        .unwrap_err();
    assert!(matches!(err, MatchdayError::Permission { .. }));
    assert!(book.authorize(Some(coach), Scope::Match(match_id), "allocate").is_ok());
    assert!(book.authorize(Some(coach), Scope::Superuser, "create").is_err());
    assert_eq!(book.visible_club_ids(Some(fan)), Some(vec![club]));
    assert_eq!(book.matches_for_clubs(&[club]).len(), 1);
}
