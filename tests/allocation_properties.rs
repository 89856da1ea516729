use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use matchday::allocation::{RatedPlayer, allocate_match, allocate_teams, plan_two_teams};
use matchday::error::MatchdayError;
use matchday::model::Position;
use matchday::store::{ClubBook, NewMatch};

fn pool(rng: &mut StdRng, n: usize) -> Vec<RatedPlayer> {
    (0..n)
        .map(|idx| RatedPlayer {
            player_id: idx as u32 + 1,
            score: rng.gen_range(10..=200),
        })
        .collect()
}

#[test]
fn team_sizes_differ_by_at_most_one() {
    let mut rng = StdRng::seed_from_u64(11);
    for n in 2..=30 {
        let players = pool(&mut rng, n);
        let split = allocate_teams(&players).expect("enough players");
        let (a, b) = (split.team1.len(), split.team2.len());
        assert_eq!(a + b, n);
        assert!(a.abs_diff(b) <= 1, "n={n}: {a} vs {b}");
    }
}

#[test]
fn score_gap_bounded_by_strongest_player() {
    let mut rng = StdRng::seed_from_u64(12);
    for n in 2..=30 {
        let players = pool(&mut rng, n);
        let best = players.iter().map(|p| p.score).max().unwrap_or(0);
        let total: i32 = players.iter().map(|p| p.score).sum();
        let split = allocate_teams(&players).expect("enough players");
        assert!(split.score_gap() <= best, "n={n}: gap {}", split.score_gap());
        assert!(split.score_gap() <= total);
    }
}

#[test]
fn every_player_placed_once() {
    let mut rng = StdRng::seed_from_u64(13);
    let players = pool(&mut rng, 17);
    let split = plan_two_teams(&players, Some(7)).expect("enough players");
    let mut ids: Vec<u32> = [&split.team1, &split.team2]
        .iter()
        .flat_map(|t| t.starters.iter().chain(&t.substitutes))
        .map(|p| p.player_id)
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=17).collect::<Vec<u32>>());
    assert_eq!(split.team1.starters.len(), 7);
    assert_eq!(split.team2.starters.len(), 7);
}

#[test]
fn each_team_starts_exactly_one_goalkeeper() {
    let mut rng = StdRng::seed_from_u64(14);
    for n in 2..=24 {
        let players = pool(&mut rng, n);
        let split = allocate_teams(&players).expect("enough players");
        let (first, second) = split.assign(&mut rng);
        for team in [first, second] {
            let keepers = team
                .iter()
                .filter(|a| a.is_starter && a.position == Position::Goalkeeper)
                .count();
            assert_eq!(keepers, 1, "n={n}");
        }
    }
}

#[test]
fn allocating_a_match_fills_both_teams() {
    let mut rng = StdRng::seed_from_u64(15);
    let mut book = ClubBook::default();
    let match_id = book
        .create_match(NewMatch {
            league_id: None,
            date: chrono::NaiveDate::from_ymd_opt(2026, 9, 6).expect("date"),
            start_time: None,
            end_time: None,
            location: "Hollow Lane Park".to_string(),
            num_teams: 2,
            max_players_per_team: Some(5),
        })
        .expect("match");
    for idx in 0..13 {
        let id = book
            .add_player(&format!("Player {idx}"), None, None, &mut rng)
            .expect("player");
        book.sheet_mut(match_id).expect("sheet").add_signup(id).expect("signup");
    }

    let (sheet, roster) = book.sheet_and_roster(match_id).expect("sheet");
    let outcome = allocate_match(sheet, roster, &mut rng).expect("allocation");
    assert_eq!(outcome.teams, 2);
    assert_eq!(outcome.starters, 10);
    assert_eq!(outcome.substitutes, 3);
    assert!(sheet.signups().is_empty());

    for team in &sheet.teams {
        let players = sheet.team_players(team.id);
        let starting_keepers = players
            .iter()
            .filter(|p| p.is_starter && p.position == Some(Position::Goalkeeper))
            .count();
        assert_eq!(starting_keepers, 1);
        assert!(players.first().is_some_and(|p| p.is_starter));
    }
}

#[test]
fn rejected_allocation_leaves_sheet_alone() {
    let mut rng = StdRng::seed_from_u64(16);
    let mut book = ClubBook::default();
    let match_id = book
        .create_match(NewMatch {
            league_id: None,
            date: chrono::NaiveDate::from_ymd_opt(2026, 9, 6).expect("date"),
            start_time: None,
            end_time: None,
            location: String::new(),
            num_teams: 2,
            max_players_per_team: None,
        })
        .expect("match");
    let id = book.add_player("Solo", None, None, &mut rng).expect("player");
    book.sheet_mut(match_id).expect("sheet").add_signup(id).expect("signup");

    let before = book.sheet(match_id).expect("sheet").clone();
    let (sheet, roster) = book.sheet_and_roster(match_id).expect("sheet");
    assert!(allocate_match(sheet, roster, &mut rng).is_err());
    assert_eq!(book.sheet(match_id).expect("sheet"), &before);
}

fn signed_up_match(
    rng: &mut StdRng,
    num_teams: u8,
    max: Option<usize>,
    n: usize,
) -> (ClubBook, u32) {
    let mut book = ClubBook::default();
    let match_id = book
        .create_match(NewMatch {
            league_id: None,
            date: chrono::NaiveDate::from_ymd_opt(2026, 9, 13).expect("date"),
            start_time: None,
            end_time: None,
            location: String::new(),
            num_teams,
            max_players_per_team: max,
        })
        .expect("match");
    for idx in 0..n {
        let id = book
            .add_player(&format!("Player {idx}"), None, None, rng)
            .expect("player");
        book.sheet_mut(match_id).expect("sheet").add_signup(id).expect("signup");
    }
    (book, match_id)
}

#[test]
fn single_team_match_benches_overflow() {
    let mut rng = StdRng::seed_from_u64(17);
    let (mut book, match_id) = signed_up_match(&mut rng, 1, Some(4), 6);

    let (sheet, roster) = book.sheet_and_roster(match_id).expect("sheet");
    let outcome = allocate_match(sheet, roster, &mut rng).expect("allocate");
    assert_eq!(outcome.teams, 1);
    assert_eq!(outcome.starters, 4);
    assert_eq!(outcome.substitutes, 2);

    let sheet = book.sheet(match_id).expect("sheet");
    let home = sheet.team_by_number(1).expect("home");
    let away = sheet.team_by_number(2).expect("away");
    assert_eq!(home.name, "Home Team");
    assert!(!away.should_allocate);
    assert!(sheet.team_players(away.id).is_empty());

    let players = sheet.team_players(home.id);
    assert_eq!(players.len(), 6);
    let keepers = players
        .iter()
        .filter(|p| p.is_starter && p.position == Some(Position::Goalkeeper))
        .count();
    assert_eq!(keepers, 1);
}

#[test]
fn no_allocated_team_is_rejected() {
    let mut rng = StdRng::seed_from_u64(18);
    let (mut book, match_id) = signed_up_match(&mut rng, 2, None, 4);
    let sheet = book.sheet_mut(match_id).expect("sheet");
    for number in [1, 2] {
        let team = sheet.team_by_number(number).expect("team").clone();
        sheet
            .update_team(team.id, &team.name, team.jersey_color, false)
            .expect("update");
    }
    assert_eq!(sheet.info.num_teams, 0);

    let (sheet, roster) = book.sheet_and_roster(match_id).expect("sheet");
    match allocate_match(sheet, roster, &mut rng) {
        Err(MatchdayError::Allocation(msg)) => {
            assert!(msg.contains("Invalid number of allocated teams: 0"), "{msg}")
        }
        other => panic!("expected an allocation error, got {other:?}"),
    }
    assert_eq!(book.sheet(match_id).expect("sheet").signups().len(), 4);
}

#[test]
fn away_side_can_be_switched_back_on() {
    let mut rng = StdRng::seed_from_u64(19);
    let (mut book, match_id) = signed_up_match(&mut rng, 1, None, 8);
    let mut update = book.match_details(match_id).expect("details");
    update.num_teams = 2;
    book.update_match(match_id, update).expect("update");

    let (sheet, roster) = book.sheet_and_roster(match_id).expect("sheet");
    let outcome = allocate_match(sheet, roster, &mut rng).expect("allocate");
    assert_eq!(outcome.teams, 2);
    let sheet = book.sheet(match_id).expect("sheet");
    let away = sheet.team_by_number(2).expect("away");
    assert_eq!(away.jersey_color.as_deref(), Some("Red"));
    assert_eq!(sheet.team_players(away.id).len(), 4);
}
