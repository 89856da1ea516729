use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, anyhow, bail};
use chrono::{NaiveDate, NaiveTime};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

use matchday::allocation;
use matchday::attributes::{self, AttributeGroup};
use matchday::config::AppConfig;
use matchday::lineup::MatchSheet;
use matchday::model::{EventKind, Player, Position, Role};
use matchday::signup;
use matchday::store::{ClubBook, NewMatch, Scope};
use matchday::validation;

const USAGE: &str = "usage: matchday [--book <path>] [--as <user>] <command> [args]

commands:
  players [--club <id>]
  player <id>
  add-club <name>
  add-league <name>
  join-league <club> <league>
  add-user <username> [--email <email>] [--superuser]
  grant <user> <club> <viewer|manager|admin>
  add-player <name> [--alias <alias>] [--club <id>] [--score <10-200>]
  delete-player <id>
  import <file> [--club <id>]
  new-match <yyyy-mm-dd> [--teams <1|2>] [--max <n>] [--location <text>]
            [--start <hh:mm>] [--end <hh:mm>] [--league <id>]
  edit-match <match> [--date <yyyy-mm-dd>] [--teams <1|2>] [--max <n>]
             [--location <text>] [--start <hh:mm>] [--end <hh:mm>] [--league <id|none>]
  team <match> <team-number> [--name <text>] [--color <text>] [--allocate <yes|no>]
  matches [--league <id>]
  delete-match <match>
  signup <match> <file> [--club <id>]
  allocate <match>
  reset <match>
  swap <match> <match-player> <match-player>
  move <match> <match-player> <team-number|signup> [--position <pos>] [--bench]
  captain <match> <team-number> [match-player]
  clear-signups <match>
  rate <match> <match-player> [rating]
  goals <match> <team-number> <goals>
  event <match> <kind> [--player <id>] [--team <number>] [--minute <m>] [--note <text>]
  show <match>
  set-score <player> <technical|mental|physical|gk|overall> <score>
  set-attr <player> <attribute> <1-20>";

const SWITCHES: [&str; 2] = ["bench", "superuser"];

/// Positional arguments plus `--key value` / `--key=value` options.
struct Args {
    positional: Vec<String>,
    options: HashMap<String, String>,
}

impl Args {
    fn parse(raw: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut positional = Vec::new();
        let mut options = HashMap::new();
        let mut iter = raw.into_iter();
        while let Some(arg) = iter.next() {
            let Some(flag) = arg.strip_prefix("--") else {
                positional.push(arg);
                continue;
            };
            if let Some((key, value)) = flag.split_once('=') {
                options.insert(key.to_string(), value.trim().to_string());
                continue;
            }
            if SWITCHES.contains(&flag) {
                options.insert(flag.to_string(), "true".to_string());
                continue;
            }
            let Some(value) = iter.next() else {
                bail!("--{flag} needs a value");
            };
            options.insert(flag.to_string(), value.trim().to_string());
        }
        Ok(Self {
            positional,
            options,
        })
    }

    fn arg(&self, idx: usize, name: &str) -> anyhow::Result<&str> {
        self.positional
            .get(idx)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("missing <{name}>\n\n{USAGE}"))
    }

    fn id(&self, idx: usize, name: &str) -> anyhow::Result<u32> {
        let raw = self.arg(idx, name)?;
        raw.parse()
            .with_context(|| format!("<{name}> must be a number, got '{raw}'"))
    }

    fn flag(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    fn opt(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn opt_parse<T: std::str::FromStr>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.opt(key)
            .map(|raw| {
                raw.parse::<T>()
                    .with_context(|| format!("--{key}: cannot parse '{raw}'"))
            })
            .transpose()
    }
}

fn main() -> anyhow::Result<()> {
    let mut config = AppConfig::from_env();
    init_tracing(&config);

    let args = Args::parse(std::env::args().skip(1))?;
    if let Some(book) = args.opt("book") {
        config.book_path = Some(PathBuf::from(book));
    }
    let Some(command) = args.positional.first().cloned() else {
        println!("{USAGE}");
        return Ok(());
    };
    let book_path = config
        .book_path
        .clone()
        .context("no club book path: pass --book or set MATCHDAY_BOOK")?;
    let mut book = ClubBook::load(&book_path)?;
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let actor = match args.opt_parse("as")? {
        Some(user) => Some(user),
        None => config.acting_user,
    };
    let changed = run(&command, &args, actor, &mut book, &mut rng)?;
    if changed {
        book.save(&book_path)?;
    }
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Returns whether the book needs saving.
fn run(
    command: &str,
    args: &Args,
    actor: Option<u32>,
    book: &mut ClubBook,
    rng: &mut StdRng,
) -> anyhow::Result<bool> {
    match command {
        "players" => {
            let club: Option<u32> = args.opt_parse("club")?;
            let clubs: Vec<u32> = match (club, book.visible_club_ids(actor)) {
                (Some(club), Some(visible)) => visible.into_iter().filter(|&c| c == club).collect(),
                (Some(club), None) => vec![club],
                (None, visible) => visible.unwrap_or_default(),
            };
            let scoped = club.is_some() || book.visible_club_ids(actor).is_some();
            let filter = scoped.then_some(clubs.as_slice());
            println!(
                "{:>5}  {:<24} {:>4} {:>4} {:>4} {:>4} {:>7}",
                "id", "name", "tec", "men", "phy", "gk", "overall"
            );
            for player in book.players_in(filter) {
                let s = player.scores();
                println!(
                    "{:>5}  {:<24} {:>4} {:>4} {:>4} {:>4} {:>7}",
                    player.id,
                    player.display_name(),
                    s.technical,
                    s.mental,
                    s.physical,
                    s.gk,
                    s.overall
                );
            }
            Ok(false)
        }
        "player" => {
            let player = book.player(args.id(1, "player")?)?;
            let scores = player.scores();
            println!("{} (#{}), overall {}", player.name, player.id, scores.overall);
            for group in AttributeGroup::ALL {
                println!("\n{} {}", group.label(), scores.get(group));
                for (key, value) in player.attributes.group(group) {
                    let label = attributes::label_of(key).unwrap_or(key.as_str());
                    println!("  {label:<20} {value:>2}");
                }
            }
            Ok(false)
        }
        "add-league" => {
            book.authorize(actor, Scope::Superuser, "create")?;
            let id = book.add_league(args.arg(1, "name")?, None)?;
            println!("league {id} created");
            Ok(true)
        }
        "join-league" => {
            let club = args.id(1, "club")?;
            book.authorize(actor, Scope::Club(club, Role::Manager), "link leagues to")?;
            book.link_club_league(club, args.id(2, "league")?)?;
            Ok(true)
        }
        "add-user" => {
            book.authorize(actor, Scope::Superuser, "create users")?;
            let id = book.add_user(
                args.arg(1, "username")?,
                args.opt("email"),
                args.flag("superuser"),
            )?;
            println!("user {id} created");
            Ok(true)
        }
        "grant" => {
            let user = args.id(1, "user")?;
            let club = args.id(2, "club")?;
            book.authorize(actor, Scope::Club(club, Role::Admin), "manage members of")?;
            let names: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
            let raw =
                validation::one_of(args.positional.get(3).map(String::as_str), &names, "role")?;
            let role = Role::parse(raw).ok_or_else(|| anyhow!("unknown role '{raw}'"))?;
            book.set_membership(user, club, role)?;
            println!("user {user} is now {} of club {club}", role.as_str());
            Ok(true)
        }
        "add-club" => {
            book.authorize(actor, Scope::Superuser, "create")?;
            let id = book.add_club(args.arg(1, "name")?, None)?;
            println!("club {id} created");
            Ok(true)
        }
        "add-player" => {
            let name = args.arg(1, "name")?;
            let club = args.opt_parse("club")?;
            book.authorize(actor, club_scope(club), "add players to")?;
            let id = match args.opt_parse::<i32>("score")? {
                Some(score) => book.add_player_with_score(name, club, score)?,
                None => book.add_player(name, club, args.opt("alias"), rng)?,
            };
            if let (Some(alias), Some(_)) = (args.opt("alias"), args.opt("score")) {
                book.rename_player(id, name, Some(alias))?;
            }
            let player = book.player(id)?;
            println!("player {id} '{}' overall {}", player.name, player.overall());
            Ok(true)
        }
        "delete-player" => {
            let player_id = args.id(1, "player")?;
            book.authorize(actor, Scope::Player(player_id), "delete")?;
            let removed = book.delete_player(player_id)?;
            println!("player '{}' deleted", removed.name);
            Ok(true)
        }
        "import" => {
            let club = args.opt_parse("club")?;
            book.authorize(actor, club_scope(club), "import players into")?;
            let text = read_text(args.arg(1, "file")?)?;
            let imported = signup::import_players(book, &text, club, rng)?;
            println!("imported {imported} new players");
            Ok(imported > 0)
        }
        "new-match" => {
            let date: NaiveDate = args
                .arg(1, "date")?
                .parse()
                .context("<date> must be yyyy-mm-dd")?;
            let league_id = args.opt_parse("league")?;
            let scope = league_id.map_or(Scope::Superuser, Scope::League);
            book.authorize(actor, scope, "schedule matches in")?;
            let new = NewMatch {
                league_id,
                date,
                start_time: parse_time(args.opt("start"))?,
                end_time: parse_time(args.opt("end"))?,
                location: args.opt("location").unwrap_or_default().to_string(),
                num_teams: args.opt_parse("teams")?.unwrap_or(2),
                max_players_per_team: args.opt_parse("max")?,
            };
            let id = book.create_match(new)?;
            println!("match {id} created");
            Ok(true)
        }
        "edit-match" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let mut update = book.match_details(match_id)?;
            if let Some(raw) = args.opt("date") {
                update.date = raw.parse().context("--date must be yyyy-mm-dd")?;
            }
            if args.opt("start").is_some() {
                update.start_time = parse_time(args.opt("start"))?;
            }
            if args.opt("end").is_some() {
                update.end_time = parse_time(args.opt("end"))?;
            }
            if let Some(location) = args.opt("location") {
                update.location = location.to_string();
            }
            if let Some(teams) = args.opt_parse("teams")? {
                update.num_teams = teams;
            }
            if let Some(max) = args.opt_parse("max")? {
                update.max_players_per_team = Some(max);
            }
            match args.opt("league") {
                Some("none") => update.league_id = None,
                Some(_) => update.league_id = args.opt_parse("league")?,
                None => {}
            }
            if let Some(league_id) = update.league_id {
                book.authorize(actor, Scope::League(league_id), "move matches into")?;
            }
            book.update_match(match_id, update)?;
            let (sheet, roster) = book.sheet_and_roster(match_id)?;
            print_sheet(sheet, roster);
            Ok(true)
        }
        "team" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let allocate = match args.opt("allocate") {
                Some(raw) => Some(validation::one_of(Some(raw), &["yes", "no"], "allocate")?),
                None => None,
            };
            let sheet = book.sheet_mut(match_id)?;
            let team_id = team_id_at(sheet, args, 2)?;
            let team = sheet
                .team(team_id)
                .ok_or_else(|| anyhow!("team {team_id} not found"))?;
            let name = args.opt("name").unwrap_or(team.name.as_str()).to_string();
            let color = match args.opt("color") {
                Some(color) => Some(color.to_string()),
                None => team.jersey_color.clone(),
            };
            let allocate = allocate.map_or(team.should_allocate, |raw| raw == "yes");
            sheet.update_team(team_id, &name, color, allocate)?;
            let team = sheet
                .team(team_id)
                .ok_or_else(|| anyhow!("team {team_id} not found"))?;
            println!(
                "team {} '{}' ({}){}",
                team.team_number,
                team.name,
                team.jersey_color.as_deref().unwrap_or("no colour"),
                if team.should_allocate { "" } else { ", not allocated" }
            );
            Ok(true)
        }
        "matches" => {
            let today = chrono::Local::now().date_naive();
            let next = book.next_match(today).map(MatchSheet::match_id);
            let league: Option<u32> = args.opt_parse("league")?;
            let sheets = match book.visible_club_ids(actor) {
                None => book.matches_by_date(league),
                Some(clubs) => book
                    .matches_for_clubs(&clubs)
                    .into_iter()
                    .filter(|s| league.is_none() || s.info.league_id == league)
                    .collect(),
            };
            for sheet in sheets {
                let info = &sheet.info;
                let kickoff = info
                    .start_time
                    .map_or_else(String::new, |t| t.format("%H:%M").to_string());
                let marker = if next == Some(info.id) { "  <- next" } else { "" };
                println!(
                    "{:>5}  {} {:<5} {:<28} {} signed up{marker}",
                    info.id,
                    info.date,
                    kickoff,
                    info.location,
                    sheet.players.len()
                );
            }
            Ok(false)
        }
        "delete-match" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "delete")?;
            let removed = book.delete_match(match_id)?;
            println!("match {} on {} deleted", removed.match_id(), removed.info.date);
            Ok(true)
        }
        "signup" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let text = read_text(args.arg(2, "file")?)?;
            let added =
                signup::sign_up_from_text(book, match_id, &text, args.opt_parse("club")?, rng)?;
            println!("{added} players signed up for match {match_id}");
            Ok(true)
        }
        "allocate" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let (sheet, roster) = book.sheet_and_roster(match_id)?;
            let outcome = allocation::allocate_match(sheet, roster, rng)?;
            print_sheet(sheet, roster);
            if let Some(gap) = outcome.score_gap {
                println!("\nstarter score gap {gap} after {} swaps", outcome.swaps);
            }
            Ok(true)
        }
        "reset" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let moved = book.sheet_mut(match_id)?.reset_teams();
            println!("{moved} players back on the signup list");
            Ok(true)
        }
        "swap" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let (first, second) = (args.id(2, "match-player")?, args.id(3, "match-player")?);
            book.sheet_mut(match_id)?.swap_players(first, second)?;
            let (sheet, roster) = book.sheet_and_roster(match_id)?;
            print_sheet(sheet, roster);
            Ok(true)
        }
        "captain" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let captain = match args.positional.get(3) {
                Some(_) => Some(args.id(3, "match-player")?),
                None => None,
            };
            let sheet = book.sheet_mut(match_id)?;
            let team_id = team_id_at(sheet, args, 2)?;
            sheet.set_captain(team_id, captain)?;
            Ok(true)
        }
        "move" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let match_player = args.id(2, "match-player")?;
            let sheet = book.sheet_mut(match_id)?;
            let team_id = match args.arg(3, "team-number")? {
                "signup" => None,
                _ => Some(team_id_at(sheet, args, 3)?),
            };
            let position = match args.opt("position") {
                Some(raw) => Some(
                    Position::parse(raw).ok_or_else(|| anyhow!("unknown position '{raw}'"))?,
                ),
                None => None,
            };
            sheet.move_player(match_player, team_id, position, !args.flag("bench"))?;
            Ok(true)
        }
        "clear-signups" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let removed = book.sheet_mut(match_id)?.clear_signups();
            println!("{removed} unallocated signups removed");
            Ok(removed > 0)
        }
        "rate" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let match_player = args.id(2, "match-player")?;
            let rating = match args.positional.get(3) {
                Some(raw) => Some(
                    raw.parse::<f32>()
                        .with_context(|| format!("rating must be a number, got '{raw}'"))?,
                ),
                None => None,
            };
            book.sheet_mut(match_id)?.set_rating(match_player, rating)?;
            Ok(true)
        }
        "goals" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let goals = validation::required_int(
                args.positional.get(3).map(String::as_str),
                "goals",
                Some(0),
                None,
            )?;
            let sheet = book.sheet_mut(match_id)?;
            let team_id = team_id_at(sheet, args, 2)?;
            sheet.set_team_score(team_id, u32::try_from(goals).context("goals out of range")?)?;
            Ok(true)
        }
        "event" => {
            let match_id = args.id(1, "match")?;
            book.authorize(actor, Scope::Match(match_id), "edit")?;
            let raw_kind = args.arg(2, "kind")?;
            let kind = EventKind::parse(raw_kind)
                .ok_or_else(|| anyhow!("unknown event kind '{raw_kind}'"))?;
            let minute = validation::parse_int(args.opt("minute"), "minute", None)?
                .map(|m| validation::int_in_range(m, Some(0), Some(150), "minute"))
                .transpose()?
                .map(|m| m as u16);
            let player = args.opt_parse("player")?;
            let sheet = book.sheet_mut(match_id)?;
            let team = match args.opt("team") {
                Some(raw) => Some(team_id_for(sheet, raw)?),
                None => None,
            };
            let note = args.opt("note").unwrap_or_default();
            let id = sheet.add_event(kind, player, team, minute, note)?;
            println!("event {id} recorded");
            Ok(true)
        }
        "show" => {
            let (sheet, roster) = (book.sheet(args.id(1, "match")?)?, book.players.as_slice());
            print_sheet(sheet, roster);
            Ok(false)
        }
        "set-score" => {
            let player_id = args.id(1, "player")?;
            book.authorize(actor, Scope::Player(player_id), "edit")?;
            let target = args.arg(2, "group")?;
            let score: i32 = args
                .arg(3, "score")?
                .parse()
                .context("<score> must be a number")?;
            let result = if target.eq_ignore_ascii_case("overall") {
                book.set_player_overall(player_id, score)?
            } else {
                let group = AttributeGroup::parse(target)
                    .ok_or_else(|| anyhow!("unknown group '{target}'"))?;
                book.set_player_category_score(player_id, group, score)?
            };
            println!("{target} now {result}, overall {}", book.player(player_id)?.overall());
            Ok(true)
        }
        "set-attr" => {
            let player_id = args.id(1, "player")?;
            book.authorize(actor, Scope::Player(player_id), "edit")?;
            let key = args.arg(2, "attribute")?;
            let value: i32 = args
                .arg(3, "value")?
                .parse()
                .context("<value> must be a number")?;
            book.set_player_attribute(player_id, key, value)?;
            println!("overall now {}", book.player(player_id)?.overall());
            Ok(true)
        }
        other => bail!("unknown command '{other}'\n\n{USAGE}"),
    }
}

/// Adding players outside any club is left to superusers.
fn club_scope(club: Option<u32>) -> Scope {
    club.map_or(Scope::Superuser, |club| Scope::Club(club, Role::Manager))
}

fn team_id_at(sheet: &MatchSheet, args: &Args, idx: usize) -> anyhow::Result<u32> {
    team_id_for(sheet, args.arg(idx, "team-number")?)
}

fn team_id_for(sheet: &MatchSheet, raw: &str) -> anyhow::Result<u32> {
    let number = validation::required_int(Some(raw), "team_number", Some(1), Some(2))?;
    sheet
        .team_by_number(number as u8)
        .map(|t| t.id)
        .ok_or_else(|| anyhow!("match {} has no team {number}", sheet.match_id()))
}

fn read_text(path: &str) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {path}"))
}

fn parse_time(raw: Option<&str>) -> anyhow::Result<Option<NaiveTime>> {
    raw.map(|t| NaiveTime::parse_from_str(t, "%H:%M").with_context(|| format!("bad time '{t}'")))
        .transpose()
}

fn print_sheet(sheet: &MatchSheet, roster: &[Player]) {
    let name_of = |player_id: u32| {
        roster
            .iter()
            .find(|p| p.id == player_id)
            .map_or("?", Player::display_name)
    };
    let overall_of = |player_id: u32| {
        roster
            .iter()
            .find(|p| p.id == player_id)
            .map_or(0, Player::overall)
    };

    let info = &sheet.info;
    println!("Match {} on {} {}", info.id, info.date, info.location);
    for team in &sheet.teams {
        println!(
            "\n{} ({} goals, strength {})",
            team.name,
            team.score,
            sheet.team_strength(team.id, roster)
        );
        for entry in sheet.team_players(team.id) {
            let pos = entry.position.map_or("-", |p| p.short());
            let role = if entry.is_starter { "" } else { " (sub)" };
            let captain = if team.captain == Some(entry.id) { " [C]" } else { "" };
            println!(
                "  #{:<4} {:<4} {:<24} {:>3}{role}{captain}",
                entry.id,
                pos,
                name_of(entry.player_id),
                overall_of(entry.player_id)
            );
        }
    }
    let signups = sheet.signups();
    if !signups.is_empty() {
        println!("\nSigned up ({})", signups.len());
        for entry in signups {
            println!("  #{:<4} {}", entry.id, name_of(entry.player_id));
        }
    }
    let timeline = sheet.timeline();
    if !timeline.is_empty() {
        println!("\nEvents");
        for event in timeline {
            let minute = event.minute.map_or_else(|| "?".to_string(), |m| format!("{m}'"));
            let who = event.player_id.map_or("", name_of);
            println!("  {minute:>4} {} {who} {}", event.kind.as_str(), event.description);
        }
    }
}
