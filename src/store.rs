use std::fs;
use std::path::Path;

use anyhow::{Context, anyhow};
use chrono::{NaiveDate, NaiveTime};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeGroup, PlayerAttributes};
use crate::error::{MatchdayError, Result};
use crate::lineup::MatchSheet;
use crate::model::{Club, ClubLeague, League, Match, Membership, Player, Role, User};
use crate::scoring;
use crate::validation;

const BOOK_VERSION: u32 = 1;

/// Everything the club manager knows, persisted as one JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubBook {
    pub version: u32,
    next_id: u32,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub clubs: Vec<Club>,
    #[serde(default)]
    pub memberships: Vec<Membership>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub leagues: Vec<League>,
    #[serde(default)]
    pub club_leagues: Vec<ClubLeague>,
    #[serde(default)]
    pub matches: Vec<MatchSheet>,
}

impl Default for ClubBook {
    fn default() -> Self {
        Self {
            version: BOOK_VERSION,
            next_id: 1,
            users: Vec::new(),
            clubs: Vec::new(),
            memberships: Vec::new(),
            players: Vec::new(),
            leagues: Vec::new(),
            club_leagues: Vec::new(),
            matches: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub league_id: Option<u32>,
    pub date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: String,
    pub num_teams: u8,
    pub max_players_per_team: Option<usize>,
}

/// What an acting user wants to touch, and at which level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Creating clubs, leagues and users, or anything without an owning club.
    Superuser,
    Club(u32, Role),
    League(u32),
    Match(u32),
    Player(u32),
}

impl ClubBook {
    /// A missing file is an empty book.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "no club book yet, starting empty");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read club book {}", path.display()))?;
        let book: ClubBook = serde_json::from_str(&raw)
            .with_context(|| format!("parse club book {}", path.display()))?;
        if book.version != BOOK_VERSION {
            return Err(anyhow!(
                "club book {} has version {}, expected {}",
                path.display(),
                book.version,
                BOOK_VERSION
            ));
        }
        Ok(book)
    }

    /// Writes to a sibling temp file, then renames over the book.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create data dir {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize club book")?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, path).with_context(|| format!("swap in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "club book saved");
        Ok(())
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    // Users and roles

    pub fn add_user(
        &mut self,
        username: &str,
        email: Option<&str>,
        is_superuser: bool,
    ) -> Result<u32> {
        let username = validation::non_empty(Some(username), "username")?;
        if self.users.iter().any(|u| u.username == username) {
            return Err(MatchdayError::integrity(
                "create_user",
                format!("username '{username}' is taken"),
            ));
        }
        let id = self.take_id();
        self.users.push(User {
            id,
            username: username.to_string(),
            email: email.map(str::trim).filter(|e| !e.is_empty()).map(str::to_string),
            is_superuser,
        });
        Ok(id)
    }

    pub fn user(&self, user_id: u32) -> Result<&User> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .ok_or_else(|| MatchdayError::not_found("User", user_id))
    }

    pub fn delete_user(&mut self, user_id: u32) -> Result<User> {
        let idx = self
            .users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| MatchdayError::not_found("User", user_id))?;
        self.memberships.retain(|m| m.user_id != user_id);
        Ok(self.users.remove(idx))
    }

    /// Inserts or replaces the user's role in the club.
    pub fn set_membership(&mut self, user_id: u32, club_id: u32, role: Role) -> Result<()> {
        self.user(user_id)?;
        self.club(club_id)?;
        match self
            .memberships
            .iter_mut()
            .find(|m| m.user_id == user_id && m.club_id == club_id)
        {
            Some(existing) => existing.role = role,
            None => self.memberships.push(Membership {
                user_id,
                club_id,
                role,
            }),
        }
        Ok(())
    }

    pub fn remove_membership(&mut self, user_id: u32, club_id: u32) -> bool {
        let before = self.memberships.len();
        self.memberships
            .retain(|m| !(m.user_id == user_id && m.club_id == club_id));
        before != self.memberships.len()
    }

    pub fn role_in(&self, user_id: u32, club_id: u32) -> Option<Role> {
        self.memberships
            .iter()
            .find(|m| m.user_id == user_id && m.club_id == club_id)
            .map(|m| m.role)
    }

    pub fn club_ids_for(&self, user_id: u32) -> Vec<u32> {
        match self.user(user_id) {
            Ok(user) if user.is_superuser => self.clubs.iter().map(|c| c.id).collect(),
            Ok(_) => self
                .memberships
                .iter()
                .filter(|m| m.user_id == user_id)
                .map(|m| m.club_id)
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn can(&self, user_id: u32, club_id: u32, required: Role) -> bool {
        match self.user(user_id) {
            Ok(user) if user.is_superuser => true,
            Ok(_) => self
                .role_in(user_id, club_id)
                .is_some_and(|role| role.allows(required)),
            Err(_) => false,
        }
    }

    pub fn require(&self, user_id: u32, club_id: u32, required: Role, action: &str) -> Result<()> {
        if self.can(user_id, club_id, required) {
            return Ok(());
        }
        Err(self.denied(action, Scope::Club(club_id, required)))
    }

    fn is_superuser(&self, user_id: u32) -> bool {
        self.user(user_id).is_ok_and(|u| u.is_superuser)
    }

    /// Managers of any club playing in the league may edit it.
    pub fn can_edit_league(&self, user_id: u32, league_id: u32) -> bool {
        self.is_superuser(user_id)
            || self
                .club_leagues
                .iter()
                .filter(|link| link.league_id == league_id)
                .any(|link| self.can(user_id, link.club_id, Role::Manager))
    }

    /// Matches outside any league are left to superusers.
    pub fn can_edit_match(&self, user_id: u32, match_id: u32) -> bool {
        if self.is_superuser(user_id) {
            return true;
        }
        match self.sheet(match_id).map(|s| s.info.league_id) {
            Ok(Some(league_id)) => self.can_edit_league(user_id, league_id),
            _ => false,
        }
    }

    /// Players without a club are left to superusers.
    pub fn can_edit_player(&self, user_id: u32, player_id: u32) -> bool {
        if self.is_superuser(user_id) {
            return true;
        }
        match self.player(player_id).map(|p| p.club_id) {
            Ok(Some(club_id)) => self.can(user_id, club_id, Role::Manager),
            _ => false,
        }
    }

    /// Clubs whose records `actor` may list; `None` means every club.
    pub fn visible_club_ids(&self, actor: Option<u32>) -> Option<Vec<u32>> {
        match actor {
            _ if self.users.is_empty() => None,
            Some(user_id) if self.is_superuser(user_id) => None,
            Some(user_id) => Some(self.club_ids_for(user_id)),
            None => Some(Vec::new()),
        }
    }

    /// Gate for every edit. A book without users is open; once a user exists,
    /// an acting user with enough rights in `scope` is required.
    pub fn authorize(&self, actor: Option<u32>, scope: Scope, action: &str) -> Result<()> {
        if self.users.is_empty() {
            return Ok(());
        }
        let allowed = actor.is_some_and(|user_id| match scope {
            Scope::Superuser => self.is_superuser(user_id),
            Scope::Club(club_id, role) => self.can(user_id, club_id, role),
            Scope::League(league_id) => self.can_edit_league(user_id, league_id),
            Scope::Match(match_id) => self.can_edit_match(user_id, match_id),
            Scope::Player(player_id) => self.can_edit_player(user_id, player_id),
        });
        if allowed {
            return Ok(());
        }
        tracing::warn!(?actor, ?scope, action, "permission denied");
        Err(self.denied(action, scope))
    }

    fn denied(&self, action: &str, scope: Scope) -> MatchdayError {
        let resource = match scope {
            Scope::Superuser => "without superuser rights".to_string(),
            Scope::Club(club_id, _) => self
                .club(club_id)
                .map(|c| format!("club '{}'", c.name))
                .unwrap_or_else(|_| format!("club {club_id}")),
            Scope::League(league_id) => self
                .league(league_id)
                .map(|l| format!("league '{}'", l.name))
                .unwrap_or_else(|_| format!("league {league_id}")),
            Scope::Match(match_id) => format!("match {match_id}"),
            Scope::Player(player_id) => self
                .player(player_id)
                .map(|p| format!("player '{}'", p.name))
                .unwrap_or_else(|_| format!("player {player_id}")),
        };
        MatchdayError::Permission {
            action: action.to_string(),
            resource,
        }
    }

    // Clubs and leagues

    pub fn add_club(&mut self, name: &str, description: Option<&str>) -> Result<u32> {
        let name = validation::non_empty(Some(name), "club_name")?;
        if self.clubs.iter().any(|c| c.name == name) {
            return Err(MatchdayError::integrity(
                "create_club",
                format!("club '{name}' already exists"),
            ));
        }
        let id = self.take_id();
        self.clubs.push(Club {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
        });
        Ok(id)
    }

    pub fn club(&self, club_id: u32) -> Result<&Club> {
        self.clubs
            .iter()
            .find(|c| c.id == club_id)
            .ok_or_else(|| MatchdayError::not_found("Club", club_id))
    }

    /// Drops memberships and league links; the club's players stay, unattached.
    pub fn delete_club(&mut self, club_id: u32) -> Result<Club> {
        let idx = self
            .clubs
            .iter()
            .position(|c| c.id == club_id)
            .ok_or_else(|| MatchdayError::not_found("Club", club_id))?;
        self.memberships.retain(|m| m.club_id != club_id);
        self.club_leagues.retain(|l| l.club_id != club_id);
        for player in self.players.iter_mut().filter(|p| p.club_id == Some(club_id)) {
            player.club_id = None;
        }
        tracing::info!(club_id, "club deleted");
        Ok(self.clubs.remove(idx))
    }

    pub fn add_league(&mut self, name: &str, description: Option<&str>) -> Result<u32> {
        let name = validation::non_empty(Some(name), "league_name")?;
        if self.leagues.iter().any(|l| l.name == name) {
            return Err(MatchdayError::integrity(
                "create_league",
                format!("league '{name}' already exists"),
            ));
        }
        let id = self.take_id();
        self.leagues.push(League {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
        });
        Ok(id)
    }

    pub fn league(&self, league_id: u32) -> Result<&League> {
        self.leagues
            .iter()
            .find(|l| l.id == league_id)
            .ok_or_else(|| MatchdayError::not_found("League", league_id))
    }

    /// Matches of the league are kept but detached from it.
    pub fn delete_league(&mut self, league_id: u32) -> Result<League> {
        let idx = self
            .leagues
            .iter()
            .position(|l| l.id == league_id)
            .ok_or_else(|| MatchdayError::not_found("League", league_id))?;
        self.club_leagues.retain(|l| l.league_id != league_id);
        for sheet in self
            .matches
            .iter_mut()
            .filter(|s| s.info.league_id == Some(league_id))
        {
            sheet.info.league_id = None;
        }
        Ok(self.leagues.remove(idx))
    }

    pub fn link_club_league(&mut self, club_id: u32, league_id: u32) -> Result<()> {
        self.club(club_id)?;
        self.league(league_id)?;
        if self
            .club_leagues
            .iter()
            .any(|l| l.club_id == club_id && l.league_id == league_id)
        {
            return Err(MatchdayError::integrity(
                "link_club_league",
                format!("club {club_id} is already in league {league_id}"),
            ));
        }
        self.club_leagues.push(ClubLeague { club_id, league_id });
        Ok(())
    }

    pub fn unlink_club_league(&mut self, club_id: u32, league_id: u32) -> bool {
        let before = self.club_leagues.len();
        self.club_leagues
            .retain(|l| !(l.club_id == club_id && l.league_id == league_id));
        before != self.club_leagues.len()
    }

    pub fn leagues_for_club(&self, club_id: u32) -> Vec<&League> {
        self.club_leagues
            .iter()
            .filter(|l| l.club_id == club_id)
            .filter_map(|link| self.leagues.iter().find(|l| l.id == link.league_id))
            .collect()
    }

    // Players

    /// New players start with random attributes across every catalog key.
    pub fn add_player<R: Rng + ?Sized>(
        &mut self,
        name: &str,
        club_id: Option<u32>,
        alias: Option<&str>,
        rng: &mut R,
    ) -> Result<u32> {
        let name = validation::non_empty(Some(name), "name")?;
        if let Some(club_id) = club_id {
            self.club(club_id)?;
        }
        let id = self.take_id();
        self.players.push(Player {
            id,
            club_id,
            name: name.to_string(),
            alias: alias.map(str::trim).filter(|a| !a.is_empty()).map(str::to_string),
            height_cm: None,
            weight_kg: None,
            position_pref: None,
            attributes: PlayerAttributes::random(rng),
        });
        tracing::debug!(player_id = id, name, "player added");
        Ok(id)
    }

    /// Same as [`ClubBook::add_player`] but seeded from a requested overall score.
    pub fn add_player_with_score(
        &mut self,
        name: &str,
        club_id: Option<u32>,
        overall: i32,
    ) -> Result<u32> {
        let name = validation::non_empty(Some(name), "name")?;
        if let Some(club_id) = club_id {
            self.club(club_id)?;
        }
        let id = self.take_id();
        self.players.push(Player {
            id,
            club_id,
            name: name.to_string(),
            alias: None,
            height_cm: None,
            weight_kg: None,
            position_pref: None,
            attributes: scoring::set_overall_score(overall),
        });
        Ok(id)
    }

    pub fn player(&self, player_id: u32) -> Result<&Player> {
        self.players
            .iter()
            .find(|p| p.id == player_id)
            .ok_or_else(|| MatchdayError::not_found("Player", player_id))
    }

    fn player_mut(&mut self, player_id: u32) -> Result<&mut Player> {
        self.players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or_else(|| MatchdayError::not_found("Player", player_id))
    }

    /// Players of the given clubs; `None` means every player.
    pub fn players_in(&self, club_ids: Option<&[u32]>) -> Vec<&Player> {
        let mut out: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| match club_ids {
                Some(ids) => p.club_id.is_some_and(|id| ids.contains(&id)),
                None => true,
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn find_player_by_name_or_alias(
        &self,
        name: &str,
        club_ids: Option<&[u32]>,
    ) -> Option<&Player> {
        let name = name.trim();
        self.players.iter().find(|p| {
            p.answers_to(name)
                && match club_ids {
                    Some(ids) if !ids.is_empty() => p.club_id.is_some_and(|id| ids.contains(&id)),
                    _ => true,
                }
        })
    }

    pub fn rename_player(&mut self, player_id: u32, name: &str, alias: Option<&str>) -> Result<()> {
        let name = validation::non_empty(Some(name), "name")?.to_string();
        let player = self.player_mut(player_id)?;
        player.name = name;
        player.alias = alias.map(str::trim).filter(|a| !a.is_empty()).map(str::to_string);
        Ok(())
    }

    pub fn set_player_body(
        &mut self,
        player_id: u32,
        height_cm: Option<u16>,
        weight_kg: Option<u16>,
    ) -> Result<()> {
        if let Some(height) = height_cm {
            validation::int_in_range(i64::from(height), Some(100), Some(250), "height")?;
        }
        if let Some(weight) = weight_kg {
            validation::int_in_range(i64::from(weight), Some(30), Some(200), "weight")?;
        }
        let player = self.player_mut(player_id)?;
        player.height_cm = height_cm;
        player.weight_kg = weight_kg;
        Ok(())
    }

    pub fn set_player_category_score(
        &mut self,
        player_id: u32,
        group: AttributeGroup,
        score: i32,
    ) -> Result<i32> {
        let player = self.player_mut(player_id)?;
        scoring::apply_category_score(&mut player.attributes, group, score);
        Ok(scoring::group_score(&player.attributes, group))
    }

    pub fn set_player_overall(&mut self, player_id: u32, score: i32) -> Result<i32> {
        let player = self.player_mut(player_id)?;
        player.attributes = scoring::set_overall_score(score);
        Ok(player.overall())
    }

    pub fn set_player_attribute(&mut self, player_id: u32, key: &str, value: i32) -> Result<()> {
        let player = self.player_mut(player_id)?;
        scoring::apply_attribute_change(&mut player.attributes, key, value)
    }

    /// Also removes the player from every match sheet.
    pub fn delete_player(&mut self, player_id: u32) -> Result<Player> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or_else(|| MatchdayError::not_found("Player", player_id))?;
        for sheet in &mut self.matches {
            sheet.remove_roster_player(player_id);
        }
        Ok(self.players.remove(idx))
    }

    // Matches

    fn check_match_fields(&self, new: &NewMatch) -> Result<()> {
        if !(1..=2).contains(&new.num_teams) {
            return Err(MatchdayError::validation("num_teams", "must be 1 or 2"));
        }
        if let Some(max) = new.max_players_per_team {
            validation::int_in_range(max as i64, Some(1), None, "max_players_per_team")?;
        }
        if let (Some(start), Some(end)) = (new.start_time, new.end_time) {
            if end <= start {
                return Err(MatchdayError::validation("end_time", "must be after start time"));
            }
        }
        if let Some(league_id) = new.league_id {
            self.league(league_id)?;
        }
        Ok(())
    }

    pub fn create_match(&mut self, new: NewMatch) -> Result<u32> {
        self.check_match_fields(&new)?;
        let id = self.take_id();
        self.matches.push(MatchSheet::new(Match {
            id,
            league_id: new.league_id,
            date: new.date,
            start_time: new.start_time,
            end_time: new.end_time,
            location: new.location.trim().to_string(),
            num_teams: new.num_teams,
            max_players_per_team: new.max_players_per_team,
        }));
        tracing::info!(match_id = id, date = %new.date, "match created");
        Ok(id)
    }

    /// Replaces the match details; `num_teams` re-derives which sides allocate.
    /// Teams, players and events on the sheet are kept.
    pub fn update_match(&mut self, match_id: u32, update: NewMatch) -> Result<()> {
        self.check_match_fields(&update)?;
        let sheet = self.sheet_mut(match_id)?;
        let info = &mut sheet.info;
        info.league_id = update.league_id;
        info.date = update.date;
        info.start_time = update.start_time;
        info.end_time = update.end_time;
        info.location = update.location.trim().to_string();
        info.max_players_per_team = update.max_players_per_team;
        sheet.set_allocated_count(update.num_teams);
        tracing::info!(match_id, "match updated");
        Ok(())
    }

    /// Details of an existing match, ready to be edited and passed back to
    /// [`ClubBook::update_match`].
    pub fn match_details(&self, match_id: u32) -> Result<NewMatch> {
        let info = &self.sheet(match_id)?.info;
        Ok(NewMatch {
            league_id: info.league_id,
            date: info.date,
            start_time: info.start_time,
            end_time: info.end_time,
            location: info.location.clone(),
            num_teams: info.num_teams,
            max_players_per_team: info.max_players_per_team,
        })
    }

    pub fn sheet(&self, match_id: u32) -> Result<&MatchSheet> {
        self.matches
            .iter()
            .find(|s| s.info.id == match_id)
            .ok_or_else(|| MatchdayError::not_found("Match", match_id))
    }

    pub fn sheet_mut(&mut self, match_id: u32) -> Result<&mut MatchSheet> {
        self.matches
            .iter_mut()
            .find(|s| s.info.id == match_id)
            .ok_or_else(|| MatchdayError::not_found("Match", match_id))
    }

    /// Borrow one sheet mutably alongside the (read-only) roster.
    pub fn sheet_and_roster(&mut self, match_id: u32) -> Result<(&mut MatchSheet, &[Player])> {
        let sheet = self
            .matches
            .iter_mut()
            .find(|s| s.info.id == match_id)
            .ok_or_else(|| MatchdayError::not_found("Match", match_id))?;
        Ok((sheet, self.players.as_slice()))
    }

    pub fn delete_match(&mut self, match_id: u32) -> Result<MatchSheet> {
        let idx = self
            .matches
            .iter()
            .position(|s| s.info.id == match_id)
            .ok_or_else(|| MatchdayError::not_found("Match", match_id))?;
        Ok(self.matches.remove(idx))
    }

    /// Most recent first.
    pub fn matches_by_date(&self, league_id: Option<u32>) -> Vec<&MatchSheet> {
        let mut out: Vec<&MatchSheet> = self
            .matches
            .iter()
            .filter(|s| league_id.is_none() || s.info.league_id == league_id)
            .collect();
        out.sort_by(|a, b| {
            b.info
                .date
                .cmp(&a.info.date)
                .then(b.info.start_time.cmp(&a.info.start_time))
        });
        out
    }

    /// Matches in leagues that one of `club_ids` plays in.
    pub fn matches_for_clubs(&self, club_ids: &[u32]) -> Vec<&MatchSheet> {
        self.matches_by_date(None)
            .into_iter()
            .filter(|s| {
                s.info.league_id.is_some_and(|league_id| {
                    self.club_leagues
                        .iter()
                        .any(|l| l.league_id == league_id && club_ids.contains(&l.club_id))
                })
            })
            .collect()
    }

    pub fn next_match(&self, today: NaiveDate) -> Option<&MatchSheet> {
        self.matches
            .iter()
            .filter(|s| s.info.date >= today)
            .min_by_key(|s| (s.info.date, s.info.start_time))
    }
}
