//! One match's team sheet: teams, signed-up players, assignments and events.
//!
//! Players join a sheet as signups (no team). Allocation or manual edits move
//! them onto teams with a position and a starter flag. A team captain always
//! refers to a match player currently on that team; any edit that takes the
//! captain off the team clears it.

use serde::{Deserialize, Serialize};

use crate::allocation::{Assignment, RatedPlayer};
use crate::error::{MatchdayError, Result};
use crate::model::{EventKind, Match, MatchEvent, MatchPlayer, MatchTeam, Player, Position};

const MAX_RATING: f32 = 10.0;
const DEFAULT_TEAMS: [(u8, &str, &str); 2] = [(1, "Home Team", "Blue"), (2, "Away Team", "Red")];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSheet {
    #[serde(rename = "match")]
    pub info: Match,
    pub teams: Vec<MatchTeam>,
    #[serde(default)]
    pub players: Vec<MatchPlayer>,
    #[serde(default)]
    pub events: Vec<MatchEvent>,
    next_id: u32,
}

impl MatchSheet {
    /// Every match has a home (team 1) and an away side (team 2); `num_teams`
    /// decides whether the away side is allocated too.
    pub fn new(info: Match) -> Self {
        let mut sheet = Self {
            info,
            teams: Vec::new(),
            players: Vec::new(),
            events: Vec::new(),
            next_id: 1,
        };
        for (number, name, color) in DEFAULT_TEAMS {
            let id = sheet.take_id();
            let should_allocate = number == 1 || sheet.info.num_teams >= 2;
            sheet.teams.push(MatchTeam {
                id,
                team_number: number,
                name: name.to_string(),
                jersey_color: Some(color.to_string()),
                score: 0,
                captain: None,
                should_allocate,
            });
        }
        sheet
    }

    pub fn match_id(&self) -> u32 {
        self.info.id
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn team(&self, team_id: u32) -> Option<&MatchTeam> {
        self.teams.iter().find(|t| t.id == team_id)
    }

    fn team_mut(&mut self, team_id: u32) -> Result<&mut MatchTeam> {
        self.teams
            .iter_mut()
            .find(|t| t.id == team_id)
            .ok_or_else(|| MatchdayError::not_found("Team", team_id))
    }

    pub fn team_by_number(&self, number: u8) -> Option<&MatchTeam> {
        self.teams.iter().find(|t| t.team_number == number)
    }

    pub fn allocated_teams(&self) -> Vec<&MatchTeam> {
        self.teams.iter().filter(|t| t.should_allocate).collect()
    }

    pub fn player(&self, match_player_id: u32) -> Option<&MatchPlayer> {
        self.players.iter().find(|p| p.id == match_player_id)
    }

    fn player_mut(&mut self, match_player_id: u32) -> Result<&mut MatchPlayer> {
        self.players
            .iter_mut()
            .find(|p| p.id == match_player_id)
            .ok_or_else(|| MatchdayError::not_found("Match player", match_player_id))
    }

    pub fn entry_for(&self, player_id: u32) -> Option<&MatchPlayer> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    /// Renames a team, changes its colours and whether allocation fills it.
    pub fn update_team(
        &mut self,
        team_id: u32,
        name: &str,
        jersey_color: Option<String>,
        should_allocate: bool,
    ) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MatchdayError::validation("team_name", "cannot be empty"));
        }
        let team = self.team_mut(team_id)?;
        team.name = name.to_string();
        team.jersey_color = jersey_color
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        team.should_allocate = should_allocate;
        self.sync_team_count();
        Ok(())
    }

    /// Marks the home side, and the away side when `num_teams` is 2, for allocation.
    pub fn set_allocated_count(&mut self, num_teams: u8) {
        for team in &mut self.teams {
            team.should_allocate = team.team_number == 1 || num_teams >= 2;
        }
        self.sync_team_count();
    }

    fn sync_team_count(&mut self) {
        self.info.num_teams = self.teams.iter().filter(|t| t.should_allocate).count() as u8;
    }

    pub fn set_team_score(&mut self, team_id: u32, score: u32) -> Result<()> {
        self.team_mut(team_id)?.score = score;
        Ok(())
    }

    /// Adds a roster player as a signup. A player can appear once per match.
    pub fn add_signup(&mut self, player_id: u32) -> Result<u32> {
        self.insert_player(player_id, None, None, false)
    }

    pub fn add_to_team(
        &mut self,
        player_id: u32,
        team_id: u32,
        position: Option<Position>,
        is_starter: bool,
    ) -> Result<u32> {
        if self.team(team_id).is_none() {
            return Err(MatchdayError::not_found("Team", team_id));
        }
        self.insert_player(player_id, Some(team_id), position, is_starter)
    }

    fn insert_player(
        &mut self,
        player_id: u32,
        team_id: Option<u32>,
        position: Option<Position>,
        is_starter: bool,
    ) -> Result<u32> {
        if self.entry_for(player_id).is_some() {
            return Err(MatchdayError::integrity(
                "add_match_player",
                format!("player {player_id} is already in match {}", self.info.id),
            ));
        }
        let id = self.take_id();
        self.players.push(MatchPlayer {
            id,
            player_id,
            team_id,
            position,
            is_starter,
            rating: None,
        });
        Ok(id)
    }

    pub fn remove_player(&mut self, match_player_id: u32) -> Result<MatchPlayer> {
        let idx = self
            .players
            .iter()
            .position(|p| p.id == match_player_id)
            .ok_or_else(|| MatchdayError::not_found("Match player", match_player_id))?;
        let removed = self.players.remove(idx);
        self.clear_stale_captains();
        Ok(removed)
    }

    /// Drops a roster player from the sheet, if present.
    pub fn remove_roster_player(&mut self, player_id: u32) -> bool {
        let before = self.players.len();
        self.players.retain(|p| p.player_id != player_id);
        let removed = self.players.len() != before;
        if removed {
            self.clear_stale_captains();
        }
        removed
    }

    /// Removes every signup that has not been placed on a team.
    pub fn clear_signups(&mut self) -> usize {
        let before = self.players.len();
        self.players.retain(|p| !p.is_signup());
        before - self.players.len()
    }

    /// Sends every allocated player back to the signup list.
    pub fn reset_teams(&mut self) -> usize {
        let mut moved = 0;
        for player in self.players.iter_mut().filter(|p| !p.is_signup()) {
            player.clear_assignment();
            moved += 1;
        }
        for team in &mut self.teams {
            team.captain = None;
        }
        moved
    }

    /// Exchanges team, position and starter flag of two match players.
    pub fn swap_players(&mut self, first: u32, second: u32) -> Result<()> {
        if first == second {
            return Ok(());
        }
        let a = self
            .player(first)
            .cloned()
            .ok_or_else(|| MatchdayError::not_found("Match player", first))?;
        let b = self
            .player(second)
            .cloned()
            .ok_or_else(|| MatchdayError::not_found("Match player", second))?;

        {
            let target = self.player_mut(first)?;
            target.team_id = b.team_id;
            target.position = b.position;
            target.is_starter = b.is_starter;
        }
        {
            let target = self.player_mut(second)?;
            target.team_id = a.team_id;
            target.position = a.position;
            target.is_starter = a.is_starter;
        }
        self.clear_stale_captains();
        tracing::debug!(match_id = self.info.id, first, second, "swapped match players");
        Ok(())
    }

    /// Places a match player; `team_id = None` sends them back to signups.
    pub fn move_player(
        &mut self,
        match_player_id: u32,
        team_id: Option<u32>,
        position: Option<Position>,
        is_starter: bool,
    ) -> Result<()> {
        if let Some(team_id) = team_id {
            if self.team(team_id).is_none() {
                return Err(MatchdayError::not_found("Team", team_id));
            }
        }
        let player = self.player_mut(match_player_id)?;
        match team_id {
            Some(team_id) => {
                player.team_id = Some(team_id);
                player.position = position;
                player.is_starter = is_starter;
            }
            None => player.clear_assignment(),
        }
        self.clear_stale_captains();
        Ok(())
    }

    pub fn set_rating(&mut self, match_player_id: u32, rating: Option<f32>) -> Result<()> {
        if let Some(value) = rating {
            if !value.is_finite() || !(0.0..=MAX_RATING).contains(&value) {
                return Err(MatchdayError::validation(
                    "rating",
                    format!("must be between 0 and {MAX_RATING}"),
                ));
            }
        }
        self.player_mut(match_player_id)?.rating = rating;
        Ok(())
    }

    /// `None` clears the captaincy.
    pub fn set_captain(&mut self, team_id: u32, captain: Option<u32>) -> Result<()> {
        if let Some(match_player_id) = captain {
            let player = self
                .player(match_player_id)
                .ok_or_else(|| MatchdayError::not_found("Match player", match_player_id))?;
            if player.team_id != Some(team_id) {
                return Err(MatchdayError::validation(
                    "captain_id",
                    "captain must play for the team",
                ));
            }
        }
        self.team_mut(team_id)?.captain = captain;
        Ok(())
    }

    pub fn captain_of(&self, team_id: u32) -> Option<&MatchPlayer> {
        let captain = self.team(team_id)?.captain?;
        self.player(captain)
    }

    fn clear_stale_captains(&mut self) {
        let players = &self.players;
        for team in &mut self.teams {
            let Some(captain) = team.captain else {
                continue;
            };
            let still_on_team = players
                .iter()
                .any(|p| p.id == captain && p.team_id == Some(team.id));
            if !still_on_team {
                team.captain = None;
            }
        }
    }

    /// Starters first, then by position line, then sheet order.
    pub fn team_players(&self, team_id: u32) -> Vec<&MatchPlayer> {
        let mut out: Vec<&MatchPlayer> = self
            .players
            .iter()
            .filter(|p| p.team_id == Some(team_id))
            .collect();
        out.sort_by(|a, b| {
            b.is_starter
                .cmp(&a.is_starter)
                .then(a.position.cmp(&b.position))
                .then(a.id.cmp(&b.id))
        });
        out
    }

    pub fn signups(&self) -> Vec<&MatchPlayer> {
        self.players.iter().filter(|p| p.is_signup()).collect()
    }

    /// Summed overall score of a team's starters.
    pub fn team_strength(&self, team_id: u32, roster: &[Player]) -> i32 {
        self.players
            .iter()
            .filter(|p| p.team_id == Some(team_id) && p.is_starter)
            .filter_map(|p| roster.iter().find(|r| r.id == p.player_id))
            .map(Player::overall)
            .sum()
    }

    /// Every match player rated from the roster, in sheet order.
    pub fn rated_pool(&self, roster: &[Player]) -> Result<Vec<RatedPlayer>> {
        self.players
            .iter()
            .map(|entry| {
                roster
                    .iter()
                    .find(|p| p.id == entry.player_id)
                    .map(RatedPlayer::from_player)
                    .ok_or_else(|| MatchdayError::not_found("Player", entry.player_id))
            })
            .collect()
    }

    pub(crate) fn apply_assignments(
        &mut self,
        team_id: u32,
        assignments: &[Assignment],
    ) -> Result<()> {
        for assignment in assignments {
            let player = self
                .players
                .iter_mut()
                .find(|p| p.player_id == assignment.player_id)
                .ok_or_else(|| MatchdayError::not_found("Player", assignment.player_id))?;
            player.team_id = Some(team_id);
            player.position = Some(assignment.position);
            player.is_starter = assignment.is_starter;
        }
        Ok(())
    }

    pub fn add_event(
        &mut self,
        kind: EventKind,
        player_id: Option<u32>,
        team_id: Option<u32>,
        minute: Option<u16>,
        description: &str,
    ) -> Result<u32> {
        if let Some(team_id) = team_id {
            if self.team(team_id).is_none() {
                return Err(MatchdayError::not_found("Team", team_id));
            }
        }
        if let Some(player_id) = player_id {
            if self.entry_for(player_id).is_none() {
                return Err(MatchdayError::validation(
                    "player_id",
                    "player is not part of this match",
                ));
            }
        }
        let id = self.take_id();
        self.events.push(MatchEvent {
            id,
            kind,
            player_id,
            team_id,
            minute,
            description: description.trim().to_string(),
        });
        Ok(id)
    }

    pub fn remove_event(&mut self, event_id: u32) -> Result<MatchEvent> {
        let idx = self
            .events
            .iter()
            .position(|e| e.id == event_id)
            .ok_or_else(|| MatchdayError::not_found("Event", event_id))?;
        Ok(self.events.remove(idx))
    }

    /// Events by minute; events without a minute come last.
    pub fn timeline(&self) -> Vec<&MatchEvent> {
        let mut out: Vec<&MatchEvent> = self.events.iter().collect();
        out.sort_by_key(|e| (e.minute.is_none(), e.minute));
        out
    }
}
