use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::attributes::PlayerAttributes;
use crate::scoring::{self, CategoryScores};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-club role; ordering follows privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Viewer,
    Manager,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Viewer, Role::Manager, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn allows(self, required: Role) -> bool {
        self >= required
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: u32,
    pub club_id: u32,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    #[serde(default)]
    pub club_id: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub height_cm: Option<u16>,
    #[serde(default)]
    pub weight_kg: Option<u16>,
    #[serde(default)]
    pub position_pref: Option<String>,
    #[serde(default)]
    pub attributes: PlayerAttributes,
}

impl Player {
    pub fn overall(&self) -> i32 {
        scoring::overall_score(&self.attributes)
    }

    pub fn scores(&self) -> CategoryScores {
        CategoryScores::of(&self.attributes)
    }

    /// Exact match on name or alias.
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.alias.as_deref() == Some(name)
    }

    pub fn display_name(&self) -> &str {
        self.alias
            .as_deref()
            .filter(|alias| !alias.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubLeague {
    pub club_id: u32,
    pub league_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: u32,
    #[serde(default)]
    pub league_id: Option<u32>,
    pub date: NaiveDate,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub location: String,
    pub num_teams: u8,
    #[serde(default)]
    pub max_players_per_team: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub fn as_str(self) -> &'static str {
        match self {
            Position::Goalkeeper => "Goalkeeper",
            Position::Defender => "Defender",
            Position::Midfielder => "Midfielder",
            Position::Forward => "Forward",
        }
    }

    pub fn short(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "goalkeeper" | "gk" => Some(Position::Goalkeeper),
            "defender" | "def" => Some(Position::Defender),
            "midfielder" | "mid" => Some(Position::Midfielder),
            "forward" | "fwd" => Some(Position::Forward),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTeam {
    pub id: u32,
    pub team_number: u8,
    pub name: String,
    #[serde(default)]
    pub jersey_color: Option<String>,
    #[serde(default)]
    pub score: u32,
    /// Match-player id of the captain.
    #[serde(default)]
    pub captain: Option<u32>,
    #[serde(default = "default_true")]
    pub should_allocate: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPlayer {
    pub id: u32,
    pub player_id: u32,
    /// `None` while the player is only signed up.
    #[serde(default)]
    pub team_id: Option<u32>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub is_starter: bool,
    #[serde(default)]
    pub rating: Option<f32>,
}

impl MatchPlayer {
    pub fn is_signup(&self) -> bool {
        self.team_id.is_none()
    }

    pub fn clear_assignment(&mut self) {
        self.team_id = None;
        self.position = None;
        self.is_starter = false;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Goal,
    Assist,
    OwnGoal,
    YellowCard,
    RedCard,
    Other,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Goal => "goal",
            EventKind::Assist => "assist",
            EventKind::OwnGoal => "own_goal",
            EventKind::YellowCard => "yellow_card",
            EventKind::RedCard => "red_card",
            EventKind::Other => "other",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "goal" => Some(EventKind::Goal),
            "assist" => Some(EventKind::Assist),
            "own_goal" => Some(EventKind::OwnGoal),
            "yellow_card" => Some(EventKind::YellowCard),
            "red_card" => Some(EventKind::RedCard),
            "other" => Some(EventKind::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub id: u32,
    pub kind: EventKind,
    #[serde(default)]
    pub player_id: Option<u32>,
    #[serde(default)]
    pub team_id: Option<u32>,
    #[serde(default)]
    pub minute: Option<u16>,
    #[serde(default)]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_hierarchy() {
        assert!(Role::Admin.allows(Role::Manager));
        assert!(Role::Manager.allows(Role::Viewer));
        assert!(!Role::Viewer.allows(Role::Manager));
        assert_eq!(Role::parse(" Admin "), Some(Role::Admin));
        assert_eq!(Role::parse("owner"), None);
    }

    #[test]
    fn player_answers_to_name_or_alias() {
        let player = Player {
            id: 1,
            club_id: None,
            name: "Robert Smith".to_string(),
            alias: Some("Bobby".to_string()),
            height_cm: None,
            weight_kg: None,
            position_pref: None,
            attributes: PlayerAttributes::uniform(10),
        };
        assert!(player.answers_to("Bobby"));
        assert!(player.answers_to("Robert Smith"));
        assert!(!player.answers_to("bobby"));
        assert_eq!(player.display_name(), "Bobby");
        assert_eq!(player.overall(), 100);
    }

    #[test]
    fn position_parse_accepts_short_forms() {
        assert_eq!(Position::parse("GK"), Some(Position::Goalkeeper));
        assert_eq!(Position::parse("midfielder"), Some(Position::Midfielder));
        assert_eq!(Position::parse("striker"), None);
    }
}
