use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::config::{
    ALLOCATION_MAX_ITERATIONS, DEFENDER_PERCENT, MIDFIELDER_PERCENT, STARTER_GOALKEEPERS,
    SUBSTITUTE_GK_PERCENT,
};
use crate::error::{MatchdayError, Result};
use crate::lineup::MatchSheet;
use crate::model::{Player, Position};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedPlayer {
    pub player_id: u32,
    pub score: i32,
}

impl RatedPlayer {
    pub fn from_player(player: &Player) -> Self {
        Self {
            player_id: player.id,
            score: player.overall(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub player_id: u32,
    pub position: Position,
    pub is_starter: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPlan {
    pub starters: Vec<RatedPlayer>,
    pub substitutes: Vec<RatedPlayer>,
}

impl TeamPlan {
    pub fn starter_score(&self) -> i32 {
        self.starters.iter().map(|p| p.score).sum()
    }

    pub fn len(&self) -> usize {
        self.starters.len() + self.substitutes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shuffles both groups and hands out positions from the templates.
    pub fn assign<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Assignment> {
        let mut out = assign_positions(&self.starters, true, rng);
        out.extend(assign_positions(&self.substitutes, false, rng));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSplit {
    pub team1: TeamPlan,
    pub team2: TeamPlan,
    pub swaps: usize,
}

impl TeamSplit {
    pub fn score_gap(&self) -> i32 {
        (self.team1.starter_score() - self.team2.starter_score()).abs()
    }

    pub fn assign<R: Rng + ?Sized>(&self, rng: &mut R) -> (Vec<Assignment>, Vec<Assignment>) {
        (self.team1.assign(rng), self.team2.assign(rng))
    }
}

/// 1 goalkeeper, ~40% defenders, ~35% midfielders, the rest forwards;
/// every outfield line gets at least one player before truncation to `size`.
pub fn starter_positions(size: usize) -> Vec<Position> {
    let mut positions = Vec::with_capacity(size.max(4));
    positions.extend(std::iter::repeat_n(Position::Goalkeeper, STARTER_GOALKEEPERS));
    positions.extend(std::iter::repeat_n(
        Position::Defender,
        (size * DEFENDER_PERCENT / 100).max(1),
    ));
    positions.extend(std::iter::repeat_n(
        Position::Midfielder,
        (size * MIDFIELDER_PERCENT / 100).max(1),
    ));
    let forwards = size.saturating_sub(positions.len()).max(1);
    positions.extend(std::iter::repeat_n(Position::Forward, forwards));
    positions.truncate(size);
    positions
}

pub fn substitute_positions(size: usize) -> Vec<Position> {
    let mut positions = Vec::with_capacity(size);
    positions.extend(std::iter::repeat_n(
        Position::Goalkeeper,
        size * SUBSTITUTE_GK_PERCENT / 100,
    ));
    positions.extend(std::iter::repeat_n(
        Position::Defender,
        size * DEFENDER_PERCENT / 100,
    ));
    positions.extend(std::iter::repeat_n(
        Position::Midfielder,
        size * MIDFIELDER_PERCENT / 100,
    ));
    let forwards = size.saturating_sub(positions.len());
    positions.extend(std::iter::repeat_n(Position::Forward, forwards));
    positions.truncate(size);
    positions
}

pub fn assign_positions<R: Rng + ?Sized>(
    players: &[RatedPlayer],
    starters: bool,
    rng: &mut R,
) -> Vec<Assignment> {
    let mut order: Vec<RatedPlayer> = players.to_vec();
    order.shuffle(rng);
    let template = if starters {
        starter_positions(order.len())
    } else {
        substitute_positions(order.len())
    };
    order
        .iter()
        .zip(template)
        .map(|(player, position)| Assignment {
            player_id: player.player_id,
            position,
            is_starter: starters,
        })
        .collect()
}

fn sorted_by_score(players: &[RatedPlayer]) -> Vec<RatedPlayer> {
    let mut sorted = players.to_vec();
    // Stable: equal scores keep signup order.
    sorted.sort_by(|a, b| b.score.cmp(&a.score));
    sorted
}

/// Greedy fill: each player joins the lighter team while both have room.
/// Returns the two starter lists and whoever did not fit.
fn greedy_split(
    sorted: &[RatedPlayer],
    cap: usize,
) -> (Vec<RatedPlayer>, Vec<RatedPlayer>, Vec<RatedPlayer>) {
    let mut team1 = Vec::with_capacity(cap);
    let mut team2 = Vec::with_capacity(cap);
    let mut rest = Vec::new();
    let (mut score1, mut score2) = (0i32, 0i32);

    for player in sorted {
        let room1 = team1.len() < cap;
        let room2 = team2.len() < cap;
        if room1 && (!room2 || score1 <= score2) {
            score1 += player.score;
            team1.push(*player);
        } else if room2 {
            score2 += player.score;
            team2.push(*player);
        } else {
            rest.push(*player);
        }
    }
    (team1, team2, rest)
}

/// Swaps starter pairs while a swap strictly narrows the score gap.
///
/// Each pass scans for the first narrowing pair and swaps it; a pass that finds
/// none ends the refinement. At most `ALLOCATION_MAX_ITERATIONS` passes run.
/// Returns the number of swaps made.
pub fn refine_by_swaps(team1: &mut [RatedPlayer], team2: &mut [RatedPlayer]) -> usize {
    let mut score1: i32 = team1.iter().map(|p| p.score).sum();
    let mut score2: i32 = team2.iter().map(|p| p.score).sum();
    let mut gap = (score1 - score2).abs();
    let mut swaps = 0;

    for _ in 0..ALLOCATION_MAX_ITERATIONS {
        let found = (0..team1.len())
            .flat_map(|i| (0..team2.len()).map(move |j| (i, j)))
            .find(|&(i, j)| {
                let delta = team1[i].score - team2[j].score;
                ((score1 - delta) - (score2 + delta)).abs() < gap
            });
        let Some((i, j)) = found else {
            break;
        };
        let delta = team1[i].score - team2[j].score;
        std::mem::swap(&mut team1[i], &mut team2[j]);
        score1 -= delta;
        score2 += delta;
        gap = (score1 - score2).abs();
        swaps += 1;
    }
    swaps
}

/// Splits the pool into two teams of at most `ceil(n/2)` players each,
/// balanced on overall score. Needs at least two players.
pub fn allocate_teams(players: &[RatedPlayer]) -> Result<TeamSplit> {
    if players.len() < 2 {
        return Err(MatchdayError::Allocation(
            "Need at least 2 players".to_string(),
        ));
    }
    let sorted = sorted_by_score(players);
    let cap = players.len().div_ceil(2);
    let (mut team1, mut team2, _) = greedy_split(&sorted, cap);
    let swaps = refine_by_swaps(&mut team1, &mut team2);
    tracing::debug!(players = players.len(), swaps, "teams allocated");
    Ok(TeamSplit {
        team1: TeamPlan {
            starters: team1,
            substitutes: Vec::new(),
        },
        team2: TeamPlan {
            starters: team2,
            substitutes: Vec::new(),
        },
        swaps,
    })
}

/// Highest scores start; anyone past `max_per_team` sits on the bench.
pub fn plan_single_team(
    players: &[RatedPlayer],
    max_per_team: Option<usize>,
) -> Result<TeamPlan> {
    if players.is_empty() {
        return Err(MatchdayError::Allocation(
            "Need at least 1 signup player".to_string(),
        ));
    }
    let mut sorted = sorted_by_score(players);
    let starters_len = max_per_team.unwrap_or(sorted.len()).min(sorted.len());
    let substitutes = sorted.split_off(starters_len);
    Ok(TeamPlan {
        starters: sorted,
        substitutes,
    })
}

/// Balanced starters for two teams, leftovers alternating onto the benches
/// (team 1 first), then swap refinement between the starting lineups.
pub fn plan_two_teams(
    players: &[RatedPlayer],
    max_per_team: Option<usize>,
) -> Result<TeamSplit> {
    if players.len() < 2 {
        return Err(MatchdayError::Allocation(
            "Need at least 2 signup players for two teams".to_string(),
        ));
    }
    let sorted = sorted_by_score(players);
    let even_cap = players.len().div_ceil(2);
    let cap = max_per_team.map_or(even_cap, |max| max.clamp(1, even_cap));
    let (mut starters1, mut starters2, rest) = greedy_split(&sorted, cap);

    let mut bench1 = Vec::new();
    let mut bench2 = Vec::new();
    for (idx, player) in rest.into_iter().enumerate() {
        if idx % 2 == 0 {
            bench1.push(player);
        } else {
            bench2.push(player);
        }
    }

    let swaps = refine_by_swaps(&mut starters1, &mut starters2);
    Ok(TeamSplit {
        team1: TeamPlan {
            starters: starters1,
            substitutes: bench1,
        },
        team2: TeamPlan {
            starters: starters2,
            substitutes: bench2,
        },
        swaps,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub teams: usize,
    pub starters: usize,
    pub substitutes: usize,
    pub swaps: usize,
    pub score_gap: Option<i32>,
}

/// Re-allocates every player on the sheet across its `should_allocate` teams.
/// Nothing on the sheet changes when the allocation is rejected.
pub fn allocate_match<R: Rng + ?Sized>(
    sheet: &mut MatchSheet,
    roster: &[Player],
    rng: &mut R,
) -> Result<AllocationOutcome> {
    let targets: Vec<(u32, u8)> = sheet
        .allocated_teams()
        .iter()
        .map(|team| (team.id, team.team_number))
        .collect();
    let pool = sheet.rated_pool(roster)?;
    let max_per_team = sheet.info.max_players_per_team;

    let outcome = match targets.as_slice() {
        [(team_id, _)] => {
            let plan = plan_single_team(&pool, max_per_team)?;
            let assigned = plan.assign(rng);
            sheet.reset_teams();
            sheet.apply_assignments(*team_id, &assigned)?;
            AllocationOutcome {
                teams: 1,
                starters: plan.starters.len(),
                substitutes: plan.substitutes.len(),
                swaps: 0,
                score_gap: None,
            }
        }
        [_, _] => {
            let team_id = |number: u8| {
                targets
                    .iter()
                    .find(|(_, n)| *n == number)
                    .map(|(id, _)| *id)
            };
            let (Some(team1), Some(team2)) = (team_id(1), team_id(2)) else {
                return Err(MatchdayError::Allocation(
                    "Both team 1 and team 2 must be allocated".to_string(),
                ));
            };
            let split = plan_two_teams(&pool, max_per_team)?;
            let assigned1 = split.team1.assign(rng);
            let assigned2 = split.team2.assign(rng);
            sheet.reset_teams();
            sheet.apply_assignments(team1, &assigned1)?;
            sheet.apply_assignments(team2, &assigned2)?;
            AllocationOutcome {
                teams: 2,
                starters: split.team1.starters.len() + split.team2.starters.len(),
                substitutes: split.team1.substitutes.len() + split.team2.substitutes.len(),
                swaps: split.swaps,
                score_gap: Some(split.score_gap()),
            }
        }
        other => {
            return Err(MatchdayError::Allocation(format!(
                "Invalid number of allocated teams: {}. Expected 1 or 2.",
                other.len()
            )));
        }
    };

    tracing::info!(
        match_id = sheet.match_id(),
        teams = outcome.teams,
        starters = outcome.starters,
        substitutes = outcome.substitutes,
        swaps = outcome.swaps,
        "match allocated"
    );
    Ok(outcome)
}
