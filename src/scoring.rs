//! Attribute aggregation: groups of 1-20 attributes become 5-100 category
//! scores, and the four categories fold into one 10-200 overall score.
//!
//! The inverse direction exists for manual editing: a requested category or
//! overall score is spread back over the attributes so that recomputing the
//! score lands on (or within rounding of) the request.

use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeGroup, AttributeMap, PlayerAttributes, clamp_attribute};
use crate::config::{
    ATTRIBUTE_MAX, ATTRIBUTE_MIN, ATTRIBUTE_TO_CATEGORY_SCALE, CATEGORY_MAX, CATEGORY_MIN,
    CATEGORY_TO_ATTRIBUTE_SCALE, OVERALL_MAX, OVERALL_MIN, OVERALL_SCORE_DIVISOR,
};
use crate::error::{MatchdayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScores {
    pub technical: i32,
    pub mental: i32,
    pub physical: i32,
    pub gk: i32,
    pub overall: i32,
}

impl CategoryScores {
    pub fn of(attrs: &PlayerAttributes) -> Self {
        let technical = category_score(&attrs.technical);
        let mental = category_score(&attrs.mental);
        let physical = category_score(&attrs.physical);
        let gk = category_score(&attrs.gk);
        Self {
            technical,
            mental,
            physical,
            gk,
            overall: overall_from_categories(technical, mental, physical, gk),
        }
    }

    pub fn get(&self, group: AttributeGroup) -> i32 {
        match group {
            AttributeGroup::Technical => self.technical,
            AttributeGroup::Mental => self.mental,
            AttributeGroup::Physical => self.physical,
            AttributeGroup::Goalkeeper => self.gk,
        }
    }
}

fn round_i32(value: f64) -> i32 {
    value.round_ties_even() as i32
}

/// Mean attribute value; 0 for an empty group.
pub fn category_average(attrs: &AttributeMap) -> f64 {
    if attrs.is_empty() {
        return 0.0;
    }
    let total: u32 = attrs.values().map(|v| u32::from(*v)).sum();
    f64::from(total) / attrs.len() as f64
}

pub fn category_score(attrs: &AttributeMap) -> i32 {
    round_i32(category_average(attrs) * ATTRIBUTE_TO_CATEGORY_SCALE)
}

pub fn group_score(attrs: &PlayerAttributes, group: AttributeGroup) -> i32 {
    category_score(attrs.group(group))
}

pub fn overall_from_categories(technical: i32, mental: i32, physical: i32, gk: i32) -> i32 {
    let weighted = technical * AttributeGroup::Technical.weight()
        + mental * AttributeGroup::Mental.weight()
        + physical * AttributeGroup::Physical.weight()
        + gk * AttributeGroup::Goalkeeper.weight();
    let overall = round_i32(f64::from(weighted) / f64::from(OVERALL_SCORE_DIVISOR));
    overall.clamp(OVERALL_MIN, OVERALL_MAX)
}

pub fn overall_score(attrs: &PlayerAttributes) -> i32 {
    CategoryScores::of(attrs).overall
}

/// Every catalog attribute of `group` set to the value that reproduces `score`.
pub fn set_category_score(group: AttributeGroup, score: i32) -> AttributeMap {
    let score = score.clamp(CATEGORY_MIN, CATEGORY_MAX);
    let value = clamp_attribute(i64::from(round_i32(
        f64::from(score) / CATEGORY_TO_ATTRIBUTE_SCALE,
    )));
    group.uniform(value)
}

/// Rebuilds all four groups for a requested overall score.
///
/// Technical, mental and physical share one uniform value close to the linear
/// image of the overall score on the category range; goalkeeping takes up the
/// remainder. Uniform groups make the overall `8a + 2g`, so the result is always
/// within one point of the (clamped) request.
pub fn set_overall_score(score: i32) -> PlayerAttributes {
    let score = score.clamp(OVERALL_MIN, OVERALL_MAX);
    let normalized = f64::from(score - OVERALL_MIN) / f64::from(OVERALL_MAX - OVERALL_MIN);
    let target_category =
        f64::from(CATEGORY_MIN) + normalized * f64::from(CATEGORY_MAX - CATEGORY_MIN);

    let mut best: Option<((i32, f64), u8, u8)> = None;
    for field in ATTRIBUTE_MIN..=ATTRIBUTE_MAX {
        let field_category = f64::from(field) * ATTRIBUTE_TO_CATEGORY_SCALE;
        let field_category_i = round_i32(field_category);
        for keeper in ATTRIBUTE_MIN..=ATTRIBUTE_MAX {
            let keeper_category = round_i32(f64::from(keeper) * ATTRIBUTE_TO_CATEGORY_SCALE);
            let overall = overall_from_categories(
                field_category_i,
                field_category_i,
                field_category_i,
                keeper_category,
            );
            // Closest overall first, then keep the outfield groups near the
            // linear target and the keeper group as a minor tiebreak.
            let spread = (field_category - target_category).abs()
                + (f64::from(keeper_category) - target_category).abs() * 0.01;
            let key = ((overall - score).abs(), spread);
            let better = match &best {
                None => true,
                Some((best_key, _, _)) => {
                    key.0 < best_key.0 || (key.0 == best_key.0 && key.1 < best_key.1)
                }
            };
            if better {
                best = Some((key, field, keeper));
            }
        }
    }

    let (field, keeper) = best
        .map(|(_, field, keeper)| (field, keeper))
        .unwrap_or((ATTRIBUTE_MIN, ATTRIBUTE_MIN));
    PlayerAttributes {
        technical: AttributeGroup::Technical.uniform(field),
        mental: AttributeGroup::Mental.uniform(field),
        physical: AttributeGroup::Physical.uniform(field),
        gk: AttributeGroup::Goalkeeper.uniform(keeper),
    }
}

/// Scales every attribute so the group average hits `target_score`, keeping
/// the relative shape of the group. An all-zero group is shifted instead.
pub fn adjust_group_to_score(attrs: &AttributeMap, target_score: i32) -> AttributeMap {
    if attrs.is_empty() {
        return attrs.clone();
    }
    let target_score = target_score.clamp(CATEGORY_MIN, CATEGORY_MAX);
    let current_avg = category_average(attrs);
    let target_avg = f64::from(target_score) / CATEGORY_TO_ATTRIBUTE_SCALE;

    attrs
        .iter()
        .map(|(key, value)| {
            let value = f64::from(*value);
            let next = if current_avg > 0.0 {
                value * (target_avg / current_avg)
            } else {
                value + (target_avg - current_avg)
            };
            (key.clone(), clamp_attribute(i64::from(round_i32(next))))
        })
        .collect()
}

/// Pins `changed_key` to `new_value` and moves the rest of the group by the
/// same proportion the group average moved. Unknown keys leave the group as is.
pub fn adjust_group_for_changed_attribute(
    attrs: &AttributeMap,
    changed_key: &str,
    new_value: i32,
) -> AttributeMap {
    let Some(old_value) = attrs.get(changed_key) else {
        return attrs.clone();
    };
    let old_value = if *old_value == 0 { 1.0 } else { f64::from(*old_value) };
    let len = attrs.len() as f64;

    let current_total: f64 = attrs.values().map(|v| f64::from(*v)).sum();
    let current_avg = current_total / len;
    let new_avg = (current_total - old_value + f64::from(new_value)) / len;

    attrs
        .iter()
        .map(|(key, value)| {
            if key == changed_key {
                return (key.clone(), clamp_attribute(i64::from(new_value)));
            }
            let value = f64::from(*value);
            let next = if current_avg > 0.0 {
                value * (new_avg / current_avg)
            } else {
                value + (new_avg - current_avg)
            };
            (key.clone(), clamp_attribute(i64::from(round_i32(next))))
        })
        .collect()
}

/// Edits one category of a player in place, proportionally.
pub fn apply_category_score(attrs: &mut PlayerAttributes, group: AttributeGroup, score: i32) {
    let current = attrs.group(group);
    let next = if current.is_empty() {
        set_category_score(group, score)
    } else {
        adjust_group_to_score(current, score)
    };
    attrs.replace_group(group, next);
}

/// Edits one attribute of a player in place and rebalances its group.
pub fn apply_attribute_change(attrs: &mut PlayerAttributes, key: &str, value: i32) -> Result<()> {
    let group = crate::attributes::group_of(key)
        .ok_or_else(|| MatchdayError::validation(key, "unknown attribute"))?;
    let current = attrs.group(group);
    if !current.contains_key(key) {
        let mut next = current.clone();
        next.insert(key.to_string(), clamp_attribute(i64::from(value)));
        attrs.replace_group(group, next);
        return Ok(());
    }
    let next = adjust_group_for_changed_attribute(current, key, value);
    attrs.replace_group(group, next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, u8)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn empty_group_scores_zero() {
        assert_eq!(category_average(&AttributeMap::new()), 0.0);
        assert_eq!(category_score(&AttributeMap::new()), 0);
    }

    #[test]
    fn category_bounds() {
        for group in AttributeGroup::ALL {
            assert_eq!(category_score(&group.uniform(1)), 5);
            assert_eq!(category_score(&group.uniform(20)), 100);
        }
    }

    #[test]
    fn weighted_overall() {
        let attrs = PlayerAttributes {
            technical: map(&[("passing", 20)]),
            mental: map(&[("composure", 10)]),
            physical: map(&[("pace", 10)]),
            gk: map(&[("handling", 10)]),
        };
        // 100*3 + 50*2 + 50*3 + 50*2 = 650 -> 130
        assert_eq!(overall_score(&attrs), 130);
        assert_eq!(overall_score(&PlayerAttributes::uniform(1)), 10);
        assert_eq!(overall_score(&PlayerAttributes::uniform(20)), 200);
        assert_eq!(overall_score(&PlayerAttributes::uniform(10)), 100);
    }

    #[test]
    fn overall_of_empty_player_is_clamped() {
        assert_eq!(overall_score(&PlayerAttributes::default()), OVERALL_MIN);
    }

    #[test]
    fn set_category_score_clamps() {
        let low = set_category_score(AttributeGroup::Technical, -40);
        assert!(low.values().all(|v| *v == 1));
        let high = set_category_score(AttributeGroup::Mental, 400);
        assert!(high.values().all(|v| *v == 20));
        let mid = set_category_score(AttributeGroup::Physical, 60);
        assert!(mid.values().all(|v| *v == 12));
    }

    #[test]
    fn set_overall_hits_every_score_within_one() {
        for target in OVERALL_MIN..=OVERALL_MAX {
            let attrs = set_overall_score(target);
            let got = overall_score(&attrs);
            assert!((got - target).abs() <= 1, "target {target} got {got}");
        }
    }

    #[test]
    fn set_overall_clamps_request() {
        assert_eq!(overall_score(&set_overall_score(0)), OVERALL_MIN);
        assert_eq!(overall_score(&set_overall_score(999)), OVERALL_MAX);
    }

    #[test]
    fn adjust_to_score_keeps_shape() {
        let attrs = map(&[("passing", 10), ("dribbling", 10), ("finishing", 10)]);
        let out = adjust_group_to_score(&attrs, 75);
        assert_eq!(out.len(), 3);
        assert!((category_average(&out) - 15.0).abs() < 1.0);

        let skewed = map(&[("passing", 4), ("dribbling", 8)]);
        let out = adjust_group_to_score(&skewed, 60);
        assert_eq!(out["passing"], 8);
        assert_eq!(out["dribbling"], 16);
    }

    #[test]
    fn adjust_all_zero_group_shifts_by_constant() {
        let zeros = map(&[("passing", 0), ("dribbling", 0)]);
        let out = adjust_group_to_score(&zeros, 50);
        assert_eq!(out["passing"], 10);
        assert_eq!(out["dribbling"], 10);
        assert!(adjust_group_to_score(&AttributeMap::new(), 50).is_empty());
    }

    #[test]
    fn changed_attribute_rebalances_others() {
        let attrs = map(&[("passing", 10), ("dribbling", 10), ("finishing", 10)]);
        let out = adjust_group_for_changed_attribute(&attrs, "passing", 15);
        assert_eq!(out["passing"], 15);
        // avg 10 -> 11.67, others scale by 1.1667
        assert_eq!(out["dribbling"], 12);
        assert_eq!(out["finishing"], 12);
    }

    #[test]
    fn changed_attribute_unknown_key_is_noop() {
        let attrs = map(&[("passing", 10), ("dribbling", 10)]);
        assert_eq!(adjust_group_for_changed_attribute(&attrs, "invalid", 15), attrs);
    }

    #[test]
    fn changed_attribute_from_zero() {
        let attrs = map(&[("passing", 0), ("dribbling", 10)]);
        let out = adjust_group_for_changed_attribute(&attrs, "passing", 5);
        assert_eq!(out["passing"], 5);
        assert_eq!(out["dribbling"], 14);

        let zeros = map(&[("passing", 0), ("dribbling", 0)]);
        let out = adjust_group_for_changed_attribute(&zeros, "passing", 5);
        assert_eq!(out["passing"], 5);
        assert_eq!(out["dribbling"], 2);
    }

    #[test]
    fn apply_helpers_edit_in_place() {
        let mut attrs = PlayerAttributes::uniform(10);
        apply_category_score(&mut attrs, AttributeGroup::Goalkeeper, 100);
        assert_eq!(group_score(&attrs, AttributeGroup::Goalkeeper), 100);
        apply_attribute_change(&mut attrs, "pace", 20).expect("known key");
        assert_eq!(attrs.get("pace"), Some(20));
        assert!(apply_attribute_change(&mut attrs, "throw_ins", 3).is_err());
    }
}
