use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{
    ATTRIBUTE_MAX, ATTRIBUTE_MIN, WEIGHT_GK, WEIGHT_MENTAL, WEIGHT_PHYSICAL, WEIGHT_TECHNICAL,
};
use crate::error::{MatchdayError, Result};

/// Attribute key -> value on the 1-20 scale.
pub type AttributeMap = BTreeMap<String, u8>;

const TECHNICAL: &[(&str, &str)] = &[
    ("corners", "Corners"),
    ("crossing", "Crossing"),
    ("dribbling", "Dribbling"),
    ("finishing", "Finishing"),
    ("first_touch", "First Touch"),
    ("free_kick_taking", "Free Kick Taking"),
    ("heading", "Heading"),
    ("long_shots", "Long Shots"),
    ("long_throws", "Long Throws"),
    ("marking", "Marking"),
    ("passing", "Passing"),
    ("penalty_taking", "Penalty Taking"),
    ("tackling", "Tackling"),
    ("technique", "Technique"),
];

const MENTAL: &[(&str, &str)] = &[
    ("aggression", "Aggression"),
    ("anticipation", "Anticipation"),
    ("bravery", "Bravery"),
    ("composure", "Composure"),
    ("concentration", "Concentration"),
    ("decisions", "Decisions"),
    ("determination", "Determination"),
    ("flair", "Flair"),
    ("leadership", "Leadership"),
    ("off_the_ball", "Off The Ball"),
    ("positioning", "Positioning"),
    ("teamwork", "Teamwork"),
    ("vision", "Vision"),
    ("work_rate", "Work Rate"),
];

const PHYSICAL: &[(&str, &str)] = &[
    ("acceleration", "Acceleration"),
    ("agility", "Agility"),
    ("balance", "Balance"),
    ("jumping_reach", "Jumping Reach"),
    ("natural_fitness", "Natural Fitness"),
    ("pace", "Pace"),
    ("stamina", "Stamina"),
    ("strength", "Strength"),
];

const GOALKEEPER: &[(&str, &str)] = &[
    ("handling", "Handling"),
    ("reflexes", "Reflexes"),
    ("one_on_ones", "One-on-Ones"),
    ("diving", "Diving"),
    ("rushing_out", "Rushing Out"),
];

static ATTRIBUTE_INDEX: Lazy<HashMap<&'static str, (AttributeGroup, &'static str)>> =
    Lazy::new(|| {
        AttributeGroup::ALL
            .iter()
            .flat_map(|group| {
                group
                    .catalog()
                    .iter()
                    .map(move |(key, label)| (*key, (*group, *label)))
            })
            .collect()
    });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeGroup {
    Technical,
    Mental,
    Physical,
    #[serde(rename = "gk")]
    Goalkeeper,
}

impl AttributeGroup {
    pub const ALL: [AttributeGroup; 4] = [
        AttributeGroup::Technical,
        AttributeGroup::Mental,
        AttributeGroup::Physical,
        AttributeGroup::Goalkeeper,
    ];

    pub fn catalog(self) -> &'static [(&'static str, &'static str)] {
        match self {
            AttributeGroup::Technical => TECHNICAL,
            AttributeGroup::Mental => MENTAL,
            AttributeGroup::Physical => PHYSICAL,
            AttributeGroup::Goalkeeper => GOALKEEPER,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            AttributeGroup::Technical => "technical",
            AttributeGroup::Mental => "mental",
            AttributeGroup::Physical => "physical",
            AttributeGroup::Goalkeeper => "gk",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AttributeGroup::Technical => "Technical",
            AttributeGroup::Mental => "Mental",
            AttributeGroup::Physical => "Physical",
            AttributeGroup::Goalkeeper => "Goalkeeping",
        }
    }

    pub fn weight(self) -> i32 {
        match self {
            AttributeGroup::Technical => WEIGHT_TECHNICAL,
            AttributeGroup::Mental => WEIGHT_MENTAL,
            AttributeGroup::Physical => WEIGHT_PHYSICAL,
            AttributeGroup::Goalkeeper => WEIGHT_GK,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "technical" | "tech" => Some(AttributeGroup::Technical),
            "mental" => Some(AttributeGroup::Mental),
            "physical" | "phys" => Some(AttributeGroup::Physical),
            "gk" | "goalkeeper" | "goalkeeping" => Some(AttributeGroup::Goalkeeper),
            _ => None,
        }
    }

    /// Every catalog key set to `value`.
    pub fn uniform(self, value: u8) -> AttributeMap {
        let value = clamp_attribute(i64::from(value));
        self.catalog()
            .iter()
            .map(|(key, _)| (key.to_string(), value))
            .collect()
    }

    pub fn random<R: Rng + ?Sized>(self, rng: &mut R) -> AttributeMap {
        self.catalog()
            .iter()
            .map(|(key, _)| {
                (
                    key.to_string(),
                    rng.gen_range(ATTRIBUTE_MIN..=ATTRIBUTE_MAX),
                )
            })
            .collect()
    }
}

pub fn group_of(key: &str) -> Option<AttributeGroup> {
    ATTRIBUTE_INDEX.get(key).map(|(group, _)| *group)
}

pub fn label_of(key: &str) -> Option<&'static str> {
    ATTRIBUTE_INDEX.get(key).map(|(_, label)| *label)
}

pub fn clamp_attribute(value: i64) -> u8 {
    value.clamp(i64::from(ATTRIBUTE_MIN), i64::from(ATTRIBUTE_MAX)) as u8
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerAttributes {
    #[serde(default)]
    pub technical: AttributeMap,
    #[serde(default)]
    pub mental: AttributeMap,
    #[serde(default)]
    pub physical: AttributeMap,
    #[serde(default)]
    pub gk: AttributeMap,
}

impl PlayerAttributes {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            technical: AttributeGroup::Technical.random(rng),
            mental: AttributeGroup::Mental.random(rng),
            physical: AttributeGroup::Physical.random(rng),
            gk: AttributeGroup::Goalkeeper.random(rng),
        }
    }

    pub fn uniform(value: u8) -> Self {
        Self {
            technical: AttributeGroup::Technical.uniform(value),
            mental: AttributeGroup::Mental.uniform(value),
            physical: AttributeGroup::Physical.uniform(value),
            gk: AttributeGroup::Goalkeeper.uniform(value),
        }
    }

    pub fn group(&self, group: AttributeGroup) -> &AttributeMap {
        match group {
            AttributeGroup::Technical => &self.technical,
            AttributeGroup::Mental => &self.mental,
            AttributeGroup::Physical => &self.physical,
            AttributeGroup::Goalkeeper => &self.gk,
        }
    }

    pub fn group_mut(&mut self, group: AttributeGroup) -> &mut AttributeMap {
        match group {
            AttributeGroup::Technical => &mut self.technical,
            AttributeGroup::Mental => &mut self.mental,
            AttributeGroup::Physical => &mut self.physical,
            AttributeGroup::Goalkeeper => &mut self.gk,
        }
    }

    pub fn replace_group(&mut self, group: AttributeGroup, attrs: AttributeMap) {
        *self.group_mut(group) = attrs;
    }

    /// Sets one attribute without touching the rest of its group.
    pub fn set(&mut self, key: &str, value: u8) -> Result<()> {
        let group = group_of(key)
            .ok_or_else(|| MatchdayError::validation(key, "unknown attribute"))?;
        if !(ATTRIBUTE_MIN..=ATTRIBUTE_MAX).contains(&value) {
            return Err(MatchdayError::validation(
                key,
                format!("must be between {ATTRIBUTE_MIN} and {ATTRIBUTE_MAX}"),
            ));
        }
        self.group_mut(group).insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<u8> {
        let group = group_of(key)?;
        self.group(group).get(key).copied()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn catalog_sizes() {
        assert_eq!(AttributeGroup::Technical.catalog().len(), 14);
        assert_eq!(AttributeGroup::Mental.catalog().len(), 14);
        assert_eq!(AttributeGroup::Physical.catalog().len(), 8);
        assert_eq!(AttributeGroup::Goalkeeper.catalog().len(), 5);
    }

    #[test]
    fn index_resolves_keys_to_groups() {
        assert_eq!(group_of("pace"), Some(AttributeGroup::Physical));
        assert_eq!(group_of("one_on_ones"), Some(AttributeGroup::Goalkeeper));
        assert_eq!(label_of("off_the_ball"), Some("Off The Ball"));
        assert_eq!(group_of("shooting"), None);
    }

    #[test]
    fn random_attributes_cover_catalog_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let attrs = PlayerAttributes::random(&mut rng);
        for group in AttributeGroup::ALL {
            let map = attrs.group(group);
            assert_eq!(map.len(), group.catalog().len());
            assert!(map.values().all(|v| (1..=20).contains(v)));
        }
    }

    #[test]
    fn set_rejects_unknown_and_out_of_range() {
        let mut attrs = PlayerAttributes::uniform(10);
        assert!(attrs.set("passing", 17).is_ok());
        assert_eq!(attrs.get("passing"), Some(17));
        assert!(attrs.set("passing", 21).is_err());
        assert!(attrs.set("throw_ins", 5).is_err());
    }

    #[test]
    fn group_keys_round_trip_through_serde() {
        let json = serde_json::to_string(&AttributeGroup::Goalkeeper).expect("serialize");
        assert_eq!(json, "\"gk\"");
        assert_eq!(AttributeGroup::parse("Goalkeeper"), Some(AttributeGroup::Goalkeeper));
    }
}
