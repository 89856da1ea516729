use rand::SeedableRng;
use rand::rngs::StdRng;

use matchday::attributes::{AttributeGroup, PlayerAttributes};
use matchday::scoring::{
    self, CategoryScores, category_score, overall_from_categories, set_category_score,
};

#[test]
fn category_bounds_at_attribute_extremes() {
    for group in AttributeGroup::ALL {
        assert_eq!(category_score(&group.uniform(1)), 5, "{group:?} at minimum");
        assert_eq!(category_score(&group.uniform(20)), 100, "{group:?} at maximum");
    }
}

#[test]
fn category_round_trip_within_two_points() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..200 {
        let attrs = PlayerAttributes::random(&mut rng);
        for group in AttributeGroup::ALL {
            let score = scoring::group_score(&attrs, group);
            let rebuilt = category_score(&set_category_score(group, score));
            assert!(
                (rebuilt - score).abs() <= 2,
                "{group:?}: {score} came back as {rebuilt}"
            );
        }
    }
}

#[test]
fn overall_round_trip_within_two_points() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let attrs = PlayerAttributes::random(&mut rng);
        let score = scoring::overall_score(&attrs);
        let rebuilt = scoring::overall_score(&scoring::set_overall_score(score));
        assert!((rebuilt - score).abs() <= 2, "{score} came back as {rebuilt}");
    }
}

#[test]
fn overall_monotonic_in_each_category() {
    let base = [40, 55, 70, 25];
    for idx in 0..4 {
        let mut previous = i32::MIN;
        for value in (5..=100).step_by(5) {
            let mut cats = base;
            cats[idx] = value;
            let overall = overall_from_categories(cats[0], cats[1], cats[2], cats[3]);
            assert!(overall >= previous, "category {idx} at {value}");
            previous = overall;
        }
    }
}

#[test]
fn uniform_tens_score_a_hundred() {
    let scores = CategoryScores::of(&PlayerAttributes::uniform(10));
    assert_eq!(scores.technical, 50);
    assert_eq!(scores.gk, 50);
    assert_eq!(scores.overall, 100);
}

#[test]
fn attribute_change_moves_category_toward_new_value() {
    let mut attrs = PlayerAttributes::uniform(10);
    let before = scoring::group_score(&attrs, AttributeGroup::Technical);
    scoring::apply_attribute_change(&mut attrs, "dribbling", 20).expect("known attribute");
    assert_eq!(attrs.get("dribbling"), Some(20));
    assert!(scoring::group_score(&attrs, AttributeGroup::Technical) > before);
    assert!(scoring::apply_attribute_change(&mut attrs, "juggling", 5).is_err());
}
