use serde::{Deserialize, Serialize};

use super::features::{ApplianceCondition, BathroomQuality, FeatureSet, NoiseLevel, Privacy};

/// The 7 appliance slots every house is expected to have. A canonical slot
/// absent from the feature map is scored as missing.
pub const CANONICAL_APPLIANCES: [&str; 7] = [
    "dishwasher",
    "range",
    "oven",
    "fridge",
    "washer",
    "dryer",
    "microwave",
];

/// One rubric category's contribution to the total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: String,
    pub points: i64,
    pub detail: String,
}

impl CategoryScore {
    /// Render as the signed human-readable string, e.g. `+2 (Nice backyard)`.
    pub fn line(&self) -> String {
        format!("{:+} ({})", self.points, self.detail)
    }
}

/// Itemized scoring result. Category order is fixed and matches the rubric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total: i64,
    pub categories: Vec<CategoryScore>,
}

impl ScoreBreakdown {
    /// Ordered (category, rendered contribution) pairs.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.categories
            .iter()
            .map(|c| (c.category.clone(), c.line()))
            .collect()
    }
}

fn push(categories: &mut Vec<CategoryScore>, category: &str, points: i64, detail: String) {
    categories.push(CategoryScore {
        category: category.to_string(),
        points,
        detail,
    });
}

/// Score a feature set against the rubric.
///
/// Pure and total: any `FeatureSet`, including the all-default one, scores
/// without error. The total always equals the sum of the category points.
pub fn calculate_score(features: &FeatureSet) -> ScoreBreakdown {
    let mut categories = Vec::with_capacity(17);

    // Garage: one point per car.
    let garage = features.garage_cars as i64;
    let garage_detail = if features.garage_cars == 0 {
        "No garage".to_string()
    } else {
        format!("{}-car garage", features.garage_cars)
    };
    push(&mut categories, "garage", garage, garage_detail);

    // Bathrooms: count times quality multiplier.
    let (multiplier, quality_label) = match features.bathroom_quality {
        BathroomQuality::Modern => (2, "modern"),
        BathroomQuality::Normal => (1, "normal"),
        BathroomQuality::NeedsUpdates => (-1, "needs updates"),
    };
    let bathrooms = features.bathrooms as i64 * multiplier;
    push(
        &mut categories,
        "bathrooms",
        bathrooms,
        format!(
            "{} bathroom{}, {}",
            features.bathrooms,
            if features.bathrooms == 1 { "" } else { "s" },
            quality_label
        ),
    );

    // Bedrooms: 1:1.
    push(
        &mut categories,
        "bedrooms",
        features.bedrooms as i64,
        format!(
            "{} bedroom{}",
            features.bedrooms,
            if features.bedrooms == 1 { "" } else { "s" }
        ),
    );

    // Square footage: one point per full 500 sq ft.
    let (sqft, sqft_detail) = if features.square_feet > 0 {
        (
            (features.square_feet / 500) as i64,
            format!("{} sq ft", features.square_feet),
        )
    } else {
        (0, "No square footage provided".to_string())
    };
    push(&mut categories, "square_feet", sqft, sqft_detail);

    // Lot size: one point per full quarter acre.
    let (lot, lot_detail) = if features.lot_acres > 0.0 {
        (
            (features.lot_acres / 0.25).floor() as i64,
            format!("{} acres", features.lot_acres),
        )
    } else {
        (0, "No lot size provided".to_string())
    };
    push(&mut categories, "lot_size", lot, lot_detail);

    let backyard = if features.nice_backyard { 2 } else { 0 };
    push(
        &mut categories,
        "backyard",
        backyard,
        if features.nice_backyard {
            "Nice backyard"
        } else {
            "No backyard or not nice"
        }
        .to_string(),
    );

    let curb = if features.curb_appeal { 1 } else { 0 };
    push(
        &mut categories,
        "curb_appeal",
        curb,
        if features.curb_appeal {
            "Has curb appeal"
        } else {
            "No curb appeal"
        }
        .to_string(),
    );

    push_appliances(&mut categories, features);

    // Basement: 0 none, 1 unfinished, 2+ finished.
    let (basement, basement_detail) = match features.basement {
        0 => (0, "No basement"),
        1 => (1, "Unfinished basement"),
        _ => (2, "Finished basement"),
    };
    push(
        &mut categories,
        "basement",
        basement,
        basement_detail.to_string(),
    );

    let (privacy, privacy_detail) = match features.privacy {
        Privacy::VeryPrivate => (3, "Very private"),
        Privacy::Private => (2, "Private"),
        Privacy::Normal => (1, "Normal privacy"),
        Privacy::NotPrivate => (-1, "Not private"),
    };
    push(
        &mut categories,
        "privacy",
        privacy,
        privacy_detail.to_string(),
    );

    let (noise, noise_detail) = match features.noise_level {
        NoiseLevel::Quiet => (1, "Quiet area"),
        NoiseLevel::Normal => (0, "Normal noise"),
        NoiseLevel::Loud => (-1, "Loud area"),
    };
    push(&mut categories, "noise", noise, noise_detail.to_string());

    let deck = if features.has_deck { 1 } else { 0 };
    push(
        &mut categories,
        "deck",
        deck,
        if features.has_deck { "Has deck" } else { "No deck" }.to_string(),
    );

    let patio = if features.patio_potential { 2 } else { 0 };
    push(
        &mut categories,
        "patio_potential",
        patio,
        if features.patio_potential {
            "Patio potential"
        } else {
            "No patio potential"
        }
        .to_string(),
    );

    let pool = if features.has_pool { 3 } else { 0 };
    push(
        &mut categories,
        "pool",
        pool,
        if features.has_pool { "Has pool" } else { "No pool" }.to_string(),
    );

    let recreation = if features.near_recreation { 2 } else { 0 };
    push(
        &mut categories,
        "near_recreation",
        recreation,
        if features.near_recreation {
            "Near recreation"
        } else {
            "Not near recreation"
        }
        .to_string(),
    );

    let shopping = if features.walking_shopping { 2 } else { 0 };
    push(
        &mut categories,
        "walking_shopping",
        shopping,
        if features.walking_shopping {
            "Walking distance to shopping"
        } else {
            "Not walkable to shopping"
        }
        .to_string(),
    );

    // HOA: -1 base plus -1 per full $100 of monthly fee.
    let (hoa, hoa_detail) = if features.has_hoa {
        (
            -1 - (features.hoa_monthly_fee / 100) as i64,
            format!("HOA: ${}/month", features.hoa_monthly_fee),
        )
    } else {
        (0, "No HOA".to_string())
    };
    push(&mut categories, "hoa", hoa, hoa_detail);

    let total = categories.iter().map(|c| c.points).sum();
    ScoreBreakdown { total, categories }
}

/// Appliance category: +2 per modern, +1 per old, -2 per missing canonical
/// slot. Conditions other than modern/old count as present but score 0.
/// Non-canonical appliance names earn their condition bonus only.
fn push_appliances(categories: &mut Vec<CategoryScore>, features: &FeatureSet) {
    let mut points = 0i64;
    let mut modern = 0u32;
    let mut old = 0u32;
    let mut unrated = 0u32;
    let mut missing = 0u32;

    for slot in CANONICAL_APPLIANCES {
        match features.appliances.get(slot) {
            Some(ApplianceCondition::Modern) => {
                points += 2;
                modern += 1;
            }
            Some(ApplianceCondition::Old) => {
                points += 1;
                old += 1;
            }
            Some(ApplianceCondition::Other) => unrated += 1,
            None => {
                points -= 2;
                missing += 1;
            }
        }
    }

    // Extras can't be "missing" -- bonus only.
    for (name, condition) in &features.appliances {
        if CANONICAL_APPLIANCES.contains(&name.as_str()) {
            continue;
        }
        match condition {
            ApplianceCondition::Modern => {
                points += 2;
                modern += 1;
            }
            ApplianceCondition::Old => {
                points += 1;
                old += 1;
            }
            ApplianceCondition::Other => unrated += 1,
        }
    }

    let mut parts = vec![
        format!("{} modern", modern),
        format!("{} old", old),
        format!("{} missing", missing),
    ];
    if unrated > 0 {
        parts.push(format!("{} unrated", unrated));
    }

    categories.push(CategoryScore {
        category: "appliances".to_string(),
        points,
        detail: parts.join(", "),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_line_points(line: &str) -> i64 {
        // Lines look like "+2 (Nice backyard)" or "-14 (0 modern, ...)".
        line.split_whitespace()
            .next()
            .unwrap()
            .parse::<i64>()
            .unwrap()
    }

    fn category_points(breakdown: &ScoreBreakdown, name: &str) -> i64 {
        breakdown
            .categories
            .iter()
            .find(|c| c.category == name)
            .unwrap()
            .points
    }

    #[test]
    fn test_default_feature_set_baseline() {
        // garage 0, bathrooms 1x1, bedrooms 1, appliances 7 missing = -14,
        // privacy normal +1, everything else 0 -> -11.
        let result = calculate_score(&FeatureSet::default());
        assert_eq!(result.total, -11);
    }

    #[test]
    fn test_total_equals_sum_of_categories() {
        let mut f = FeatureSet::default();
        f.garage_cars = 2;
        f.square_feet = 2750;
        f.lot_acres = 1.3;
        f.has_hoa = true;
        f.hoa_monthly_fee = 315;
        f.appliances
            .insert("dishwasher".to_string(), ApplianceCondition::Modern);

        let result = calculate_score(&f);
        let sum: i64 = result.categories.iter().map(|c| c.points).sum();
        assert_eq!(result.total, sum);
    }

    #[test]
    fn test_total_round_trips_through_rendered_strings() {
        let mut f = FeatureSet::default();
        f.bathroom_quality = BathroomQuality::NeedsUpdates;
        f.bathrooms = 2;
        f.noise_level = NoiseLevel::Loud;
        f.has_pool = true;

        let result = calculate_score(&f);
        let parsed_sum: i64 = result
            .entries()
            .iter()
            .map(|(_, line)| parse_line_points(line))
            .sum();
        assert_eq!(result.total, parsed_sum);
    }

    #[test]
    fn test_category_order_is_fixed() {
        let result = calculate_score(&FeatureSet::default());
        let names: Vec<&str> = result
            .categories
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        assert_eq!(
            names,
            vec![
                "garage",
                "bathrooms",
                "bedrooms",
                "square_feet",
                "lot_size",
                "backyard",
                "curb_appeal",
                "appliances",
                "basement",
                "privacy",
                "noise",
                "deck",
                "patio_potential",
                "pool",
                "near_recreation",
                "walking_shopping",
                "hoa"
            ]
        );
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let mut f = FeatureSet::default();
        f.garage_cars = 3;
        f.appliances
            .insert("washer".to_string(), ApplianceCondition::Old);
        let a = calculate_score(&f);
        let b = calculate_score(&f);
        assert_eq!(a, b);
    }

    #[test]
    fn test_appliances_partial_set() {
        // dishwasher modern (+2), range old (+1), 5 canonical missing (-10).
        let mut f = FeatureSet::default();
        f.appliances
            .insert("dishwasher".to_string(), ApplianceCondition::Modern);
        f.appliances
            .insert("range".to_string(), ApplianceCondition::Old);

        let result = calculate_score(&f);
        assert_eq!(category_points(&result, "appliances"), -7);
    }

    #[test]
    fn test_appliances_other_condition_is_present_but_unscored() {
        let mut f = FeatureSet::default();
        for slot in CANONICAL_APPLIANCES {
            f.appliances
                .insert(slot.to_string(), ApplianceCondition::Other);
        }
        let result = calculate_score(&f);
        assert_eq!(category_points(&result, "appliances"), 0);
        let detail = &result
            .categories
            .iter()
            .find(|c| c.category == "appliances")
            .unwrap()
            .detail;
        assert!(detail.contains("0 missing"));
    }

    #[test]
    fn test_non_canonical_appliance_bonus_only() {
        // Wine fridge is not canonical: +2 bonus, but the 7 canonical slots
        // are still missing (-14).
        let mut f = FeatureSet::default();
        f.appliances
            .insert("wine_fridge".to_string(), ApplianceCondition::Modern);
        let result = calculate_score(&f);
        assert_eq!(category_points(&result, "appliances"), -12);
    }

    #[test]
    fn test_hoa_penalty_curve() {
        let mut f = FeatureSet::default();
        f.has_hoa = true;
        f.hoa_monthly_fee = 250;
        let result = calculate_score(&f);
        assert_eq!(category_points(&result, "hoa"), -3); // -1 base, -2 for $250
    }

    #[test]
    fn test_hoa_absent_scores_zero() {
        let mut f = FeatureSet::default();
        f.hoa_monthly_fee = 500; // ignored without has_hoa
        let result = calculate_score(&f);
        assert_eq!(category_points(&result, "hoa"), 0);
    }

    #[test]
    fn test_square_feet_floors_at_500_increments() {
        let mut f = FeatureSet::default();
        f.square_feet = 2499;
        let result = calculate_score(&f);
        assert_eq!(category_points(&result, "square_feet"), 4);
    }

    #[test]
    fn test_lot_size_quarter_acre_increments() {
        let mut f = FeatureSet::default();
        f.lot_acres = 1.3;
        let result = calculate_score(&f);
        assert_eq!(category_points(&result, "lot_size"), 5); // floor(1.3 / 0.25)
    }

    #[test]
    fn test_bathroom_quality_multipliers() {
        let mut f = FeatureSet::default();
        f.bathrooms = 3;

        f.bathroom_quality = BathroomQuality::Modern;
        assert_eq!(category_points(&calculate_score(&f), "bathrooms"), 6);

        f.bathroom_quality = BathroomQuality::Normal;
        assert_eq!(category_points(&calculate_score(&f), "bathrooms"), 3);

        f.bathroom_quality = BathroomQuality::NeedsUpdates;
        assert_eq!(category_points(&calculate_score(&f), "bathrooms"), -3);
    }

    #[test]
    fn test_basement_levels() {
        let mut f = FeatureSet::default();
        for (level, expected) in [(0u8, 0i64), (1, 1), (2, 2), (3, 2)] {
            f.basement = level;
            let result = calculate_score(&f);
            assert_eq!(
                category_points(&result, "basement"),
                expected,
                "basement level {}",
                level
            );
        }
    }

    #[test]
    fn test_privacy_and_noise_spread() {
        let mut f = FeatureSet::default();
        f.privacy = Privacy::VeryPrivate;
        f.noise_level = NoiseLevel::Quiet;
        let high = calculate_score(&f).total;

        f.privacy = Privacy::NotPrivate;
        f.noise_level = NoiseLevel::Loud;
        let low = calculate_score(&f).total;

        // very_private+quiet (+4) vs not_private+loud (-2)
        assert_eq!(high - low, 6);
    }

    #[test]
    fn test_boolean_amenities() {
        let mut f = FeatureSet::default();
        f.nice_backyard = true;
        f.curb_appeal = true;
        f.has_deck = true;
        f.patio_potential = true;
        f.has_pool = true;
        f.near_recreation = true;
        f.walking_shopping = true;
        let with = calculate_score(&f).total;
        let without = calculate_score(&FeatureSet::default()).total;
        assert_eq!(with - without, 2 + 1 + 1 + 2 + 3 + 2 + 2);
    }

    #[test]
    fn test_breakdown_serializes_in_order() {
        let result = calculate_score(&FeatureSet::default());
        let json = serde_json::to_string(&result).unwrap();
        let back: ScoreBreakdown = serde_json::from_str(&json).unwrap();
        assert_eq!(result, back);
    }
}
