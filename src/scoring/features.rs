use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Condition of a single appliance.
///
/// Anything other than `modern` or `old` deserializes as `Other`: the
/// appliance counts as present but earns no bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplianceCondition {
    Modern,
    Old,
    #[serde(other)]
    Other,
}

/// Bathroom quality acts as a multiplier on the bathroom count.
/// Unknown values fall back to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BathroomQuality {
    Modern,
    NeedsUpdates,
    // serde requires the `other` catch-all to be the final variant.
    #[default]
    #[serde(other)]
    Normal,
}

/// Unknown values fall back to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Privacy {
    VeryPrivate,
    Private,
    NotPrivate,
    #[default]
    #[serde(other)]
    Normal,
}

/// Unknown values fall back to `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseLevel {
    Quiet,
    Loud,
    #[default]
    #[serde(other)]
    Normal,
}

/// Everything about a house that the rubric scores.
///
/// Example JSON:
/// ```json
/// {
///   "garage_cars": 2,
///   "bathrooms": 3,
///   "bathroom_quality": "modern",
///   "bedrooms": 4,
///   "square_feet": 2400,
///   "lot_acres": 0.5,
///   "appliances": { "dishwasher": "modern", "fridge": "old" },
///   "privacy": "very_private",
///   "has_hoa": true,
///   "hoa_monthly_fee": 250
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureSet {
    pub garage_cars: u32,
    pub bathrooms: u32,
    pub bathroom_quality: BathroomQuality,
    pub bedrooms: u32,
    pub square_feet: u32,
    pub lot_acres: f64,
    pub nice_backyard: bool,
    pub curb_appeal: bool,
    /// Appliance name -> condition. A canonical appliance absent from this
    /// map is scored as missing.
    pub appliances: BTreeMap<String, ApplianceCondition>,
    /// Basement level: 0 none, 1 unfinished, 2 finished.
    pub basement: u8,
    pub privacy: Privacy,
    pub noise_level: NoiseLevel,
    pub has_deck: bool,
    pub patio_potential: bool,
    pub has_pool: bool,
    pub near_recreation: bool,
    pub walking_shopping: bool,
    pub has_hoa: bool,
    /// Monthly HOA fee in dollars; only meaningful when `has_hoa` is set.
    pub hoa_monthly_fee: u32,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            garage_cars: 0,
            bathrooms: 1,
            bathroom_quality: BathroomQuality::default(),
            bedrooms: 1,
            square_feet: 0,
            lot_acres: 0.0,
            nice_backyard: false,
            curb_appeal: false,
            appliances: BTreeMap::new(),
            basement: 0,
            privacy: Privacy::default(),
            noise_level: NoiseLevel::default(),
            has_deck: false,
            patio_potential: false,
            has_pool: false,
            near_recreation: false,
            walking_shopping: false,
            has_hoa: false,
            hoa_monthly_fee: 0,
        }
    }
}
