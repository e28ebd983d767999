pub mod engine;
pub mod features;

pub use engine::{calculate_score, CategoryScore, ScoreBreakdown, CANONICAL_APPLIANCES};
pub use features::{ApplianceCondition, BathroomQuality, FeatureSet, NoiseLevel, Privacy};
