//! Training intensity estimation.
//!
//! Callers hold an [`IntensityEstimator`] behind [`SharedEstimator`]; the
//! implementation is picked once at startup and handed to Rocket as managed
//! state. Profiles with missing biometrics never reach the estimator and go
//! through [`fallback_intensity`] instead.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::models::{Gender, Goal, Intensity, UserProfile};

pub type SharedEstimator = Arc<dyn IntensityEstimator>;

/// Inputs a classifier sees after featurization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub age: i64,
    pub bmi: f64,
    pub gender: Gender,
    pub goal: Goal,
}

pub trait IntensityEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    fn classify(&self, features: &Features) -> Intensity;

    fn estimate(
        &self,
        age: i64,
        weight_kg: f64,
        height_cm: f64,
        gender: Gender,
        goal: Goal,
    ) -> (Intensity, f64) {
        let bmi = bmi(weight_kg, height_cm);
        let features = Features {
            age,
            bmi,
            gender,
            goal,
        };
        (self.classify(&features), bmi)
    }
}

/// Height below 1 cm is clamped so the division stays finite.
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm.max(1.0) / 100.0;
    weight_kg / (height_m * height_m)
}

/// Age and BMI rule used whenever the profile is incomplete.
pub fn fallback_intensity(age: Option<i64>, bmi: Option<f64>) -> Intensity {
    let bmi = bmi.unwrap_or(24.0);

    if age.unwrap_or(30) < 25 && bmi < 26.0 {
        return Intensity::High;
    }
    if age.unwrap_or(35) > 45 || bmi > 30.0 {
        return Intensity::Low;
    }
    Intensity::Medium
}

#[instrument(skip(estimator, profile), fields(estimator = estimator.name()))]
pub fn intensity_for_profile(
    estimator: &dyn IntensityEstimator,
    profile: &UserProfile,
    goal: Goal,
) -> Intensity {
    match (
        profile.age,
        profile.weight_kg,
        profile.height_cm,
        profile.gender,
    ) {
        (Some(age), Some(weight), Some(height), Some(gender)) => {
            let (intensity, bmi) = estimator.estimate(age, weight, height, gender, goal);
            debug!(%intensity, bmi, "Estimated intensity from profile");
            intensity
        }
        _ => {
            let intensity = fallback_intensity(profile.age, profile.computed_bmi());
            debug!(%intensity, "Profile incomplete, used fallback intensity rule");
            intensity
        }
    }
}

/// Deterministic score table. Goal sets the base score; male gender adds a
/// little; age past 35 and BMI past 27 subtract from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreTableEstimator;

impl ScoreTableEstimator {
    const LOW_CEILING: f64 = 0.15;
    const MEDIUM_CEILING: f64 = 0.55;

    pub fn score(features: &Features) -> f64 {
        let goal_weight = match features.goal {
            Goal::WeightLoss => 0.3,
            Goal::MuscleGain => 0.6,
            Goal::Endurance => 0.5,
        };
        let gender_weight = match features.gender {
            Gender::Male => 0.25,
            Gender::Female => 0.0,
        };

        goal_weight + gender_weight
            - 0.02 * ((features.age - 35).max(0) as f64)
            - 0.03 * (features.bmi - 27.0).max(0.0)
    }
}

impl IntensityEstimator for ScoreTableEstimator {
    fn name(&self) -> &'static str {
        "score-table"
    }

    fn classify(&self, features: &Features) -> Intensity {
        let score = Self::score(features);
        if score < Self::LOW_CEILING {
            Intensity::Low
        } else if score < Self::MEDIUM_CEILING {
            Intensity::Medium
        } else {
            Intensity::High
        }
    }
}
