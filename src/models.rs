use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Goal {
    #[serde(rename = "Weight Loss")]
    WeightLoss,
    #[serde(rename = "Muscle Gain")]
    MuscleGain,
    Endurance,
}

impl Goal {
    pub const ALL: [Goal; 3] = [Goal::WeightLoss, Goal::MuscleGain, Goal::Endurance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::WeightLoss => "Weight Loss",
            Goal::MuscleGain => "Muscle Gain",
            Goal::Endurance => "Endurance",
        }
    }
}

impl FromStr for Goal {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Goal::ALL
            .into_iter()
            .find(|goal| goal.as_str() == s.trim())
            .ok_or_else(|| AppError::Validation(format!("Unknown goal: {}", s)))
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "Low",
            Intensity::Medium => "Medium",
            Intensity::High => "High",
        }
    }
}

impl FromStr for Intensity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Low" => Ok(Intensity::Low),
            "Medium" => Ok(Intensity::Medium),
            "High" => Ok(Intensity::High),
            other => Err(AppError::Validation(format!("Unknown intensity: {}", other))),
        }
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl FromStr for Gender {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            other => Err(AppError::Validation(format!("Unknown gender: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitnessLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl FitnessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "Beginner",
            FitnessLevel::Intermediate => "Intermediate",
            FitnessLevel::Advanced => "Advanced",
        }
    }
}

impl FromStr for FitnessLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Beginner" => Ok(FitnessLevel::Beginner),
            "Intermediate" => Ok(FitnessLevel::Intermediate),
            "Advanced" => Ok(FitnessLevel::Advanced),
            other => Err(AppError::Validation(format!(
                "Unknown fitness level: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanSource {
    #[serde(rename = "AI")]
    Ai,
    Preset,
}

impl PlanSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanSource::Ai => "AI",
            PlanSource::Preset => "Preset",
        }
    }
}

impl FromStr for PlanSource {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "AI" => Ok(PlanSource::Ai),
            "Preset" => Ok(PlanSource::Preset),
            other => Err(AppError::Validation(format!("Unknown plan source: {}", other))),
        }
    }
}

/// Body measurements and preferences the planner reads. Every biometric is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: Option<i64>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub gender: Option<Gender>,
    pub bmi: Option<f64>,
    pub goal: Option<Goal>,
    pub fitness_level: FitnessLevel,
}

impl UserProfile {
    /// BMI rounded to one decimal, when both height and weight are known.
    pub fn computed_bmi(&self) -> Option<f64> {
        match (self.height_cm, self.weight_kg) {
            (Some(height), Some(weight)) => {
                Some((crate::estimator::bmi(weight, height) * 10.0).round() / 10.0)
            }
            _ => None,
        }
    }
}

/// One entry in a day's ordered exercise list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExerciseItem {
    Strength {
        name: String,
        sets: i64,
        reps: i64,
        #[serde(default)]
        completed: bool,
    },
    Cardio {
        name: String,
        minutes: i64,
        #[serde(default)]
        completed: bool,
    },
    Rest {
        name: String,
        minutes: i64,
        #[serde(default)]
        completed: bool,
    },
}

impl ExerciseItem {
    pub fn name(&self) -> &str {
        match self {
            ExerciseItem::Strength { name, .. }
            | ExerciseItem::Cardio { name, .. }
            | ExerciseItem::Rest { name, .. } => name,
        }
    }

    pub fn is_completed(&self) -> bool {
        match self {
            ExerciseItem::Strength { completed, .. }
            | ExerciseItem::Cardio { completed, .. }
            | ExerciseItem::Rest { completed, .. } => *completed,
        }
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle(&mut self) -> bool {
        let completed = match self {
            ExerciseItem::Strength { completed, .. }
            | ExerciseItem::Cardio { completed, .. }
            | ExerciseItem::Rest { completed, .. } => completed,
        };
        *completed = !*completed;
        *completed
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutPlan {
    pub id: i64,
    pub user_id: i64,
    pub goal: Goal,
    pub start_date: NaiveDate,
    pub days: i64,
    pub source: PlanSource,
    pub intensity: Intensity,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbWorkoutPlan {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub goal: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub days: Option<i64>,
    pub source: Option<String>,
    pub intensity: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl TryFrom<DbWorkoutPlan> for WorkoutPlan {
    type Error = AppError;

    fn try_from(plan: DbWorkoutPlan) -> Result<Self, Self::Error> {
        let id = plan.id.unwrap_or_default();
        let corrupt = |field: &str| AppError::Internal(format!("Plan {} has no {}", id, field));

        Ok(Self {
            id,
            user_id: plan.user_id.unwrap_or_default(),
            goal: plan.goal.ok_or_else(|| corrupt("goal"))?.parse()?,
            start_date: plan.start_date.ok_or_else(|| corrupt("start_date"))?,
            days: plan.days.unwrap_or_default(),
            source: plan.source.ok_or_else(|| corrupt("source"))?.parse()?,
            intensity: plan.intensity.ok_or_else(|| corrupt("intensity"))?.parse()?,
            created_at: plan
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutDay {
    pub id: i64,
    pub plan_id: i64,
    pub day_index: i64,
    pub date: NaiveDate,
    pub items: Vec<ExerciseItem>,
}

impl WorkoutDay {
    pub fn is_complete(&self) -> bool {
        self.items.iter().all(ExerciseItem::is_completed)
    }
}

#[derive(sqlx::FromRow, Clone)]
pub struct DbWorkoutDay {
    pub id: Option<i64>,
    pub plan_id: Option<i64>,
    pub day_index: Option<i64>,
    pub date: Option<NaiveDate>,
    pub items: Option<Json<Vec<ExerciseItem>>>,
}

impl TryFrom<DbWorkoutDay> for WorkoutDay {
    type Error = AppError;

    fn try_from(day: DbWorkoutDay) -> Result<Self, Self::Error> {
        let id = day.id.unwrap_or_default();

        Ok(Self {
            id,
            plan_id: day.plan_id.unwrap_or_default(),
            day_index: day.day_index.unwrap_or_default(),
            date: day
                .date
                .ok_or_else(|| AppError::Internal(format!("Workout day {} has no date", id)))?,
            items: day.items.map(|items| items.0).unwrap_or_default(),
        })
    }
}

/// A day that has been generated but not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkoutDay {
    pub day_index: i64,
    pub date: NaiveDate,
    pub items: Vec<ExerciseItem>,
}

#[derive(Debug, Clone)]
pub struct NewWorkoutPlan {
    pub user_id: i64,
    pub goal: Goal,
    pub start_date: NaiveDate,
    pub days: i64,
    pub source: PlanSource,
    pub intensity: Intensity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutLog {
    pub id: i64,
    pub user_id: i64,
    pub day_id: i64,
    pub item_index: i64,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbWorkoutLog {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub day_id: Option<i64>,
    pub item_index: Option<i64>,
    pub completed: Option<bool>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<DbWorkoutLog> for WorkoutLog {
    fn from(log: DbWorkoutLog) -> Self {
        Self {
            id: log.id.unwrap_or_default(),
            user_id: log.user_id.unwrap_or_default(),
            day_id: log.day_id.unwrap_or_default(),
            item_index: log.item_index.unwrap_or_default(),
            completed: log.completed.unwrap_or_default(),
            created_at: log
                .created_at
                .map(|dt| DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc))
                .unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_parses_display_names() {
        assert_eq!("Muscle Gain".parse::<Goal>().unwrap(), Goal::MuscleGain);
        assert_eq!(" Endurance ".parse::<Goal>().unwrap(), Goal::Endurance);
        assert!(matches!(
            "Yoga".parse::<Goal>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn unknown_intensity_is_a_validation_error() {
        assert_eq!("High".parse::<Intensity>().unwrap(), Intensity::High);
        assert!(matches!(
            "Extreme".parse::<Intensity>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn exercise_items_serialize_with_kind_tag() {
        let item = ExerciseItem::Cardio {
            name: "Swim".to_string(),
            minutes: 25,
            completed: false,
        };

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["kind"], "cardio");
        assert_eq!(value["minutes"], 25);

        let parsed: ExerciseItem =
            serde_json::from_str(r#"{"kind":"strength","name":"Dips","sets":3,"reps":8}"#)
                .unwrap();
        assert!(!parsed.is_completed());
        assert_eq!(parsed.name(), "Dips");
    }

    #[test]
    fn toggle_flips_only_the_flag() {
        let mut item = ExerciseItem::Strength {
            name: "Deadlifts".to_string(),
            sets: 4,
            reps: 8,
            completed: false,
        };

        assert!(item.toggle());
        assert!(item.is_completed());
        assert!(!item.toggle());
        assert_eq!(
            item,
            ExerciseItem::Strength {
                name: "Deadlifts".to_string(),
                sets: 4,
                reps: 8,
                completed: false,
            }
        );
    }

    #[test]
    fn computed_bmi_needs_height_and_weight() {
        let mut profile = UserProfile {
            height_cm: Some(180.0),
            ..Default::default()
        };
        assert_eq!(profile.computed_bmi(), None);

        profile.weight_kg = Some(75.0);
        assert_eq!(profile.computed_bmi(), Some(23.1));
    }
}
