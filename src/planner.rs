use chrono::{Days, NaiveDate};
use rand::Rng;
use rand::seq::IndexedRandom;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::catalog::{self, REST_ACTIVITY, REST_MINUTES};
use crate::db;
use crate::error::AppError;
use crate::estimator::{IntensityEstimator, intensity_for_profile};
use crate::models::{
    ExerciseItem, Goal, Intensity, NewWorkoutDay, NewWorkoutPlan, PlanSource, UserProfile,
    WorkoutDay, WorkoutPlan,
};

pub const REPS_PER_SET: i64 = 8;

/// Every fourth day (indices 3, 7, 11, ...) is a rest day.
pub const REST_CYCLE: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume {
    pub strength_moves: usize,
    pub sets: i64,
    pub cardio_minutes: i64,
}

pub fn preset_volume(intensity: Intensity) -> Volume {
    let (strength_moves, sets, cardio_minutes) = match intensity {
        Intensity::Low => (3, 2, 15),
        Intensity::Medium => (4, 3, 25),
        Intensity::High => (5, 4, 35),
    };

    Volume {
        strength_moves,
        sets,
        cardio_minutes,
    }
}

pub fn is_rest_day(day_index: i64) -> bool {
    day_index % REST_CYCLE == REST_CYCLE - 1
}

pub fn rest_day() -> Vec<ExerciseItem> {
    vec![ExerciseItem::Rest {
        name: REST_ACTIVITY.to_string(),
        minutes: REST_MINUTES,
        completed: false,
    }]
}

/// Distinct strength moves from the goal's pool followed by one cardio finisher.
pub fn training_day<R: Rng + ?Sized>(goal: Goal, volume: Volume, rng: &mut R) -> Vec<ExerciseItem> {
    let pools = catalog::pools(goal);

    let mut items: Vec<ExerciseItem> = pools
        .strength
        .choose_multiple(rng, volume.strength_moves)
        .map(|name| ExerciseItem::Strength {
            name: name.to_string(),
            sets: volume.sets,
            reps: REPS_PER_SET,
            completed: false,
        })
        .collect();

    if let Some(name) = pools.cardio.choose(rng) {
        items.push(ExerciseItem::Cardio {
            name: name.to_string(),
            minutes: volume.cardio_minutes,
            completed: false,
        });
    }

    items
}

pub fn build_plan_days<R: Rng + ?Sized>(
    goal: Goal,
    total_days: i64,
    start_date: NaiveDate,
    volume: Volume,
    rng: &mut R,
) -> Result<Vec<NewWorkoutDay>, AppError> {
    if total_days < 1 {
        return Err(AppError::Validation(format!(
            "A plan needs at least one day, got {}",
            total_days
        )));
    }

    (0..total_days)
        .map(|day_index| {
            let date = start_date
                .checked_add_days(Days::new(day_index as u64))
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "Plan starting {} runs past the supported calendar",
                        start_date
                    ))
                })?;

            let items = if is_rest_day(day_index) {
                rest_day()
            } else {
                training_day(goal, volume, rng)
            };

            Ok(NewWorkoutDay {
                day_index,
                date,
                items,
            })
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub goal: Goal,
    pub total_days: i64,
    pub source: PlanSource,
    /// Only honoured for preset plans.
    pub intensity: Option<Intensity>,
    pub start_date: NaiveDate,
}

pub fn resolve_intensity(
    estimator: &dyn IntensityEstimator,
    profile: &UserProfile,
    request: &PlanRequest,
) -> Result<Intensity, AppError> {
    match (request.source, request.intensity) {
        (PlanSource::Ai, None) => Ok(intensity_for_profile(estimator, profile, request.goal)),
        (PlanSource::Ai, Some(_)) => Err(AppError::Validation(
            "An intensity override can only be given for Preset plans".to_string(),
        )),
        (PlanSource::Preset, intensity) => Ok(intensity.unwrap_or(Intensity::Medium)),
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedPlan {
    pub plan: WorkoutPlan,
    pub days: Vec<WorkoutDay>,
}

#[instrument(skip(pool, estimator, profile))]
pub async fn generate_plan(
    pool: &Pool<Sqlite>,
    estimator: &dyn IntensityEstimator,
    user_id: i64,
    profile: &UserProfile,
    request: PlanRequest,
) -> Result<GeneratedPlan, AppError> {
    let intensity = resolve_intensity(estimator, profile, &request)?;
    let volume = preset_volume(intensity);

    let days = build_plan_days(
        request.goal,
        request.total_days,
        request.start_date,
        volume,
        &mut rand::rng(),
    )?;

    let new_plan = NewWorkoutPlan {
        user_id,
        goal: request.goal,
        start_date: request.start_date,
        days: request.total_days,
        source: request.source,
        intensity,
    };

    let (plan, days) = db::insert_plan_with_days(pool, &new_plan, days).await?;

    info!(
        plan_id = plan.id,
        goal = %plan.goal,
        intensity = %plan.intensity,
        days = plan.days,
        "Generated workout plan"
    );

    Ok(GeneratedPlan { plan, days })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::{Features, ScoreTableEstimator};
    use crate::models::Gender;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashSet;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn preset_volume_is_fixed_per_intensity() {
        assert_eq!(
            preset_volume(Intensity::Low),
            Volume {
                strength_moves: 3,
                sets: 2,
                cardio_minutes: 15
            }
        );
        assert_eq!(
            preset_volume(Intensity::Medium),
            Volume {
                strength_moves: 4,
                sets: 3,
                cardio_minutes: 25
            }
        );
        assert_eq!(
            preset_volume(Intensity::High),
            Volume {
                strength_moves: 5,
                sets: 4,
                cardio_minutes: 35
            }
        );
    }

    #[test]
    fn zero_day_plan_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let volume = preset_volume(Intensity::Medium);

        for days in [0, -3] {
            let result = build_plan_days(Goal::Endurance, days, start(), volume, &mut rng);
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn days_cover_every_index_with_matching_dates() {
        let mut rng = StdRng::seed_from_u64(7);
        let days = build_plan_days(
            Goal::WeightLoss,
            30,
            start(),
            preset_volume(Intensity::Low),
            &mut rng,
        )
        .unwrap();

        assert_eq!(days.len(), 30);
        for (expected, day) in days.iter().enumerate() {
            assert_eq!(day.day_index, expected as i64);
            assert_eq!(
                day.date,
                start() + chrono::Duration::days(expected as i64)
            );
        }
    }

    #[test]
    fn every_fourth_day_is_rest() {
        let mut rng = StdRng::seed_from_u64(11);
        let days = build_plan_days(
            Goal::MuscleGain,
            12,
            start(),
            preset_volume(Intensity::High),
            &mut rng,
        )
        .unwrap();

        for day in &days {
            if day.day_index % 4 == 3 {
                assert_eq!(day.items, rest_day());
            } else {
                assert!(day.items.iter().all(|i| !matches!(i, ExerciseItem::Rest { .. })));
            }
        }
    }

    #[test]
    fn training_days_follow_volume_and_goal_pools() {
        for (seed, intensity) in [(3, Intensity::Low), (4, Intensity::Medium), (5, Intensity::High)]
        {
            let mut rng = StdRng::seed_from_u64(seed);
            let volume = preset_volume(intensity);
            let pools = catalog::pools(Goal::Endurance);

            for _ in 0..20 {
                let items = training_day(Goal::Endurance, volume, &mut rng);
                assert_eq!(items.len(), volume.strength_moves + 1);

                let (strength, cardio) = items.split_at(volume.strength_moves);
                let names: HashSet<_> = strength.iter().map(ExerciseItem::name).collect();
                assert_eq!(names.len(), volume.strength_moves, "strength moves repeat");

                for item in strength {
                    match item {
                        ExerciseItem::Strength {
                            name,
                            sets,
                            reps,
                            completed,
                        } => {
                            assert!(pools.strength.iter().any(|known| *known == name.as_str()));
                            assert_eq!(*sets, volume.sets);
                            assert_eq!(*reps, REPS_PER_SET);
                            assert!(!completed);
                        }
                        other => panic!("expected strength item, got {:?}", other),
                    }
                }

                match &cardio[0] {
                    ExerciseItem::Cardio { name, minutes, .. } => {
                        assert!(pools.cardio.iter().any(|known| *known == name.as_str()));
                        assert_eq!(*minutes, volume.cardio_minutes);
                    }
                    other => panic!("expected cardio item, got {:?}", other),
                }
            }
        }
    }

    #[test]
    fn small_pool_is_used_whole() {
        let mut rng = StdRng::seed_from_u64(9);
        let volume = Volume {
            strength_moves: 50,
            sets: 3,
            cardio_minutes: 10,
        };

        let items = training_day(Goal::Endurance, volume, &mut rng);
        assert_eq!(items.len(), catalog::pools(Goal::Endurance).strength.len() + 1);
    }

    #[test]
    fn seven_day_muscle_gain_example() {
        let profile = UserProfile {
            age: Some(30),
            height_cm: Some(180.0),
            weight_kg: Some(75.0),
            gender: Some(Gender::Male),
            ..Default::default()
        };
        let request = PlanRequest {
            goal: Goal::MuscleGain,
            total_days: 7,
            source: PlanSource::Ai,
            intensity: None,
            start_date: start(),
        };

        let intensity = resolve_intensity(&ScoreTableEstimator, &profile, &request).unwrap();
        let volume = preset_volume(intensity);
        let mut rng = StdRng::seed_from_u64(42);
        let days = build_plan_days(request.goal, 7, start(), volume, &mut rng).unwrap();

        let pools = catalog::pools(Goal::MuscleGain);
        assert_eq!(days.len(), 7);
        assert_eq!(days[3].items, rest_day());
        for day in days.iter().filter(|d| d.day_index != 3) {
            assert_eq!(day.items.len(), volume.strength_moves + 1);
            for item in &day.items {
                let name = item.name();
                assert!(
                    pools.strength.iter().chain(pools.cardio).any(|known| *known == name),
                    "{} is not a Muscle Gain exercise",
                    name
                );
            }
        }
    }

    #[test]
    fn preset_source_uses_override_or_medium() {
        struct Panicking;
        impl IntensityEstimator for Panicking {
            fn name(&self) -> &'static str {
                "panicking"
            }
            fn classify(&self, _features: &Features) -> Intensity {
                panic!("preset plans must not consult the estimator")
            }
        }

        let mut request = PlanRequest {
            goal: Goal::WeightLoss,
            total_days: 5,
            source: PlanSource::Preset,
            intensity: None,
            start_date: start(),
        };
        let profile = UserProfile {
            age: Some(30),
            height_cm: Some(170.0),
            weight_kg: Some(70.0),
            gender: Some(Gender::Female),
            ..Default::default()
        };

        assert_eq!(
            resolve_intensity(&Panicking, &profile, &request).unwrap(),
            Intensity::Medium
        );

        request.intensity = Some(Intensity::Low);
        assert_eq!(
            resolve_intensity(&Panicking, &profile, &request).unwrap(),
            Intensity::Low
        );

        request.source = PlanSource::Ai;
        assert!(matches!(
            resolve_intensity(&Panicking, &profile, &request),
            Err(AppError::Validation(_))
        ));
    }
}
