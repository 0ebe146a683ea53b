use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument};

use crate::{
    db,
    error::AppError,
    models::{WorkoutDay, WorkoutPlan},
};

/// The user's active plan and, when today falls inside it, today's day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TodayView {
    pub plan: Option<WorkoutPlan>,
    pub day: Option<WorkoutDay>,
    pub day_offset: Option<i64>,
}

/// Whole days from the plan start to `today`. Negative before the start.
pub fn day_offset(start_date: NaiveDate, today: NaiveDate) -> i64 {
    (today - start_date).num_days()
}

/// The day index scheduled for `offset`, if the plan covers it.
pub fn scheduled_index(offset: i64, plan_days: i64) -> Option<i64> {
    (0..plan_days).contains(&offset).then_some(offset)
}

#[instrument(skip(pool))]
pub async fn get_today(
    pool: &Pool<Sqlite>,
    user_id: i64,
    today: NaiveDate,
) -> Result<TodayView, AppError> {
    let Some(plan) = db::get_latest_plan_for_user(pool, user_id).await? else {
        debug!("User has no workout plan");
        return Ok(TodayView::default());
    };

    let offset = day_offset(plan.start_date, today);
    let day = match scheduled_index(offset, plan.days) {
        Some(index) => db::get_plan_day_by_index(pool, plan.id, index).await?,
        None => {
            debug!(offset, plan_days = plan.days, "Today is outside the active plan");
            None
        }
    };

    Ok(TodayView {
        plan: Some(plan),
        day,
        day_offset: Some(offset),
    })
}
