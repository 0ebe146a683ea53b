use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};

use crate::{db, error::AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub completed: bool,
    pub day_complete: bool,
}

/// Flips the completion flag of one item on a workout day and records the
/// change in the workout log. Nothing is written unless every check passes.
#[instrument(skip(pool))]
pub async fn toggle_item(
    pool: &Pool<Sqlite>,
    day_id: i64,
    item_index: i64,
    user_id: i64,
) -> Result<ToggleOutcome, AppError> {
    // Take the write lock before reading so concurrent toggles queue on the
    // busy timeout instead of failing the read-to-write upgrade.
    let mut tx = pool.begin_with("BEGIN IMMEDIATE").await?;

    let Some((mut day, owner_id)) = db::get_day_with_owner(&mut *tx, day_id).await? else {
        return Err(AppError::NotFound(format!("Workout day {} not found", day_id)));
    };

    if owner_id != user_id {
        warn!(owner_id, "Toggle attempted on another user's workout day");
        return Err(AppError::Authorization(
            "Workout day belongs to another user".to_string(),
        ));
    }

    let item_count = day.items.len();
    let index = usize::try_from(item_index)
        .ok()
        .filter(|index| *index < item_count)
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Item index {} is out of range for a day with {} items",
                item_index, item_count
            ))
        })?;

    let completed = day.items[index].toggle();

    db::update_day_items(&mut *tx, day.id, &day.items).await?;
    db::insert_workout_log(&mut *tx, user_id, day.id, item_index, completed).await?;

    tx.commit().await?;

    let outcome = ToggleOutcome {
        completed,
        day_complete: day.is_complete(),
    };
    info!(
        completed = outcome.completed,
        day_complete = outcome.day_complete,
        "Toggled workout item"
    );

    Ok(outcome)
}
