use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::Goal;

pub const REST_ACTIVITY: &str = "Active recovery walk";
pub const REST_MINUTES: i64 = 20;

#[derive(Debug, Serialize)]
pub struct ExercisePools {
    pub strength: &'static [&'static str],
    pub cardio: &'static [&'static str],
}

static WEIGHT_LOSS: ExercisePools = ExercisePools {
    strength: &[
        "Goblet squats",
        "Walking lunges",
        "Kettlebell swings",
        "Plank",
        "Push-ups",
        "Bodyweight circuit",
        "Mountain climbers",
    ],
    cardio: &[
        "Brisk walk",
        "HIIT intervals",
        "Jump rope",
        "Cycling",
        "Elliptical",
        "Swim",
    ],
};

static MUSCLE_GAIN: ExercisePools = ExercisePools {
    strength: &[
        "Back squats",
        "Front squats",
        "Romanian deadlifts",
        "Deadlifts",
        "Bench press",
        "Overhead press",
        "Barbell rows",
        "Pull-ups",
        "Dips",
        "Dumbbell curls",
    ],
    cardio: &["Rower easy", "Incline walk", "Cycling"],
};

static ENDURANCE: ExercisePools = ExercisePools {
    strength: &[
        "Goblet squats",
        "Walking lunges",
        "Kettlebell swings",
        "Pull-ups",
        "Plank",
        "Burpees",
    ],
    cardio: &[
        "Steady run",
        "Tempo run",
        "Cycling",
        "Swim",
        "Rowing machine",
        "Stair climber",
    ],
};

pub fn pools(goal: Goal) -> &'static ExercisePools {
    match goal {
        Goal::WeightLoss => &WEIGHT_LOSS,
        Goal::MuscleGain => &MUSCLE_GAIN,
        Goal::Endurance => &ENDURANCE,
    }
}

pub fn is_known_exercise(name: &str) -> bool {
    name == REST_ACTIVITY
        || Goal::ALL.into_iter().any(|goal| {
            let pools = pools(goal);
            pools
                .strength
                .iter()
                .chain(pools.cardio.iter())
                .any(|known| *known == name)
        })
}

/// Demo video search link for a catalog exercise.
pub fn media_link(name: &str) -> Option<String> {
    if !is_known_exercise(name) {
        return None;
    }

    let query = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("+");

    Some(format!(
        "https://www.youtube.com/results?search_query={}+exercise+form",
        query.to_ascii_lowercase()
    ))
}

/// Media links for every exercise a plan with this goal can contain.
pub fn media_links(goal: Goal) -> BTreeMap<String, String> {
    let pools = pools(goal);

    pools
        .strength
        .iter()
        .chain(pools.cardio.iter())
        .chain(std::iter::once(&REST_ACTIVITY))
        .filter_map(|name| media_link(name).map(|link| (name.to_string(), link)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn pools_have_no_duplicates() {
        for goal in Goal::ALL {
            let pools = pools(goal);
            let strength: HashSet<_> = pools.strength.iter().collect();
            let cardio: HashSet<_> = pools.cardio.iter().collect();
            assert_eq!(strength.len(), pools.strength.len(), "{}", goal);
            assert_eq!(cardio.len(), pools.cardio.len(), "{}", goal);
            assert!(!pools.cardio.is_empty());
        }
    }

    #[test]
    fn media_link_only_for_catalog_names() {
        assert_eq!(
            media_link("Romanian deadlifts").as_deref(),
            Some("https://www.youtube.com/results?search_query=romanian+deadlifts+exercise+form")
        );
        assert_eq!(
            media_link("Push-ups").as_deref(),
            Some("https://www.youtube.com/results?search_query=push+ups+exercise+form")
        );
        assert!(media_link(REST_ACTIVITY).is_some());
        assert!(media_link("Underwater basket weaving").is_none());
    }

    #[test]
    fn media_links_cover_goal_pools_and_rest() {
        let links = media_links(Goal::MuscleGain);
        assert_eq!(
            links.len(),
            MUSCLE_GAIN.strength.len() + MUSCLE_GAIN.cardio.len() + 1
        );
        assert!(links.contains_key("Bench press"));
        assert!(links.contains_key(REST_ACTIVITY));
    }
}
