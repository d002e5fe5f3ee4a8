//! Deterministic-shape plan generation from the exercise catalog.
//!
//! Used whenever the AI provider is unavailable or returns something
//! unusable. Only the frequency answer influences the shape; goal and level
//! are accepted for symmetry with the provider path but currently ignored.

use std::collections::HashSet;

use rand::Rng;
use rand::seq::{SliceRandom, index};
use tracing::debug;

use fitplan_db::models::{DayWorkout, DietPlan, Exercise, Meal, PlanContent, WorkoutPlan};

use crate::catalog::FocusArea::{Cardio, Core, Flexibility, Strength};
use crate::catalog::{Catalog, CatalogExercise, FocusArea};
use crate::profile::UserProfile;

pub const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

pub const MIN_EXERCISES_PER_DAY: usize = 3;
pub const MAX_EXERCISES_PER_DAY: usize = 5;

/// Exercises drawn per day, split evenly across the day's focus areas.
const EXERCISES_PER_DAY_TARGET: usize = 4;

/// `[min, max)` for generated daily calories.
pub const CALORIE_RANGE: std::ops::Range<u32> = 1800..2400;

const MEAL_NAMES: [&str; 4] = ["Breakfast", "Lunch", "Dinner", "Snack"];
const SNACK_FALLBACK: [&str; 2] = ["Mixed nuts", "Fruit"];

const FULL_BODY: &[FocusArea] = &[Cardio, Strength, Core];

const SPLIT_ROTATION: [&[FocusArea]; 5] = [
    &[Cardio, Core],
    &[Strength, Flexibility],
    &[Cardio, Strength],
    &[Core, Flexibility],
    &[Strength, Cardio],
];

const SPECIALIZED_ROTATION: [&[FocusArea]; 7] = [
    &[Strength],
    &[Cardio],
    &[Core, Flexibility],
    &[Strength],
    &[Cardio],
    &[Core],
    &[Flexibility],
];

/// Focus areas for day `day_index` of a `days`-per-week program.
pub fn focus_for_day(days: u32, day_index: usize) -> &'static [FocusArea] {
    match days {
        0..=3 => FULL_BODY,
        4..=5 => SPLIT_ROTATION[day_index % SPLIT_ROTATION.len()],
        _ => SPECIALIZED_ROTATION[day_index % SPECIALIZED_ROTATION.len()],
    }
}

/// Builds plans from a [`Catalog`]. Never fails.
#[derive(Debug, Clone, Copy)]
pub struct FallbackPlanGenerator<'a> {
    catalog: &'a Catalog,
}

impl Default for FallbackPlanGenerator<'static> {
    fn default() -> Self {
        Self::new(Catalog::builtin())
    }
}

impl<'a> FallbackPlanGenerator<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Generate a full plan. All randomness comes from `rng`.
    pub fn generate<R: Rng + ?Sized>(&self, profile: &UserProfile, rng: &mut R) -> PlanContent {
        let days = profile.training_days();
        let plan = PlanContent {
            workout_plan: self.workout(days, rng),
            diet_plan: self.diet(rng),
        };
        debug!(
            days,
            daily_calories = plan.diet_plan.daily_calories,
            "built fallback plan"
        );
        plan
    }

    /// Weekly schedule of `days` training days, Monday first.
    pub fn workout<R: Rng + ?Sized>(&self, days: u32, rng: &mut R) -> WorkoutPlan {
        let count = (days as usize).min(WEEKDAYS.len());
        let schedule: Vec<String> = WEEKDAYS[..count].iter().map(|d| (*d).to_owned()).collect();

        let exercises = schedule
            .iter()
            .enumerate()
            .map(|(i, day)| DayWorkout {
                day: day.clone(),
                routines: self.day_routines(focus_for_day(days, i), rng),
            })
            .collect();

        WorkoutPlan {
            schedule,
            exercises,
        }
    }

    fn day_routines<R: Rng + ?Sized>(&self, focus: &[FocusArea], rng: &mut R) -> Vec<Exercise> {
        let per_area = (EXERCISES_PER_DAY_TARGET / focus.len().max(1)).max(1);
        let mut picked: Vec<&CatalogExercise> = Vec::new();

        for &area in focus {
            let pool = self.catalog.by_category(area);
            let amount = per_area.min(pool.len());
            picked.extend(index::sample(rng, pool.len(), amount).iter().map(|i| pool[i]));
        }

        if picked.len() < MIN_EXERCISES_PER_DAY {
            let taken: HashSet<&str> = picked.iter().map(|e| e.name.as_str()).collect();
            let mut seen = HashSet::new();
            let candidates: Vec<&CatalogExercise> = self
                .catalog
                .exercises()
                .iter()
                .filter(|e| !taken.contains(e.name.as_str()) && seen.insert(e.name.as_str()))
                .collect();
            let amount = (MIN_EXERCISES_PER_DAY - picked.len()).min(candidates.len());
            picked.extend(
                index::sample(rng, candidates.len(), amount)
                    .iter()
                    .map(|i| candidates[i]),
            );
        }

        picked.truncate(MAX_EXERCISES_PER_DAY);
        picked.into_iter().map(CatalogExercise::to_exercise).collect()
    }

    /// Four meals from shuffled food groups and a random calorie target.
    pub fn diet<R: Rng + ?Sized>(&self, rng: &mut R) -> DietPlan {
        let mut groups: Vec<&Vec<String>> = self.catalog.food_sets().iter().collect();
        groups.shuffle(rng);

        let meals = MEAL_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| Meal {
                name: (*name).to_owned(),
                foods: groups.get(i).map_or_else(
                    || SNACK_FALLBACK.iter().map(|f| (*f).to_owned()).collect(),
                    |foods| (*foods).clone(),
                ),
                calories: None,
            })
            .collect();

        DietPlan {
            daily_calories: rng.random_range(CALORIE_RANGE),
            meals,
        }
    }
}
