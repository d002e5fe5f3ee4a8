use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Plan content
// ---------------------------------------------------------------------------

/// A single exercise within a day's routine.
///
/// Either `sets` + `reps` or `duration` is expected, though both are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sets: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    /// Free-form duration such as `"45 seconds"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// Form tips and instructions.
    #[serde(default)]
    pub description: String,
}

/// The routine for one scheduled weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWorkout {
    pub day: String,
    pub routines: Vec<Exercise>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    /// Weekday names, in training order.
    pub schedule: Vec<String>,
    pub exercises: Vec<DayWorkout>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    /// Category label: Breakfast, Lunch, Dinner or Snack.
    pub name: String,
    pub foods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietPlan {
    pub daily_calories: u32,
    pub meals: Vec<Meal>,
}

/// A generated program: the workout and diet halves together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanContent {
    pub workout_plan: WorkoutPlan,
    pub diet_plan: DietPlan,
}

/// Structural problems that keep plan content out of the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanContentError {
    #[error("plan name must not be empty")]
    EmptyName,

    #[error("workout schedule must list at least one day")]
    EmptySchedule,

    #[error("workout plan must contain at least one day of exercises")]
    NoWorkoutDays,

    #[error("workout day #{index} has no day name")]
    UnnamedDay { index: usize },

    #[error("exercise #{index} on {day} has no name")]
    UnnamedExercise { day: String, index: usize },

    #[error("exercise {exercise:?} on {day} has a zero {field}")]
    ZeroCount {
        day: String,
        exercise: String,
        field: &'static str,
    },

    #[error("daily calories must be positive")]
    ZeroCalories,

    #[error("meal #{index} has no name")]
    UnnamedMeal { index: usize },
}

impl WorkoutPlan {
    /// Check the shape the store relies on.
    pub fn validate(&self) -> Result<(), PlanContentError> {
        if self.schedule.is_empty() {
            return Err(PlanContentError::EmptySchedule);
        }
        if self.exercises.is_empty() {
            return Err(PlanContentError::NoWorkoutDays);
        }
        for (index, day) in self.exercises.iter().enumerate() {
            if day.day.trim().is_empty() {
                return Err(PlanContentError::UnnamedDay { index });
            }
            for (index, exercise) in day.routines.iter().enumerate() {
                if exercise.name.trim().is_empty() {
                    return Err(PlanContentError::UnnamedExercise {
                        day: day.day.clone(),
                        index,
                    });
                }
                for (field, value) in [("sets", exercise.sets), ("reps", exercise.reps)] {
                    if value == Some(0) {
                        return Err(PlanContentError::ZeroCount {
                            day: day.day.clone(),
                            exercise: exercise.name.clone(),
                            field,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl DietPlan {
    pub fn validate(&self) -> Result<(), PlanContentError> {
        if self.daily_calories == 0 {
            return Err(PlanContentError::ZeroCalories);
        }
        for (index, meal) in self.meals.iter().enumerate() {
            if meal.name.trim().is_empty() {
                return Err(PlanContentError::UnnamedMeal { index });
            }
        }
        Ok(())
    }
}

impl PlanContent {
    pub fn validate(&self) -> Result<(), PlanContentError> {
        self.workout_plan.validate()?;
        self.diet_plan.validate()
    }
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// A persisted fitness program owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    /// Opaque identifier issued by the identity provider.
    pub user_id: String,
    pub name: String,
    #[sqlx(json)]
    pub workout_plan: WorkoutPlan,
    #[sqlx(json)]
    pub diet_plan: DietPlan,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plan {
    /// Clone out the workout and diet halves.
    pub fn content(&self) -> PlanContent {
        PlanContent {
            workout_plan: self.workout_plan.clone(),
            diet_plan: self.diet_plan.clone(),
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.is_active { "active" } else { "inactive" };
        write!(f, "{} ({}, {marker})", self.name, self.id)
    }
}

/// A user mirrored from the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub external_id: String,
    pub email: String,
    pub name: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
