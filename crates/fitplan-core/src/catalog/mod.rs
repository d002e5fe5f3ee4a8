//! Exercise and food library for the fallback planner.
//!
//! The built-in library is defined in `catalog.toml` and embedded in the
//! binary at compile time. Alternate libraries can be parsed with
//! [`Catalog::from_toml`].

use std::fmt;
use std::sync::LazyLock;

use serde::Deserialize;

use fitplan_db::models::Exercise;

/// Training category an exercise belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusArea {
    Cardio,
    Strength,
    Core,
    Flexibility,
}

impl FocusArea {
    pub const ALL: [FocusArea; 4] = [
        FocusArea::Cardio,
        FocusArea::Strength,
        FocusArea::Core,
        FocusArea::Flexibility,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FocusArea::Cardio => "cardio",
            FocusArea::Strength => "strength",
            FocusArea::Core => "core",
            FocusArea::Flexibility => "flexibility",
        }
    }
}

impl fmt::Display for FocusArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the exercise library.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogExercise {
    pub name: String,
    pub category: FocusArea,
    #[serde(default)]
    pub sets: Option<u32>,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub duration: Option<String>,
    pub description: String,
}

impl CatalogExercise {
    /// Convert into the plan content representation.
    pub fn to_exercise(&self) -> Exercise {
        Exercise {
            name: self.name.clone(),
            sets: self.sets,
            reps: self.reps,
            duration: self.duration.clone(),
            description: self.description.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FoodSet {
    foods: Vec<String>,
}

/// Container for deserializing a catalog TOML document.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    exercises: Vec<CatalogExercise>,
    #[serde(default)]
    food_sets: Vec<FoodSet>,
}

/// Exercises grouped by category plus the pool of meal food groups.
#[derive(Debug, Clone)]
pub struct Catalog {
    exercises: Vec<CatalogExercise>,
    food_sets: Vec<Vec<String>>,
}

static CATALOG_TOML: &str = include_str!("catalog.toml");

static BUILTIN: LazyLock<Catalog> = LazyLock::new(|| {
    Catalog::from_toml(CATALOG_TOML).expect("embedded catalog.toml is invalid")
});

impl Catalog {
    /// The embedded library.
    ///
    /// # Panics
    ///
    /// Panics on first use if the embedded TOML is malformed. The unit tests
    /// below parse it, so a released binary always carries a valid one.
    pub fn builtin() -> &'static Catalog {
        &BUILTIN
    }

    /// Parse a catalog from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        let file: CatalogFile = toml::from_str(text)?;
        Ok(Self {
            exercises: file.exercises,
            food_sets: file.food_sets.into_iter().map(|s| s.foods).collect(),
        })
    }

    /// Every exercise, in library order.
    pub fn exercises(&self) -> &[CatalogExercise] {
        &self.exercises
    }

    /// Exercises of one category, in library order.
    pub fn by_category(&self, category: FocusArea) -> Vec<&CatalogExercise> {
        self.exercises
            .iter()
            .filter(|e| e.category == category)
            .collect()
    }

    pub fn food_sets(&self) -> &[Vec<String>] {
        &self.food_sets
    }

    /// Categories with no exercise. The fallback planner needs at least one
    /// exercise in every category to fill each day.
    pub fn missing_categories(&self) -> Vec<FocusArea> {
        FocusArea::ALL
            .into_iter()
            .filter(|&area| self.exercises.iter().all(|e| e.category != area))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn builtin_has_five_per_category() {
        let catalog = Catalog::builtin();
        for area in FocusArea::ALL {
            assert_eq!(catalog.by_category(area).len(), 5, "category {area}");
        }
        assert_eq!(catalog.exercises().len(), 20);
    }

    #[test]
    fn builtin_names_are_unique() {
        let names: HashSet<&str> = Catalog::builtin()
            .exercises()
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names.len(), 20);
    }

    #[test]
    fn builtin_entries_have_a_dose() {
        for e in Catalog::builtin().exercises() {
            let reps_based = e.sets.is_some() && e.reps.is_some();
            assert!(
                reps_based || e.duration.is_some(),
                "{} has neither sets/reps nor duration",
                e.name
            );
        }
    }

    #[test]
    fn builtin_food_sets() {
        let sets = Catalog::builtin().food_sets();
        assert_eq!(sets.len(), 8);
        assert!(sets.iter().all(|s| s.len() == 3));
    }

    #[test]
    fn builtin_covers_every_category() {
        assert!(Catalog::builtin().missing_categories().is_empty());
    }

    #[test]
    fn missing_categories_lists_gaps_in_order() {
        let text = r#"
            [[exercises]]
            name = "Plank"
            category = "core"
            duration = "30 seconds"
            description = "Hold a push-up position"
        "#;
        let catalog = Catalog::from_toml(text).unwrap();
        assert_eq!(
            catalog.missing_categories(),
            vec![FocusArea::Cardio, FocusArea::Strength, FocusArea::Flexibility]
        );
        assert!(catalog.food_sets().is_empty());
    }

    #[test]
    fn from_toml_rejects_unknown_category() {
        let text = r#"
            [[exercises]]
            name = "Rowing"
            category = "rowing"
            description = "x"
        "#;
        assert!(Catalog::from_toml(text).is_err());
    }

    #[test]
    fn to_exercise_copies_dose() {
        let squats = Catalog::builtin()
            .exercises()
            .iter()
            .find(|e| e.name == "Squats")
            .unwrap()
            .to_exercise();
        assert_eq!(squats.sets, Some(3));
        assert_eq!(squats.reps, Some(15));
        assert_eq!(squats.duration, None);
    }
}
