//! Prompt templates and response parsing shared by the providers.

use serde::de::DeserializeOwned;

use super::GenerationFailure;
use crate::profile::{ResolvedProfile, UserProfile};

/// Sampling temperature sent with every request.
pub const TEMPERATURE: f32 = 0.7;

/// Output token cap sent with every request.
pub const MAX_OUTPUT_TOKENS: u32 = 2000;

pub const SYSTEM_PROMPT: &str = "You are a professional fitness trainer and nutritionist. \
Create personalized workout and diet plans based on user information. \
Always respond with valid JSON only, no additional text.";

const FULL_PLAN_SHAPE: &str = r#"{
  "workoutPlan": {
    "schedule": ["Monday", "Tuesday", "Wednesday"],
    "exercises": [
      {
        "day": "Monday",
        "routines": [
          {
            "name": "Exercise Name",
            "sets": 3,
            "reps": 12,
            "duration": "30 seconds",
            "description": "form tips and instructions"
          }
        ]
      }
    ]
  },
  "dietPlan": {
    "dailyCalories": 2200,
    "meals": [
      {"name": "Breakfast", "foods": ["Food1", "Food2"]}
    ]
  }
}"#;

const WORKOUT_SHAPE: &str = r#"{"schedule": ["Monday", "Tuesday", "Wednesday"], "exercises": [{"day": "Monday", "routines": [{"name": "Push-ups", "sets": 3, "reps": 12, "description": "form tips"}]}]}"#;

const DIET_SHAPE: &str =
    r#"{"dailyCalories": 2200, "meals": [{"name": "Breakfast", "foods": ["Oatmeal", "Coffee"]}]}"#;

fn resolved(profile: &UserProfile) -> ResolvedProfile<'_> {
    profile.resolve(&ResolvedProfile::PROMPT_PLACEHOLDERS)
}

/// Single prompt asking for the whole `{workoutPlan, dietPlan}` document.
pub fn full_plan_prompt(profile: &UserProfile) -> String {
    let p = resolved(profile);
    format!(
        "Create a personalized fitness plan for:\n\
         - Age: {}\n\
         - Height: {}\n\
         - Weight: {}\n\
         - Injuries: {}\n\
         - Workout frequency: {} days per week\n\
         - Goal: {}\n\
         - Fitness level: {}\n\
         - Dietary restrictions: {}\n\
         \n\
         Return a JSON object with this exact structure:\n{FULL_PLAN_SHAPE}",
        p.age, p.height, p.weight, p.injuries, p.frequency, p.goal, p.level, p.restrictions,
    )
}

/// Prompt for the workout half only.
pub fn workout_prompt(profile: &UserProfile) -> String {
    let p = resolved(profile);
    format!(
        "Create a personalized workout plan JSON for a {} year old, {} tall, {} person \
         with {} fitness level and {} injuries. Goal: {}. Frequency: {} days per week. \
         Respond with JSON only. Format:\n{WORKOUT_SHAPE}",
        p.age, p.height, p.weight, p.level, p.injuries, p.goal, p.frequency,
    )
}

/// Prompt for the diet half only.
pub fn diet_prompt(profile: &UserProfile) -> String {
    let p = resolved(profile);
    format!(
        "Create a personalized diet plan JSON for a {} year old, {} tall, {} person \
         with {} fitness level. Goal: {}. Dietary restrictions: {}. \
         Respond with JSON only. Format:\n{DIET_SHAPE}",
        p.age, p.height, p.weight, p.level, p.goal, p.restrictions,
    )
}

/// Remove every ```` ```json ```` and ```` ``` ```` marker and trim.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_owned()
}

/// Strip fences and deserialize a model response.
pub fn parse_response<T: DeserializeOwned>(text: &str) -> Result<T, GenerationFailure> {
    let cleaned = strip_code_fences(text);
    serde_json::from_str(&cleaned).map_err(|e| GenerationFailure::Parse(e.to_string()))
}
