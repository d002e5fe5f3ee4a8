//! CLI handlers for `fitplan plan` subcommands.
//!
//! Implements:
//! - `fitplan plan list <user-id>`                 -- list a user's plans, newest first
//! - `fitplan plan active <user-id>`               -- show the user's active plan
//! - `fitplan plan show <plan-id>`                 -- show one plan in full
//! - `fitplan plan activate <user-id> <plan-id>`   -- make a plan the active one
//! - `fitplan plan rename <plan-id> <name>`        -- rename a plan
//! - `fitplan plan delete <plan-id>`               -- delete a plan

use anyhow::{Context, Result, bail};
use sqlx::PgPool;
use uuid::Uuid;

use fitplan_db::models::Plan;
use fitplan_db::queries::plans::{self as plan_queries, PlanUpdate};

use crate::PlanCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, pool: &PgPool) -> Result<()> {
    match command {
        PlanCommands::List { user_id } => cmd_list(pool, &user_id).await,
        PlanCommands::Active { user_id } => cmd_active(pool, &user_id).await,
        PlanCommands::Show { plan_id } => cmd_show(pool, &plan_id).await,
        PlanCommands::Activate { user_id, plan_id } => {
            cmd_activate(pool, &user_id, &plan_id).await
        }
        PlanCommands::Rename { plan_id, name } => cmd_rename(pool, &plan_id, name).await,
        PlanCommands::Delete { plan_id } => cmd_delete(pool, &plan_id).await,
    }
}

fn parse_plan_id(plan_id_str: &str) -> Result<Uuid> {
    plan_id_str
        .parse()
        .with_context(|| format!("invalid plan ID: {:?}", plan_id_str))
}

// -----------------------------------------------------------------------
// fitplan plan list <user-id>
// -----------------------------------------------------------------------

async fn cmd_list(pool: &PgPool, user_id: &str) -> Result<()> {
    let plans = plan_queries::get_user_plans(pool, user_id).await?;

    if plans.is_empty() {
        println!("No plans found for {user_id}. Use `fitplan generate {user_id}` to create one.");
        return Ok(());
    }

    // ID is always 36 chars (UUID).
    let id_w = 36;
    let name_w = plans.iter().map(|p| p.name.len()).max().unwrap_or(4).max(4);
    let active_w = 6;
    let days_w = 4;

    println!(
        "{:<id_w$}  {:<name_w$}  {:<active_w$}  {:>days_w$}  CREATED",
        "ID", "NAME", "ACTIVE", "DAYS",
    );

    for plan in &plans {
        let active = if plan.is_active { "yes" } else { "" };
        let created = plan.created_at.format("%Y-%m-%d %H:%M");
        println!(
            "{:<id_w$}  {:<name_w$}  {:<active_w$}  {:>days_w$}  {}",
            plan.id,
            plan.name,
            active,
            plan.workout_plan.schedule.len(),
            created,
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------
// fitplan plan active <user-id> / fitplan plan show <plan-id>
// -----------------------------------------------------------------------

async fn cmd_active(pool: &PgPool, user_id: &str) -> Result<()> {
    match plan_queries::get_active_plan(pool, user_id).await? {
        Some(plan) => print_plan(&plan),
        None => println!("{user_id} has no active plan."),
    }
    Ok(())
}

async fn cmd_show(pool: &PgPool, plan_id_str: &str) -> Result<()> {
    let plan_id = parse_plan_id(plan_id_str)?;
    let Some(plan) = plan_queries::get_plan(pool, plan_id).await? else {
        bail!("plan {plan_id} not found");
    };
    print_plan(&plan);
    Ok(())
}

/// Print a plan with its full schedule and meals.
pub fn print_plan(plan: &Plan) {
    println!("Plan: {}", plan.name);
    println!("  ID:       {}", plan.id);
    println!("  User:     {}", plan.user_id);
    println!("  Active:   {}", if plan.is_active { "yes" } else { "no" });
    println!(
        "  Created:  {}",
        plan.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Updated:  {}",
        plan.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    println!();
    println!("Workout ({}):", plan.workout_plan.schedule.join(", "));
    for day in &plan.workout_plan.exercises {
        println!("  {}", day.day);
        for exercise in &day.routines {
            println!("    - {}", exercise_line(exercise));
        }
    }

    println!();
    println!("Diet ({} kcal/day):", plan.diet_plan.daily_calories);
    for meal in &plan.diet_plan.meals {
        println!("  {}: {}", meal.name, meal.foods.join(", "));
    }
}

fn exercise_line(exercise: &fitplan_db::models::Exercise) -> String {
    let mut line = exercise.name.clone();
    match (exercise.sets, exercise.reps, exercise.duration.as_deref()) {
        (Some(sets), Some(reps), _) => line.push_str(&format!(" {sets}x{reps}")),
        (_, _, Some(duration)) => line.push_str(&format!(" ({duration})")),
        _ => {}
    }
    if !exercise.description.is_empty() {
        line.push_str(&format!(": {}", exercise.description));
    }
    line
}

// -----------------------------------------------------------------------
// fitplan plan activate / rename / delete
// -----------------------------------------------------------------------

async fn cmd_activate(pool: &PgPool, user_id: &str, plan_id_str: &str) -> Result<()> {
    let plan_id = parse_plan_id(plan_id_str)?;
    let plan = plan_queries::toggle_plan_active(pool, user_id, plan_id).await?;

    println!("Plan activated.");
    println!();
    println!("  Plan ID:  {}", plan.id);
    println!("  Name:     {}", plan.name);
    if plan.user_id != user_id {
        println!("  Owner:    {} (not {user_id})", plan.user_id);
    }
    Ok(())
}

async fn cmd_rename(pool: &PgPool, plan_id_str: &str, name: String) -> Result<()> {
    let plan_id = parse_plan_id(plan_id_str)?;
    let update = PlanUpdate {
        name: Some(name),
        ..PlanUpdate::default()
    };
    let plan = plan_queries::update_plan(pool, plan_id, &update).await?;
    println!("Plan {} renamed to {:?}.", plan.id, plan.name);
    Ok(())
}

async fn cmd_delete(pool: &PgPool, plan_id_str: &str) -> Result<()> {
    let plan_id = parse_plan_id(plan_id_str)?;
    if !plan_queries::delete_plan(pool, plan_id).await? {
        bail!("plan {plan_id} not found");
    }
    println!("Plan {plan_id} deleted.");
    Ok(())
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use fitplan_db::models::Exercise;

    fn exercise(sets: Option<u32>, reps: Option<u32>, duration: Option<&str>) -> Exercise {
        Exercise {
            name: "Plank".to_owned(),
            sets,
            reps,
            duration: duration.map(str::to_owned),
            description: String::new(),
        }
    }

    #[test]
    fn parse_valid_plan_id() {
        let id = "550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(parse_plan_id(id).unwrap().to_string(), id);
    }

    #[test]
    fn parse_invalid_plan_id() {
        let err = parse_plan_id("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("invalid plan ID"));
    }

    #[test]
    fn exercise_line_prefers_sets_and_reps() {
        assert_eq!(exercise_line(&exercise(Some(3), Some(12), None)), "Plank 3x12");
        assert_eq!(
            exercise_line(&exercise(None, None, Some("30 seconds"))),
            "Plank (30 seconds)"
        );
        assert_eq!(exercise_line(&exercise(None, None, None)), "Plank");
    }

    #[test]
    fn exercise_line_appends_description() {
        let mut ex = exercise(None, None, Some("1 min"));
        ex.description = "Keep hips level".to_owned();
        assert_eq!(exercise_line(&ex), "Plank (1 min): Keep hips level");
    }
}
