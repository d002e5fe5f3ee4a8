//! `fitplan generate`: generate a plan from questionnaire answers and store
//! it as the user's active plan.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::Args;
use sqlx::PgPool;

use fitplan_core::catalog::Catalog;
use fitplan_core::fallback::FallbackPlanGenerator;
use fitplan_core::orchestrator::PlanGenerator;
use fitplan_core::profile::UserProfile;
use fitplan_core::service::{self, GenerateRequest, GenerationOutcome};

use crate::plan_cmds::print_plan;

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Identity-provider user ID the plan belongs to
    pub user_id: String,
    #[arg(long)]
    pub age: Option<String>,
    #[arg(long)]
    pub height: Option<String>,
    #[arg(long)]
    pub weight: Option<String>,
    #[arg(long)]
    pub injuries: Option<String>,
    /// Training days per week, e.g. "3" or "5 days"
    #[arg(long)]
    pub frequency: Option<String>,
    /// Fitness goal, e.g. "Weight Loss"
    #[arg(long)]
    pub goal: Option<String>,
    /// Experience level, e.g. "Beginner"
    #[arg(long)]
    pub level: Option<String>,
    /// Dietary restrictions
    #[arg(long)]
    pub restrictions: Option<String>,
    /// Seed the fallback generator for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,
    /// Exercise catalog TOML to use instead of the built-in one
    #[arg(long, value_name = "PATH")]
    pub catalog: Option<PathBuf>,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    pub fn to_request(&self) -> GenerateRequest {
        GenerateRequest {
            user_id: self.user_id.clone(),
            profile: UserProfile {
                age: self.age.clone(),
                height: self.height.clone(),
                weight: self.weight.clone(),
                injuries: self.injuries.clone(),
                frequency: self.frequency.clone(),
                goal: self.goal.clone(),
                level: self.level.clone(),
                restrictions: self.restrictions.clone(),
            },
        }
    }
}

/// Read a catalog file and check that the fallback planner can use it.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    let catalog = Catalog::from_toml(&text)
        .with_context(|| format!("failed to parse catalog {}", path.display()))?;

    let missing = catalog.missing_categories();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|area| area.as_str()).collect();
        bail!(
            "catalog {} has no exercises for: {}",
            path.display(),
            names.join(", ")
        );
    }
    Ok(catalog)
}

pub async fn run_generate(
    pool: &PgPool,
    generator: PlanGenerator,
    args: &GenerateArgs,
) -> Result<()> {
    let generator = match args.seed {
        Some(seed) => generator.with_seed(seed),
        None => generator,
    };
    let generator = match args.catalog.as_deref() {
        Some(path) => {
            // The generator holds the catalog for the rest of the process.
            let catalog: &'static Catalog = Box::leak(Box::new(load_catalog(path)?));
            tracing::debug!(
                path = %path.display(),
                exercises = catalog.exercises().len(),
                "loaded catalog"
            );
            generator.with_fallback(FallbackPlanGenerator::new(catalog))
        }
        None => generator,
    };

    let outcome = service::generate_fitness_plan(pool, &generator, &args.to_request()).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    match outcome {
        GenerationOutcome::Saved { plan, source } => {
            if !args.json {
                println!("Plan generated ({source}) and set as active.");
                println!();
                print_plan(&plan);
            }
            Ok(())
        }
        GenerationOutcome::Failed { error } => bail!("plan generation failed: {error}"),
    }
}
