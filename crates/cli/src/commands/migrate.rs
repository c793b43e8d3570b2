use cloudlift_core::directory::DirectoryClient;
use cloudlift_core::models::plan::MigrationPlan;
use cloudlift_core::models::report::{ExecutionOutcome, GroupAssignment};
use cloudlift_core::report::{read_json, write_json};
use cloudlift_graph::sync::{MigrationEngine, MigrationRun};
use tracing::{error, info};

use super::{Context, Verdict};

/// Run the `migrate` command: execute the stored plan against the destination.
pub async fn run(
    config_path: &str,
    env_name: &str,
    dry_run: bool,
    export_passwords: bool,
) -> anyhow::Result<Verdict> {
    let ctx = Context::load(config_path, env_name)?;
    let engine = ctx.engine(ctx.connect()?, dry_run);
    let plan = load_plan(&ctx)?;
    migrate(&ctx, &engine, &plan, export_passwords).await
}

/// Read the plan written by `analyze`.
pub fn load_plan(ctx: &Context) -> anyhow::Result<MigrationPlan> {
    let path = ctx.artifacts().plan;
    if !path.exists() {
        anyhow::bail!(
            "No migration plan at {}. Run `cloudlift analyze` first.",
            path.display()
        );
    }
    let plan: MigrationPlan = read_json(&path)?;
    check_plan(ctx, &plan)?;
    Ok(plan)
}

/// Refuse a plan analyzed for another environment or user limit.
fn check_plan(ctx: &Context, plan: &MigrationPlan) -> anyhow::Result<()> {
    let env = &ctx.env;
    if plan.environment.as_deref() != Some(env.environment.as_str()) {
        anyhow::bail!(
            "Migration plan was analyzed for environment '{}', not '{}'. \
             Run `cloudlift --env {} analyze` first.",
            plan.environment.as_deref().unwrap_or("unknown"),
            env.environment,
            env.environment
        );
    }
    if plan.user_limit != env.user_limit() {
        anyhow::bail!(
            "Migration plan was analyzed with user limit {:?}, environment '{}' expects {:?}. \
             Run `cloudlift --env {} analyze` first.",
            plan.user_limit,
            env.environment,
            env.user_limit(),
            env.environment
        );
    }
    Ok(())
}

pub async fn migrate<D: DirectoryClient>(
    ctx: &Context,
    engine: &MigrationEngine<D>,
    plan: &MigrationPlan,
    export_passwords: bool,
) -> anyhow::Result<Verdict> {
    let dry_run = engine.options().dry_run;
    let run = engine.execute(plan).await;

    print_summary(&run);

    if dry_run {
        println!();
        println!("This was a dry run. No accounts or groups were created.");
        println!("Run `cloudlift migrate` without --dry-run to apply changes.");
    } else {
        let path = ctx.artifacts().report;
        write_json(&path, &run.report)?;
        info!(path = %path.display(), "wrote migration report");
        println!("  Report:           {}", path.display());
    }

    if export_passwords {
        print_passwords(&run);
    }

    let verdict = Verdict::new(&ctx.env, run.failed());
    if verdict.fatal {
        error!(
            environment = %ctx.env.environment,
            failed = verdict.failed,
            "accounts failed in production"
        );
    }
    Ok(verdict)
}

fn print_summary(run: &MigrationRun) {
    println!(
        "Migration {}!",
        if run.dry_run { "preview" } else { "completed" }
    );
    println!("  Created:          {}", run.created());
    println!("  Already existing: {}", run.already_existing());
    if run.dry_run {
        println!("  Would create:     {}", run.would_create());
    }
    println!("  Failed:           {}", run.failed());
    println!("  Groups created:   {}", run.groups_created);

    let failures: Vec<_> = run
        .results
        .iter()
        .filter_map(|r| match &r.outcome {
            ExecutionOutcome::Failed { error } => Some((&r.entry.new_upn, error)),
            _ => None,
        })
        .collect();
    if !failures.is_empty() {
        println!("  Failures:");
        for (upn, error) in failures {
            println!("    {upn}: {error}");
        }
    }

    let group_failures: Vec<_> = run
        .results
        .iter()
        .filter_map(|r| match &r.group {
            GroupAssignment::Failed { group, error } => Some((&r.entry.new_upn, group, error)),
            _ => None,
        })
        .collect();
    if !group_failures.is_empty() {
        println!("  Group assignment warnings:");
        for (upn, group, error) in group_failures {
            println!("    {upn} -> {group}: {error}");
        }
    }
}

fn print_passwords(run: &MigrationRun) {
    let mut issued = run.issued_passwords().peekable();
    println!();
    if issued.peek().is_none() {
        println!("No temporary passwords were issued in this run.");
        return;
    }
    println!("upn,password");
    for (upn, password) in issued {
        println!("{upn},{password}");
    }
}
