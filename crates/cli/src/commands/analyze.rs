use cloudlift_core::directory::DirectoryClient;
use cloudlift_core::models::plan::MigrationPlan;
use cloudlift_core::report::write_json;
use cloudlift_graph::sync::MigrationEngine;
use tracing::info;

use super::Context;

/// Run the `analyze` command: classify the source export against the
/// destination directory and write the pre-migration plan.
pub async fn run(config_path: &str, env_name: &str) -> anyhow::Result<()> {
    let ctx = Context::load(config_path, env_name)?;
    let engine = ctx.engine(ctx.connect()?, false);
    analyze(&ctx, &engine).await?;
    Ok(())
}

pub async fn analyze<D: DirectoryClient>(
    ctx: &Context,
    engine: &MigrationEngine<D>,
) -> anyhow::Result<MigrationPlan> {
    let export = ctx.load_export()?;
    let mut plan = engine
        .analyze(&export, &ctx.config.directory.domain)
        .await?;
    plan.stamp(&ctx.env.environment, ctx.env.user_limit());

    let path = ctx.artifacts().plan;
    write_json(&path, &plan)?;
    info!(path = %path.display(), "wrote migration plan");

    println!("Analysis complete ({}):", ctx.env.environment);
    println!("  Source users: {}", plan.total_users);
    println!("  To migrate:   {}", plan.to_migrate.len());
    println!("  Conflicts:    {}", plan.conflicts.len());
    println!("  Disabled:     {}", plan.disabled.len());
    println!("  Plan:         {}", path.display());

    Ok(plan)
}
