use cloudlift_core::models::plan::MigrationPlan;
use cloudlift_core::models::report::MigrationReport;
use cloudlift_core::report::{read_json, render_text, write_text};
use tracing::info;

use super::Context;

/// Run the `report` command: render the final text report from the stored
/// plan and migration report.
pub async fn run(config_path: &str, env_name: &str) -> anyhow::Result<()> {
    let ctx = Context::load(config_path, env_name)?;
    let text = render(&ctx)?;
    println!("{text}");
    Ok(())
}

/// Render and persist the text report, returning it.
pub fn render(ctx: &Context) -> anyhow::Result<String> {
    let paths = ctx.artifacts();
    for (path, command) in [(&paths.plan, "analyze"), (&paths.report, "migrate")] {
        if !path.exists() {
            anyhow::bail!(
                "Missing {}. Run `cloudlift {command}` first.",
                path.display()
            );
        }
    }

    let plan: MigrationPlan = read_json(&paths.plan)?;
    let report: MigrationReport = read_json(&paths.report)?;
    let text = render_text(&plan, &report, &ctx.report_meta())?;

    write_text(&paths.text, &text)?;
    info!(path = %paths.text.display(), "wrote final report");
    Ok(text)
}
