use std::path::Path;

use cloudlift_core::config::{validate_domain, CloudliftConfig};
use tracing::info;

/// Run the `init` command: write a default configuration file.
pub async fn run(config_path: &str, domain: &str, force: bool) -> anyhow::Result<()> {
    validate_domain(domain)?;

    let path = Path::new(config_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    let config = CloudliftConfig::generate_default(domain);
    let toml_str = toml::to_string_pretty(&config)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &toml_str)?;
    info!(path = %path.display(), "wrote configuration");

    println!("Cloudlift initialized successfully!");
    println!("  Configuration: {}", path.display());
    println!("  Domain:        {}", domain);
    println!();
    println!("Next steps:");
    println!("  1. Set directory.tenant_id and directory.client_id (or CLOUDLIFT_TENANT_ID / CLOUDLIFT_CLIENT_ID)");
    println!("  2. Export CLOUDLIFT_CLIENT_SECRET (a .env file is also read)");
    println!("  3. Point source.path at your directory export");
    println!("  4. Run `cloudlift --env dev run`");

    Ok(())
}
