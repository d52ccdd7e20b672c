use crate::{
    CleanArgs,
    build::{base_path_from_config, resolve_against},
    config::Config,
};

pub async fn run(args: &CleanArgs) -> Result<(), anyhow::Error> {
    let (config, config_path) = Config::load_from_arg(args.config_file.as_deref())?;
    let base_path = base_path_from_config(&config_path);

    let site_path = resolve_against(&base_path, &config.site.output);
    let input_path = resolve_against(&base_path, &config.site.input);
    if input_path.starts_with(&site_path) {
        anyhow::bail!(
            "refusing to delete {}: it contains the input directory",
            site_path.display()
        );
    }

    if !site_path.exists() {
        tracing::info!("nothing to clean at {}", site_path.display());
        return Ok(());
    }

    if args.dry_run {
        tracing::info!("would delete {}", site_path.display());
    } else {
        tokio::fs::remove_dir_all(&site_path).await?;
        tracing::info!("deleted {}", site_path.display());
    }

    Ok(())
}
