use anyhow::Context;

use crate::{
    BuildArgs,
    build::{Builder, base_path_from_config},
    config::{BuildContext, Config},
};

pub async fn run(args: &BuildArgs) -> Result<(), anyhow::Error> {
    let (config, config_path) = Config::load_from_arg(args.config_file.as_deref())?;
    let base_path = base_path_from_config(&config_path);

    // The environment is read once, here
    let build = BuildContext::from_env();
    tracing::info!(
        "building {} (production: {}, path prefix: {})",
        config.site.name,
        build.production,
        build.path_prefix
    );

    let builder = Builder::new(config, base_path, build);
    let result = builder.build().await.context("build failed")?;

    tracing::info!(
        "built site to {} ({} documents, {} passthrough files)",
        result.output_dir.display(),
        result.documents,
        result.passthrough_files
    );

    Ok(())
}
