use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::Router;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures_util::stream::Stream;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;

use crate::{
    ServeArgs,
    build::{
        BuildResult, Builder, ChangeKind, FileWatcher, LIVE_RELOAD_PATH, PathClassifier,
        WatchEvent, WatchPaths, base_path_from_config,
    },
    config::{BuildContext, Config},
};

/// SSE handler for live reload notifications.
async fn live_reload_handler(
    State(tx): State<broadcast::Sender<()>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = tx.subscribe();
    let stream = async_stream::stream! {
        let mut rx = rx;
        loop {
            match rx.recv().await {
                Ok(_) => {
                    yield Ok(Event::default().event("reload").data("reload"));
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Missed some messages, but that's fine - we just need the latest
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    break;
                }
            }
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn run(args: &ServeArgs) -> Result<(), anyhow::Error> {
    let (config, config_path) = Config::load_from_arg(args.config_file.as_deref())?;
    let base_path = base_path_from_config(&config_path);

    // The environment is read once; the dev server adds its own flags
    let build = BuildContext::from_env().with_dev_mode(config.dev.live_reload);

    // Create broadcast channel for live reload
    let (reload_tx, _) = broadcast::channel::<()>(16);

    tracing::info!("building site...");
    let result = do_build(&config, &base_path, &build).await?;

    let _watcher_handle = if args.watch {
        let watch_paths = WatchPaths {
            input_dir: canonical(&result.input_dir),
            output_dir: canonical(&result.output_dir),
            templates_dir: canonical(&result.templates_dir),
            config_path: canonical(&config_path),
        };
        let classifier = PathClassifier::new(watch_paths.clone());

        match FileWatcher::new(&config.dev.watch, &watch_paths, classifier) {
            Ok(watcher) => {
                tracing::info!("watching {} for changes", watch_paths.input_dir.display());

                let runtime = tokio::runtime::Handle::current();
                let rebuild_base = base_path.clone();
                let rebuild_build = build.clone();
                let rebuild_config_path = config_path.clone();
                let mut rebuild_config = config.clone();
                let watcher_reload_tx = reload_tx.clone();

                Some(tokio::task::spawn_blocking(move || {
                    while let Some(event) = watcher.recv() {
                        match event {
                            WatchEvent::FilesChanged(changes) => {
                                tracing::info!(
                                    "detected {} change(s), rebuilding...",
                                    changes.len()
                                );
                                for change in &changes {
                                    tracing::debug!("changed: {}", change);
                                }

                                if changes.contains(&ChangeKind::Config) {
                                    match Config::load_from_file(&rebuild_config_path) {
                                        Ok(config) => rebuild_config = config,
                                        Err(e) => {
                                            tracing::error!("config error: {}", e);
                                            continue;
                                        }
                                    }
                                }

                                let rebuilt = runtime.block_on(do_build(
                                    &rebuild_config,
                                    &rebuild_base,
                                    &rebuild_build,
                                ));

                                // Notify connected browsers to reload
                                match rebuilt {
                                    Ok(_) => {
                                        let _ = watcher_reload_tx.send(());
                                    }
                                    Err(e) => tracing::error!("build error: {:#}", e),
                                }
                            }
                            WatchEvent::Error(e) => {
                                tracing::warn!("watch error: {}", e);
                            }
                        }
                    }
                }))
            }
            Err(e) => {
                tracing::warn!("failed to start file watcher: {}", e);
                None
            }
        }
    } else {
        None
    };

    let serve_dir = ServeDir::new(&result.output_dir).append_index_html_on_directories(true);

    // Build router with SSE endpoint for live reload; the site is mounted at
    // the path prefix so prefixed links resolve locally
    let router = Router::new()
        .route(LIVE_RELOAD_PATH, get(live_reload_handler))
        .with_state(reload_tx);
    let app = if build.path_prefix == "/" {
        router.fallback_service(serve_dir)
    } else {
        router.nest_service(build.path_prefix.trim_end_matches('/'), serve_dir)
    };

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    let display_host = if args.bind == "0.0.0.0" {
        "localhost"
    } else {
        &args.bind
    };
    let url = format!("http://{}:{}{}", display_host, args.port, build.path_prefix);

    tracing::info!("serving site at {}", url);
    tracing::info!("press Ctrl+C to stop");

    if args.open
        && let Err(e) = open::that(&url)
    {
        tracing::warn!("failed to open browser: {}", e);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Helper function to run the build
async fn do_build(
    config: &Config,
    base_path: &Path,
    build: &BuildContext,
) -> Result<BuildResult, anyhow::Error> {
    let builder = Builder::new(config.clone(), base_path.to_path_buf(), build.clone());
    let result = builder.build().await?;
    tracing::info!(
        "built {} documents, {} passthrough files",
        result.documents,
        result.passthrough_files
    );
    Ok(result)
}

/// Canonicalize for consistent matching with file events.
fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
