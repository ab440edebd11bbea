use std::{process, sync::Arc};

use gazette::{
    application::{
        access::IdentityProvider, entries::EntryService, error::AppError, repos::EntriesRepo,
    },
    cache::{CacheConfig, LruCacheClient, RecentEntriesCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        identity::HeaderIdentityProvider,
        memory::MemoryRepositories,
        telemetry,
    },
};
use tokio::{signal, sync::Notify, time};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))?;

    connect_postgres(database_url, &settings.database).await?;
    info!(target = "gazette::migrate", "migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repo = init_repository(&settings).await?;

    let cache_config = CacheConfig::from(&settings.cache);
    let recent = RecentEntriesCache::new(
        Arc::new(LruCacheClient::new(&cache_config)),
        &cache_config,
    );
    let entries = EntryService::new(repo, recent).with_page_size(settings.site.page_size.get());
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(HeaderIdentityProvider::from_settings(&settings.auth));

    let state = HttpState::new(entries, identity, settings.site.clone());
    serve_http(&settings.server, http::build_router(state)).await
}

async fn init_repository(settings: &config::Settings) -> Result<Arc<dyn EntriesRepo>, AppError> {
    match settings.database.url.as_ref() {
        Some(url) => {
            let repositories = connect_postgres(url, &settings.database).await?;
            info!(target = "gazette::store", "using postgres entry store");
            Ok(Arc::new(repositories))
        }
        None => {
            warn!(
                target = "gazette::store",
                "database url is not configured; entries live in memory and vanish on exit"
            );
            Ok(Arc::new(MemoryRepositories::new()))
        }
    }
}

async fn connect_postgres(
    url: &str,
    database: &config::DatabaseSettings,
) -> Result<PostgresRepositories, AppError> {
    let pool = PostgresRepositories::connect(url, database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(PostgresRepositories::new(pool))
}

async fn serve_http(
    server: &config::ServerSettings,
    router: axum::Router,
) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "gazette::http", addr = %server.addr, "listening");

    let shutdown = Arc::new(Notify::new());
    let server_future = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move { shutdown.notified().await }
    });
    let mut server_future = Box::pin(server_future.into_future());

    tokio::select! {
        result = &mut server_future => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        outcome = signal::ctrl_c() => {
            if let Err(err) = outcome {
                warn!(target = "gazette::http", error = %err, "failed to listen for shutdown signal");
            }
            info!(target = "gazette::http", "shutdown requested; draining connections");
            shutdown.notify_one();

            match time::timeout(server.graceful_shutdown, server_future).await {
                Ok(result) => {
                    result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
                }
                Err(_) => {
                    warn!(
                        target = "gazette::http",
                        timeout_secs = server.graceful_shutdown.as_secs(),
                        "graceful shutdown timed out"
                    );
                    Ok(())
                }
            }
        }
    }
}
