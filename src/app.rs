//! Process bootstrap: pick a store, register modules and serve HTTP.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use shelf_db::Database;
use shelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules::{
    self,
    books::store::{MemoryStore, MongoStore, SharedStore},
};

/// Where books and reviews are kept for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Mongo,
    /// Process-local storage, lost on exit.
    Memory,
}

/// Build a registry holding every application module, backed by `store`.
pub fn build_registry(store: SharedStore) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store);
    registry
}

/// Create the database client and check that the server answers.
///
/// An unreachable server is logged and tolerated; requests fail with 500
/// until it comes back. Returns whether the ping succeeded.
pub async fn connect_database(settings: &Settings) -> anyhow::Result<(Database, bool)> {
    let database = shelf_db::connect(&settings.database).await?;

    let reachable = match database.ping().await {
        Ok(()) => {
            tracing::info!(
                database = %database.name(),
                uri = %settings.database.redacted_uri(),
                "connected to MongoDB"
            );
            true
        }
        Err(e) => {
            tracing::warn!(
                error = %format!("{e:#}"),
                uri = %settings.database.redacted_uri(),
                "MongoDB connection error, serving anyway"
            );
            false
        }
    };

    Ok((database, reachable))
}

/// Create every index the registered modules declare.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let database = shelf_db::connect(&settings.database).await?;
    database.ping().await?;

    let registry = build_registry(Arc::new(MongoStore::new(&database)));
    let migrations = registry.collect_migrations();
    database.apply_migrations(&migrations).await?;
    database.shutdown().await;

    Ok(migrations.len())
}

/// Run the service until ctrl-c or SIGTERM.
pub async fn run(settings: Settings, backend: StoreBackend) -> anyhow::Result<()> {
    run_until(settings, backend, shelf_http::shutdown_signal()).await
}

/// Run the service until `shutdown` resolves, then stop modules and close
/// the database client.
pub async fn run_until<F>(settings: Settings, backend: StoreBackend, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::info!(env = ?settings.environment, ?backend, "studyshelf starting");

    let database = match backend {
        StoreBackend::Mongo => Some(connect_database(&settings).await?),
        StoreBackend::Memory => None,
    };

    let store: SharedStore = match &database {
        Some((database, _)) => Arc::new(MongoStore::new(database)),
        None => Arc::new(MemoryStore::new()),
    };
    let registry = build_registry(store);

    if let Some((database, true)) = &database {
        if let Err(e) = database.apply_migrations(&registry.collect_migrations()).await {
            tracing::warn!(error = %format!("{e:#}"), "index migrations failed");
        }
    }

    let ctx = InitCtx {
        settings: &settings,
    };
    registry
        .init_modules(&ctx)
        .await
        .context("module initialization failed")?;
    registry
        .start_modules(&ctx)
        .await
        .context("module startup failed")?;

    let served = shelf_http::serve(&registry, &settings, shutdown).await;

    if let Err(e) = registry.stop_modules().await {
        tracing::error!(error = %format!("{e:#}"), "failed to stop modules cleanly");
    }
    if let Some((database, _)) = database {
        database.shutdown().await;
    }

    tracing::info!("studyshelf stopped");
    served
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_holds_books_module() {
        let registry = build_registry(Arc::new(MemoryStore::new()));
        assert_eq!(registry.module_count(), 1);
        assert!(registry.get_module("books").is_some());
        assert_eq!(registry.collect_migrations().len(), 2);
    }

    #[tokio::test]
    async fn memory_backend_serves_and_shuts_down() {
        let mut settings = Settings::default();
        settings.server.host = "127.0.0.1".to_string();
        settings.server.port = 0;

        run_until(settings, StoreBackend::Memory, async {})
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn port_conflict_is_reported() {
        let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut settings = Settings::default();
        settings.server.host = "127.0.0.1".to_string();
        settings.server.port = occupied.local_addr().unwrap().port();

        let error = run_until(settings, StoreBackend::Memory, async {})
            .await
            .unwrap_err();
        assert!(format!("{error:#}").contains("failed to bind"));
    }
}
