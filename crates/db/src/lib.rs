//! MongoDB client factory and index migration tooling.
//!
//! The [`Database`] handle is created once per process and cloned into
//! whatever needs it; all clones share the driver's connection pool.

use std::time::Duration;

use anyhow::Context;
use mongodb::{
    bson::{doc, Bson, Document},
    options::{ClientOptions, IndexOptions},
    Client, Collection, IndexModel,
};
use shelf_kernel::{settings::DatabaseSettings, Migration};

const APP_NAME: &str = "studyshelf";

/// Process-wide database handle.
#[derive(Clone, Debug)]
pub struct Database {
    client: Client,
    database: mongodb::Database,
}

/// Build a client from settings. The driver connects lazily, so this does
/// not fail when the server is unreachable; use [`Database::ping`] for that.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<Database> {
    tracing::info!(
        target: "shelf-db",
        uri = %settings.redacted_uri(),
        database = %settings.name,
        "creating database client"
    );

    let mut options = ClientOptions::parse(&settings.uri)
        .await
        .with_context(|| format!("invalid connection string '{}'", settings.redacted_uri()))?;

    let timeout = Duration::from_millis(settings.connect_timeout_ms);
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);
    if options.app_name.is_none() {
        options.app_name = Some(APP_NAME.to_string());
    }

    let client = Client::with_options(options).context("failed to build database client")?;
    let database = client.database(&settings.name);

    Ok(Database { client, database })
}

impl Database {
    pub fn name(&self) -> &str {
        self.database.name()
    }

    /// Typed handle to a collection of this database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.database.collection(name)
    }

    /// Round-trip a `ping` command to verify connectivity.
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.database
            .run_command(doc! { "ping": 1 })
            .await
            .with_context(|| format!("failed to ping database '{}'", self.name()))?;
        Ok(())
    }

    /// Create every index declared by the registered modules.
    pub async fn apply_migrations(&self, migrations: &[(String, Migration)]) -> anyhow::Result<()> {
        for (module, migration) in migrations {
            let name = migration.index_name(module);
            tracing::info!(
                target: "shelf-db",
                module = %module,
                collection = migration.collection,
                index = %name,
                "applying index migration"
            );

            self.collection::<Document>(migration.collection)
                .create_index(index_model(module, migration))
                .await
                .with_context(|| format!("failed to apply migration '{}'", name))?;
        }

        Ok(())
    }

    /// Close pooled connections. Waits for outstanding cursors to be dropped.
    pub async fn shutdown(self) {
        tracing::info!(target: "shelf-db", database = %self.name(), "closing database client");
        self.client.shutdown().await;
    }
}

/// Translate a module migration into a driver index model.
pub fn index_model(module: &str, migration: &Migration) -> IndexModel {
    let mut keys = Document::new();
    for (field, direction) in migration.keys {
        keys.insert(*field, *direction);
    }

    let options = IndexOptions::builder()
        .name(migration.index_name(module))
        .unique(migration.unique)
        .build();

    IndexModel::builder().keys(keys).options(options).build()
}
