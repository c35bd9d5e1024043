use async_trait::async_trait;
use axum::Router;

/// Shared state handed to module lifecycle hooks.
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
}

/// Index migration contributed by a module.
///
/// A document store has no table schema to evolve, so a migration is the
/// declaration of one index on one collection. Applying the same migration
/// twice is a no-op on the database side.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub collection: &'static str,
    /// Index keys in order, `1` for ascending and `-1` for descending.
    pub keys: &'static [(&'static str, i32)],
    pub unique: bool,
}

impl Migration {
    /// Index name used on the database, scoped by the owning module.
    pub fn index_name(&self, module: &str) -> String {
        format!("{}_{}", module, self.id)
    }
}

/// A feature area of the service: its routes, API docs, indexes and
/// lifecycle hooks.
///
/// Hooks run in this order: indexes are applied, then `init` and `start` in
/// registration order. `stop` runs in reverse order once the server drains.
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name, also the mount point `/api/{name}`.
    fn name(&self) -> &'static str;

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
    }

    /// OpenAPI fragment with paths relative to the mount point.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
