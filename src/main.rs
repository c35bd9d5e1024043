use anyhow::Context;
use shelf_app::StoreBackend;
use shelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load StudyShelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    shelf_app::run(settings, StoreBackend::Mongo).await
}
