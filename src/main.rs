use anyhow::Context;
use seedbed_kernel::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load seedbed settings")?;
    seedbed_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        app_name = %settings.database.app_name,
        "seedbed bootstrap starting"
    );

    let store = seedbed_app::connect(&settings).await?;
    seedbed_app::bootstrap(&store).await?;

    tracing::info!("seedbed bootstrap complete");
    Ok(())
}
