use ellp_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ellp_observability::init();

    let config = AppConfig::from_env()?;
    let _services = ellp_service::build_services(&config).await?;

    tracing::info!(
        persistent = config.database.is_some(),
        token_ttl_minutes = config.access_token_ttl.num_minutes(),
        "services ready"
    );
    Ok(())
}
