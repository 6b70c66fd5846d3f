use catalog_core::Config;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let (_state, router) = catalog_api::setup::initialize_app(config.clone()).await?;
    catalog_api::setup::server::start_server(&config, router).await
}
