use anyhow::Result;
use murmur_config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    murmur_server::init_tracing(&config);

    murmur_server::run(config).await
}
