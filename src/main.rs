use anthropic_openai_adapter::args::Args;
use anthropic_openai_adapter::config::Config;
use anthropic_openai_adapter::{logger, router};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init(&args.log_filter);

    let config = Config::from_args(&args)?;
    log::info!("proxying to {}", config.base_url);

    let listener = tokio::net::TcpListener::bind((config.host.clone(), config.port)).await?;
    log::info!("anthropic-openai-adapter listening on {}:{}", config.host, config.port);

    let app = router(config);
    axum::serve(listener, app).await?;

    Ok(())
}
