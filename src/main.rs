use clap::Parser;
use dockerpool::cli::Args;
use dockerpool::pool::ContainerPool;
use dockerpool::runtime::DockerRuntime;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "dockerpool=debug,poem=debug"
    } else {
        "dockerpool=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    info!("starting dockerpool");

    let runtime = DockerRuntime::connect(args.docker_host.as_deref()).await?;
    let pool = Arc::new(ContainerPool::new(Arc::new(runtime)));

    dockerpool::api::serve(pool, &args.listen_addr()).await?;

    Ok(())
}
