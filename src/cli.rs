//! Command-line interface.

use clap::Parser;

/// Pool server flags.
#[derive(Debug, Parser)]
#[command(name = "dockerpool", version, about = "HTTP-managed pools of Docker containers")]
pub struct Args {
    /// Address to listen on.
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = 5000)]
    pub port: u16,

    /// Enable debug logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Container daemon URI (`unix://…` or `tcp://…`); defaults to the
    /// local Docker socket with Podman fallback.
    #[arg(short = 'u', long)]
    pub docker_host: Option<String>,
}

impl Args {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
