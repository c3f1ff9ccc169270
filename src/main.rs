//! dropform CLI: one DigitalOcean droplet from a Terraform-style file.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "dropform",
    version,
    about = "Plan, apply, or destroy a single DigitalOcean droplet described in a .tf file"
)]
struct Cli {
    #[command(flatten)]
    run: dropform::cli::RunArgs,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = dropform::cli::dispatch(cli.run) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
