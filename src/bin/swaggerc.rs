use clap::Parser;
use swaggerc::cli::{run_cli, Cli};
use swaggerc::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // held until exit so buffered log lines are flushed
    let _guard = init_logging(&LogConfig::from_env().with_verbosity(cli.verbose))?;
    run_cli(cli)
}
