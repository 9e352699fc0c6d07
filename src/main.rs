use routebind::{cli, otel};

fn main() -> anyhow::Result<()> {
    let config = otel::LogConfig::from_env();
    otel::init_logging_with_config(&config)?;
    cli::run_cli()
}
