use webdispatch::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    init_logging(&LogConfig::from_env())?;
    webdispatch::cli::run_cli()
}
