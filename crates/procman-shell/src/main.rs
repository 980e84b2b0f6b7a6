use anyhow::{Context, Result};
use clap::Parser;
use procman::{ProcessManager, config};
use procman_shell::{ConsoleSink, Shell};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "procman")]
#[command(about = "Procman - interactive supervisor for named processes")]
#[command(version)]
struct Cli {
    /// Process registration file
    #[arg(short, long, default_value = "processes.yaml")]
    config: PathBuf,

    /// Log filter, e.g. "procman=debug"
    #[arg(long, default_value = "warn")]
    log: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("Invalid log filter")?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    smol::block_on(async {
        let processes = config::load_file(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?;

        let manager = ProcessManager::builder()
            .config(processes.settings.clone())
            .sink(ConsoleSink)
            .build();
        processes
            .register_all(&manager)
            .await
            .context("Failed to register processes")?;
        info!("Registered {} processes", processes.processes.len());

        let stdin = smol::io::BufReader::new(smol::Unblock::new(std::io::stdin()));
        Shell::new(manager.clone()).run(stdin).await?;

        // Leave nothing running behind the shell
        let report = manager.stop_all_processes().await;
        for failure in report.failures() {
            eprintln!("{}", failure);
        }
        Ok(())
    })
}
