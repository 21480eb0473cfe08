use cascade_io::cli::{converge_command, run_command, summary_command, Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            nodes,
            edges,
            stress,
            seed,
            trials,
            rule,
            data_weights,
            out,
        } => {
            run_command(nodes, edges, stress, seed, trials, rule, data_weights, out)?;
        }

        Commands::Converge {
            nodes,
            edges,
            stress,
            node,
            level,
            seed,
            rule,
            out,
        } => {
            converge_command(nodes, edges, stress, node, level, seed, rule, out)?;
        }

        Commands::Summary {
            nodes,
            edges,
            stress,
        } => {
            summary_command(nodes, edges, stress)?;
        }
    }

    Ok(())
}
