use anyhow::Context;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = kwanza_cli::Cli::parse();
    kwanza_observability::init();

    let config = kwanza_billing::BillingConfig::from_env().context("loading billing configuration")?;
    let output = kwanza_cli::run(&cli.command, &config)?;
    println!("{output}");
    Ok(())
}
