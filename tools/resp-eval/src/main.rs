use clap::Parser;

mod args;
mod subcmd;

fn main() -> anyhow::Result<()> {
    let cli = args::Cli::parse();
    cli.run_program()
}
