use clap::Parser;

fn main() -> miette::Result<()> {
    scriptex_cli::Cli::parse().run()
}
