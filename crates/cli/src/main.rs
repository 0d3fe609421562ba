use clap::Parser;

mod commands;
mod logger;
mod source;

fn main() {
    let cli = commands::Cli::parse();
    if let Err(err) = logger::init(cli.debug, cli.trace, cli.quiet) {
        eprintln!("failed to set up logger: {err}");
    }
    std::process::exit(commands::run(cli));
}
