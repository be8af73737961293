use clap::Parser;
use log::error;

mod args;
mod survey;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = survey::run_with_args(&args) {
        error!("upeval failed: {:?}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
