mod args;
mod review;

use clap::Parser;
use env_logger::{Builder, Env};
use log::{debug, warn};

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    Builder::from_env(Env::default().default_filter_or(level)).init();
    debug!("args: {:?}", args);

    if let Err(e) = review::run(&args) {
        warn!("Error occurred: {:?}", e);
        eprintln!("An error occurred: {}", e);
        std::process::exit(1);
    }
}
