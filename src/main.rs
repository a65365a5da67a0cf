mod args;
mod sgp;

use clap::Parser;
use log::debug;
use snafu::ErrorCompat;

use crate::args::Args;

fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
    debug!("args: {:?}", args);

    if let Err(e) = sgp::run(&args) {
        let mut chain = ErrorCompat::iter_chain(&e);
        if let Some(top) = chain.next() {
            eprintln!("An error occured: {}", top);
        }
        for cause in chain {
            eprintln!("  caused by: {}", cause);
        }
        std::process::exit(1);
    }
}
