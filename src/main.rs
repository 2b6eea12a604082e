use aerobalance::cli;
use std::process;

fn main() {
    if let Err(err) = cli::run() {
        eprintln!("{}", err);
        process::exit(1);
    }
}
