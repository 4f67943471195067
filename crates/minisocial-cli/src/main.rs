mod cli;

use std::process;

use minisocial_core::interrupt;

fn main() {
    if let Err(e) = cli::run() {
        if e.downcast_ref::<interrupt::InterruptedError>().is_some() {
            process::exit(130);
        }
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
