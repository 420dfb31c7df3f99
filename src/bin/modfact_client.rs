use std::{error::Error, path::PathBuf};

use clap::Parser;
use modfact::{Dispatcher, load_endpoints};

#[derive(Debug, Parser)]
#[command(version, about = "Compute k! mod m across a set of servers", long_about = None)]
struct Cli {
    /// Compute the factorial of this number
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    k: u64,
    /// Modulus of the result
    #[arg(long = "mod", value_parser = clap::value_parser!(u64).range(2..))]
    modulus: u64,
    /// File listing one `host:port` server per line
    #[arg(long)]
    servers: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();
    let endpoints = load_endpoints(&cli.servers)?;
    println!("Found {} servers", endpoints.len());

    let report = Dispatcher::new(endpoints).dispatch(cli.k, cli.modulus)?;

    for assignment in &report.assignments {
        match &assignment.outcome {
            Ok(partial) => println!(
                "{} ({}): {}",
                assignment.endpoint, assignment.span, partial.value
            ),
            Err(e) => eprintln!("{} ({}): no result, {e}", assignment.endpoint, assignment.span),
        }
    }

    if !report.is_complete() {
        eprintln!("warning: some servers failed; their ranges are missing from the result");
    }
    println!("{}! mod {} = {}", report.k, report.modulus, report.result);

    Ok(())
}
