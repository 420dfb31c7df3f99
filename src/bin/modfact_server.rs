use std::{
    error::Error,
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::NonZeroUsize,
};

use clap::Parser;
use log::info;
use modfact::{FactorialServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(version, about = "Serve modular factorial requests", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,
    /// Worker threads used for every request
    #[arg(long)]
    tnum: NonZeroUsize,
    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    host: IpAddr,
    /// Connections served at the same time
    #[arg(long, default_value = "4")]
    connections: NonZeroUsize,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let cli = Cli::parse();

    ctrlc::set_handler(|| {
        info!("shutting down");
        std::process::exit(0);
    })?;

    let server = FactorialServer::bind(ServerConfig {
        address: SocketAddr::new(cli.host, cli.port),
        workers: cli.tnum,
        connections: cli.connections,
    })?;

    server.listen()?;
    Ok(())
}
