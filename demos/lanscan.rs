use clap::Parser;
use lanscan::{ScanConfigBuilder, Scanner};
use log::{error, info};
use std::time::Duration;

/// Simple example to scan the link-local networks for a service
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Network kind to probe with (tcp, tcp4, tcp6, udp, ...)
    #[arg(short, long, default_value = "tcp4")]
    network: String,
    /// Port the hosts should accept connections on
    #[arg(short, long, default_value_t = 80)]
    port: i32,
    /// Number of concurrent probes
    #[arg(short, long, default_value_t = 20)]
    workers: usize,
    /// Overall scan time budget in milliseconds
    #[arg(short, long, default_value_t = 5000)]
    timeout: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    info!(
        "Scanning link local network for {} services on port {}.",
        args.network, args.port
    );
    let config = match ScanConfigBuilder::new(&args.network, args.port)
        .with_workers(args.workers)
        .with_timeout(Duration::from_millis(args.timeout))
        .build()
    {
        Ok(config) => config,
        Err(err) => {
            error!("{}", err);
            std::process::exit(1);
        }
    };

    let report = Scanner::new(config).scan().await;
    info!("Scan results:");
    for host in &report.hosts {
        info!("Host {} responded on port {}", host, args.port);
    }
    info!("Scan duration: {:?}", report.elapsed);
}
