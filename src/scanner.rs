use std::{collections::HashSet, net::IpAddr, sync::Arc, time::Duration};

use ipnet::IpNet;
use log::{debug, info, warn};
use tokio::{
    sync::{mpsc, Mutex},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    interface::{link_local_addresses, InterfaceSource, SystemInterfaces},
    network::Network,
    probe::{AdaptiveTimeout, Connector, SocketConnector, Worker, DEFAULT_PROBE_TIMEOUT},
    subnet,
};

pub const DEFAULT_WORKERS: usize = 20;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const MAX_ADDRESSES_PER_SUBNET: usize = 1000;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Scans the link-local networks of the machine for hosts accepting connections on `port`.
///
/// Runs `workers` probes in parallel and returns whatever responded once every candidate
/// has been tried or `timeout` has elapsed, whichever comes first. Running out of time is
/// not an error.
///
/// # Errors
/// Returns an error if `network` is not a recognised network kind or `port` lies outside
/// `0..=65535`. No probe is sent in that case.
pub async fn scan(
    network: &str,
    port: i32,
    workers: usize,
    timeout: Duration,
) -> Result<Vec<IpAddr>> {
    let config = ScanConfigBuilder::new(network, port)
        .with_workers(workers)
        .with_timeout(timeout)
        .build()?;
    Ok(Scanner::new(config).scan().await.hosts)
}

#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub network: Network,
    pub port: u16,
    pub workers: usize,
    pub timeout: Duration,
    pub probe_timeout: Duration,
    pub max_addresses: usize,
    pub queue_capacity: usize,
    pub deduplicate: bool,
}

#[derive(Debug, Clone)]
pub struct ScanConfigBuilder {
    network: String,
    port: i32,
    workers: usize,
    timeout: Duration,
    probe_timeout: Duration,
    max_addresses: usize,
    queue_capacity: usize,
    deduplicate: bool,
}

impl ScanConfigBuilder {
    pub fn new(network: &str, port: i32) -> Self {
        Self {
            network: network.into(),
            port,
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            max_addresses: MAX_ADDRESSES_PER_SUBNET,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            deduplicate: false,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the overall time budget of the scan.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout each worker starts probing with before adapting it.
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_max_addresses(mut self, max_addresses: usize) -> Self {
        self.max_addresses = max_addresses;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Reports a host once even if several local subnets contain it.
    pub fn with_deduplication(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    pub fn build(self) -> Result<ScanConfig> {
        let network = self.network.parse::<Network>()?;
        let port = u16::try_from(self.port).map_err(|_| Error::InvalidPort(self.port))?;
        Ok(ScanConfig {
            network,
            port,
            workers: self.workers,
            timeout: self.timeout,
            probe_timeout: self.probe_timeout,
            max_addresses: self.max_addresses,
            queue_capacity: self.queue_capacity.max(1),
            deduplicate: self.deduplicate,
        })
    }
}

/// Outcome of a scan: the hosts that accepted a connection and how long it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub hosts: Vec<IpAddr>,
    pub elapsed: Duration,
}

/// Link-local network scanner.
///
/// # Example
/// ```no_run
/// use lanscan::{ScanConfigBuilder, Scanner};
/// use std::time::Duration;
///
/// let config = ScanConfigBuilder::new("tcp4", 80)
///     .with_workers(20)
///     .with_timeout(Duration::from_secs(5))
///     .build()
///     .expect("valid scan parameters");
/// tokio_test::block_on(async {
///     let report = Scanner::new(config).scan().await;
///     for host in &report.hosts {
///         println!("{} responded", host);
///     }
///     println!("scan took {:?}", report.elapsed);
/// })
/// ```
#[derive(Debug)]
pub struct Scanner<I = SystemInterfaces, C = SocketConnector> {
    config: ScanConfig,
    interfaces: I,
    connector: Arc<C>,
}

impl Scanner {
    /// Creates a scanner probing through the interfaces and sockets of the machine.
    pub fn new(config: ScanConfig) -> Self {
        Self::with_collaborators(config, SystemInterfaces, SocketConnector)
    }
}

impl<I: InterfaceSource, C: Connector> Scanner<I, C> {
    pub fn with_collaborators(config: ScanConfig, interfaces: I, connector: C) -> Self {
        Self {
            config,
            interfaces,
            connector: Arc::new(connector),
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Runs one scan.
    ///
    /// Workers and the task feeding them are stopped when this returns; connections already
    /// under way finish on their own timeout and their outcome is dropped.
    pub async fn scan(&self) -> ScanReport {
        let start = Instant::now();
        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        if self.config.workers == 0 {
            warn!("scan started without workers, nothing will be probed");
            return ScanReport {
                hosts: Vec::new(),
                elapsed: start.elapsed(),
            };
        }

        let token = CancellationToken::new();
        let _guard = token.clone().drop_guard();

        let (target_tx, target_rx) = mpsc::channel(self.config.queue_capacity);
        let targets = Arc::new(Mutex::new(target_rx));
        let (found_tx, mut found_rx) = mpsc::unbounded_channel();
        let (done_tx, mut done_rx) = mpsc::channel(self.config.workers);

        for id in 0..self.config.workers {
            let worker = Worker {
                id,
                network: self.config.network,
                port: self.config.port,
                timeout: AdaptiveTimeout::new(self.config.probe_timeout),
                connector: Arc::clone(&self.connector),
                targets: Arc::clone(&targets),
                found: found_tx.clone(),
                done: done_tx.clone(),
                token: token.clone(),
            };
            tokio::spawn(worker.probe_loop());
        }
        drop(found_tx);
        drop(done_tx);

        let subnets = link_local_addresses(&self.interfaces, self.config.network);
        debug!("scanning {} local subnets: {:?}", subnets.len(), subnets);
        tokio::spawn(feed(
            target_tx,
            subnets,
            self.config.max_addresses,
            token.clone(),
        ));

        let mut hosts = Vec::new();
        let mut outstanding = self.config.workers;
        loop {
            tokio::select! {
                biased;
                Some(host) = found_rx.recv() => hosts.push(host),
                Some(()) = done_rx.recv() => {
                    outstanding -= 1;
                    if outstanding == 0 {
                        break;
                    }
                }
                _ = &mut deadline => {
                    debug!("scan deadline reached with {} workers busy", outstanding);
                    break;
                }
            }
        }
        // hosts sent before the loop ended are already buffered
        while let Ok(host) = found_rx.try_recv() {
            hosts.push(host);
        }

        if self.config.deduplicate {
            let mut seen = HashSet::new();
            hosts.retain(|host| seen.insert(*host));
        }

        let elapsed = start.elapsed();
        info!(
            "{} scan on port {} found {} hosts in {:?}",
            self.config.network,
            self.config.port,
            hosts.len(),
            elapsed
        );
        ScanReport { hosts, elapsed }
    }
}

/// Enqueues the candidates of every subnet, nearest to the local address first, then
/// closes the queue by dropping `targets`.
async fn feed(
    targets: mpsc::Sender<IpAddr>,
    subnets: Vec<IpNet>,
    max_addresses: usize,
    token: CancellationToken,
) {
    for net in subnets {
        let local = net.addr();
        let candidates = subnet::enumerate(&net, max_addresses);
        let ordered = subnet::radial_order(&candidates, &local);
        debug!("queueing {} addresses around {}", ordered.len(), net);

        for target in ordered {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                sent = targets.send(target) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    }
}
