use std::{
    io,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use futures::future::{BoxFuture, FutureExt};
use log::{debug, trace};
use tokio::{
    net::{TcpStream, UdpSocket},
    sync::{mpsc, Mutex},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

use crate::network::{Network, Transport};

/// Timeout a worker starts with before it has seen the network answer.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(50);

/// Opens a connection to a target and closes it right away.
///
/// Implementations resolve to `Ok(())` when the target accepted the connection within
/// `timeout`, and to an error otherwise.
pub trait Connector: Send + Sync + 'static {
    fn connect(
        &self,
        network: Network,
        target: SocketAddr,
        timeout: Duration,
    ) -> BoxFuture<'_, io::Result<()>>;
}

/// Connects through the sockets of the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocketConnector;

impl Connector for SocketConnector {
    fn connect(
        &self,
        network: Network,
        target: SocketAddr,
        timeout: Duration,
    ) -> BoxFuture<'_, io::Result<()>> {
        async move {
            match tokio::time::timeout(timeout, Self::open(network.transport(), target)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(io::ErrorKind::TimedOut.into()),
            }
        }
        .boxed()
    }
}

impl SocketConnector {
    async fn open(transport: Transport, target: SocketAddr) -> io::Result<()> {
        match transport {
            Transport::Tcp => TcpStream::connect(target).await.map(drop),
            Transport::Udp => {
                let local: IpAddr = match target {
                    SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
                    SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
                };
                let socket = UdpSocket::bind(SocketAddr::new(local, 0)).await?;
                socket.connect(target).await
            }
            #[cfg(unix)]
            Transport::Unix => tokio::net::UnixStream::connect(target.to_string())
                .await
                .map(drop),
            #[cfg(unix)]
            Transport::UnixGram => {
                tokio::net::UnixDatagram::unbound()?.connect(target.to_string())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("{:?} probes are not supported", transport),
            )),
        }
    }
}

/// Per-worker connection timeout that shrinks toward the observed round-trip time.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct AdaptiveTimeout(Duration);

impl Default for AdaptiveTimeout {
    fn default() -> Self {
        Self(DEFAULT_PROBE_TIMEOUT)
    }
}

impl AdaptiveTimeout {
    pub fn new(initial: Duration) -> Self {
        Self(initial)
    }

    pub fn get(&self) -> Duration {
        self.0
    }

    /// Takes half of the slack left by an attempt that took `elapsed` off the timeout.
    /// Attempts that used the whole timeout leave it unchanged.
    pub fn observe(self, elapsed: Duration) -> Self {
        match self.0.checked_sub(elapsed) {
            Some(slack) if !slack.is_zero() => Self(self.0 - slack / 2),
            _ => self,
        }
    }
}

/// Queue of addresses shared by every worker of a scan.
pub(crate) type TargetQueue = Arc<Mutex<mpsc::Receiver<IpAddr>>>;

pub(crate) struct Worker<C> {
    pub(crate) id: usize,
    pub(crate) network: Network,
    pub(crate) port: u16,
    pub(crate) timeout: AdaptiveTimeout,
    pub(crate) connector: Arc<C>,
    pub(crate) targets: TargetQueue,
    pub(crate) found: mpsc::UnboundedSender<IpAddr>,
    pub(crate) done: mpsc::Sender<()>,
    pub(crate) token: CancellationToken,
}

impl<C: Connector> Worker<C> {
    /// Probes targets until the queue is closed and drained or the scan is over, then
    /// reports completion once.
    pub(crate) async fn probe_loop(self) {
        let mut timeout = self.timeout;
        let mut probed = 0usize;

        while let Some(target) = self.next_target().await {
            let addr = SocketAddr::new(target, self.port);
            let start = Instant::now();
            let outcome = self
                .connector
                .connect(self.network, addr, timeout.get())
                .await;
            let elapsed = start.elapsed();
            probed += 1;

            match outcome {
                Ok(()) => {
                    trace!("worker {}: {} responded after {:?}", self.id, addr, elapsed);
                    // the receiver is gone once the scan has returned
                    let _ = self.found.send(target);
                }
                Err(err) => trace!("worker {}: {} did not respond: {}", self.id, addr, err),
            }
            timeout = timeout.observe(elapsed);
        }

        debug!(
            "worker {} finished after {} probes, timeout settled at {:?}",
            self.id,
            probed,
            timeout.get()
        );
        let _ = self.done.send(()).await;
    }

    async fn next_target(&self) -> Option<IpAddr> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            target = async { self.targets.lock().await.recv().await } => target,
        }
    }
}
