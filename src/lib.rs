//! Finds hosts listening on a given port across the private and link-local networks the
//! machine is attached to.
//!
//! Every local subnet is walked outward from the machine's own address, so neighbours are
//! probed first, by a pool of workers whose connection timeout adapts to the latency of the
//! network. The scan ends when every candidate has been probed or the time budget runs out.
//!
//! ## Example
//! Following example scans the local networks for hosts answering on a TCP port and logs them.
//! ```no_run
#![doc = include_str!("../demos/lanscan.rs")]
//! ```

pub mod error;
pub mod interface;
pub mod network;
pub mod probe;
pub mod scanner;
pub mod subnet;

pub use error::{Error, Result};
pub use interface::{link_local_addresses, InterfaceSource, SystemInterfaces};
pub use network::{Network, Transport};
pub use probe::{AdaptiveTimeout, Connector, SocketConnector};
pub use scanner::{scan, ScanConfig, ScanConfigBuilder, ScanReport, Scanner};
