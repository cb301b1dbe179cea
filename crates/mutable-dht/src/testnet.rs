//! Multi-node test networks.
//!
//! A testnet starts one seed node, then joins the remaining nodes one at a
//! time, each fully bootstrapped before the next starts. Teardown closes
//! every server first, then destroys nodes last-created-first so the seed
//! stays reachable the longest.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use mutable_dht_core::{PeerAddr, SchemeId};
use mutable_dht_rpc::MemoryNetwork;

use crate::config::{NodeConfig, DEFAULT_REQUEST_TIMEOUT};
use crate::error::{DhtError, Result};
use crate::node::DhtNode;

/// Default seed host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default seed port.
pub const DEFAULT_PORT: u16 = 49737;

/// Configuration for [`Testnet::create`].
#[derive(Debug, Clone)]
pub struct TestnetConfig {
    /// Host every node binds.
    pub host: String,
    /// Seed node port.
    pub port: u16,
    /// External bootstrap contacts. When empty the seed becomes the contact.
    pub bootstrap: Vec<PeerAddr>,
    /// Backends assigned round-robin in creation order.
    pub schemes: Vec<SchemeId>,
    /// Per-request timeout for every node.
    pub request_timeout: Duration,
}

impl Default for TestnetConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            bootstrap: Vec::new(),
            schemes: vec![SchemeId::default()],
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl TestnetConfig {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn bootstrap(mut self, bootstrap: Vec<PeerAddr>) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn schemes(mut self, schemes: Vec<SchemeId>) -> Self {
        self.schemes = schemes;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn scheme_for(&self, index: usize) -> SchemeId {
        if self.schemes.is_empty() {
            return SchemeId::default();
        }
        self.schemes[index % self.schemes.len()]
    }
}

/// What teardown did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownReport {
    /// Servers closed, in closing order.
    pub closed_servers: Vec<PeerAddr>,
    /// Nodes destroyed, in destruction order.
    pub destroyed: Vec<PeerAddr>,
}

/// A set of nodes sharing one in-process network.
pub struct Testnet {
    network: Arc<MemoryNetwork>,
    config: TestnetConfig,
    bootstrap: Vec<PeerAddr>,
    nodes: Vec<DhtNode>,
}

impl Testnet {
    /// Create a testnet of `size` nodes on a fresh network.
    pub async fn create(size: usize, config: TestnetConfig) -> Result<Self> {
        Self::create_on(MemoryNetwork::new(), size, config).await
    }

    /// Create a testnet of `size` nodes on an existing network.
    ///
    /// `size == 0` returns an empty testnet without binding anything.
    pub async fn create_on(
        network: Arc<MemoryNetwork>,
        size: usize,
        config: TestnetConfig,
    ) -> Result<Self> {
        let mut testnet = Self {
            network,
            bootstrap: config.bootstrap.clone(),
            config,
            nodes: Vec::with_capacity(size),
        };
        if size == 0 {
            return Ok(testnet);
        }

        let seed_config = testnet
            .node_config(0)
            .port(testnet.config.port)
            .ephemeral(false)
            .firewalled(false);
        let seed = DhtNode::spawn(Arc::clone(&testnet.network), seed_config).await?;
        seed.fully_bootstrapped().await?;
        if testnet.bootstrap.is_empty() {
            testnet.bootstrap.push(seed.address().clone());
        }
        debug!(addr = %seed.address(), "testnet seed ready");
        testnet.nodes.push(seed);

        while testnet.nodes.len() < size {
            let config = testnet.node_config(testnet.nodes.len()).ephemeral(false);
            testnet.join(config).await?;
        }

        info!(
            size = testnet.nodes.len(),
            bootstrap = ?testnet.bootstrap,
            "testnet created"
        );
        Ok(testnet)
    }

    /// Add an ephemeral node pointed at the testnet's bootstrap contacts.
    pub async fn create_node(&mut self) -> Result<DhtNode> {
        let config = self.node_config(self.nodes.len());
        self.join(config).await
    }

    /// Add a node with a custom configuration. Its bootstrap list is
    /// replaced by the testnet's.
    pub async fn create_node_with(&mut self, config: NodeConfig) -> Result<DhtNode> {
        let config = config.bootstrap(self.bootstrap.clone());
        self.join(config).await
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> &[DhtNode] {
        &self.nodes
    }

    /// Node at `index` in creation order.
    pub fn node(&self, index: usize) -> Option<&DhtNode> {
        self.nodes.get(index)
    }

    /// Bootstrap contacts given to every node.
    pub fn bootstrap(&self) -> &[PeerAddr] {
        &self.bootstrap
    }

    /// The shared network.
    pub fn network(&self) -> &Arc<MemoryNetwork> {
        &self.network
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Close every server, then destroy nodes in reverse creation order.
    ///
    /// Nodes destroyed beforehand are skipped and left out of the report.
    /// Teardown continues past a failing node and returns the first error.
    pub async fn destroy(self) -> Result<TeardownReport> {
        let mut report = TeardownReport::default();

        for node in &self.nodes {
            for server in node.listening().await {
                if server.close().await {
                    report.closed_servers.push(server.address().clone());
                }
            }
        }

        let mut first_error = None;
        for node in self.nodes.iter().rev() {
            match node.destroy().await {
                Ok(()) => report.destroyed.push(node.address().clone()),
                Err(DhtError::Destroyed(addr)) => {
                    debug!(addr = %addr, "node already destroyed");
                }
                Err(e) => {
                    warn!(addr = %node.address(), error = %e, "node teardown failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        info!(
            closed = report.closed_servers.len(),
            destroyed = report.destroyed.len(),
            "testnet destroyed"
        );
        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }

    fn node_config(&self, index: usize) -> NodeConfig {
        NodeConfig::default()
            .host(self.config.host.clone())
            .bootstrap(self.bootstrap.clone())
            .scheme(self.config.scheme_for(index))
            .request_timeout(self.config.request_timeout)
    }

    async fn join(&mut self, config: NodeConfig) -> Result<DhtNode> {
        let node = DhtNode::spawn(Arc::clone(&self.network), config).await?;
        node.fully_bootstrapped().await?;
        debug!(addr = %node.address(), index = self.nodes.len(), "testnet node joined");
        self.nodes.push(node.clone());
        Ok(node)
    }
}

impl std::fmt::Debug for Testnet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Testnet")
            .field("bootstrap", &self.bootstrap)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
