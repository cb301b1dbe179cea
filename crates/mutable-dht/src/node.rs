//! A DHT node: server, routing table, record store and replication.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use mutable_dht_core::{KeyPair, PeerAddr, PublicKey, SchemeId};
use mutable_dht_rpc::{
    closest_nodes, serve, GetOptions, GetResult, LookupConfig, MemoryNetwork, PutOptions,
    PutResult, Replicator, RequestHandler, RoutingTable, RpcClient, Transport,
};
use mutable_dht_store::{MemoryStore, MutableRecords, RecordStore, SqliteStore};

use crate::config::{NodeConfig, StoreConfig};
use crate::error::{DhtError, Result};

/// An open listening address of a node.
#[derive(Clone)]
pub struct Server {
    addr: PeerAddr,
    network: Arc<MemoryNetwork>,
}

impl Server {
    /// The bound address.
    pub fn address(&self) -> &PeerAddr {
        &self.addr
    }

    /// Stop accepting requests. Returns false if already closed.
    pub async fn close(&self) -> bool {
        let closed = self.network.unbind(&self.addr).await;
        if closed {
            debug!(addr = %self.addr, "server closed");
        }
        closed
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Server").field(&self.addr).finish()
    }
}

struct NodeInner {
    address: PeerAddr,
    config: NodeConfig,
    network: Arc<MemoryNetwork>,
    handler: Arc<RequestHandler>,
    replicator: Replicator,
    servers: Vec<Server>,
    bootstrapped: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

/// A running node on an in-process network.
///
/// Cheap to clone; clones share the same node.
#[derive(Clone)]
pub struct DhtNode {
    inner: Arc<NodeInner>,
}

impl DhtNode {
    /// Bind, start serving and start bootstrapping.
    ///
    /// Returns once the server is bound; await
    /// [`fully_bootstrapped`](Self::fully_bootstrapped) before relying on
    /// the routing table.
    pub async fn spawn(network: Arc<MemoryNetwork>, config: NodeConfig) -> Result<Self> {
        let store: Arc<dyn RecordStore> = match &config.store {
            StoreConfig::Memory => Arc::new(MemoryStore::new()),
            StoreConfig::Sqlite(path) => Arc::new(SqliteStore::open(path)?),
        };

        let listener = network.bind(&config.host, config.port).await?;
        let address = listener.local_addr().clone();

        let table = Arc::new(RoutingTable::new(address.node_id(), config.routing.k));
        let records = MutableRecords::new(store, config.scheme);
        let handler = Arc::new(RequestHandler::new(
            address.clone(),
            Arc::clone(&table),
            records,
        ));
        let serve_task = tokio::spawn(serve(listener, Arc::clone(&handler)));

        let transport: Arc<dyn Transport> =
            Arc::new(network.transport(config.request_timeout));
        let client = RpcClient::new(transport, address.clone(), config.advertises_ephemeral());
        let lookup = LookupConfig::from(config.routing);
        let replicator = Replicator::new(client.clone(), Arc::clone(&table), config.scheme, lookup);

        let (signal, bootstrapped) = watch::channel(false);
        let bootstrap_task = tokio::spawn(bootstrap(
            client,
            table,
            config.bootstrap.clone(),
            lookup,
            signal,
        ));

        info!(
            addr = %address,
            scheme = config.scheme.as_str(),
            ephemeral = config.ephemeral,
            firewalled = config.firewalled,
            "node started"
        );

        let server = Server {
            addr: address.clone(),
            network: Arc::clone(&network),
        };

        Ok(Self {
            inner: Arc::new(NodeInner {
                address,
                config,
                network,
                handler,
                replicator,
                servers: vec![server],
                bootstrapped,
                tasks: Mutex::new(vec![serve_task, bootstrap_task]),
                destroyed: AtomicBool::new(false),
            }),
        })
    }

    /// The node's bound address.
    pub fn address(&self) -> &PeerAddr {
        &self.inner.address
    }

    /// The node's configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.inner.config
    }

    /// The backend this node signs and verifies with.
    pub fn scheme(&self) -> SchemeId {
        self.inner.config.scheme
    }

    /// The node's routing table.
    pub fn routing_table(&self) -> &Arc<RoutingTable> {
        self.inner.replicator.table()
    }

    /// Records this node stores for others.
    pub fn records(&self) -> &MutableRecords {
        self.inner.handler.records()
    }

    /// The network the node is bound on.
    pub fn network(&self) -> &Arc<MemoryNetwork> {
        &self.inner.network
    }

    /// Wait until bootstrap has finished.
    pub async fn fully_bootstrapped(&self) -> Result<()> {
        self.ensure_alive()?;
        let mut rx = self.inner.bootstrapped.clone();
        rx.wait_for(|done| *done)
            .await
            .map(|_| ())
            .map_err(|_| DhtError::Destroyed(self.inner.address.clone()))
    }

    /// Whether bootstrap has finished.
    pub fn is_bootstrapped(&self) -> bool {
        *self.inner.bootstrapped.borrow()
    }

    /// Generate a key pair with this node's backend.
    pub fn generate_key_pair(&self, seed: Option<&[u8; 32]>) -> KeyPair {
        self.inner.config.scheme.scheme().generate_key_pair(seed)
    }

    /// Sign `value` with `key_pair` and store it on the nodes closest to
    /// the key.
    pub async fn put(
        &self,
        key_pair: &KeyPair,
        value: impl Into<Bytes>,
        options: PutOptions,
    ) -> Result<PutResult> {
        self.ensure_alive()?;
        Ok(self.inner.replicator.put(key_pair, value, options).await?)
    }

    /// Fetch the highest-sequence verified record for `public_key`.
    pub async fn get(
        &self,
        public_key: &PublicKey,
        options: GetOptions,
    ) -> Result<Option<GetResult>> {
        self.ensure_alive()?;
        Ok(self.inner.replicator.get(public_key, options).await?)
    }

    /// Servers still accepting requests.
    pub async fn listening(&self) -> Vec<Server> {
        let mut open = Vec::new();
        for server in &self.inner.servers {
            if self.inner.network.is_bound(&server.addr).await {
                open.push(server.clone());
            }
        }
        open
    }

    /// Stop background tasks and close remaining servers. Later calls to
    /// the node fail with [`DhtError::Destroyed`].
    pub async fn destroy(&self) -> Result<()> {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return Err(DhtError::Destroyed(self.inner.address.clone()));
        }

        for server in &self.inner.servers {
            server.close().await;
        }

        let tasks: Vec<JoinHandle<()>> = self
            .inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for task in tasks {
            task.abort();
        }

        info!(addr = %self.inner.address, "node destroyed");
        Ok(())
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_destroyed() {
            return Err(DhtError::Destroyed(self.inner.address.clone()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for DhtNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhtNode")
            .field("address", &self.inner.address)
            .field("scheme", &self.inner.config.scheme)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Ping each contact, then look up our own id to fill the table.
async fn bootstrap(
    client: RpcClient,
    table: Arc<RoutingTable>,
    contacts: Vec<PeerAddr>,
    lookup: LookupConfig,
    signal: watch::Sender<bool>,
) {
    let local = client.local_addr().clone();
    for contact in contacts.iter().filter(|c| **c != local) {
        match client.ping(contact).await {
            Ok(()) => {
                table.add(contact.clone());
            }
            Err(e) => warn!(addr = %local, contact = %contact, error = %e, "bootstrap contact unreachable"),
        }
    }

    let found = closest_nodes(&client, &table, *table.local_id(), lookup).await;
    debug!(
        addr = %local,
        found = found.len(),
        table = table.len(),
        "bootstrap lookup finished"
    );

    signal.send_replace(true);
}
