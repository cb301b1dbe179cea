//! Transport abstraction for the RPC layer.
//!
//! The transport delivers one encoded request to an address and returns the
//! encoded reply. Implementations may use UDP, TCP, or any other transport.

use async_trait::async_trait;

use mutable_dht_core::PeerAddr;

use crate::error::Result;

/// Request/response transport.
///
/// Implementations must be thread-safe (Send + Sync) and must bound every
/// call with a timeout.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an encoded request to `peer` and wait for its encoded reply.
    async fn request(&self, peer: &PeerAddr, payload: Vec<u8>) -> Result<Vec<u8>>;
}

/// An in-process network for tests and testnets.
///
/// Listeners bind `host:port` addresses on a shared [`MemoryNetwork`]; a
/// request is a channel message carrying a oneshot for the reply.
pub mod memory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot, RwLock};

    use crate::error::RpcError;

    /// First port handed out for `port = 0` binds.
    pub const EPHEMERAL_PORT_START: u16 = 49152;

    /// Queue depth per listener.
    const LISTENER_QUEUE: usize = 1024;

    /// A request waiting to be answered.
    #[derive(Debug)]
    pub struct IncomingRequest {
        /// The encoded request.
        pub payload: Vec<u8>,
        reply: oneshot::Sender<Vec<u8>>,
    }

    impl IncomingRequest {
        /// Send the encoded reply. A requester that gave up is ignored.
        pub fn respond(self, payload: Vec<u8>) {
            let _ = self.reply.send(payload);
        }
    }

    struct NetworkState {
        listeners: HashMap<PeerAddr, mpsc::Sender<IncomingRequest>>,
        next_port: u16,
    }

    /// Shared state for the memory transport network.
    pub struct MemoryNetwork {
        state: RwLock<NetworkState>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Bind a listener. Port 0 picks a free ephemeral port.
        pub async fn bind(self: &Arc<Self>, host: &str, port: u16) -> Result<MemoryListener> {
            let mut state = self.state.write().await;

            let addr = if port == 0 {
                let mut candidate = None;
                for _ in 0..=(u16::MAX - EPHEMERAL_PORT_START) {
                    let port = state.next_port;
                    state.next_port = if port == u16::MAX {
                        EPHEMERAL_PORT_START
                    } else {
                        port + 1
                    };
                    let addr = PeerAddr::new(host, port);
                    if !state.listeners.contains_key(&addr) {
                        candidate = Some(addr);
                        break;
                    }
                }
                candidate.ok_or_else(|| RpcError::AddrInUse(PeerAddr::new(host, 0)))?
            } else {
                PeerAddr::new(host, port)
            };

            if state.listeners.contains_key(&addr) {
                return Err(RpcError::AddrInUse(addr));
            }

            let (tx, rx) = mpsc::channel(LISTENER_QUEUE);
            state.listeners.insert(addr.clone(), tx);

            Ok(MemoryListener {
                addr,
                network: Arc::clone(self),
                receiver: rx,
            })
        }

        /// Remove a listener. Its `accept` loop ends once queued requests drain.
        pub async fn unbind(&self, addr: &PeerAddr) -> bool {
            self.state.write().await.listeners.remove(addr).is_some()
        }

        /// Whether something is listening at `addr`.
        pub async fn is_bound(&self, addr: &PeerAddr) -> bool {
            self.state.read().await.listeners.contains_key(addr)
        }

        /// Number of bound listeners.
        pub async fn bound_count(&self) -> usize {
            self.state.read().await.listeners.len()
        }

        /// Create a transport connected to this network.
        pub fn transport(self: &Arc<Self>, timeout: Duration) -> MemoryTransport {
            MemoryTransport {
                network: Arc::clone(self),
                timeout,
            }
        }

        async fn sender(&self, addr: &PeerAddr) -> Option<mpsc::Sender<IncomingRequest>> {
            self.state.read().await.listeners.get(addr).cloned()
        }
    }

    impl Default for MemoryNetwork {
        fn default() -> Self {
            Self {
                state: RwLock::new(NetworkState {
                    listeners: HashMap::new(),
                    next_port: EPHEMERAL_PORT_START,
                }),
            }
        }
    }

    /// A bound address receiving requests.
    pub struct MemoryListener {
        addr: PeerAddr,
        network: Arc<MemoryNetwork>,
        receiver: mpsc::Receiver<IncomingRequest>,
    }

    impl MemoryListener {
        /// The bound address.
        pub fn local_addr(&self) -> &PeerAddr {
            &self.addr
        }

        /// The network this listener is bound on.
        pub fn network(&self) -> &Arc<MemoryNetwork> {
            &self.network
        }

        /// Next request, or `None` once unbound and drained.
        pub async fn accept(&mut self) -> Option<IncomingRequest> {
            self.receiver.recv().await
        }
    }

    /// In-memory transport implementation.
    #[derive(Clone)]
    pub struct MemoryTransport {
        network: Arc<MemoryNetwork>,
        timeout: Duration,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn request(&self, peer: &PeerAddr, payload: Vec<u8>) -> Result<Vec<u8>> {
            let sender = self
                .network
                .sender(peer)
                .await
                .ok_or_else(|| RpcError::PeerUnreachable(peer.clone()))?;

            let (reply, rx) = oneshot::channel();
            let exchange = async {
                sender
                    .send(IncomingRequest { payload, reply })
                    .await
                    .map_err(|_| RpcError::PeerUnreachable(peer.clone()))?;
                rx.await.map_err(|_| RpcError::PeerUnreachable(peer.clone()))
            };

            match tokio::time::timeout(self.timeout, exchange).await {
                Ok(result) => result,
                Err(_) => Err(RpcError::Timeout(peer.clone())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryNetwork;
    use super::*;
    use crate::error::RpcError;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_transport_request_reply() {
        let network = MemoryNetwork::new();
        let mut listener = network.bind("127.0.0.1", 49737).await.unwrap();
        let addr = listener.local_addr().clone();

        tokio::spawn(async move {
            while let Some(incoming) = listener.accept().await {
                let mut reply = incoming.payload.clone();
                reply.reverse();
                incoming.respond(reply);
            }
        });

        let transport = network.transport(Duration::from_secs(1));
        let reply = transport.request(&addr, vec![1, 2, 3]).await.unwrap();
        assert_eq!(reply, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_bind_conflict_and_auto_port() {
        let network = MemoryNetwork::new();
        let _a = network.bind("127.0.0.1", 49737).await.unwrap();
        assert!(matches!(
            network.bind("127.0.0.1", 49737).await,
            Err(RpcError::AddrInUse(_))
        ));

        let b = network.bind("127.0.0.1", 0).await.unwrap();
        let c = network.bind("127.0.0.1", 0).await.unwrap();
        assert_ne!(b.local_addr(), c.local_addr());
        assert_eq!(network.bound_count().await, 3);
    }

    #[tokio::test]
    async fn test_unbound_peer_is_unreachable() {
        let network = MemoryNetwork::new();
        let listener = network.bind("127.0.0.1", 0).await.unwrap();
        let addr = listener.local_addr().clone();
        assert!(network.unbind(&addr).await);
        assert!(!network.is_bound(&addr).await);

        let transport = network.transport(Duration::from_secs(1));
        assert!(matches!(
            transport.request(&addr, vec![0]).await,
            Err(RpcError::PeerUnreachable(_))
        ));
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let network = MemoryNetwork::new();
        // Bound but never accepting.
        let listener = network.bind("127.0.0.1", 0).await.unwrap();
        let transport = network.transport(Duration::from_millis(50));

        assert!(matches!(
            transport.request(listener.local_addr(), vec![0]).await,
            Err(RpcError::Timeout(_))
        ));
    }
}
