//! Server side: answer requests from peers.

use std::sync::Arc;

use tracing::{debug, warn};

use mutable_dht_core::PeerAddr;
use mutable_dht_store::MutableRecords;

use crate::messages::{
    decode, encode, limits, Request, RequestEnvelope, Response, ResponseEnvelope, RpcErrorCode,
    PROTOCOL_VERSION,
};
use crate::routing::RoutingTable;
use crate::transport::memory::MemoryListener;

/// Answers requests against a node's routing table and record store.
pub struct RequestHandler {
    local: PeerAddr,
    table: Arc<RoutingTable>,
    records: MutableRecords,
}

impl RequestHandler {
    /// Create a handler for the node at `local`.
    pub fn new(local: PeerAddr, table: Arc<RoutingTable>, records: MutableRecords) -> Self {
        Self {
            local,
            table,
            records,
        }
    }

    /// The node's record table.
    pub fn records(&self) -> &MutableRecords {
        &self.records
    }

    /// Decode, handle and encode. Never fails: problems become error responses.
    pub fn handle_bytes(&self, payload: &[u8]) -> Vec<u8> {
        let response = match decode::<RequestEnvelope>(payload) {
            Ok(envelope) => self.handle(envelope),
            Err(e) => {
                debug!(local = %self.local, error = %e, "undecodable request");
                Response::error(RpcErrorCode::InvalidMessage, e.to_string())
            }
        };

        match encode(&ResponseEnvelope::new(response)) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(local = %self.local, error = %e, "failed to encode response");
                encode(&ResponseEnvelope::new(Response::error(
                    RpcErrorCode::InternalError,
                    "response encoding failed",
                )))
                .unwrap_or_default()
            }
        }
    }

    /// Handle one decoded request.
    pub fn handle(&self, envelope: RequestEnvelope) -> Response {
        if envelope.version != PROTOCOL_VERSION {
            return Response::error(
                RpcErrorCode::VersionMismatch,
                format!("expected version {}", PROTOCOL_VERSION),
            );
        }
        if let Err(reason) = envelope.validate_limits() {
            let code = match envelope.request {
                Request::MutablePut { .. } => RpcErrorCode::ValueTooLarge,
                _ => RpcErrorCode::InvalidMessage,
            };
            return Response::error(code, reason);
        }

        if !envelope.ephemeral && envelope.from != self.local {
            self.table.add(envelope.from.clone());
        }

        debug!(
            local = %self.local,
            from = %envelope.from,
            kind = envelope.request.kind(),
            "handling request"
        );

        match envelope.request {
            Request::Ping => Response::Pong,

            Request::FindNode { target } => {
                let closer = self
                    .table
                    .closest(&target, self.table.k().min(limits::MAX_CLOSER_NODES) + 1)
                    .into_iter()
                    .filter(|p| p != &envelope.from)
                    .take(self.table.k().min(limits::MAX_CLOSER_NODES))
                    .collect();
                Response::Nodes { closer }
            }

            Request::MutablePut { record } => match self.records.put(&record, Some(&envelope.from)) {
                Ok(outcome) => Response::Stored { outcome },
                Err(e) => {
                    warn!(local = %self.local, error = %e, "store failed");
                    Response::error(RpcErrorCode::InternalError, e.to_string())
                }
            },

            Request::MutableGet { public_key, seq } => match self.records.get(&public_key) {
                Ok(record) => Response::Value {
                    record: record.filter(|r| r.seq >= seq),
                },
                Err(e) => {
                    warn!(local = %self.local, error = %e, "store read failed");
                    Response::error(RpcErrorCode::InternalError, e.to_string())
                }
            },
        }
    }
}

/// Answer requests arriving on `listener` until it is unbound.
///
/// Store access is synchronous, so each request is handled on the blocking
/// pool.
pub async fn serve(mut listener: MemoryListener, handler: Arc<RequestHandler>) {
    let addr = listener.local_addr().clone();
    while let Some(mut incoming) = listener.accept().await {
        let payload = std::mem::take(&mut incoming.payload);
        let handler = Arc::clone(&handler);
        match tokio::task::spawn_blocking(move || handler.handle_bytes(&payload)).await {
            Ok(reply) => incoming.respond(reply),
            Err(e) => warn!(addr = %addr, error = %e, "request handler panicked"),
        }
    }
    debug!(addr = %addr, "server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use mutable_dht_core::{Namespaces, PublicKey, Record, SchemeId, Signature};
    use mutable_dht_store::{MemoryStore, PutOutcome};

    fn handler() -> RequestHandler {
        let local = PeerAddr::new("127.0.0.1", 1);
        let table = Arc::new(RoutingTable::new(local.node_id(), 20));
        let records = MutableRecords::new(Arc::new(MemoryStore::new()), SchemeId::Reference);
        RequestHandler::new(local, table, records)
    }

    fn envelope(port: u16, ephemeral: bool, request: Request) -> RequestEnvelope {
        RequestEnvelope::new(PeerAddr::new("127.0.0.1", port), ephemeral, request)
    }

    fn signed(seq: u64, value: &[u8]) -> Record {
        let scheme = SchemeId::Dalek.scheme();
        let kp = scheme.generate_key_pair(Some(&[8; 32]));
        Record::sign(
            scheme,
            &kp,
            &Namespaces::standard().mutable_put,
            seq,
            value.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn test_ping_adds_non_ephemeral_sender() {
        let h = handler();
        assert_eq!(h.handle(envelope(2, false, Request::Ping)), Response::Pong);
        assert_eq!(h.handle(envelope(3, true, Request::Ping)), Response::Pong);

        assert!(h.table.contains(&PeerAddr::new("127.0.0.1", 2)));
        assert!(!h.table.contains(&PeerAddr::new("127.0.0.1", 3)));
    }

    #[test]
    fn test_find_node_excludes_requester() {
        let h = handler();
        h.handle(envelope(2, false, Request::Ping));
        h.handle(envelope(3, false, Request::Ping));

        let target = PeerAddr::new("127.0.0.1", 2).node_id();
        match h.handle(envelope(2, false, Request::FindNode { target })) {
            Response::Nodes { closer } => {
                assert_eq!(closer, vec![PeerAddr::new("127.0.0.1", 3)]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_put_and_get() {
        let h = handler();
        let r0 = signed(0, b"zero");
        let r2 = signed(2, b"two");

        let put = |r: &Record| h.handle(envelope(2, true, Request::MutablePut { record: r.clone() }));
        assert_eq!(put(&r0), Response::Stored { outcome: PutOutcome::Accepted });
        assert_eq!(put(&r2), Response::Stored { outcome: PutOutcome::Accepted });
        assert_eq!(
            put(&r0),
            Response::Stored {
                outcome: PutOutcome::Stale { current_seq: 2 }
            }
        );

        let get = |seq| {
            h.handle(envelope(
                2,
                true,
                Request::MutableGet {
                    public_key: r0.public_key,
                    seq,
                },
            ))
        };
        assert_eq!(get(0), Response::Value { record: Some(r2.clone()) });
        assert_eq!(get(2), Response::Value { record: Some(r2) });
        assert_eq!(get(3), Response::Value { record: None });
    }

    #[test]
    fn test_forged_put_is_rejected() {
        let h = handler();
        let forged = Record {
            public_key: PublicKey::from_bytes([4; 32]),
            seq: 1,
            value: Bytes::from_static(b"x"),
            signature: Signature::ZERO,
        };
        assert_eq!(
            h.handle(envelope(2, true, Request::MutablePut { record: forged })),
            Response::Stored {
                outcome: PutOutcome::InvalidSignature
            }
        );
    }

    #[test]
    fn test_oversized_put_is_rejected() {
        let h = handler();
        let record = Record {
            public_key: PublicKey::from_bytes([4; 32]),
            seq: 1,
            value: Bytes::from(vec![0u8; limits::MAX_VALUE_LEN + 1]),
            signature: Signature::ZERO,
        };
        match h.handle(envelope(2, false, Request::MutablePut { record })) {
            Response::Error { code, .. } => assert_eq!(code, RpcErrorCode::ValueTooLarge),
            other => panic!("unexpected {:?}", other),
        }
        // Rejected senders are not added.
        assert!(h.table.is_empty());
    }

    #[test]
    fn test_version_mismatch() {
        let h = handler();
        let mut env = envelope(2, false, Request::Ping);
        env.version = PROTOCOL_VERSION + 1;
        match h.handle(env) {
            Response::Error { code, .. } => assert_eq!(code, RpcErrorCode::VersionMismatch),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_garbage_bytes_get_error_response() {
        let h = handler();
        let reply: ResponseEnvelope = decode(&h.handle_bytes(b"not cbor")).unwrap();
        assert!(matches!(
            reply.response,
            Response::Error {
                code: RpcErrorCode::InvalidMessage,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_serve_sqlite_backed_node() {
        use crate::client::RpcClient;
        use crate::transport::memory::MemoryNetwork;
        use mutable_dht_store::SqliteStore;
        use std::time::Duration;

        let network = MemoryNetwork::new();
        let listener = network.bind("127.0.0.1", 0).await.unwrap();
        let addr = listener.local_addr().clone();
        let table = Arc::new(RoutingTable::new(addr.node_id(), 20));
        let store = Arc::new(SqliteStore::open_memory().unwrap());
        let records = MutableRecords::new(store, SchemeId::Dalek);
        let server = tokio::spawn(serve(
            listener,
            Arc::new(RequestHandler::new(addr.clone(), table, records)),
        ));

        let client = RpcClient::new(
            Arc::new(network.transport(Duration::from_secs(1))),
            PeerAddr::new("127.0.0.1", 2),
            true,
        );
        let record = signed(4, b"durable");
        assert_eq!(
            client.mutable_put(&addr, record.clone()).await.unwrap(),
            PutOutcome::Accepted
        );
        let fetched = client
            .mutable_get(&addr, record.public_key, 0)
            .await
            .unwrap();
        assert_eq!(fetched, Some(record));

        assert!(network.unbind(&addr).await);
        server.await.unwrap();
    }
}
