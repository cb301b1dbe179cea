//! Put/get replication for mutable records.
//!
//! Put signs once and offers the identical record to every node closest to
//! `Blake3(public_key)`; each target decides acceptance on its own. Get asks
//! the same target set and keeps the highest-sequence record that verifies.

use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use mutable_dht_core::{
    check_value_len, KeyPair, Namespace, Namespaces, PeerAddr, PublicKey, Record, SchemeId,
    Signature,
};

use crate::client::RpcClient;
use crate::error::{Result, RpcError};
use crate::lookup::{closest_nodes, LookupConfig};
use crate::routing::RoutingTable;

/// Options for [`Replicator::put`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Sequence number. Callers track monotonicity across their own puts.
    pub seq: u64,
}

impl PutOptions {
    /// Put at an explicit sequence number.
    pub fn seq(seq: u64) -> Self {
        Self { seq }
    }
}

/// What a put did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutResult {
    pub public_key: PublicKey,
    pub seq: u64,
    pub signature: Signature,
    /// Targets that answered, whatever their outcome.
    pub responding_peers: Vec<PeerAddr>,
    /// Targets that stored the record as new.
    pub accepted_by: Vec<PeerAddr>,
}

/// Options for [`Replicator::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetOptions {
    /// Ignore records below this sequence number.
    pub seq: u64,
    /// Wait for every target and return the highest sequence. When false,
    /// the first verified record wins.
    pub latest: bool,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            seq: 0,
            latest: true,
        }
    }
}

/// A verified record and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetResult {
    pub seq: u64,
    pub value: Bytes,
    pub signature: Signature,
    pub from: PeerAddr,
}

impl GetResult {
    fn new(record: Record, from: PeerAddr) -> Self {
        Self {
            seq: record.seq,
            value: record.value,
            signature: record.signature,
            from,
        }
    }
}

/// Client side of the mutable record protocol for one node.
#[derive(Clone)]
pub struct Replicator {
    client: RpcClient,
    table: Arc<RoutingTable>,
    scheme: SchemeId,
    namespace: Namespace,
    lookup: LookupConfig,
}

impl Replicator {
    /// Create a replicator signing and verifying with `scheme`.
    pub fn new(
        client: RpcClient,
        table: Arc<RoutingTable>,
        scheme: SchemeId,
        lookup: LookupConfig,
    ) -> Self {
        Self {
            client,
            table,
            scheme,
            namespace: Namespaces::standard().mutable_put,
            lookup,
        }
    }

    /// The signing and verifying scheme.
    pub fn scheme(&self) -> SchemeId {
        self.scheme
    }

    /// The routing table lookups start from.
    pub fn table(&self) -> &Arc<RoutingTable> {
        &self.table
    }

    /// Find the live nodes closest to a public key's target.
    pub async fn targets(&self, public_key: &PublicKey) -> Vec<PeerAddr> {
        closest_nodes(&self.client, &self.table, public_key.target(), self.lookup).await
    }

    /// Sign `value` and replicate it.
    pub async fn put(
        &self,
        key_pair: &KeyPair,
        value: impl Into<Bytes>,
        options: PutOptions,
    ) -> Result<PutResult> {
        let value = value.into();
        check_value_len(value.len())?;
        let record = Record::sign(
            self.scheme.scheme(),
            key_pair,
            &self.namespace,
            options.seq,
            value,
        )?;
        self.put_record(record).await
    }

    /// Replicate an already signed record.
    pub async fn put_record(&self, record: Record) -> Result<PutResult> {
        let targets = self.targets(&record.public_key).await;
        if targets.is_empty() {
            return Err(RpcError::NetworkUnavailable(
                "no nodes found for put".to_string(),
            ));
        }

        let mut set = JoinSet::new();
        for peer in targets {
            let client = self.client.clone();
            let record = record.clone();
            set.spawn(async move {
                let result = client.mutable_put(&peer, record).await;
                (peer, result)
            });
        }

        let mut responding_peers = Vec::new();
        let mut accepted_by = Vec::new();
        while let Some(joined) = set.join_next().await {
            let Ok((peer, result)) = joined else {
                continue;
            };
            match result {
                Ok(outcome) => {
                    if outcome.is_accepted() {
                        accepted_by.push(peer.clone());
                    }
                    debug!(peer = %peer, outcome = ?outcome, "put answered");
                    responding_peers.push(peer);
                }
                Err(e) => debug!(peer = %peer, error = %e, "put delivery failed"),
            }
        }

        if responding_peers.is_empty() {
            return Err(RpcError::NetworkUnavailable(
                "no target answered the put".to_string(),
            ));
        }

        info!(
            public_key = %record.public_key,
            seq = record.seq,
            responding = responding_peers.len(),
            accepted = accepted_by.len(),
            "mutable put complete"
        );

        Ok(PutResult {
            public_key: record.public_key,
            seq: record.seq,
            signature: record.signature,
            responding_peers,
            accepted_by,
        })
    }

    /// Fetch the latest verified record for `public_key`.
    ///
    /// `Ok(None)` means targets answered but none holds a qualifying record.
    pub async fn get(&self, public_key: &PublicKey, options: GetOptions) -> Result<Option<GetResult>> {
        let targets = self.targets(public_key).await;
        if targets.is_empty() {
            return Err(RpcError::NetworkUnavailable(
                "no nodes found for get".to_string(),
            ));
        }

        let mut set = JoinSet::new();
        for peer in targets {
            let client = self.client.clone();
            let public_key = *public_key;
            set.spawn(async move {
                let result = client.mutable_get(&peer, public_key, options.seq).await;
                (peer, result)
            });
        }

        let mut responded = 0usize;
        let mut best: Option<(Record, PeerAddr)> = None;
        while let Some(joined) = set.join_next().await {
            let Ok((peer, result)) = joined else {
                continue;
            };
            let record = match result {
                Ok(record) => {
                    responded += 1;
                    record
                }
                Err(e) => {
                    debug!(peer = %peer, error = %e, "get query failed");
                    continue;
                }
            };
            let Some(record) = record else {
                continue;
            };

            if !self.is_acceptable(&record, public_key, options.seq) {
                warn!(
                    peer = %peer,
                    public_key = %public_key,
                    seq = record.seq,
                    "dropping unverifiable record"
                );
                continue;
            }

            if !options.latest {
                set.abort_all();
                return Ok(Some(GetResult::new(record, peer)));
            }
            if best.as_ref().map_or(true, |(b, _)| record.seq > b.seq) {
                best = Some((record, peer));
            }
        }

        if responded == 0 {
            return Err(RpcError::NetworkUnavailable(
                "no target answered the get".to_string(),
            ));
        }

        Ok(best.map(|(record, from)| GetResult::new(record, from)))
    }

    fn is_acceptable(&self, record: &Record, public_key: &PublicKey, min_seq: u64) -> bool {
        record.public_key == *public_key
            && record.seq >= min_seq
            && record.verify(self.scheme.scheme(), &self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{serve, RequestHandler};
    use crate::transport::memory::MemoryNetwork;
    use crate::transport::Transport;
    use mutable_dht_store::{MemoryStore, MutableRecords};
    use std::time::Duration;

    struct Peer {
        addr: PeerAddr,
        replicator: Replicator,
        handler: Arc<RequestHandler>,
    }

    /// Spin up `n` fully meshed peers, alternating schemes.
    async fn swarm(n: usize) -> (Arc<MemoryNetwork>, Vec<Peer>) {
        let network = MemoryNetwork::new();
        let mut peers = Vec::new();
        for i in 0..n {
            let scheme = SchemeId::ALL[i % SchemeId::ALL.len()];
            let listener = network.bind("127.0.0.1", 0).await.unwrap();
            let addr = listener.local_addr().clone();
            let table = Arc::new(RoutingTable::new(addr.node_id(), 20));
            let records = MutableRecords::new(Arc::new(MemoryStore::new()), scheme);
            let handler = Arc::new(RequestHandler::new(addr.clone(), table.clone(), records));
            tokio::spawn(serve(listener, handler.clone()));

            let transport: Arc<dyn Transport> =
                Arc::new(network.transport(Duration::from_secs(2)));
            let client = RpcClient::new(transport, addr.clone(), false);
            let replicator = Replicator::new(client, table, scheme, LookupConfig::default());
            peers.push(Peer {
                addr,
                replicator,
                handler,
            });
        }
        for a in &peers {
            for b in &peers {
                a.replicator.table().add(b.addr.clone());
            }
        }
        (network, peers)
    }

    #[tokio::test]
    async fn test_put_then_get_across_peers() {
        let (_net, peers) = swarm(6).await;
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);

        let put = peers[0]
            .replicator
            .put(&kp, &b"testing standard"[..], PutOptions::default())
            .await
            .unwrap();
        assert_eq!(put.seq, 0);
        assert_eq!(put.public_key, kp.public_key);
        assert_eq!(put.responding_peers.len(), 5);
        assert_eq!(put.accepted_by.len(), 5);

        let got = peers[1]
            .replicator
            .get(&kp.public_key, GetOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.seq, 0);
        assert_eq!(&got.value[..], b"testing standard");
        assert_eq!(got.signature, put.signature);
    }

    #[tokio::test]
    async fn test_get_returns_highest_sequence() {
        let (_net, peers) = swarm(5).await;
        let kp = SchemeId::Reference.scheme().generate_key_pair(None);

        peers[0]
            .replicator
            .put(&kp, &b"old"[..], PutOptions::seq(0))
            .await
            .unwrap();
        peers[2]
            .replicator
            .put(&kp, &b"new"[..], PutOptions::seq(2))
            .await
            .unwrap();

        let got = peers[4]
            .replicator
            .get(&kp.public_key, GetOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got.seq, 2);
        assert_eq!(&got.value[..], b"new");

        // A stale re-put changes nothing.
        let stale = peers[1]
            .replicator
            .put(&kp, &b"old"[..], PutOptions::seq(0))
            .await
            .unwrap();
        assert!(stale.accepted_by.is_empty());
        assert!(!stale.responding_peers.is_empty());
    }

    #[tokio::test]
    async fn test_get_skips_forged_and_stale_responses() {
        let (_net, peers) = swarm(4).await;
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);

        peers[0]
            .replicator
            .put(&kp, &b"genuine"[..], PutOptions::seq(1))
            .await
            .unwrap();

        // Below the requested minimum: treated as absent.
        let none = peers[3]
            .replicator
            .get(
                &kp.public_key,
                GetOptions {
                    seq: 2,
                    latest: true,
                },
            )
            .await
            .unwrap();
        assert!(none.is_none());

        let any = peers[3]
            .replicator
            .get(
                &kp.public_key,
                GetOptions {
                    seq: 0,
                    latest: false,
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(any.seq, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_key_is_none() {
        let (_net, peers) = swarm(3).await;
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);
        let got = peers[0]
            .replicator
            .get(&kp.public_key, GetOptions::default())
            .await
            .unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_isolated_node_is_network_unavailable() {
        let (_net, peers) = swarm(1).await;
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);

        assert!(matches!(
            peers[0]
                .replicator
                .put(&kp, &b"v"[..], PutOptions::default())
                .await,
            Err(RpcError::NetworkUnavailable(_))
        ));
        assert!(matches!(
            peers[0]
                .replicator
                .get(&kp.public_key, GetOptions::default())
                .await,
            Err(RpcError::NetworkUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_targets_fail_put() {
        let (net, peers) = swarm(3).await;
        for peer in &peers[1..] {
            net.unbind(&peer.addr).await;
        }
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);
        assert!(matches!(
            peers[0]
                .replicator
                .put(&kp, &b"v"[..], PutOptions::default())
                .await,
            Err(RpcError::NetworkUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_value_fails_before_network() {
        let (_net, peers) = swarm(2).await;
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);
        let err = peers[0]
            .replicator
            .put(&kp, vec![0u8; 1001], PutOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Core(ref e) if e.is_encoding()));
        assert!(peers[1].handler.records().is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_sequence_reuse_keeps_first_value() {
        let (_net, peers) = swarm(3).await;
        let kp = SchemeId::Dalek.scheme().generate_key_pair(None);

        peers[0]
            .replicator
            .put(&kp, &b"first"[..], PutOptions::seq(5))
            .await
            .unwrap();
        let rival = peers[1]
            .replicator
            .put(&kp, &b"second"[..], PutOptions::seq(5))
            .await
            .unwrap();
        // Only the first writer's own node had no copy yet.
        assert_eq!(rival.accepted_by, vec![peers[0].addr.clone()]);
        assert_eq!(rival.responding_peers.len(), 2);

        for peer in &peers[1..] {
            let stored = peer.handler.records().get(&kp.public_key).unwrap().unwrap();
            assert_eq!(&stored.value[..], b"first");
        }
    }
}
