//! Iterative closest-node lookup.
//!
//! Starting from the local routing table, repeatedly asks the closest
//! not-yet-queried peers (at most `alpha` at a time) for closer peers, until
//! every one of the `k` closest known candidates has been queried.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::debug;

use mutable_dht_core::{Blake3Hash, PeerAddr};

use crate::client::RpcClient;
use crate::routing::{distance, RoutingTable};

/// Lookup tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupConfig {
    /// Result size and candidate window.
    pub k: usize,
    /// Concurrent requests per round.
    pub alpha: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            k: crate::routing::DEFAULT_K,
            alpha: 3,
        }
    }
}

/// Find up to `k` live peers closest to `target`, closest first.
///
/// Only peers that answered are returned. Peers that answered are added to
/// the routing table; peers that failed are removed from it.
pub async fn closest_nodes(
    client: &RpcClient,
    table: &Arc<RoutingTable>,
    target: Blake3Hash,
    config: LookupConfig,
) -> Vec<PeerAddr> {
    let k = config.k.max(1);
    let alpha = config.alpha.max(1);
    let local = client.local_addr().clone();

    let mut candidates: BTreeMap<[u8; 32], PeerAddr> = table
        .closest(&target, k)
        .into_iter()
        .map(|p| (distance(&p.node_id(), &target), p))
        .collect();
    let mut queried: HashSet<PeerAddr> = HashSet::new();
    let mut responded: BTreeMap<[u8; 32], PeerAddr> = BTreeMap::new();

    loop {
        let batch: Vec<PeerAddr> = candidates
            .values()
            .take(k)
            .filter(|p| !queried.contains(*p))
            .take(alpha)
            .cloned()
            .collect();
        if batch.is_empty() {
            break;
        }

        let mut set = JoinSet::new();
        for peer in batch {
            queried.insert(peer.clone());
            let client = client.clone();
            set.spawn(async move {
                let result = client.find_node(&peer, target).await;
                (peer, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            let Ok((peer, result)) = joined else {
                continue;
            };
            let peer_distance = distance(&peer.node_id(), &target);
            match result {
                Ok(closer) => {
                    table.add(peer.clone());
                    responded.insert(peer_distance, peer);
                    for node in closer {
                        if node == local || queried.contains(&node) {
                            continue;
                        }
                        candidates
                            .entry(distance(&node.node_id(), &target))
                            .or_insert(node);
                    }
                }
                Err(e) => {
                    debug!(peer = %peer, error = %e, "lookup query failed");
                    table.remove(&peer);
                    candidates.remove(&peer_distance);
                }
            }
        }
    }

    responded.into_values().take(k).collect()
}
