//! Kademlia routing table.
//!
//! Node ids are `Blake3("host:port")`. The table keeps up to `k` peers per
//! bucket, bucketed by the length of the common prefix with the local id.

use std::sync::{PoisonError, RwLock};

use mutable_dht_core::{Blake3Hash, PeerAddr};

/// Number of bits in a node id, and so the number of buckets.
pub const ID_BITS: usize = 256;

/// Default bucket size.
pub const DEFAULT_K: usize = 20;

/// XOR distance between two ids. Compares big-endian.
pub fn distance(a: &Blake3Hash, b: &Blake3Hash) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a.as_bytes()[i] ^ b.as_bytes()[i];
    }
    out
}

/// Bucket for `other` relative to `local`: the number of leading bits they
/// share. `None` if the ids are equal.
pub fn bucket_index(local: &Blake3Hash, other: &Blake3Hash) -> Option<usize> {
    let d = distance(local, other);
    for (i, byte) in d.iter().enumerate() {
        if *byte != 0 {
            return Some(i * 8 + byte.leading_zeros() as usize);
        }
    }
    None
}

/// A k-bucket routing table.
#[derive(Debug)]
pub struct RoutingTable {
    local_id: Blake3Hash,
    k: usize,
    buckets: RwLock<Vec<Vec<PeerAddr>>>,
}

impl RoutingTable {
    /// Create an empty table around `local_id`.
    pub fn new(local_id: Blake3Hash, k: usize) -> Self {
        Self {
            local_id,
            k: k.max(1),
            buckets: RwLock::new(vec![Vec::new(); ID_BITS]),
        }
    }

    /// The local node id.
    pub fn local_id(&self) -> &Blake3Hash {
        &self.local_id
    }

    /// Bucket size.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Add or refresh a peer.
    ///
    /// A known peer moves to the most-recently-seen end of its bucket. A new
    /// peer is dropped when its bucket is full.
    pub fn add(&self, peer: PeerAddr) -> bool {
        let Some(index) = bucket_index(&self.local_id, &peer.node_id()) else {
            return false;
        };
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        let bucket = &mut buckets[index];

        if let Some(pos) = bucket.iter().position(|p| p == &peer) {
            let existing = bucket.remove(pos);
            bucket.push(existing);
            return true;
        }
        if bucket.len() < self.k {
            bucket.push(peer);
            return true;
        }
        false
    }

    /// Remove a peer.
    pub fn remove(&self, peer: &PeerAddr) -> bool {
        let Some(index) = bucket_index(&self.local_id, &peer.node_id()) else {
            return false;
        };
        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        let bucket = &mut buckets[index];
        match bucket.iter().position(|p| p == peer) {
            Some(pos) => {
                bucket.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Whether a peer is in the table.
    pub fn contains(&self, peer: &PeerAddr) -> bool {
        let Some(index) = bucket_index(&self.local_id, &peer.node_id()) else {
            return false;
        };
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets[index].contains(peer)
    }

    /// Up to `count` known peers closest to `target`, closest first.
    pub fn closest(&self, target: &Blake3Hash, count: usize) -> Vec<PeerAddr> {
        let mut peers: Vec<([u8; 32], PeerAddr)> = self
            .peers()
            .into_iter()
            .map(|p| (distance(&p.node_id(), target), p))
            .collect();
        peers.sort_by(|a, b| a.0.cmp(&b.0));
        peers.truncate(count);
        peers.into_iter().map(|(_, p)| p).collect()
    }

    /// Every known peer.
    pub fn peers(&self) -> Vec<PeerAddr> {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets.iter().flatten().cloned().collect()
    }

    /// Number of known peers.
    pub fn len(&self) -> usize {
        let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
        buckets.iter().map(Vec::len).sum()
    }

    /// Whether no peer is known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
