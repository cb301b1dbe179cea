//! Typed request helpers over a [`Transport`].

use std::sync::Arc;

use mutable_dht_core::{Blake3Hash, PeerAddr, PublicKey, Record};
use mutable_dht_store::PutOutcome;

use crate::error::{Result, RpcError};
use crate::messages::{
    decode, encode, Request, RequestEnvelope, Response, ResponseEnvelope, PROTOCOL_VERSION,
};
use crate::transport::Transport;

/// Sends requests on behalf of one local node.
#[derive(Clone)]
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    local: PeerAddr,
    ephemeral: bool,
}

impl RpcClient {
    /// Create a client advertising `local` as the reply address.
    pub fn new(transport: Arc<dyn Transport>, local: PeerAddr, ephemeral: bool) -> Self {
        Self {
            transport,
            local,
            ephemeral,
        }
    }

    /// The advertised local address.
    pub fn local_addr(&self) -> &PeerAddr {
        &self.local
    }

    /// Send one request and decode the reply. Error responses become errors.
    pub async fn request(&self, peer: &PeerAddr, request: Request) -> Result<Response> {
        let envelope = RequestEnvelope::new(self.local.clone(), self.ephemeral, request);
        let reply = self.transport.request(peer, encode(&envelope)?).await?;
        let reply: ResponseEnvelope = decode(&reply)?;

        if reply.version != PROTOCOL_VERSION {
            return Err(RpcError::VersionMismatch {
                local: PROTOCOL_VERSION,
                peer: reply.version,
            });
        }
        reply
            .response
            .validate_limits()
            .map_err(|e| RpcError::InvalidMessage(e.to_string()))?;

        match reply.response {
            Response::Error { code, message } => Err(RpcError::PeerError { code, message }),
            response => Ok(response),
        }
    }

    /// Liveness probe.
    pub async fn ping(&self, peer: &PeerAddr) -> Result<()> {
        match self.request(peer, Request::Ping).await? {
            Response::Pong => Ok(()),
            _ => Err(RpcError::UnexpectedResponse("ping")),
        }
    }

    /// Ask `peer` for the nodes it knows closest to `target`.
    pub async fn find_node(&self, peer: &PeerAddr, target: Blake3Hash) -> Result<Vec<PeerAddr>> {
        match self.request(peer, Request::FindNode { target }).await? {
            Response::Nodes { closer } => Ok(closer),
            _ => Err(RpcError::UnexpectedResponse("find_node")),
        }
    }

    /// Offer a record to `peer`.
    pub async fn mutable_put(&self, peer: &PeerAddr, record: Record) -> Result<PutOutcome> {
        match self.request(peer, Request::MutablePut { record }).await? {
            Response::Stored { outcome } => Ok(outcome),
            _ => Err(RpcError::UnexpectedResponse("mutable_put")),
        }
    }

    /// Ask `peer` for its record of `public_key` with sequence at least `seq`.
    pub async fn mutable_get(
        &self,
        peer: &PeerAddr,
        public_key: PublicKey,
        seq: u64,
    ) -> Result<Option<Record>> {
        match self
            .request(peer, Request::MutableGet { public_key, seq })
            .await?
        {
            Response::Value { record } => Ok(record),
            _ => Err(RpcError::UnexpectedResponse("mutable_get")),
        }
    }
}
