//! Groups backed by network subsystems; present only on the online surface.

use std::sync::Arc;

use crate::subsystems::{Exchange, ExchangeStat, Transport};
use crate::types::{Cid, PeerId};

pub struct SwarmApi {
    transport: Arc<dyn Transport>,
    peer_id: PeerId,
}

impl SwarmApi {
    pub(crate) fn new(transport: Arc<dyn Transport>, peer_id: PeerId) -> Self {
        Self { transport, peer_id }
    }

    pub fn peers(&self) -> Vec<PeerId> {
        self.transport.peers()
    }

    pub fn id(&self) -> &PeerId {
        &self.peer_id
    }
}

pub struct BitswapApi {
    exchange: Arc<dyn Exchange>,
}

impl BitswapApi {
    pub(crate) fn new(exchange: Arc<dyn Exchange>) -> Self {
        Self { exchange }
    }

    /// Blocks requested but not yet received.
    pub fn wantlist(&self) -> Vec<Cid> {
        self.exchange.wantlist()
    }

    pub fn stat(&self) -> ExchangeStat {
        self.exchange.stat()
    }
}
