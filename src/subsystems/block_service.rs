//! Block service: repository first, exchange when attached.

use std::sync::{Arc, RwLock};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::error::{NodeError, NodeResult};
use crate::subsystems::{BlockService, Exchange, Repository};
use crate::types::{Block, Cid};

pub struct RepoBlockService {
    repo: Arc<dyn Repository>,
    exchange: RwLock<Option<Arc<dyn Exchange>>>,
}

impl RepoBlockService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            repo,
            exchange: RwLock::new(None),
        }
    }

    fn exchange(&self) -> Option<Arc<dyn Exchange>> {
        match self.exchange.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace_exchange(&self, exchange: Option<Arc<dyn Exchange>>) {
        match self.exchange.write() {
            Ok(mut guard) => *guard = exchange,
            Err(poisoned) => *poisoned.into_inner() = exchange,
        }
    }
}

impl BlockService for RepoBlockService {
    fn set_exchange(&self, exchange: Arc<dyn Exchange>) {
        self.replace_exchange(Some(exchange));
    }

    fn unset_exchange(&self) {
        self.replace_exchange(None);
    }

    fn has_exchange(&self) -> bool {
        self.exchange().is_some()
    }

    fn get(&self, cid: Cid) -> BoxFuture<'_, NodeResult<Block>> {
        async move {
            if let Some(block) = self.repo.get_block(&cid)? {
                return Ok(block);
            }

            // Guard released before awaiting the network.
            let Some(exchange) = self.exchange() else {
                return Err(NodeError::BlockNotFound(cid));
            };

            match exchange.fetch(cid).await? {
                Some(block) => {
                    self.repo.put_block(block.clone())?;
                    tracing::debug!(cid = %cid, "Block fetched from exchange");
                    Ok(block)
                }
                None => Err(NodeError::BlockNotFound(cid)),
            }
        }
        .boxed()
    }

    fn put(&self, block: Block) -> NodeResult<()> {
        self.repo.put_block(block)
    }

    fn delete(&self, cid: &Cid) -> NodeResult<()> {
        if self.repo.delete_block(cid)? {
            Ok(())
        } else {
            Err(NodeError::BlockNotFound(*cid))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::{MemoryExchange, MemoryRepo};

    #[tokio::test]
    async fn test_exchange_only_consulted_while_attached() {
        let repo: Arc<dyn Repository> = Arc::new(MemoryRepo::new());
        let service = RepoBlockService::new(repo.clone());
        let exchange = Arc::new(MemoryExchange::new());
        let remote = Block::new(b"remote".to_vec());
        exchange.provide(remote.clone());
        exchange.start();

        assert_eq!(service.get(remote.cid).await, Err(NodeError::BlockNotFound(remote.cid)));

        service.set_exchange(exchange.clone());
        assert!(service.has_exchange());
        assert_eq!(service.get(remote.cid).await.unwrap(), remote);

        // Now cached locally.
        service.unset_exchange();
        assert_eq!(service.get(remote.cid).await.unwrap(), remote);
        assert!(repo.get_block(&remote.cid).unwrap().is_some());
    }

    #[test]
    fn test_delete_missing_block() {
        let service = RepoBlockService::new(Arc::new(MemoryRepo::new()));
        let cid = Cid::of(b"nothing");
        assert_eq!(service.delete(&cid), Err(NodeError::BlockNotFound(cid)));
    }
}
