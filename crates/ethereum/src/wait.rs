//! Waiting for transactions to be mined
//!
//! Polls a [`ChainBackend`] for a receipt until it shows up or the caller's
//! cancellation future completes.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use ethers::providers::{JsonRpcClient, Middleware, Provider};
use ethers::types::{Address, Bytes, TransactionReceipt, H256};
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use abibind_core::{Error, Result};

/// The chain queries needed to follow a transaction
#[async_trait]
pub trait ChainBackend: Send + Sync {
    /// Receipt of a transaction, `None` while it is pending
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>>;

    /// Code deployed at an address
    async fn code_at(&self, address: Address) -> Result<Bytes>;
}

#[async_trait]
impl<P: JsonRpcClient + 'static> ChainBackend for Provider<P> {
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>> {
        self.get_transaction_receipt(hash)
            .await
            .map_err(|e| Error::chain(format!("Failed to fetch receipt of {:?}: {}", hash, e)))
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        self.get_code(address, None)
            .await
            .map_err(|e| Error::chain(format!("Failed to fetch code at {:?}: {}", address, e)))
    }
}

/// Poll for the receipt of `hash` every `interval`, starting immediately.
///
/// Query errors are logged and polling continues. Completing `cancel` ends the
/// wait with [`Error::Cancelled`], including while a query is in flight.
pub async fn wait_mined<B, C>(
    backend: &B,
    hash: H256,
    interval: Duration,
    cancel: C,
) -> Result<TransactionReceipt>
where
    B: ChainBackend + ?Sized,
    C: Future<Output = ()>,
{
    tokio::pin!(cancel);

    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = &mut cancel => return Err(Error::Cancelled(format!("{:?}", hash))),
            _ = ticker.tick() => {}
        }

        let receipt = tokio::select! {
            biased;
            _ = &mut cancel => return Err(Error::Cancelled(format!("{:?}", hash))),
            receipt = backend.transaction_receipt(hash) => receipt,
        };

        match receipt {
            Ok(Some(receipt)) => {
                debug!(tx = ?hash, block = ?receipt.block_number, "transaction mined");
                return Ok(receipt);
            }
            Ok(None) => debug!(tx = ?hash, "transaction not yet mined"),
            Err(e) => warn!(tx = ?hash, error = %e, "failed to query receipt, retrying"),
        }
    }
}

/// Wait for a contract creation and check that code landed at the new address
pub async fn wait_deployed<B, C>(
    backend: &B,
    hash: H256,
    interval: Duration,
    cancel: C,
) -> Result<Address>
where
    B: ChainBackend + ?Sized,
    C: Future<Output = ()>,
{
    let receipt = wait_mined(backend, hash, interval, cancel).await?;
    let address = receipt
        .contract_address
        .ok_or_else(|| Error::NotContractCreation(format!("{:?}", hash)))?;

    let code = backend.code_at(address).await?;
    if code.is_empty() {
        return Err(Error::NoCodeAfterDeploy(format!("{:?}", address)));
    }

    debug!(tx = ?hash, address = ?address, "contract deployed");
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, timeout, Instant};

    mock! {
        pub Backend {}

        #[async_trait]
        impl ChainBackend for Backend {
            async fn transaction_receipt(&self, hash: H256) -> Result<Option<TransactionReceipt>>;
            async fn code_at(&self, address: Address) -> Result<Bytes>;
        }
    }

    fn receipt(contract: Option<Address>) -> TransactionReceipt {
        TransactionReceipt {
            contract_address: contract,
            block_number: Some(7u64.into()),
            ..Default::default()
        }
    }

    /// Backend whose receipt appears on the `mined_at`-th query, erroring on the ones in `failing`
    fn backend_mined_at(mined_at: usize, failing: &'static [usize], contract: Option<Address>) -> (MockBackend, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut backend = MockBackend::new();
        backend.expect_transaction_receipt().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if failing.contains(&n) {
                Err(Error::chain("connection reset"))
            } else if n >= mined_at {
                Ok(Some(receipt(contract)))
            } else {
                Ok(None)
            }
        });
        (backend, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_mined_polls_until_receipt() {
        let (backend, calls) = backend_mined_at(3, &[], None);

        let receipt = wait_mined(&backend, H256::zero(), Duration::from_secs(1), std::future::pending())
            .await
            .unwrap();

        assert_eq!(receipt.block_number, Some(7u64.into()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_mined_survives_backend_errors() {
        let (backend, calls) = backend_mined_at(4, &[1, 2], None);

        let result = wait_mined(&backend, H256::zero(), Duration::from_millis(100), std::future::pending()).await;

        assert!(result.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_wait_mined_cancellation() {
        let mut backend = MockBackend::new();
        backend.expect_transaction_receipt().returning(|_| Ok(None));

        let started = Instant::now();
        let result = timeout(
            Duration::from_secs(2),
            wait_mined(&backend, H256::repeat_byte(1), Duration::from_millis(20), sleep(Duration::from_millis(50))),
        )
        .await
        .expect("cancellation must end the wait");

        assert!(matches!(result, Err(Error::Cancelled(_))));
        assert!(result.unwrap_err().is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_between_slow_ticks() {
        let mut backend = MockBackend::new();
        backend.expect_transaction_receipt().times(1).returning(|_| Ok(None));

        let started = Instant::now();
        let result = wait_mined(&backend, H256::zero(), Duration::from_secs(60), sleep(Duration::from_millis(50))).await;

        assert!(matches!(result, Err(Error::Cancelled(_))));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_deployed() {
        let address = Address::repeat_byte(0xaa);
        let (mut backend, _) = backend_mined_at(1, &[], Some(address));
        backend
            .expect_code_at()
            .withf(move |a| *a == address)
            .returning(|_| Ok(Bytes::from(vec![0x60, 0x80])));

        let deployed = wait_deployed(&backend, H256::zero(), Duration::from_secs(1), std::future::pending())
            .await
            .unwrap();
        assert_eq!(deployed, address);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_deployed_without_code() {
        let (mut backend, _) = backend_mined_at(1, &[], Some(Address::repeat_byte(0xbb)));
        backend.expect_code_at().returning(|_| Ok(Bytes::new()));

        let err = wait_deployed(&backend, H256::zero(), Duration::from_secs(1), std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoCodeAfterDeploy(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_deployed_not_a_creation() {
        let (backend, _) = backend_mined_at(1, &[], None);

        let err = wait_deployed(&backend, H256::zero(), Duration::from_secs(1), std::future::pending())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotContractCreation(_)));
    }
}
