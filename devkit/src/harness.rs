/*!
Test harness wiring an [`Icinga`] reconciler to a [`MockIcingaClient`].
*/

use crate::mock_client::{MockIcingaClient, MockOp};
use kube_icinga::Icinga;
use std::sync::Arc;
use std::time::Duration;

pub struct TestHarness {
    pub client: MockIcingaClient,
    pub icinga: Icinga,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_client(MockIcingaClient::new())
    }

    /// Every client call takes `latency` to settle.
    pub fn with_latency(latency: Duration) -> Self {
        Self::with_client(MockIcingaClient::new().with_latency(latency))
    }

    pub fn with_client(client: MockIcingaClient) -> Self {
        let icinga = Icinga::new(Arc::new(client.clone()));
        Self { client, icinga }
    }

    /// Panics with the recorded call log when the count of `op` differs.
    pub fn assert_calls(&self, op: MockOp, expected: usize) {
        let actual = self.client.count(op);
        assert_eq!(
            actual,
            expected,
            "expected {expected} {op:?} calls, got {actual}: {:#?}",
            self.client.calls()
        );
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// fmt subscriber writing through the test capture; safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}
