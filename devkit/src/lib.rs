/*!
# kube-icinga devkit - Stubs and helpers for development

Support library for exercising the reconciler without an Icinga server:
- In-memory Icinga client with call recording and failure injection
- Attribute fixtures for managed hosts and services
- Test harness and test logging
*/

pub mod fixtures;
pub mod harness;
pub mod mock_client;

pub use harness::{init_test_logging, TestHarness};
pub use mock_client::{MockCall, MockIcingaClient, MockOp};
