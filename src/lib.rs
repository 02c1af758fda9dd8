pub mod config;
pub mod dashboard;
pub mod error;
pub mod http_client;
pub mod http_fetch;
pub mod ingest;
pub mod logging;
pub mod reconcile;
pub mod records;
pub mod sources;
pub mod store;
pub mod tvi;
