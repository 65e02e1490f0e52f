pub mod cache;
pub mod convert;
pub mod fetch;
pub mod fingerprint;
pub mod kv;
pub mod ledger;
pub mod pipeline;
pub mod queue;
