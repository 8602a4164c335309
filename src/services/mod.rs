pub mod query_orchestrator;

pub use query_orchestrator::{QueryOrchestrator, QuerySubscriber};
