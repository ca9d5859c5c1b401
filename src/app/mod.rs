//! Application layer containing business logic and shared state.

pub mod agent_service;
pub mod service;
pub mod signature;
pub mod state;
pub mod webhook_service;

pub use agent_service::AgentService;
pub use service::AppService;
pub use signature::{canonical_json, sign_payload, verify_signature};
pub use state::AppState;
pub use webhook_service::WebhookService;
