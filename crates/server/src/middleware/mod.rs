pub mod request_context;
pub mod validated_json;

pub use request_context::{RequestContext, request_context_middleware};
pub use validated_json::ValidatedJson;
