//! Request logging middleware.

use crate::error::HandlerResult;
use crate::http::{RequestContext, ResponseContext};

/// Log `<METHOD> <URI>` for every request. Never finishes the response.
pub async fn log_request(req: RequestContext, _res: ResponseContext) -> HandlerResult {
    tracing::info!(
        request_id = %req.id(),
        user_agent = req.header("user-agent").unwrap_or("-"),
        "{} {}",
        req.method(),
        req.uri()
    );
    Ok(())
}
