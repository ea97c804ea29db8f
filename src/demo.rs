//! Reference application served by the `mini-express` binary.

use serde::Serialize;

use crate::app::App;
use crate::config::ServerConfig;
use crate::error::HandlerResult;
use crate::http::middleware::log_request;
use crate::http::{Params, RequestContext, ResponseContext};

#[derive(Debug, Serialize)]
struct Updated<'a> {
    message: &'static str,
    data: &'a Params,
}

async fn index(_req: RequestContext, res: ResponseContext) -> HandlerResult {
    res.send("Welcome to Mini Express!");
    Ok(())
}

async fn create_data(req: RequestContext, res: ResponseContext) -> HandlerResult {
    res.json(req.body())
}

async fn update_data(req: RequestContext, res: ResponseContext) -> HandlerResult {
    res.json(&Updated {
        message: "Data updated",
        data: req.body(),
    })
}

async fn delete_data(_req: RequestContext, res: ResponseContext) -> HandlerResult {
    res.send("Data deleted");
    Ok(())
}

/// Build the reference app: request logging plus the `/` and `/data` routes.
pub fn reference_app(config: ServerConfig) -> App {
    let mut app = App::with_config(config);
    app.use_middleware(log_request)
        .get("/", index)
        .post("/data", create_data)
        .put("/data", update_data)
        .delete("/data", delete_data);
    app
}
