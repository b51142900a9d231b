//! A small subject API served on port 8084.
//!
//! Every route goes through panic recovery and cost logging. The login route
//! gets one second, the `/subject` routes 500 ms. `GET /subject/slow/:ms`
//! sleeps for the given time, so a large value shows the timeout answer.
//!
//! Run with `RUST_LOG=info cargo run --example subject_api`.

use std::time::Duration;

use log::info;
use microdispatch_rs::middleware::{cost, recovery, timeout};
use microdispatch_rs::{handler_fn, HandlerFn, HttpServer, Router, Routes, ServerConfig, StatusCode};

/// A handler answering `message` as a JSON string.
fn reply(message: &'static str) -> HandlerFn {
    handler_fn(move |ctx| Box::pin(async move {
        ctx.json(StatusCode::Ok, message)?;
        Ok(())
    }))
}

fn subject_get() -> HandlerFn {
    handler_fn(|ctx| Box::pin(async move {
        let id: i64 = ctx.param_or("id", 0);
        ctx.json(StatusCode::Ok, &format!("ok, SubjectGetController:{id}"))?;
        Ok(())
    }))
}

fn subject_slow() -> HandlerFn {
    handler_fn(|ctx| Box::pin(async move {
        let ms: u64 = ctx.param_or("ms", 0);
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(ms)) => {
                ctx.json(StatusCode::Ok, &format!("slept {ms}ms"))?;
            }
            () = ctx.done() => {
                info!("Gave up sleeping after the deadline");
            }
        }
        Ok(())
    }))
}

fn register_routes(router: &mut Router) -> Result<(), microdispatch_rs::RouteError> {
    router.get("/", vec![timeout(Duration::from_secs(1)), reply("ok, userController 444")])?;

    let mut subject = router.group("/subject");
    subject.use_middleware(vec![timeout(Duration::from_millis(500))]);
    subject.delete("/:id", vec![reply("ok, SubjectDelController")])?;
    subject.get("/:id", vec![subject_get()])?;
    subject.get("/list/all", vec![reply("ok, SubjectListController")])?;
    subject.put("/:id", vec![reply("ok, SubjectUpdateController")])?;
    subject.post("/", vec![reply("ok, subject SubjectAddController")])?;
    subject.get("/slow/:ms", vec![subject_slow()])?;

    let mut info = subject.group("/info");
    info.get("/name", vec![reply("ok, SubjectNameController")])?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut router = Router::new();
    router.use_middleware(vec![recovery(), cost()]);
    register_routes(&mut router)?;

    let config = ServerConfig {
        addr: "127.0.0.1:8084".parse()?,
        shutdown_timeout: Duration::from_secs(5),
        ..ServerConfig::default()
    };

    HttpServer::new(config, router).start().await?;

    Ok(())
}
