//! Tests for the built-in middleware.

#[cfg(test)]
mod middleware_tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use tokio::sync::oneshot;
    use tokio_util::sync::CancellationToken;

    use crate::context::{handler_fn, Context, HandlerFn, ResponseWriter};
    use crate::middleware::{cost, panic_message, recovery, timeout};
    use crate::parser::{HttpRequest, HttpVersion, Method};
    use crate::server::{Error, StatusCode};

    fn context(handlers: Vec<HandlerFn>, writer: &ResponseWriter, cancel: CancellationToken) -> Context {
        let request = HttpRequest::new(Method::GET, "/subject/1", HttpVersion::Http11, HashMap::new());
        Context::new(request, handlers.into(), HashMap::new(), writer.clone(), cancel)
    }

    fn ok_handler() -> HandlerFn {
        handler_fn(|ctx| Box::pin(async move {
            ctx.json(StatusCode::Ok, "ok, SubjectGetController")?;
            Ok(())
        }))
    }

    fn explode() -> Result<(), Error> {
        panic!("subject store exploded")
    }

    fn panicking_handler() -> HandlerFn {
        handler_fn(|_ctx| Box::pin(async move { explode() }))
    }

    fn failing_handler() -> HandlerFn {
        handler_fn(|_ctx| Box::pin(async move {
            Err(Error::InternalError("subject missing".to_string()))
        }))
    }

    #[tokio::test]
    async fn test_timeout_lets_fast_chain_answer() {
        let writer = ResponseWriter::new();
        let mut ctx = context(
            vec![timeout(Duration::from_secs(1)), ok_handler()],
            &writer,
            CancellationToken::new(),
        );

        ctx.next().await.unwrap();

        assert!(!ctx.has_timed_out());
        let response = writer.finish().unwrap();
        assert_eq!(response.status, StatusCode::Ok);
        assert_eq!(response.body_str(), "\"ok, SubjectGetController\"");
    }

    #[tokio::test]
    async fn test_timeout_turns_panic_into_one_500() {
        let writer = ResponseWriter::new();
        let mut ctx = context(
            vec![timeout(Duration::from_secs(1)), panicking_handler()],
            &writer,
            CancellationToken::new(),
        );

        ctx.next().await.unwrap();

        let response = writer.finish().unwrap();
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(response.body_str(), "\"inner error\"");
        assert!(!ctx.has_timed_out());
    }

    #[tokio::test]
    async fn test_timeout_answers_and_drops_late_write() {
        let writer = ResponseWriter::new();
        let (late_tx, late_rx) = oneshot::channel();
        let late_tx = Arc::new(Mutex::new(Some(late_tx)));

        // Ignores cancellation and writes long after its budget.
        let slow = handler_fn(move |ctx| {
            let late_tx = Arc::clone(&late_tx);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                let written = ctx.text(StatusCode::Ok, "late subject list");
                if let Some(tx) = late_tx.lock().take() {
                    let _ = tx.send((written, ctx.has_timed_out()));
                }
                Ok(())
            })
        });
        let mut ctx = context(
            vec![timeout(Duration::from_millis(20)), slow],
            &writer,
            CancellationToken::new(),
        );

        ctx.next().await.unwrap();
        assert!(ctx.has_timed_out());
        assert!(writer.has_responded());

        let (written, saw_timeout) = late_rx.await.unwrap();
        assert!(!written, "late write must be dropped");
        assert!(saw_timeout);

        let response = writer.finish().unwrap();
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(response.body_str(), "\"timed out\"");
    }

    #[tokio::test]
    async fn test_abandoned_chain_observes_cancellation() {
        let writer = ResponseWriter::new();
        let (done_tx, done_rx) = oneshot::channel();
        let done_tx = Arc::new(Mutex::new(Some(done_tx)));

        let cooperative = handler_fn(move |ctx| {
            let done_tx = Arc::clone(&done_tx);
            Box::pin(async move {
                let has_deadline = ctx.deadline().is_some();
                let cancelled = tokio::select! {
                    () = ctx.done() => true,
                    () = tokio::time::sleep(Duration::from_secs(10)) => false,
                };
                if let Some(tx) = done_tx.lock().take() {
                    let _ = tx.send((cancelled, has_deadline));
                }
                Ok(())
            })
        });
        let mut ctx = context(
            vec![timeout(Duration::from_millis(20)), cooperative],
            &writer,
            CancellationToken::new(),
        );

        ctx.next().await.unwrap();

        let (cancelled, has_deadline) = tokio::time::timeout(Duration::from_secs(2), done_rx)
            .await
            .expect("chain should stop once cancelled")
            .unwrap();
        assert!(cancelled);
        assert!(has_deadline);
        assert_eq!(writer.finish().unwrap().body_str(), "\"timed out\"");
    }

    #[tokio::test]
    async fn test_nested_guard_keeps_earlier_deadline() {
        let writer = ResponseWriter::new();
        let remaining: Arc<Mutex<Option<Duration>>> = Arc::default();
        let remaining_clone = Arc::clone(&remaining);
        let record = handler_fn(move |ctx| {
            let remaining = Arc::clone(&remaining_clone);
            Box::pin(async move {
                *remaining.lock() = ctx
                    .deadline()
                    .map(|deadline| deadline.saturating_duration_since(tokio::time::Instant::now()));
                ctx.text(StatusCode::Ok, "recorded");
                Ok(())
            })
        });
        let mut ctx = context(
            vec![timeout(Duration::from_millis(500)), timeout(Duration::from_secs(10)), record],
            &writer,
            CancellationToken::new(),
        );

        ctx.next().await.unwrap();

        let remaining = (*remaining.lock()).expect("handler should see a deadline");
        assert!(remaining <= Duration::from_millis(500), "got {remaining:?}");
        assert_eq!(writer.finish().unwrap().status, StatusCode::Ok);
    }

    #[tokio::test]
    async fn test_timeout_fires_on_base_cancellation() {
        let writer = ResponseWriter::new();
        let base = CancellationToken::new();
        let never = handler_fn(|ctx| Box::pin(async move {
            ctx.done().await;
            Ok(())
        }));
        let mut ctx = context(vec![timeout(Duration::from_secs(30)), never], &writer, base.clone());

        base.cancel();
        ctx.next().await.unwrap();

        assert!(ctx.has_timed_out());
        assert_eq!(writer.finish().unwrap().body_str(), "\"timed out\"");
    }

    #[tokio::test]
    async fn test_timeout_passes_handler_error_up() {
        let writer = ResponseWriter::new();
        let mut ctx = context(
            vec![timeout(Duration::from_secs(1)), failing_handler()],
            &writer,
            CancellationToken::new(),
        );

        let result = ctx.next().await;

        assert!(matches!(result, Err(Error::InternalError(_))));
        assert!(!writer.has_responded());
    }

    #[tokio::test]
    async fn test_outer_middleware_resumes_after_guard() {
        let writer = ResponseWriter::new();
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::default();
        let order_outer = Arc::clone(&order);
        let outer = handler_fn(move |ctx| {
            let order = Arc::clone(&order_outer);
            Box::pin(async move {
                order.lock().push("outer:in");
                ctx.next().await?;
                order.lock().push("outer:out");
                Ok(())
            })
        });
        let order_inner = Arc::clone(&order);
        let inner = handler_fn(move |ctx| {
            let order = Arc::clone(&order_inner);
            Box::pin(async move {
                order.lock().push("handler");
                ctx.text(StatusCode::Ok, "ok");
                Ok(())
            })
        });
        let mut ctx = context(
            vec![outer, timeout(Duration::from_secs(1)), inner],
            &writer,
            CancellationToken::new(),
        );

        ctx.next().await.unwrap();

        assert_eq!(*order.lock(), vec!["outer:in", "handler", "outer:out"]);
    }

    #[tokio::test]
    async fn test_recovery_catches_panic() {
        let writer = ResponseWriter::new();
        let mut ctx = context(
            vec![recovery(), panicking_handler()],
            &writer,
            CancellationToken::new(),
        );

        ctx.next().await.unwrap();

        let response = writer.finish().unwrap();
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(response.body_str(), "\"subject store exploded\"");
    }

    #[tokio::test]
    async fn test_recovery_keeps_response_written_before_panic() {
        let writer = ResponseWriter::new();
        let write_then_panic = handler_fn(|ctx| Box::pin(async move {
            ctx.text(StatusCode::Created, "created");
            explode()
        }));
        let mut ctx = context(vec![recovery(), write_then_panic], &writer, CancellationToken::new());

        ctx.next().await.unwrap();

        assert_eq!(writer.finish().unwrap().status, StatusCode::Created);
    }

    #[tokio::test]
    async fn test_recovery_and_cost_pass_errors_through() {
        let writer = ResponseWriter::new();
        let mut ctx = context(
            vec![recovery(), cost(), failing_handler()],
            &writer,
            CancellationToken::new(),
        );

        let result = ctx.next().await;

        assert!(matches!(result, Err(Error::InternalError(ref msg)) if msg == "subject missing"));
    }

    #[tokio::test]
    async fn test_cost_runs_the_rest_of_the_chain() {
        let writer = ResponseWriter::new();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        let mark = handler_fn(move |_ctx| {
            let ran = Arc::clone(&ran_clone);
            Box::pin(async move {
                ran.store(true, Ordering::SeqCst);
                Ok(())
            })
        });
        let mut ctx = context(vec![cost(), mark], &writer, CancellationToken::new());

        ctx.next().await.unwrap();

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_panic_message_variants() {
        let literal: Box<dyn std::any::Any + Send> = Box::new("static message");
        let owned: Box<dyn std::any::Any + Send> = Box::new(String::from("owned message"));
        let other: Box<dyn std::any::Any + Send> = Box::new(42_u8);

        assert_eq!(panic_message(literal.as_ref()), "static message");
        assert_eq!(panic_message(owned.as_ref()), "owned message");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
