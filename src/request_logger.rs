use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

/// Start time of the request, kept in Rocket's request-local cache.
struct RequestStart(Instant);

/// Fairing that logs one line per HTTP request with its latency.
///
/// Only the path is logged; query strings and headers may carry credentials.
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(|| RequestStart(Instant::now()));
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let elapsed = request
            .local_cache(|| RequestStart(Instant::now()))
            .0
            .elapsed();
        let status = response.status();

        let line = format!(
            "{} {} -> {} ({:.2}ms)",
            request.method(),
            request.uri().path(),
            status.code,
            elapsed.as_secs_f64() * 1000.0
        );
        if status.code >= 500 {
            log::warn!("{}", line);
        } else {
            log::info!("{}", line);
        }
    }
}
