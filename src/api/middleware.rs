use std::time::Duration;

use actix_web::{
    Error,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
};
use tracing::{debug, warn};

/**
 * Requests slower than this are logged as warnings. Chart rendering is the usual cause.
 */
const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(2);

/**
 * Middleware for timing requests.
 */
pub async fn timing_middleware(request: ServiceRequest, next: Next<impl MessageBody>) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let start_time = std::time::Instant::now();
    let path = request.path().to_owned();
    let method = request.method().to_owned();
    let response = next.call(request).await;
    let status = match &response {
        Ok(service_response) => service_response.status().as_u16(),
        Err(err) => err.as_response_error().status_code().as_u16(),
    };
    let duration = start_time.elapsed();
    let elapsed_ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
    if duration > SLOW_REQUEST_THRESHOLD {
        warn!(target: "performance", %method, %path, status, elapsed_ms, "Slow request");
    } else {
        debug!(target: "performance", %method, %path, status, elapsed_ms, "Request processed");
    }
    response
}
