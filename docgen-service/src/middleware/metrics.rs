use crate::services::metrics::{ERRORS_TOTAL, HTTP_REQUESTS_TOTAL};
use axum::{extract::Request, middleware::Next, response::Response};
use service_core::error::ErrorCode;

pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&path, &status])
        .inc();

    // AppError responses carry their reason code as an extension.
    if let Some(ErrorCode(code)) = response.extensions().get::<ErrorCode>().copied() {
        ERRORS_TOTAL.with_label_values(&[code]).inc();
    }

    response
}
