/// Security response headers
///
/// Every response, errors and the notification stream included, carries:
///
/// - `X-Content-Type-Options: nosniff`
/// - `X-Frame-Options: DENY`
/// - `X-XSS-Protection: 1; mode=block`
/// - `Referrer-Policy: strict-origin-when-cross-origin`
/// - `Permissions-Policy` denying device APIs
/// - `Content-Security-Policy: default-src 'none'; frame-ancestors 'none'`
///   (the API serves JSON and event streams only)
/// - `Strict-Transport-Security` when running with `PRODUCTION=true`
///
/// # Example
///
/// ```
/// use axum::{middleware::map_response_with_state, Router};
/// use tasqar_api::middleware::security::{add_security_headers, SecurityHeaders};
///
/// let app: Router = Router::new()
///     .layer(map_response_with_state(SecurityHeaders::new(true), add_security_headers));
/// ```

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::Response,
};

/// Header policy; HSTS only makes sense behind TLS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityHeaders {
    pub hsts: bool,
}

impl SecurityHeaders {
    pub fn new(production: bool) -> Self {
        Self { hsts: production }
    }

    /// Writes the headers, replacing any a handler set
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
        headers.insert(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        );
        headers.insert(
            HeaderName::from_static("permissions-policy"),
            HeaderValue::from_static("geolocation=(), microphone=(), camera=(), payment=(), usb=()"),
        );
        headers.insert(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        );

        if self.hsts {
            headers.insert(
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static("max-age=31536000; includeSubDomains; preload"),
            );
        }
    }
}

/// Response mapper for `axum::middleware::map_response_with_state`
pub async fn add_security_headers(
    State(policy): State<SecurityHeaders>,
    mut response: Response,
) -> Response {
    policy.apply(response.headers_mut());
    response
}
