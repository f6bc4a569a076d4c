//! Authorization gate
//!
//! Request interceptor enforcing the role/path allow-list before any handler
//! runs. Token verification happens upstream; by the time the gate executes,
//! the verified claims (if any) are carried as a typed request extension.

use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

/// Issuer claim identifying the restricted role
pub const RESTRICTED_ISSUER: &str = "user";

/// The single path the restricted role may reach
pub const RESTRICTED_ALLOWED_PATH: &str = "/volumes";

/// Verified identity claims for one request.
///
/// Inserted by the upstream token-verification layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub issuer: String,
}

/// Pure policy check: may a request with these claims reach this path?
///
/// Any path other than the allow-listed one is denied to the restricted role.
/// Requests without claims pass through: the verification layer is simply not
/// installed in that deployment.
pub fn is_permitted(claims: Option<&Claims>, path: &str) -> bool {
    match claims {
        Some(claims) if claims.issuer == RESTRICTED_ISSUER => path == RESTRICTED_ALLOWED_PATH,
        _ => true,
    }
}

/// Middleware enforcing [`is_permitted`]; rejected requests never reach the
/// handler.
pub async fn authorize(request: Request, next: Next) -> Response {
    let claims = request.extensions().get::<Claims>();

    if !is_permitted(claims, request.uri().path()) {
        warn!(
            "Rejected {} {} for restricted issuer",
            request.method(),
            request.uri().path()
        );
        return (StatusCode::UNAUTHORIZED, "administrator access required").into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Extension, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    #[test]
    fn test_policy_is_pure() {
        let admin = Claims { issuer: "admin".into() };
        let user = Claims { issuer: RESTRICTED_ISSUER.into() };

        assert!(is_permitted(None, "/clusters"));
        assert!(is_permitted(Some(&admin), "/clusters"));
        assert!(is_permitted(Some(&user), "/volumes"));
        assert!(!is_permitted(Some(&user), "/clusters"));
        assert!(!is_permitted(Some(&user), "/volumes/ab12"));
        assert!(!is_permitted(Some(&user), "/queue/deadbeef"));
    }

    fn gated_router(counter: Arc<AtomicUsize>, claims: Option<Claims>) -> Router {
        let handler_counter = counter.clone();
        let mut router = Router::new()
            .route(
                "/clusters",
                get(move || {
                    let c = handler_counter.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        "ok"
                    }
                }),
            )
            .route("/volumes", get(|| async { "ok" }))
            .layer(middleware::from_fn(authorize));
        if let Some(claims) = claims {
            router = router.layer(Extension(claims));
        }
        router
    }

    #[tokio::test]
    async fn test_restricted_issuer_rejected_handler_not_invoked() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = gated_router(
            counter.clone(),
            Some(Claims { issuer: RESTRICTED_ISSUER.into() }),
        );

        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/clusters")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restricted_issuer_allowed_path() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = gated_router(
            counter,
            Some(Claims { issuer: RESTRICTED_ISSUER.into() }),
        );

        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/volumes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_issuer_passes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = gated_router(counter.clone(), Some(Claims { issuer: "admin".into() }));

        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/clusters")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_claims_passes() {
        let counter = Arc::new(AtomicUsize::new(0));
        let router = gated_router(counter.clone(), None);

        let response = router
            .oneshot(
                HttpRequest::builder()
                    .uri("/clusters")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
