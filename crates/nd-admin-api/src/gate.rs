use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::SESSION_COOKIE;

pub(crate) const LOGIN_PATH: &str = "/login";
pub(crate) const AUTH_API_PREFIX: &str = "/api/auth";
pub(crate) const HOME_PATH: &str = "/";

// Operational endpoints sit outside the auth boundary.
const GATE_EXEMPT: &[&str] = &["/healthz", "/metrics", "/api/openapi.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateAction {
    Allow,
    RedirectToLogin,
    RedirectToHome,
}

/// Classifies a request purely from its path and whether a session cookie is
/// present. The cookie value is never inspected here.
pub(crate) fn evaluate(path: &str, has_session: bool) -> GateAction {
    let is_public = path == LOGIN_PATH || path.starts_with(AUTH_API_PREFIX);

    if !is_public && !has_session {
        return GateAction::RedirectToLogin;
    }

    // Only the login page itself bounces authenticated clients; the rest of
    // the public prefix stays reachable so logout keeps working.
    if path == LOGIN_PATH && has_session {
        return GateAction::RedirectToHome;
    }

    GateAction::Allow
}

pub(crate) async fn session_gate(jar: CookieJar, request: Request, next: Next) -> Response {
    let path = request.uri().path();
    if GATE_EXEMPT.contains(&path) {
        return next.run(request).await;
    }

    let has_session = jar.get(SESSION_COOKIE).is_some();
    match evaluate(path, has_session) {
        GateAction::Allow => next.run(request).await,
        GateAction::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
        GateAction::RedirectToHome => Redirect::to(HOME_PATH).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::routing::get;
    use axum::{middleware, Router};
    use tower::ServiceExt;

    #[test]
    fn evaluate_decision_table() {
        let cases = [
            ("/login", false, GateAction::Allow),
            ("/login", true, GateAction::RedirectToHome),
            ("/posts", false, GateAction::RedirectToLogin),
            ("/posts", true, GateAction::Allow),
            ("/api/auth/logout", true, GateAction::Allow),
            ("/api/auth/logout", false, GateAction::Allow),
            ("/api/auth/login", false, GateAction::Allow),
            ("/", false, GateAction::RedirectToLogin),
            ("/", true, GateAction::Allow),
            ("/api/trending", false, GateAction::RedirectToLogin),
            ("/api/trending", true, GateAction::Allow),
        ];

        for (path, has_session, expected) in cases {
            assert_eq!(
                evaluate(path, has_session),
                expected,
                "path={path} has_session={has_session}"
            );
        }
    }

    fn gated_app() -> Router {
        Router::new()
            .route("/api/posts", get(|| async { StatusCode::OK }))
            .route("/healthz", get(|| async { StatusCode::OK }))
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn(session_gate))
    }

    fn request(path: &str, with_cookie: bool) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if with_cookie {
            builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}=some-admin-id"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn protected_route_without_session_redirects_to_login() {
        let response = gated_app()
            .oneshot(request("/api/posts", false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            LOGIN_PATH
        );
    }

    #[tokio::test]
    async fn protected_route_with_session_passes_through() {
        let response = gated_app()
            .oneshot(request("/api/posts", true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn login_with_session_redirects_home() {
        let response = gated_app().oneshot(request("/login", true)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), HOME_PATH);
    }

    #[tokio::test]
    async fn healthz_bypasses_the_gate() {
        let response = gated_app().oneshot(request("/healthz", false)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cookie_value_is_not_validated() {
        let response = gated_app()
            .oneshot(
                Request::builder()
                    .uri("/api/posts")
                    .header(header::COOKIE, format!("{SESSION_COOKIE}=garbage"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
