//! Client details recorded with an invite code usage.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use domain::models::ClientInfo;

/// User agent and client IP of the request. Never rejects.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta(pub ClientInfo);

/// First address in an `X-Forwarded-For` value.
fn forwarded_for(value: &str) -> Option<String> {
    value
        .split(',')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = TypedHeader::<UserAgent>::from_request_parts(parts, state)
            .await
            .ok()
            .map(|TypedHeader(agent)| agent.as_str().to_string());

        let ip_address = parts
            .headers
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(forwarded_for)
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            });

        Ok(ClientMeta(ClientInfo {
            user_agent,
            ip_address,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> ClientInfo {
        let (mut parts, _) = request.into_parts();
        let ClientMeta(info) = ClientMeta::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        info
    }

    #[test]
    fn test_forwarded_for() {
        assert_eq!(
            forwarded_for("203.0.113.7, 10.0.0.1").as_deref(),
            Some("203.0.113.7")
        );
        assert_eq!(forwarded_for(" , "), None);
    }

    #[tokio::test]
    async fn test_headers_are_captured() {
        let info = extract(
            Request::builder()
                .header("User-Agent", "Mozilla/5.0 (X11)")
                .header("X-Forwarded-For", "198.51.100.4")
                .body(())
                .unwrap(),
        )
        .await;

        assert_eq!(info.user_agent.as_deref(), Some("Mozilla/5.0 (X11)"));
        assert_eq!(info.ip_address.as_deref(), Some("198.51.100.4"));
    }

    #[tokio::test]
    async fn test_connect_info_fallback() {
        let mut request = Request::builder().body(()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let info = extract(request).await;
        assert_eq!(info.user_agent, None);
        assert_eq!(info.ip_address.as_deref(), Some("127.0.0.1"));
    }
}
