//! Identity of the browser that consumed an invite code.
//!
//! The remembered invite code belongs to one client. The id travels in the
//! `sri_client` cookie set by the consume endpoint; non-browser clients may
//! send it in `X-Client-ID` instead.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap, HeaderValue},
};
use uuid::Uuid;

pub const CLIENT_COOKIE: &str = "sri_client";
/// Lowercase so it can be inserted as a static header name.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

const CLIENT_COOKIE_PATH: &str = "/api/v1/invite-codes";
const CLIENT_COOKIE_MAX_AGE_SECS: i64 = 365 * 24 * 60 * 60;

/// Client id of the request; `None` when absent or not a UUID. Never rejects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientId(pub Option<Uuid>);

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}

fn client_id_from(headers: &HeaderMap) -> Option<Uuid> {
    cookie_value(headers, CLIENT_COOKIE)
        .or_else(|| headers.get(CLIENT_ID_HEADER)?.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientId(client_id_from(&parts.headers)))
    }
}

/// `Set-Cookie` value handing `id` to the browser.
pub fn client_cookie(id: Uuid, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Strict",
        CLIENT_COOKIE, id, CLIENT_COOKIE_PATH, CLIENT_COOKIE_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Adds the cookie and the `X-Client-ID` header for a newly issued id.
pub fn attach_client_id(headers: &mut HeaderMap, id: Uuid, secure: bool) {
    if let Ok(value) = HeaderValue::from_str(&client_cookie(id, secure)) {
        headers.append(header::SET_COOKIE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        headers.insert(CLIENT_ID_HEADER, value);
    }
}
