use axum::http::{header, HeaderMap, HeaderValue};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use cookie::Cookie;
use hmac::{Hmac, Mac};
use shared_types::{ActiveRole, AppError};

use super::jwt::{self, Claims};

type HmacSha256 = Hmac<sha2::Sha256>;

/// Bearer credential.
pub const ACCESS_COOKIE: &str = "designops_access";
/// Signed cache of the resolved role, read by the route guard.
pub const ROLE_COOKIE: &str = "designops_role";

/// Role cookie marker for a session that resolved to no role.
const NO_ROLE_MARKER: &str = "none";

/// What the role cookie on a request says, after verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleCookie {
    /// Absent, expired, forged, or issued for another token.
    Missing,
    /// The session resolved to no role.
    NoRole,
    Role(ActiveRole),
}

fn cookie_secure() -> bool {
    std::env::var("COOKIE_SECURE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
}

fn cookie_domain() -> Option<String> {
    std::env::var("COOKIE_DOMAIN")
        .ok()
        .filter(|d| !d.is_empty())
}

fn role_cookie_secret() -> Result<String, AppError> {
    ["ROLE_COOKIE_SECRET", "JWT_SECRET"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|secret| !secret.is_empty())
        .ok_or_else(|| AppError::internal("No secret configured for role cookie signing"))
}

fn session_cookie(name: &'static str, value: String, max_age: cookie::time::Duration) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, value))
        .http_only(true)
        .same_site(cookie::SameSite::Lax)
        .path("/")
        .max_age(max_age)
        .secure(cookie_secure());

    if let Some(domain) = cookie_domain() {
        cookie = cookie.domain(domain);
    }

    cookie.build()
}

fn to_header(cookie: &Cookie<'_>) -> Result<HeaderValue, AppError> {
    HeaderValue::from_str(&cookie.to_string())
        .map_err(|_| AppError::internal(format!("Invalid Set-Cookie value for {}", cookie.name())))
}

/// MAC over `user_id:jti:expires_at:role`. The token id ties the cookie to
/// the access token it was issued alongside.
fn mac_for(claims: &Claims, expires_at: i64, role: &str) -> Result<HmacSha256, AppError> {
    let secret = role_cookie_secret()?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::internal("Invalid role cookie secret"))?;
    mac.update(format!("{}:{}:{}:", claims.sub, claims.jti.as_deref().unwrap_or(""), expires_at).as_bytes());
    mac.update(role.as_bytes());
    Ok(mac)
}

/// Encode a role cookie value as `<role>.<user_id>.<expires_at>.<signature>`.
///
/// `None` writes the no-role marker. The value expires with the access
/// token or after the cookie lifetime, whichever comes first.
pub fn sign_role(claims: &Claims, role: Option<ActiveRole>) -> Result<String, AppError> {
    let lifetime = jwt::access_token_expiry_minutes() * 60;
    let expires_at = claims.exp.min(Utc::now().timestamp() + lifetime);
    let role = role.map_or(NO_ROLE_MARKER, |r| r.as_str());

    let mac = mac_for(claims, expires_at, role)?;
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{}.{}.{}.{}", role, claims.sub, expires_at, signature))
}

/// Verify a role cookie value against the caller's token at time `now`.
/// Any mismatch or expiry yields `RoleCookie::Missing`.
pub fn verify_role(value: &str, claims: &Claims, now: i64) -> RoleCookie {
    verify_parts(value, claims, now).unwrap_or(RoleCookie::Missing)
}

fn verify_parts(value: &str, claims: &Claims, now: i64) -> Option<RoleCookie> {
    let mut parts = value.splitn(4, '.');
    let (role, uid, expires_at, signature) =
        (parts.next()?, parts.next()?, parts.next()?, parts.next()?);

    if uid.parse::<i64>().ok()? != claims.sub {
        return None;
    }
    let expires_at: i64 = expires_at.parse().ok()?;
    if expires_at <= now {
        return None;
    }
    let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
    let mac = mac_for(claims, expires_at, role).ok()?;
    mac.verify_slice(&signature).ok()?;

    if role == NO_ROLE_MARKER {
        return Some(RoleCookie::NoRole);
    }
    ActiveRole::parse(role).map(RoleCookie::Role)
}

/// Build a Set-Cookie header value for the access token.
pub fn build_access_cookie(token: &str, max_age_minutes: i64) -> Result<HeaderValue, AppError> {
    to_header(&session_cookie(
        ACCESS_COOKIE,
        token.to_string(),
        cookie::time::Duration::minutes(max_age_minutes),
    ))
}

/// Build a Set-Cookie header value for the signed role.
pub fn build_role_cookie(
    claims: &Claims,
    role: Option<ActiveRole>,
    max_age_minutes: i64,
) -> Result<HeaderValue, AppError> {
    to_header(&session_cookie(
        ROLE_COOKIE,
        sign_role(claims, role)?,
        cookie::time::Duration::minutes(max_age_minutes),
    ))
}

/// Build a Set-Cookie header that expires the named cookie.
pub fn build_clear_cookie(name: &'static str) -> Result<HeaderValue, AppError> {
    to_header(&session_cookie(name, String::new(), cookie::time::Duration::ZERO))
}

/// Extract the access token from cookies (preferred) or Bearer header (fallback).
pub fn extract_access_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_cookie(headers, ACCESS_COOKIE) {
        return Some(token);
    }

    // REST clients send a Bearer header instead
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// The verified role cookie for the caller. Stale, tampered or foreign
/// cookies are logged and treated as absent.
pub fn extract_role(headers: &HeaderMap, claims: &Claims) -> RoleCookie {
    let Some(raw) = extract_cookie(headers, ROLE_COOKIE) else {
        return RoleCookie::Missing;
    };
    let role = verify_role(&raw, claims, Utc::now().timestamp());
    if role == RoleCookie::Missing {
        tracing::warn!(user_id = claims.sub, "Ignoring role cookie that failed verification");
    }
    role
}

/// Parse a specific cookie value from the Cookie header.
fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|piece| Cookie::parse(piece.trim().to_string()).ok())
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}

/// Mirror a resolved session into cookies on the response.
///
/// The access token is re-set when the request carried one; the role
/// cookie always carries the resolved role or the no-role marker.
pub fn set_session_cookies(
    headers: &mut HeaderMap,
    access_token: Option<&str>,
    claims: &Claims,
    role: Option<ActiveRole>,
) -> Result<(), AppError> {
    let minutes = jwt::access_token_expiry_minutes();

    if let Some(token) = access_token {
        headers.append(header::SET_COOKIE, build_access_cookie(token, minutes)?);
    }
    headers.append(header::SET_COOKIE, build_role_cookie(claims, role, minutes)?);
    Ok(())
}

/// Expire both session cookies.
pub fn clear_session_cookies(headers: &mut HeaderMap) -> Result<(), AppError> {
    headers.append(header::SET_COOKIE, build_clear_cookie(ACCESS_COOKIE)?);
    headers.append(header::SET_COOKIE, build_clear_cookie(ROLE_COOKIE)?);
    Ok(())
}
