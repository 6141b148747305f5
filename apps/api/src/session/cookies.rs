// Session cookie helpers. Values are percent-encoded so names with spaces or
// non-ASCII characters survive the Cookie header.

use std::borrow::Cow;

use axum::http::{header, HeaderMap, HeaderValue};

pub const USER_ID_COOKIE: &str = "session_user_id";
pub const USER_NAME_COOKIE: &str = "session_user_name";

/// Seven days.
pub const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

/// `Set-Cookie` values that start a session for `user_id` / `user_name`.
pub fn session_cookies(user_id: &str, user_name: &str) -> [String; 2] {
    [
        set_cookie(USER_ID_COOKIE, user_id, SESSION_MAX_AGE_SECS),
        set_cookie(USER_NAME_COOKIE, user_name, SESSION_MAX_AGE_SECS),
    ]
}

/// `Set-Cookie` values that expire both session cookies.
pub fn cleared_cookies() -> [String; 2] {
    [
        set_cookie(USER_ID_COOKIE, "", 0),
        set_cookie(USER_NAME_COOKIE, "", 0),
    ]
}

/// Appends each cookie as its own `Set-Cookie` header.
pub fn append_set_cookies(headers: &mut HeaderMap, cookies: &[String]) {
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }
}

/// Reads cookie `name` from every `Cookie` header. Empty values count as absent.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| {
            urlencoding::decode(v)
                .map(Cow::into_owned)
                .unwrap_or_else(|_| v.to_string())
        })
        .filter(|v| !v.is_empty())
}

fn set_cookie(name: &str, value: &str, max_age: u64) -> String {
    format!(
        "{name}={}; Path=/; Max-Age={max_age}; HttpOnly; SameSite=Lax",
        urlencoding::encode(value)
    )
}
