// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session cookie construction and lookup.

use axum::http::{header::COOKIE, HeaderMap};
use chrono::{DateTime, Utc};
use cookie::{time::OffsetDateTime, Cookie};

use super::SessionSettings;

/// Build the cookie carrying `id`, expiring with the stored record.
pub fn session_cookie(
    settings: &SessionSettings,
    id: &str,
    expires_at: DateTime<Utc>,
) -> Cookie<'static> {
    let mut cookie = base_cookie(settings, id.to_string());
    cookie.set_http_only(settings.cookie_http_only);
    cookie.set_secure(settings.cookie_secure);
    cookie.set_same_site(settings.cookie_same_site);
    cookie.set_expires(OffsetDateTime::from_unix_timestamp(expires_at.timestamp()).ok());
    cookie
}

/// Build a cookie that tells the browser to forget the session.
///
/// Domain and path must match the issuing cookie or browsers keep the old one.
pub fn removal_cookie(settings: &SessionSettings) -> Cookie<'static> {
    let mut cookie = base_cookie(settings, String::new());
    cookie.make_removal();
    cookie
}

fn base_cookie(settings: &SessionSettings, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(settings.cookie_name.clone(), value);
    cookie.set_path(settings.cookie_path.clone());
    if let Some(domain) = &settings.cookie_domain {
        cookie.set_domain(domain.clone());
    }
    cookie
}

/// Find the value of cookie `name` across all `Cookie` request headers.
///
/// Empty values are treated as absent.
pub fn find_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| Cookie::split_parse(raw))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;
    use cookie::SameSite;

    fn settings() -> SessionSettings {
        SessionSettings {
            cookie_domain: Some("wallet.example".to_string()),
            cookie_secure: true,
            cookie_same_site: Some(SameSite::Strict),
            ..SessionSettings::default()
        }
    }

    #[test]
    fn session_cookie_carries_configured_attributes() {
        let expires_at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let cookie = session_cookie(&settings(), "abc-123", expires_at);

        assert_eq!(cookie.name(), "session");
        assert_eq!(cookie.value(), "abc-123");
        assert_eq!(cookie.domain(), Some("wallet.example"));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(
            cookie.expires_datetime().map(|at| at.unix_timestamp()),
            Some(expires_at.timestamp())
        );
    }

    #[test]
    fn removal_cookie_matches_domain_and_path() {
        let cookie = removal_cookie(&settings());
        let header = cookie.to_string();

        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.domain(), Some("wallet.example"));
        assert_eq!(cookie.path(), Some("/"));
        assert!(header.contains("Max-Age=0"), "{header}");
    }

    #[test]
    fn find_cookie_scans_every_header() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; lang=en"));
        headers.append(COOKIE, HeaderValue::from_static("session=abc-123"));

        assert_eq!(find_cookie(&headers, "session"), Some("abc-123".to_string()));
        assert_eq!(find_cookie(&headers, "lang"), Some("en".to_string()));
        assert_eq!(find_cookie(&headers, "missing"), None);
    }

    #[test]
    fn find_cookie_ignores_empty_value() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("session="));
        assert_eq!(find_cookie(&headers, "session"), None);
    }
}
