//! One-shot status messages carried to the next page view in a signed cookie.

use axum::response::{IntoResponse, Response};
use axum_extra::extract::{
    CookieJar, SignedCookieJar,
    cookie::{Cookie, SameSite},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use http::{StatusCode, header};
use serde::{Deserialize, Serialize};

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Success,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    fn encode(&self) -> Option<String> {
        let json = serde_json::to_vec(self).ok()?;
        Some(URL_SAFE_NO_PAD.encode(json))
    }

    fn decode(value: &str) -> Option<Self> {
        let json = URL_SAFE_NO_PAD.decode(value).ok()?;
        serde_json::from_slice(&json).ok()
    }

    /// Queues this message for the next page view.
    pub fn store(&self, jar: SignedCookieJar) -> SignedCookieJar {
        match self.encode() {
            Some(value) => jar.add(
                Cookie::build((FLASH_COOKIE, value))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax),
            ),
            None => jar,
        }
    }

    /// Reads the pending message, if any, and clears it from the jars.
    ///
    /// The signed jar only sees cookies whose signature checks out, so a
    /// tampered or stale cookie is cleared through the raw jar instead.
    pub fn take(
        jar: SignedCookieJar,
        raw: CookieJar,
    ) -> (SignedCookieJar, CookieJar, Option<Flash>) {
        match jar.get(FLASH_COOKIE) {
            Some(cookie) => {
                let flash = Flash::decode(cookie.value());
                (jar.remove(removal()), raw, flash)
            }
            None if raw.get(FLASH_COOKIE).is_some() => (jar, raw.remove(removal()), None),
            None => (jar, raw, None),
        }
    }
}

fn removal() -> Cookie<'static> {
    Cookie::build(FLASH_COOKIE).path("/").build()
}

/// A `302 Found` back to the listing that carries a flash along.
pub struct FlashRedirect {
    jar: SignedCookieJar,
    flash: Flash,
}

impl FlashRedirect {
    pub fn new(jar: SignedCookieJar, flash: Flash) -> Self {
        Self { jar, flash }
    }
}

impl IntoResponse for FlashRedirect {
    fn into_response(self) -> Response {
        let jar = self.flash.store(self.jar);
        (StatusCode::FOUND, jar, [(header::LOCATION, "/")]).into_response()
    }
}
