//! Request signature verification.
//!
//! Wraps the whole route table. A request passes when its method cannot
//! exfiltrate content (OPTIONS, POST), when no secret is configured, or when
//! its `sha` query parameter matches the signature of the request path.
//! Rejections are a bare 403 that reveals nothing about the target resource.

use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{header, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::error::TEXT_PLAIN_UTF8;

/// Query parameter carrying the request signature.
pub const SIGNATURE_PARAM: &str = "sha";

const SIGNATURE_LEN: usize = 16;

/// Signature over a canonical request path: the first 16 hex characters of
/// HMAC-SHA256 keyed with the configured secret.
pub fn sign_path(secret: &str, path: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(path.as_bytes());
    let mut encoded = hex::encode(mac.finalize().into_bytes());
    encoded.truncate(SIGNATURE_LEN);
    encoded
}

fn signature_param(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == SIGNATURE_PARAM).then_some(value)
    })
}

pub async fn verify_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    // Uploads and preflights carry no signature: they cannot read existing
    // content.
    if request.method() == Method::OPTIONS || request.method() == Method::POST {
        return next.run(request).await;
    }

    let Some(secret) = state.config.secret.as_deref() else {
        return next.run(request).await;
    };

    let expected = sign_path(secret, request.uri().path());
    let provided = request.uri().query().and_then(signature_param);
    let authorized = provided.is_some_and(|provided| {
        provided.len() == expected.len()
            && bool::from(provided.as_bytes().ct_eq(expected.as_bytes()))
    });

    if authorized {
        next.run(request).await
    } else {
        tracing::warn!(
            path = %request.uri().path(),
            "unsigned request rejected by signature filter"
        );
        (
            StatusCode::FORBIDDEN,
            [(header::CONTENT_TYPE, TEXT_PLAIN_UTF8)],
            "forbidden",
        )
            .into_response()
    }
}
