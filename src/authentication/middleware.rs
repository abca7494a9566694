use std::sync::Arc;

use warp::{reject::Rejection, Filter};

use super::jwt::{SessionData, SessionSigner};
use crate::{
    constants::{SESSION_COOKIE, TOKEN_PREFIX},
    error::ActionError,
};

/// Picks the session token from the `Authorization: Token ...` header, falling
/// back to the session cookie.
pub fn extract_token(cookie: Option<String>, authorization: Option<String>) -> Option<String> {
    authorization
        .and_then(|header| {
            header
                .strip_prefix(TOKEN_PREFIX)
                .map(|token| token.trim().to_string())
        })
        .filter(|token| !token.is_empty())
        .or(cookie.filter(|token| !token.is_empty()))
}

fn with_token() -> impl Filter<Extract = (Option<String>,), Error = Rejection> + Clone {
    warp::cookie::optional::<String>(SESSION_COOKIE)
        .and(warp::header::optional::<String>("authorization"))
        .map(extract_token)
}

pub fn with_session(
    signer: Arc<SessionSigner>,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    with_token().and_then(move |token: Option<String>| {
        let signer = signer.clone();
        async move {
            match token {
                Some(token) => signer.verify(&token).map_err(warp::reject::custom),
                None => Err(warp::reject::custom(ActionError::Unauthorized(
                    String::from("Authentication credentials were not provided"),
                ))),
            }
        }
    })
}

/// Anonymous requests, and requests with an unusable token, extract `None`.
pub fn with_possible_session(
    signer: Arc<SessionSigner>,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    with_token().map(move |token: Option<String>| {
        token.and_then(|token| signer.verify(&token).ok())
    })
}
