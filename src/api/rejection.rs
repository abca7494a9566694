use std::convert::Infallible;

use serde::Serialize;
use warp::{
    body::BodyDeserializeError,
    http::StatusCode,
    reject::{
        InvalidQuery, LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType,
    },
    Rejection, Reply,
};

use crate::error::ActionError;

#[derive(Serialize, Debug)]
pub struct ErrorBody {
    pub errors: String,
}

fn classify(err: &Rejection) -> (StatusCode, String) {
    if let Some(e) = err.find::<ActionError>() {
        return match e {
            ActionError::Query(query) => {
                log::error!("Request failed: {query}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    String::from("Internal server error"),
                )
            }
            e => (e.status(), e.to_string()),
        };
    }

    if let Some(e) = err.find::<BodyDeserializeError>() {
        return (StatusCode::BAD_REQUEST, e.to_string());
    }
    if let Some(e) = err.find::<InvalidQuery>() {
        return (StatusCode::BAD_REQUEST, e.to_string());
    }
    if err.find::<LengthRequired>().is_some() {
        return (
            StatusCode::LENGTH_REQUIRED,
            String::from("Content-Length required"),
        );
    }
    if err.find::<PayloadTooLarge>().is_some() {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            String::from("Payload too large"),
        );
    }
    if err.find::<UnsupportedMediaType>().is_some() {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            String::from("Unsupported media type"),
        );
    }
    if err.find::<MethodNotAllowed>().is_some() {
        return (
            StatusCode::METHOD_NOT_ALLOWED,
            String::from("Method not allowed"),
        );
    }
    if err.is_not_found() {
        return (StatusCode::NOT_FOUND, String::from("Not found"));
    }

    log::error!("Unhandled rejection: {err:?}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        String::from("Internal server error"),
    )
}

/// Renders every rejection as `{"errors": "..."}` with its mapped status.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, errors) = classify(&err);

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody { errors }),
        status,
    ))
}
