use std::convert::Infallible;

use serde::Serialize;
use sqlx::error::ErrorKind;
use warp::{
    http::StatusCode,
    reject::{Reject, Rejection},
    reply, Reply,
};

/// Request-scoped failure taxonomy. None of these are fatal to the
/// process; each maps to a distinct HTTP status at the boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("query failed: {0}")]
    Query(String),
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthorized(_) => StatusCode::FORBIDDEN,
            Error::Query(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug)]
enum QueryErrorKind {
    Conflict,
    ProtectedReference,
    NotFound,
    Other,
}

/// Classifies driver errors before they fold into [`Error`]: unique
/// constraint losers become conflicts, restricted foreign keys become
/// protected-reference conflicts.
pub struct QueryError {
    kind: QueryErrorKind,
    info: String,
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self {
                kind: QueryErrorKind::NotFound,
                info: String::from("Row not found"),
            },
            sqlx::Error::Database(e) => {
                let kind = match e.kind() {
                    ErrorKind::UniqueViolation => QueryErrorKind::Conflict,
                    ErrorKind::ForeignKeyViolation => QueryErrorKind::ProtectedReference,
                    _ => QueryErrorKind::Other,
                };
                Self {
                    kind,
                    info: e.to_string(),
                }
            }
            other => Self {
                kind: QueryErrorKind::Other,
                info: other.to_string(),
            },
        }
    }
}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        match value.kind {
            QueryErrorKind::Conflict => Error::Conflict(value.info),
            QueryErrorKind::ProtectedReference => Error::Conflict(value.info),
            QueryErrorKind::NotFound => Error::NotFound(value.info),
            QueryErrorKind::Other => Error::Query(value.info),
        }
    }
}

#[derive(Debug)]
pub struct ApiRejection(pub Error);

impl Reject for ApiRejection {}

impl From<Error> for Rejection {
    fn from(value: Error) -> Self {
        warp::reject::custom(ApiRejection(value))
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, String::from("Not found"))
    } else if let Some(ApiRejection(e)) = err.find::<ApiRejection>() {
        (e.status(), e.to_string())
    } else {
        log::warn!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            String::from("Internal server error"),
        )
    };

    let body = reply::json(&ErrorBody {
        code: status.as_u16(),
        message,
    });

    Ok(reply::with_status(body, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err: Error = QueryError::from(sqlx::Error::RowNotFound).into();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn pool_errors_map_to_query() {
        let err: Error = QueryError::from(sqlx::Error::PoolTimedOut).into();
        assert!(matches!(err, Error::Query(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn rejections_become_json_replies_with_matching_status() {
        let rejection = Rejection::from(Error::Conflict(String::from("Recipe is already in favorites")));
        let reply = handle_rejection(rejection).await;
        let response = reply.unwrap().into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let reply = handle_rejection(warp::reject::not_found()).await;
        let response = reply.unwrap().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            Error::Validation(String::from("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Conflict(String::from("x")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            Error::NotFound(String::from("x")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Unauthorized(String::from("x")).status(),
            StatusCode::FORBIDDEN
        );
    }
}
