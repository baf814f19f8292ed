use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphiteError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Request error: {0}")]
    RequestError(String),

    #[error("Response error: {0}")]
    ResponseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Template error: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// Error reported by the hosted model. The text carries the provider's
    /// status marker (`SAFETY`, `DEADLINE_EXCEEDED`, ...) when one exists.
    #[error("{0}")]
    ServiceError(String),

    #[error("AWS error: {0}")]
    AwsError(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for GraphiteError {
    fn from(e: serde_json::Error) -> Self {
        GraphiteError::SerializationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GraphiteError>;

#[cfg(feature = "server")]
mod http {
    use super::GraphiteError;
    use actix_web::http::header::ContentType;
    use actix_web::http::StatusCode;
    use actix_web::HttpResponse;
    use serde_json::json;

    impl actix_web::error::ResponseError for GraphiteError {
        fn error_response(&self) -> HttpResponse {
            log::error!("API error: {:?}", self);
            HttpResponse::build(self.status_code())
                .insert_header(ContentType::json())
                .json(json!({ "error": self.to_string() }))
        }

        fn status_code(&self) -> StatusCode {
            match self {
                GraphiteError::RequestError(_) | GraphiteError::SerializationError(_) => {
                    StatusCode::BAD_REQUEST
                }
                GraphiteError::ServiceError(_)
                | GraphiteError::ResponseError(_)
                | GraphiteError::AwsError(_)
                | GraphiteError::Http(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_keep_provider_text() {
        let err = GraphiteError::ServiceError("SAFETY: candidate blocked".into());
        assert_eq!(err.to_string(), "SAFETY: candidate blocked");
    }

    #[test]
    fn json_errors_become_serialization_errors() {
        let err: GraphiteError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, GraphiteError::SerializationError(_)));
    }
}
