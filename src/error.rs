use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{error, warn};

use crate::identity::IdentityError;
use crate::schemas::AppState;

/// Full description of a server error, attached to the response for the
/// development error page.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// Errors a page or API handler can fail with.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Template(_) | AppError::Identity(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let title = match status {
            StatusCode::NOT_FOUND => "Not Found",
            StatusCode::BAD_REQUEST => "Bad Request",
            _ => "Error",
        };

        if status.is_server_error() {
            error!(error = ?self, "Request failed");
        } else {
            warn!(error = %self, "Request rejected");
        }

        // Server error details stay in the log
        let detail = if status.is_server_error() {
            "An error occurred while processing your request.".to_string()
        } else {
            escape_html(&self.to_string())
        };
        let mut response = (status, Html(error_page(title, &detail))).into_response();
        if status.is_server_error() {
            response.extensions_mut().insert(ErrorDetail(format!("{:?}", self)));
        }
        response
    }
}

fn error_page(title: &str, detail: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>{title} - AgriEnergy Connect</title></head>\
         <body><h1>{title}</h1><p>{detail}</p><p><a href=\"/\">Back to home</a></p></body></html>"
    )
}

/// In development, replace server error pages with the underlying error.
pub async fn developer_error_page(State(state): State<AppState>, mut response: Response) -> Response {
    let Some(ErrorDetail(detail)) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };
    if !state.environment.is_development() {
        return response;
    }

    let status = response.status();
    let body = error_page("Error", &format!("<pre>{}</pre>", escape_html(&detail)));
    (status, Html(body)).into_response()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeEnvironment;
    use crate::test_utils::test_utils::setup_test_app_state;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("farmer 3".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Validation("bad date".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Database(DbErr::Custom("gone".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Identity(IdentityError::RoleNotFound("Farmer".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_server_error_detail_hidden_in_production() {
        let state = setup_test_app_state().await;
        let response = AppError::Database(DbErr::Custom("pool <exhausted>".into())).into_response();

        let response = developer_error_page(State(state), response).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains("An error occurred while processing your request."));
        assert!(!body.contains("exhausted"));
    }

    #[tokio::test]
    async fn test_server_error_detail_shown_in_development() {
        let mut state = setup_test_app_state().await;
        state.environment = RuntimeEnvironment::Development;
        let response = AppError::Database(DbErr::Custom("pool <exhausted>".into())).into_response();

        let response = developer_error_page(State(state), response).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_text(response).await;
        assert!(body.contains("Database(Custom(&quot;pool &lt;exhausted&gt;&quot;))"));
    }

    #[tokio::test]
    async fn test_client_errors_pass_through_development_page() {
        let mut state = setup_test_app_state().await;
        state.environment = RuntimeEnvironment::Development;
        let response = AppError::NotFound("Farmer 9".into()).into_response();

        let response = developer_error_page(State(state), response).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_text(response).await.contains("Not found: Farmer 9"));
    }

    #[test]
    fn test_client_errors_are_escaped() {
        assert_eq!(escape_html("<b>\"x\" & 'y'</b>"), "&lt;b&gt;&quot;x&quot; &amp; &#x27;y&#x27;&lt;/b&gt;");
    }
}
