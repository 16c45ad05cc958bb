use axum::{extract::State, response::Html};
use tracing::instrument;

use super::{page_context, render};
use crate::error::AppError;
use crate::schemas::AppState;
use crate::session::CurrentUser;

#[instrument(skip_all)]
pub async fn index(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> Result<Html<String>, AppError> {
    render(&state, "home/index.html", &page_context(user.as_ref()))
}

pub async fn privacy(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> Result<Html<String>, AppError> {
    render(&state, "home/privacy.html", &page_context(user.as_ref()))
}

pub async fn error(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> Result<Html<String>, AppError> {
    render(&state, "home/error.html", &page_context(user.as_ref()))
}
