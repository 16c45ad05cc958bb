use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tower_cookies::Cookies;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use super::{page_context, render, validation_messages};
use crate::error::AppError;
use crate::identity::SignInResult;
use crate::schemas::AppState;
use crate::session::{CurrentUser, Session};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "ReturnUrl")]
    pub return_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "The Email field is not a valid e-mail address."))]
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub return_url: Option<String>,
}

impl LoginForm {
    /// Form problems, with the password length taken from the password policy.
    pub fn errors(&self, required_length: usize) -> Vec<String> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => validation_messages(&e),
        };
        if self.password.chars().count() < required_length {
            errors.push(format!(
                "The Password must be at least {} characters long.",
                required_length
            ));
        }
        errors.sort();
        errors
    }
}

/// A redirect target is only followed when it stays on this site.
pub fn is_local_url(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\")
}

fn local_return_url(url: Option<&str>) -> Option<&str> {
    url.filter(|url| is_local_url(url))
}

fn login_page_response(
    state: &AppState,
    email: &str,
    return_url: Option<&str>,
    errors: Vec<String>,
) -> Result<Response, AppError> {
    let mut context = page_context(None);
    context.insert("email", email);
    context.insert("return_url", &return_url);
    context.insert("errors", &errors);
    Ok(render(state, "account/login.html", &context)?.into_response())
}

pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    login_page_response(&state, "", local_return_url(query.return_url.as_deref()), Vec::new())
}

#[instrument(skip_all, fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let return_url = local_return_url(form.return_url.as_deref());

    let errors = form.errors(state.password_policy.required_length);
    if !errors.is_empty() {
        return login_page_response(&state, &form.email, return_url, errors);
    }

    let users = state.user_manager();
    match users.password_sign_in(&form.email, &form.password).await? {
        SignInResult::Succeeded(user) => {
            let roles = users.role_names(&user).await?;
            let session = Session::new(&user, roles);
            let target = return_url.unwrap_or(session.dashboard()).to_string();
            state.sessions.sign_in(&cookies, session).await;
            info!("User logged in");
            Ok(Redirect::to(&target).into_response())
        }
        SignInResult::LockedOut => {
            warn!("User account locked out");
            login_page_response(
                &state,
                &form.email,
                return_url,
                vec!["This account has been locked out, please try again later.".to_string()],
            )
        }
        SignInResult::Failed => login_page_response(
            &state,
            &form.email,
            return_url,
            vec!["Invalid login attempt.".to_string()],
        ),
    }
}

#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    cookies: Cookies,
    user: Option<CurrentUser>,
) -> Redirect {
    let session_id = user.as_ref().map(|user| user.session_id.as_str());
    state.sessions.sign_out(&cookies, session_id).await;
    match &user {
        Some(user) => info!(user_id = user.session.user_id, "User logged out"),
        None => debug!("Logout without a live session"),
    }
    Redirect::to("/")
}

pub async fn access_denied(
    State(state): State<AppState>,
    user: Option<CurrentUser>,
) -> Result<(StatusCode, Html<String>), AppError> {
    let page = render(&state, "account/access_denied.html", &page_context(user.as_ref()))?;
    Ok((StatusCode::FORBIDDEN, page))
}
