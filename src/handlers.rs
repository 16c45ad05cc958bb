use axum::response::Html;
use tera::Context;

use crate::error::AppError;
use crate::schemas::AppState;
use crate::session::CurrentUser;

pub mod account;
pub mod employee;
pub mod farmer;
pub mod health;
pub mod home;
pub mod products;

/// Base template context: the signed-in user, if any, for the layout.
pub fn page_context(user: Option<&CurrentUser>) -> Context {
    let mut context = Context::new();
    if let Some(user) = user {
        context.insert("current_user", &user.session.view());
    }
    context
}

pub fn render(state: &AppState, template: &str, context: &Context) -> Result<Html<String>, AppError> {
    Ok(Html(state.templates.render(template, context)?))
}

/// Collect `validator` failures as display messages, one per broken rule.
pub fn validation_messages(errors: &validator::ValidationErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, failures)| {
            failures.iter().map(move |failure| match &failure.message {
                Some(message) => message.to_string(),
                None => format!("The {} field is invalid.", field),
            })
        })
        .collect();
    messages.sort();
    messages
}
