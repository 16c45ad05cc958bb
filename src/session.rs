//! Cookie sessions and the authentication extractors built on them.
//!
//! The cookie carries an opaque UUID; the session itself lives server side in
//! a moka cache whose time-to-idle gives the sliding idle timeout.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use model::entities::user::{self, RoleLabel};
use moka::future::Cache;
use serde_json::json;
use std::sync::Arc;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};
use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::config::SessionSettings;
use crate::schemas::AppState;

pub const LOGIN_PATH: &str = "/Account/Login";
pub const ACCESS_DENIED_PATH: &str = "/Account/AccessDenied";

/// What the site remembers about a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: i32,
    pub email: String,
    pub display_name: String,
    /// Role label used to pick the dashboard.
    pub role: RoleLabel,
    /// Role memberships at sign-in time.
    pub roles: Vec<String>,
}

impl Session {
    pub fn new(user: &user::Model, roles: Vec<String>) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            display_name: user.full_name(),
            role: user.role,
            roles,
        }
    }

    pub fn is_in_role(&self, role: RoleLabel) -> bool {
        self.roles.iter().any(|name| name == role.as_str())
    }

    /// Landing page for this user after sign-in.
    pub fn dashboard(&self) -> &'static str {
        match self.role {
            RoleLabel::Employee => "/Employee/Index",
            RoleLabel::Farmer => "/Farmer/Index",
        }
    }

    /// Template-facing view of the session.
    pub fn view(&self) -> serde_json::Value {
        json!({
            "email": self.email,
            "display_name": self.display_name,
            "role": self.role.as_str(),
            "dashboard": self.dashboard(),
        })
    }
}

/// Server-side session storage keyed by the session cookie.
#[derive(Clone, Debug)]
pub struct SessionStore {
    cache: Cache<String, Session>,
    cookie_name: Arc<str>,
}

impl SessionStore {
    pub fn new(settings: &SessionSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(settings.idle_timeout())
            .build();

        Self {
            cache,
            cookie_name: Arc::from(settings.cookie_name.as_str()),
        }
    }

    /// Store a new session and hand its id to the client.
    pub async fn sign_in(&self, cookies: &Cookies, session: Session) -> String {
        let id = Uuid::new_v4().to_string();
        debug!(user_id = session.user_id, "Session started");
        self.cache.insert(id.clone(), session).await;

        let mut cookie = Cookie::new(self.cookie_name.to_string(), id.clone());
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Lax);
        cookies.add(cookie);

        id
    }

    /// Resolve the session named by the request's cookie, if it is still live.
    pub async fn current(&self, cookies: &Cookies) -> Option<(String, Session)> {
        let id = cookies.get(&self.cookie_name)?.value().to_string();
        let session = self.get(&id).await;
        if session.is_none() {
            trace!("Session cookie present but no live session");
        }
        session.map(|session| (id, session))
    }

    /// End the session `session_id`, if any, and expire the cookie.
    pub async fn sign_out(&self, cookies: &Cookies, session_id: Option<&str>) {
        if let Some(id) = session_id {
            self.cache.invalidate(id).await;
            debug!("Session ended");
        }

        let mut removal = Cookie::new(self.cookie_name.to_string(), "");
        removal.set_path("/");
        cookies.remove(removal);
    }

    pub async fn get(&self, id: &str) -> Option<Session> {
        self.cache.get(id).await
    }
}

/// Why an authenticated extractor refused a request.
#[derive(Debug)]
pub enum AuthRejection {
    /// No live session; send the browser to the login page.
    Unauthenticated { return_url: String },
    /// Signed in, but without the required role.
    Forbidden,
    /// The cookie layer is missing from the router.
    MissingCookies,
}

pub fn login_redirect_target(return_url: &str) -> String {
    match serde_urlencoded::to_string([("ReturnUrl", return_url)]) {
        Ok(query) => format!("{}?{}", LOGIN_PATH, query),
        Err(_) => LOGIN_PATH.to_string(),
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated { return_url } => {
                Redirect::to(&login_redirect_target(&return_url)).into_response()
            }
            AuthRejection::Forbidden => Redirect::to(ACCESS_DENIED_PATH).into_response(),
            AuthRejection::MissingCookies => {
                error!("Cookie layer is not installed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// The signed-in user. Use `Option<CurrentUser>` on public pages.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session_id: String,
    pub session: Session,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::MissingCookies)?;

        match state.sessions.current(&cookies).await {
            Some((session_id, session)) => Ok(CurrentUser { session_id, session }),
            None => {
                let return_url = parts
                    .uri
                    .path_and_query()
                    .map(|pq| pq.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string());
                Err(AuthRejection::Unauthenticated { return_url })
            }
        }
    }
}

async fn require_role(
    parts: &mut Parts,
    state: &AppState,
    role: RoleLabel,
) -> Result<CurrentUser, AuthRejection> {
    let user = CurrentUser::from_request_parts(parts, state).await?;
    if user.session.is_in_role(role) {
        Ok(user)
    } else {
        debug!(user_id = user.session.user_id, required = %role, "Access denied");
        Err(AuthRejection::Forbidden)
    }
}

/// A signed-in member of the Employee role.
#[derive(Debug, Clone)]
pub struct RequireEmployee(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireEmployee {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, RoleLabel::Employee).await.map(RequireEmployee)
    }
}

/// A signed-in member of the Farmer role.
#[derive(Debug, Clone)]
pub struct RequireFarmer(pub CurrentUser);

#[async_trait]
impl FromRequestParts<AppState> for RequireFarmer {
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_role(parts, state, RoleLabel::Farmer).await.map(RequireFarmer)
    }
}
