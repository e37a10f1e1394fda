/// Route gate
///
/// Decides, for a host, a path and the current auth state, which view to
/// render or where to send the browser. The function is pure; callers
/// re-run it whenever the location or the session snapshot changes.
///
/// # Rules (first match wins)
///
/// 1. `/admin`, `/success`, `/cancel` render their own view in any auth state
/// 2. While auth is loading, render the loading view and decide nothing else
/// 3. On the local development host, dashboard with access, landing otherwise
/// 4. Application host root: login when signed out, dashboard with access,
///    marketing site otherwise
/// 5. Protected paths (`/dashboard`, `/program`, `/program/...`): application
///    (login) URL when signed out, dashboard with access, marketing site otherwise
/// 6. Anything else renders the landing view

/// Host name used during local development
pub const LOCAL_DEV_HOST: &str = "localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Host serving the signed-in application
    pub app_host: String,

    /// Application URL; the login location for signed-out visitors
    pub app_url: String,

    /// Marketing site URL; where visitors without access are sent
    pub site_url: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            app_host: crate::config::DEFAULT_APP_HOST.to_string(),
            app_url: crate::config::DEFAULT_APP_URL.to_string(),
            site_url: crate::config::DEFAULT_SITE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Session or entitlement still resolving
    Loading,
    SignedOut,
    SignedIn { has_access: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Admin,
    Success,
    Cancel,
    Loading,
    Login,
    Dashboard,
    Landing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Render(View),
    Redirect(String),
}

#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub host: &'a str,
    pub path: &'a str,
    pub auth: AuthState,
}

pub fn is_protected_path(path: &str) -> bool {
    path == "/dashboard" || path == "/program" || path.starts_with("/program/")
}

pub fn decide(config: &GateConfig, input: &GateInput<'_>) -> GateDecision {
    match input.path {
        "/admin" => return GateDecision::Render(View::Admin),
        "/success" => return GateDecision::Render(View::Success),
        "/cancel" => return GateDecision::Render(View::Cancel),
        _ => {}
    }

    let has_access = match input.auth {
        AuthState::Loading => return GateDecision::Render(View::Loading),
        AuthState::SignedOut => None,
        AuthState::SignedIn { has_access } => Some(has_access),
    };

    if input.host == LOCAL_DEV_HOST {
        return if has_access == Some(true) {
            GateDecision::Render(View::Dashboard)
        } else {
            GateDecision::Render(View::Landing)
        };
    }

    if input.host == config.app_host && input.path == "/" {
        return match has_access {
            None => GateDecision::Render(View::Login),
            Some(true) => GateDecision::Render(View::Dashboard),
            Some(false) => GateDecision::Redirect(config.site_url.clone()),
        };
    }

    if is_protected_path(input.path) {
        return match has_access {
            None => GateDecision::Redirect(config.app_url.clone()),
            Some(true) => GateDecision::Render(View::Dashboard),
            Some(false) => GateDecision::Redirect(config.site_url.clone()),
        };
    }

    GateDecision::Render(View::Landing)
}

/// Where to go right after a successful sign-in on the login view.
pub fn after_login(config: &GateConfig, has_access: bool) -> GateDecision {
    if has_access {
        GateDecision::Redirect(config.app_url.clone())
    } else {
        GateDecision::Render(View::Landing)
    }
}
