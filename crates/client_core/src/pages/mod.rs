//! Page controllers. Each owns its loaded data, renders through a
//! [`Document`] and talks to the backend only through [`crate::api::Backend`].

use maud::{html, Markup};
use shared::error::{ApiException, ErrorCode};
use tracing::{error, warn};

use crate::document::Document;

pub mod block;
pub mod courses;
pub mod dashboard;
pub mod lesson;
pub mod profile;
pub mod progress;

pub const PAYMENT_PROMPT: &str =
    "Доступ запрещен. Оплатите доступ для использования приложения. Перейти на главную?";
pub const HOME_PATH: &str = "/";
pub const DASHBOARD_PATH: &str = "/dashboard/";

/// Page-boundary policy for a failed load: unauthorized goes home, unpaid
/// asks first, everything else becomes an inline error with a retry button.
pub fn handle_page_error(
    document: &dyn Document,
    container: &str,
    message: &str,
    err: &ApiException,
) {
    match err.code {
        ErrorCode::Unauthorized => {
            warn!(container, "page: unauthorized, leaving");
            document.navigate(HOME_PATH);
        }
        ErrorCode::PaymentRequired => {
            warn!(container, "page: payment required");
            if document.confirm(PAYMENT_PROMPT) {
                document.navigate(HOME_PATH);
            }
        }
        ErrorCode::Locked => document.render(container, error_state(&err.message)),
        _ => {
            error!(container, error = %err, "page: load failed");
            document.render(container, error_state(message));
        }
    }
}

pub fn error_state(message: &str) -> Markup {
    html! {
        div class="error-state" {
            i class="fas fa-exclamation-triangle" {}
            p { (message) }
            button class="btn-primary" data-action="retry" { "Попробовать снова" }
        }
    }
}

pub fn loading_state(message: &str) -> Markup {
    html! {
        div class="loading-state" {
            div class="loading-spinner" {}
            p { (message) }
        }
    }
}

/// `part / total` as a rounded percentage, 0 for an empty total.
pub fn percent_of(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(part) * 100.0 / f64::from(total)).round() as u32
}

pub fn format_time(minutes: i64) -> String {
    if minutes < 60 {
        return format!("{minutes} мин");
    }
    let hours = minutes / 60;
    let mins = minutes % 60;
    if mins > 0 {
        format!("{hours} ч {mins} мин")
    } else {
        format!("{hours} ч")
    }
}

pub fn avatar_initial(username: Option<&str>) -> String {
    username
        .and_then(|name| name.chars().next())
        .map(|first| first.to_uppercase().collect())
        .unwrap_or_else(|| "👋".to_string())
}
