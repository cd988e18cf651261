use std::sync::Arc;

use maud::{html, Markup};
use shared::{
    error::ApiException,
    protocol::{ProfileBlockProgress, ProfileBundle, UserSummary},
};
use tracing::{info, warn};

use super::{avatar_initial, handle_page_error, percent_of, HOME_PATH};
use crate::{api::Backend, document::Document, session::SessionGate};

pub const BLOCKS_PROGRESS_LIST: &str = "blocks-progress-list";
pub const LOGOUT_PROMPT: &str = "Вы уверены, что хотите выйти?";
const WORD_GOAL: u32 = 1000;
const MINUTES_PER_STUDY_DAY: i64 = 10;

pub struct ProfilePage {
    backend: Backend,
    document: Arc<dyn Document>,
    data: Option<ProfileBundle>,
}

impl ProfilePage {
    pub fn new(backend: Backend, document: Arc<dyn Document>) -> Self {
        Self {
            backend,
            document,
            data: None,
        }
    }

    pub fn data(&self) -> Option<&ProfileBundle> {
        self.data.as_ref()
    }

    pub async fn initialize(&mut self) -> Result<(), ApiException> {
        match self.backend.user_profile().await {
            Ok(bundle) => {
                self.data = Some(bundle);
                self.render();
                Ok(())
            }
            Err(err) => {
                handle_page_error(
                    self.document.as_ref(),
                    BLOCKS_PROGRESS_LIST,
                    "Не удалось загрузить данные профиля",
                    &err,
                );
                Err(err)
            }
        }
    }

    pub fn render(&self) {
        let Some(data) = &self.data else {
            return;
        };
        let document = self.document.as_ref();
        render_user(document, &data.user);

        let stats = &data.stats;
        document.set_text("total-words-learned", &stats.learned_words.to_string());
        document.set_text(
            "total-study-time",
            &((stats.total_study_time as f64 / 60.0).round() as i64).to_string(),
        );
        document.set_text("total-sessions", &stats.total_sessions.to_string());
        document.set_text("current-streak", &stats.current_streak.to_string());
        document.set_text("best-streak", &format!("{} дней", stats.longest_streak));
        document.set_text(
            "study-days",
            &study_days(stats.total_study_time).to_string(),
        );
        document.set_text(
            "average-accuracy",
            &format!("{}%", average_accuracy(&data.blocks_progress)),
        );
        document.set_text(
            "current-goal",
            &format!(
                "Изучить {WORD_GOAL} слов Корана ({}%)",
                percent_of(stats.learned_words, WORD_GOAL)
            ),
        );
        document.set_text(
            "user-id",
            &data.user.id.map(|id| id.to_string()).unwrap_or_default(),
        );

        document.render(BLOCKS_PROGRESS_LIST, blocks_progress(&data.blocks_progress));
    }

    /// Clears the session after the user confirms and returns to the landing page.
    pub fn logout(&self, session: &mut SessionGate) -> bool {
        if !self.document.confirm(LOGOUT_PROMPT) {
            return false;
        }
        if let Err(err) = session.logout() {
            warn!(error = %err, "profile: failed to clear session");
        }
        info!("profile: logged out");
        self.document.navigate(HOME_PATH);
        true
    }
}

fn render_user(document: &dyn Document, user: &UserSummary) {
    let username = Some(user.username.as_str()).filter(|name| !name.is_empty());
    document.set_text("profile-avatar", &avatar_initial(username));
    document.set_text("profile-username", username.unwrap_or("Пользователь"));
    document.set_text(
        "profile-telegram",
        &user
            .telegram_username
            .as_deref()
            .filter(|name| !name.is_empty())
            .map(|name| format!("@{name}"))
            .unwrap_or_else(|| "Не указан".to_string()),
    );
    if let Some(joined) = user.date_joined {
        document.set_text(
            "member-since",
            &format!("Участник с {}", joined.format("%d.%m.%Y")),
        );
    }
    document.set_text(
        "payment-date",
        &match user.payment_date {
            Some(paid) => format!("Оплачено: {}", paid.format("%d.%m.%Y")),
            None => "Ожидание оплаты".to_string(),
        },
    );
}

/// Mean accuracy over blocks that have any, rounded.
pub fn average_accuracy(blocks: &[ProfileBlockProgress]) -> u32 {
    let measured: Vec<f64> = blocks
        .iter()
        .map(|block| block.overall_accuracy)
        .filter(|accuracy| *accuracy > 0.0)
        .collect();
    if measured.is_empty() {
        return 0;
    }
    (measured.iter().sum::<f64>() / measured.len() as f64).round() as u32
}

/// Rough day count assuming ten minutes of study per day, never below one.
pub fn study_days(total_minutes: i64) -> i64 {
    ((total_minutes as f64 / MINUTES_PER_STUDY_DAY as f64).round() as i64).max(1)
}

fn blocks_progress(blocks: &[ProfileBlockProgress]) -> Markup {
    html! {
        @if blocks.is_empty() {
            div class="empty-state" {
                i class="fas fa-book-open" {}
                p { "Начните обучение, чтобы отслеживать прогресс" }
            }
        } @else {
            @for block in blocks {
                div.block-progress-item.completed[block.is_completed] {
                    div class="block-info" {
                        h4 { (block.title) }
                        div class="block-stats" {
                            span class="words-count" { (block.learned_words) "/" (block.total_words) " слов" }
                            span class="accuracy" { (block.overall_accuracy) "% точность" }
                        }
                    }
                    div class="block-visual" {
                        div class="progress-circle-small" {
                            (percent_of(block.learned_words, block.total_words)) "%"
                        }
                        @if block.is_completed {
                            div class="completion-badge" { i class="fas fa-check" {} }
                        }
                    }
                }
            }
        }
    }
}
