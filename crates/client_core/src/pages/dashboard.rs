use std::sync::Arc;

use chrono::{Local, Timelike};
use maud::{html, Markup};
use shared::{
    domain::BlockId,
    error::ApiException,
    protocol::{DashboardBlock, DashboardBundle, DashboardStats},
};
use tracing::{debug, info};

use super::{avatar_initial, handle_page_error, percent_of};
use crate::{api::Backend, document::Document};

pub const BLOCKS_CONTAINER: &str = "blocks-container";
pub const DEFAULT_NAME: &str = "Ученик";

pub struct DashboardPage {
    backend: Backend,
    document: Arc<dyn Document>,
    data: Option<DashboardBundle>,
}

impl DashboardPage {
    pub fn new(backend: Backend, document: Arc<dyn Document>) -> Self {
        Self {
            backend,
            document,
            data: None,
        }
    }

    pub fn data(&self) -> Option<&DashboardBundle> {
        self.data.as_ref()
    }

    pub async fn initialize(&mut self) -> Result<(), ApiException> {
        self.load().await?;
        self.render(Local::now().hour());
        Ok(())
    }

    pub async fn refresh(&mut self) -> Result<(), ApiException> {
        info!("dashboard: refreshing");
        self.initialize().await
    }

    async fn load(&mut self) -> Result<(), ApiException> {
        self.document
            .render(BLOCKS_CONTAINER, super::loading_state("Загрузка блоков..."));
        match self.backend.dashboard().await {
            Ok(bundle) => {
                debug!(blocks = bundle.blocks.len(), "dashboard: data loaded");
                self.data = Some(bundle);
                Ok(())
            }
            Err(err) => {
                handle_page_error(
                    self.document.as_ref(),
                    BLOCKS_CONTAINER,
                    "Не удалось загрузить данные",
                    &err,
                );
                Err(err)
            }
        }
    }

    pub fn render(&self, hour: u32) {
        let Some(data) = &self.data else {
            return;
        };
        let document = self.document.as_ref();
        let username = data
            .user
            .as_ref()
            .map(|user| user.username.as_str())
            .filter(|name| !name.is_empty());

        document.set_text("user-avatar", &avatar_initial(username));
        document.set_text(
            "greeting-text",
            &format!(
                "{}, {}!",
                greeting_for_hour(hour),
                username.unwrap_or(DEFAULT_NAME)
            ),
        );
        document.set_text("user-motivation", &motivation(&data.stats));

        document.set_text("learned-words", &data.stats.learned_words.to_string());
        document.set_width("words-progress-bar", data.stats.progress_percentage);
        document.set_text("today-words", &data.stats.today_words.to_string());
        let (trend_text, positive) = trend(&data.stats);
        document.set_text("trend-text", &trend_text);
        document.set_class("trend-text", "positive", positive);
        document.set_class("trend-text", "neutral", !positive);

        document.render(BLOCKS_CONTAINER, blocks_list(&data.blocks));
    }

    /// Locked blocks do not open.
    pub fn open_block(&self, block_id: BlockId) -> bool {
        let unlocked = self
            .data
            .as_ref()
            .and_then(|data| data.blocks.iter().find(|block| block.id == block_id))
            .is_some_and(|block| !block.is_locked);
        if unlocked {
            self.document.navigate(&format!("/app/block/{block_id}/"));
        }
        unlocked
    }
}

pub fn greeting_for_hour(hour: u32) -> &'static str {
    match hour {
        0..=5 => "تهجد مبارك",
        6..=11 => "صباح الخير",
        _ => "مساء الخير",
    }
}

pub fn motivation(stats: &DashboardStats) -> String {
    let progress = stats.progress_percentage;
    if stats.today_words > 0 {
        format!("Сегодня: {} новых слов", stats.today_words)
    } else if stats.current_streak > 0 {
        format!("Не прерывайте серию {} дней!", stats.current_streak)
    } else if progress <= 0.0 {
        "Начните с первого блока".to_string()
    } else if progress < 25.0 {
        "Отличное начало! Продолжайте!".to_string()
    } else if progress < 50.0 {
        "Вы на четверти пути!".to_string()
    } else if progress < 75.0 {
        "Больше половины пройдено!".to_string()
    } else {
        "Почти у цели! Осталось немного!".to_string()
    }
}

/// Trend line under the stats and whether it reads as positive.
pub fn trend(stats: &DashboardStats) -> (String, bool) {
    if stats.today_words > 0 {
        (format!("+{} с начала дня", stats.today_words), true)
    } else if stats.current_streak > 0 {
        (format!("Серия {} дней", stats.current_streak), false)
    } else {
        ("Готов к обучению".to_string(), false)
    }
}

/// Lesson-based progress when the block reports lessons, else word-based.
pub fn block_progress(block: &DashboardBlock) -> (u32, String) {
    let (completed, total) = block
        .progress
        .as_ref()
        .map(|progress| (progress.lessons_completed, progress.total_lessons))
        .unwrap_or_default();
    if total > 0 {
        (percent_of(completed, total), format!("{completed}/{total} уроков"))
    } else if block.total_words > 0 {
        (
            percent_of(block.learned_words, block.total_words),
            format!("{}/{} слов", block.learned_words, block.total_words),
        )
    } else {
        (0, "Новый блок".to_string())
    }
}

pub fn unlock_message(block: &DashboardBlock) -> &'static str {
    if block.order == 1 {
        "Начните обучение"
    } else {
        "Пройдите предыдущий блок для разблокировки"
    }
}

fn blocks_list(blocks: &[DashboardBlock]) -> Markup {
    html! {
        @if blocks.is_empty() {
            div class="error-state" {
                i class="fas fa-book-open" {}
                p { "Учебные блоки временно недоступны" }
                button data-action="refresh" { "Обновить" }
            }
        } @else {
            @for block in blocks {
                (block_card(block))
            }
        }
    }
}

pub fn block_card(block: &DashboardBlock) -> Markup {
    let (percentage, progress_text) = block_progress(block);
    let started = block
        .progress
        .as_ref()
        .is_some_and(|progress| progress.lessons_completed > 0);
    let icon = if block.is_locked {
        "fa-lock"
    } else if started {
        "fa-play-circle"
    } else {
        "fa-play"
    };
    let card_state = if block.is_locked { "locked" } else { "active" };
    let title = if block.title.is_empty() {
        "Блок обучения"
    } else {
        &block.title
    };
    let description = if block.description.is_empty() {
        "Изучение новых слов"
    } else {
        &block.description
    };

    html! {
        div class={ "block-card " (card_state) } data-block-id=(block.id.0) {
            div class="block-header" {
                div class="block-title" {
                    div class="block-icon" { i class={ "fas " (icon) } {} }
                    (title)
                }
                div class="block-status" {
                    @if block.is_locked {
                        span class="status-locked" { i class="fas fa-lock" {} " Заблокировано" }
                    } @else {
                        span class="status-active" { i class="fas fa-play" {} " Доступно" }
                    }
                }
            }
            div class="block-description" { (description) }
            div class="block-progress" {
                div class="progress-text" { (progress_text) }
                div class="progress-percent" { (percentage) "%" }
            }
            @if block.is_locked {
                div class="lock-overlay" {
                    div class="lock-icon" { i class="fas fa-lock" {} }
                    div class="lock-text" { (unlock_message(block)) }
                }
            }
        }
    }
}
