use std::sync::Arc;

use maud::{html, Markup};
use shared::{
    domain::{BlockId, LessonId},
    error::{ApiException, ErrorCode},
    protocol::{BlockBundle, BlockLesson, CompleteBlockResponse},
};
use tracing::{error, info};

use super::{handle_page_error, percent_of};
use crate::{
    api::Backend,
    document::{Document, Toast},
};

pub const BLOCK_INFO: &str = "block-info";
pub const LESSONS_CONTAINER: &str = "lessons-container";
pub const TEST_BUTTON: &str = "test-button";
const PREVIEW_WORDS: usize = 3;

pub struct BlockPage {
    block_id: BlockId,
    backend: Backend,
    document: Arc<dyn Document>,
    data: Option<BlockBundle>,
}

impl BlockPage {
    pub fn new(block_id: BlockId, backend: Backend, document: Arc<dyn Document>) -> Self {
        Self {
            block_id,
            backend,
            document,
            data: None,
        }
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    pub fn data(&self) -> Option<&BlockBundle> {
        self.data.as_ref()
    }

    pub async fn initialize(&mut self) -> Result<(), ApiException> {
        info!(block_id = self.block_id.0, "block: loading");
        match self.backend.block_detail(self.block_id).await {
            Ok(bundle) => {
                self.data = Some(bundle);
                self.render();
                Ok(())
            }
            Err(err) => {
                let message = format!("Не удалось загрузить данные блока: {}", err.message);
                handle_page_error(self.document.as_ref(), BLOCK_INFO, &message, &err);
                Err(err)
            }
        }
    }

    pub async fn refresh(&mut self) -> Result<(), ApiException> {
        self.initialize().await
    }

    pub fn render(&self) {
        let Some(data) = &self.data else {
            return;
        };
        let document = self.document.as_ref();
        document.set_text("block-title", &data.block.title);
        document.render(BLOCK_INFO, block_overview(data));
        document.render(LESSONS_CONTAINER, lessons_list(&data.lessons));

        let ready = self.all_lessons_completed();
        document.set_class(TEST_BUTTON, "disabled", !ready);
        document.set_text(
            TEST_BUTTON,
            if ready {
                "Начать финальный тест блока"
            } else {
                "Завершите все уроки для доступа к тесту"
            },
        );
    }

    /// A block without lessons has nothing to test.
    pub fn all_lessons_completed(&self) -> bool {
        self.data.as_ref().is_some_and(|data| {
            !data.lessons.is_empty() && data.lessons.iter().all(|lesson| lesson.progress.is_completed)
        })
    }

    pub fn open_lesson(&self, lesson_id: LessonId) -> bool {
        let Some(data) = &self.data else {
            return false;
        };
        let Some(index) = data.lessons.iter().position(|lesson| lesson.id == lesson_id) else {
            return false;
        };
        if lesson_locked(&data.lessons, index) {
            info!(lesson_id = lesson_id.0, "block: lesson is locked");
            return false;
        }
        self.document.navigate(&format!("/app/lesson/{lesson_id}/"));
        true
    }

    pub fn start_quick_review(&self, lesson_id: LessonId) {
        info!(lesson_id = lesson_id.0, "block: quick review requested");
        self.document.toast(Toast::info(
            "Функция быстрого обзора будет доступна в следующем обновлении!",
        ));
    }

    /// Checks the test can start before leaving for the test page.
    pub async fn start_test(&self) -> bool {
        if !self.all_lessons_completed() {
            self.document.toast(Toast::warning(
                "Завершите все уроки блока для доступа к тесту!",
            ));
            return false;
        }
        match self.backend.start_block_test(self.block_id).await {
            Ok(bundle) if !bundle.words.is_empty() => {
                self.document
                    .navigate(&format!("/app/block-test/{}/", self.block_id));
                true
            }
            Ok(_) => {
                self.document
                    .toast(Toast::error("Не удалось загрузить данные теста"));
                false
            }
            Err(err) => {
                error!(block_id = self.block_id.0, error = %err, "block: test start failed");
                let toast = match err.code {
                    ErrorCode::Locked => Toast::warning("Завершите все уроки блока перед тестом!"),
                    ErrorCode::PaymentRequired => Toast::error("Доступ к тесту требует оплаты"),
                    _ => Toast::error("Ошибка при запуске теста. Попробуйте снова."),
                };
                self.document.toast(toast);
                false
            }
        }
    }

    /// Marks the block complete after a passed test. Nothing is sent otherwise.
    pub async fn submit_test_results(&mut self, is_passed: bool) -> Option<CompleteBlockResponse> {
        if !is_passed {
            return None;
        }
        match self.backend.complete_block(self.block_id).await {
            Ok(result) => {
                if result.next_block_available {
                    self.document.toast(Toast::success(
                        "Блок завершен! Следующий блок разблокирован.",
                    ));
                    if let Err(err) = self.refresh().await {
                        error!(error = %err, "block: refresh after completion failed");
                    }
                } else {
                    self.document.toast(Toast::success("Блок завершен!"));
                }
                Some(result)
            }
            Err(err) => {
                error!(block_id = self.block_id.0, error = %err, "block: completion failed");
                self.document
                    .toast(Toast::error("Ошибка сохранения прогресса блока"));
                None
            }
        }
    }
}

/// The first lesson is always open; every other one needs its predecessor completed.
pub fn lesson_locked(lessons: &[BlockLesson], index: usize) -> bool {
    match index.checked_sub(1).and_then(|previous| lessons.get(previous)) {
        Some(previous) => !previous.progress.is_completed,
        None => false,
    }
}

pub fn learned_words(lesson: &BlockLesson) -> usize {
    lesson.words.iter().filter(|word| word.is_learned).count()
}

pub fn lesson_progress(lesson: &BlockLesson) -> u32 {
    percent_of(learned_words(lesson) as u32, lesson.words.len() as u32)
}

fn block_overview(data: &BlockBundle) -> Markup {
    let total = data.lessons.len() as u32;
    let completed = data
        .lessons
        .iter()
        .filter(|lesson| lesson.progress.is_completed)
        .count() as u32;
    html! {
        div class="block-overview" {
            div class="overview-stats" {
                div class="stat" { div class="stat-value" { (total) } div class="stat-label" { "уроков" } }
                div class="stat" { div class="stat-value" { (completed) } div class="stat-label" { "завершено" } }
                div class="stat" {
                    div class="stat-value" { (percent_of(completed, total)) "%" }
                    div class="stat-label" { "прогресс" }
                }
            }
            div class="block-description" { p { (data.block.description) } }
        }
    }
}

fn lessons_list(lessons: &[BlockLesson]) -> Markup {
    if lessons.is_empty() {
        return html! { div class="error-state" { p { "Уроки не найдены" } } };
    }
    html! {
        @for (index, lesson) in lessons.iter().enumerate() {
            (lesson_card(lessons, index, lesson))
        }
    }
}

fn lesson_card(lessons: &[BlockLesson], index: usize, lesson: &BlockLesson) -> Markup {
    let locked = lesson_locked(lessons, index);
    let completed = lesson.progress.is_completed;
    let icon = if locked {
        "fa-lock"
    } else if completed {
        "fa-check-circle"
    } else {
        "fa-play-circle"
    };
    let progress = lesson_progress(lesson);
    let hidden_words = lesson.words.len().saturating_sub(PREVIEW_WORDS);

    html! {
        div.lesson-card.compact.locked[locked].completed[completed] data-lesson-id=(lesson.id.0) {
            @if locked {
                div class="lock-overlay" {
                    div class="lock-icon" { i class="fas fa-lock" {} }
                    div class="lock-text" { "Пройдите предыдущий урок для разблокировки" }
                }
            }
            div class="lesson-header" {
                div class="lesson-icon" { i class={ "fas " (icon) } {} }
                div class="lesson-info" {
                    h3 { (lesson.title) }
                    p { (lesson.words.len()) " слов для изучения" }
                }
                div class="lesson-status" {
                    @if locked {
                        span class="status-locked" { "Заблокировано" }
                    } @else if completed {
                        span class="status-completed" { "Завершено" }
                    } @else {
                        span class="status-pending" { "Доступно" }
                    }
                }
            }
            div class="lesson-progress" {
                div class="progress-text" {
                    span class="progress-count" {
                        (learned_words(lesson)) "/" (lesson.words.len()) " слов изучено"
                    }
                    span class="progress-percent" { (progress) "%" }
                }
                div class="progress-bar" {
                    div class="progress-fill" style={ "width: " (progress) "%" } {}
                }
            }
            @if !locked && !completed {
                div class="words-preview" {
                    @for word in lesson.words.iter().take(PREVIEW_WORDS) {
                        div.word-badge.learned[word.is_learned] { (word.arabic) }
                    }
                    @if hidden_words > 0 {
                        div class="word-badge" { "+" (hidden_words) }
                    }
                }
            }
            @if locked {
                @if let Some(previous) = index.checked_sub(1).and_then(|previous| lessons.get(previous)) {
                    div class="unlock-info" {
                        "Завершите урок \"" (previous.title) "\" для разблокировки"
                    }
                }
            }
        }
    }
}
