use std::sync::Arc;

use maud::{html, Markup};
use shared::{domain::BlockId, error::ApiException, protocol::DashboardBlock};
use tracing::debug;

use super::handle_page_error;
use crate::{
    api::Backend,
    document::{Document, Toast},
};

pub const COURSES_CONTAINER: &str = "courses-container";

const BLOCK_ICONS: [&str; 7] = [
    "fa-seedling",
    "fa-leaf",
    "fa-tree",
    "fa-apple-alt",
    "fa-star",
    "fa-gem",
    "fa-crown",
];

pub fn block_icon(order: u32) -> &'static str {
    BLOCK_ICONS[order as usize % BLOCK_ICONS.len()]
}

/// Course list built from the same bundle as the dashboard.
pub struct CoursesPage {
    backend: Backend,
    document: Arc<dyn Document>,
    blocks: Vec<DashboardBlock>,
}

impl CoursesPage {
    pub fn new(backend: Backend, document: Arc<dyn Document>) -> Self {
        Self {
            backend,
            document,
            blocks: Vec::new(),
        }
    }

    pub fn blocks(&self) -> &[DashboardBlock] {
        &self.blocks
    }

    pub async fn initialize(&mut self) -> Result<(), ApiException> {
        let bundle = match self.backend.dashboard().await {
            Ok(bundle) => bundle,
            Err(err) => {
                handle_page_error(
                    self.document.as_ref(),
                    COURSES_CONTAINER,
                    "Не удалось загрузить курсы",
                    &err,
                );
                return Err(err);
            }
        };
        debug!(blocks = bundle.blocks.len(), "courses: data loaded");
        self.blocks = bundle.blocks;
        self.render();
        Ok(())
    }

    pub fn render(&self) {
        self.document
            .render(COURSES_CONTAINER, courses_list(&self.blocks));
    }

    pub fn start_block(&self, block_id: BlockId) -> bool {
        let open = self
            .blocks
            .iter()
            .any(|block| block.id == block_id && !block.is_locked);
        if open {
            self.document.navigate(&format!("/app/block/{block_id}/"));
        }
        open
    }

    pub fn start_review(&self) {
        self.document
            .toast(Toast::info("Функция повторения скоро будет доступна!"));
    }
}

/// Share of learned words, 0 for a block without words.
pub fn word_progress(block: &DashboardBlock) -> f64 {
    if block.total_words == 0 {
        return 0.0;
    }
    f64::from(block.learned_words) / f64::from(block.total_words) * 100.0
}

fn courses_list(blocks: &[DashboardBlock]) -> Markup {
    html! {
        @for block in blocks {
            div.course-card.locked[block.is_locked] data-block-id=(block.id.0) {
                div class="course-header" {
                    div class="course-icon" { i class={ "fas " (block_icon(block.order)) } {} }
                    div class="course-info" {
                        h3 { (block.title) }
                        p { (block.description) }
                    }
                    div class="course-status" {
                        i class={ "fas " (if block.is_locked { "fa-lock" } else { "fa-play" }) } {}
                    }
                }
                div class="course-progress" {
                    div class="progress-text" { (block.learned_words) "/" (block.total_words) " слов" }
                    div class="progress-bar" {
                        div class="progress-fill" style={ "width: " (word_progress(block)) "%" } {}
                    }
                }
                @if !block.is_locked {
                    div class="course-actions" {
                        button class="btn-primary" data-action="start-block" { "Продолжить" }
                    }
                }
            }
        }
    }
}
