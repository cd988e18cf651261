use std::sync::Arc;

use chrono::Datelike;
use maud::{html, Markup};
use shared::{
    domain::TimeSlot,
    error::ApiException,
    protocol::{
        Achievement, BlockProgressDetail, DailyActivity, DetailedProgress, ProgressSummary,
        RecentSession, StudyHabits, TimeDistribution,
    },
};
use tracing::{debug, warn};

use super::{format_time, handle_page_error, percent_of};
use crate::{api::Backend, document::Document};

pub const PROGRESS_CONTENT: &str = "progress-content";
pub const CHART_DAYS: usize = 7;
/// Words in a day that fill the activity bar.
pub const FULL_DAY_WORDS: f64 = 20.0;
/// Minutes in a day that fill the time bar.
pub const FULL_DAY_MINUTES: f64 = 60.0;

const DAY_NAMES: [&str; 7] = ["Вс", "Пн", "Вт", "Ср", "Чт", "Пт", "Сб"];

pub struct ProgressPage {
    backend: Backend,
    document: Arc<dyn Document>,
    data: Option<DetailedProgress>,
    summary: Option<ProgressSummary>,
}

impl ProgressPage {
    pub fn new(backend: Backend, document: Arc<dyn Document>) -> Self {
        Self {
            backend,
            document,
            data: None,
            summary: None,
        }
    }

    pub fn data(&self) -> Option<&DetailedProgress> {
        self.data.as_ref()
    }

    pub fn summary(&self) -> Option<&ProgressSummary> {
        self.summary.as_ref()
    }

    pub async fn initialize(&mut self) -> Result<(), ApiException> {
        match self.backend.progress_detailed().await {
            Ok(data) => {
                debug!(days = data.chart_data.len(), "progress: data loaded");
                self.data = Some(data);
                self.render();
                Ok(())
            }
            Err(err) => {
                handle_page_error(
                    self.document.as_ref(),
                    PROGRESS_CONTENT,
                    "Не удалось загрузить данные прогресса",
                    &err,
                );
                Err(err)
            }
        }
    }

    /// Recent sessions from the weekly summary. A failure leaves the rest of
    /// the page untouched.
    pub async fn load_summary(&mut self) {
        match self.backend.progress_summary().await {
            Ok(summary) => {
                self.document
                    .render("recent-sessions", recent_sessions(&summary.recent_sessions));
                self.summary = Some(summary);
            }
            Err(err) => warn!(error = %err, "progress: weekly summary unavailable"),
        }
    }

    pub fn render(&self) {
        let Some(data) = &self.data else {
            return;
        };
        let document = self.document.as_ref();
        let overview = &data.overview;
        document.set_text(
            "overall-progress",
            &format!("{}%", overview.progress_percentage),
        );
        document.set_width("overall-progress-bar", overview.progress_percentage);
        document.set_text("total-study-time", &format_time(overview.total_study_time));
        document.set_text("total-sessions", &overview.total_sessions.to_string());
        document.set_text("current-streak", &format!("{} дней", overview.current_streak));
        document.set_text("longest-streak", &format!("{} дней", overview.longest_streak));
        document.set_text("average-accuracy", &format!("{}%", overview.average_accuracy));

        document.render("weekly-activity", weekly_activity(&data.chart_data));
        document.render("blocks-progress", blocks_progress(&data.blocks_progress));
        if let Some(distribution) = &data.time_distribution {
            let favorite = data
                .study_habits
                .as_ref()
                .and_then(|habits| habits.favorite_time);
            document.render("time-distribution", time_distribution(distribution, favorite));
        }
        if let Some(habits) = &data.study_habits {
            document.render("study-habits", study_habits(habits));
        }
        document.render("achievements-list", achievements(&data.achievements));
    }
}

/// The most recent `CHART_DAYS` entries, oldest first.
pub fn last_days(chart: &[DailyActivity]) -> &[DailyActivity] {
    &chart[chart.len().saturating_sub(CHART_DAYS)..]
}

/// Bar heights in percent: `(words, time)`, each capped at 100.
pub fn day_bar_heights(day: &DailyActivity) -> (f64, f64) {
    let words = (f64::from(day.words_learned) / FULL_DAY_WORDS * 100.0).min(100.0);
    let time = (day.time_studied as f64 / FULL_DAY_MINUTES * 100.0).min(100.0);
    (words, time)
}

pub fn day_name(day: &DailyActivity) -> &'static str {
    DAY_NAMES[day.date.weekday().num_days_from_sunday() as usize]
}

fn weekly_activity(chart: &[DailyActivity]) -> Markup {
    if chart.is_empty() {
        return html! { div class="no-data" { "Нет данных за последние 30 дней" } };
    }
    let days = last_days(chart);
    let words: u32 = days.iter().map(|day| day.words_learned).sum();
    let minutes: i64 = days.iter().map(|day| day.time_studied).sum();
    html! {
        div class="weekly-header" {
            h3 { "Активность за неделю" }
            div class="weekly-stats" {
                span class="stat-badge" { (words) " слов" }
                span class="stat-badge" { (minutes) " мин" }
            }
        }
        div class="days-grid" {
            @for day in days {
                @let (words_height, time_height) = day_bar_heights(day);
                div class="day-bar" {
                    div class="bar-container" {
                        div class="time-bar" style={ "height: " (time_height) "%" } {}
                        div class="words-bar" style={ "height: " (words_height) "%" } {}
                    }
                    div class="day-label" {
                        div class="day-name" { (day_name(day)) }
                        div class="day-number" { (day.date.day()) }
                    }
                    div class="day-stats" {
                        small { (day.words_learned) " сл" }
                        small { (day.time_studied) " мин" }
                    }
                }
            }
        }
    }
}

fn blocks_progress(blocks: &[BlockProgressDetail]) -> Markup {
    if blocks.is_empty() {
        return html! { div class="no-data" { "Нет данных по блокам" } };
    }
    html! {
        @for block in blocks {
            div.block-progress-item.completed[block.is_completed] {
                div class="block-progress-header" {
                    div class="block-title" { (block.title) }
                    div class="block-percent" { (block.progress_percentage) "%" }
                }
                div class="block-progress-bar" {
                    div class="block-progress-fill" style={ "width: " (block.progress_percentage) "%" } {}
                }
                div class="block-progress-details" {
                    div class="block-stat" { (block.learned_words) "/" (block.total_words) " слов" }
                    div class="block-stat" { (block.accuracy) "% точность" }
                    div class="block-stat" {
                        (if block.is_completed { "Завершен" } else { "В процессе" })
                    }
                }
            }
        }
    }
}

fn time_distribution(distribution: &TimeDistribution, favorite: Option<TimeSlot>) -> Markup {
    let total = distribution.total();
    let busiest = distribution.busiest();
    html! {
        div class="time-distribution-grid" {
            @for slot in TimeSlot::ALL {
                @let minutes = distribution.minutes(slot);
                div.time-slot.highlight[slot == busiest] {
                    div class="time-label" { (slot.label()) }
                    div class="time-value" { (minutes) " мин" }
                    div class="time-percent" {
                        (percent_of(minutes.max(0) as u32, total.max(0) as u32)) "%"
                    }
                }
            }
        }
        div class="time-summary" {
            "Любимое время для учебы: "
            strong { (favorite.unwrap_or(TimeSlot::Evening).label()) }
        }
    }
}

fn study_habits(habits: &StudyHabits) -> Markup {
    html! {
        div class="habits-grid" {
            div class="habit-card" {
                div class="habit-value" { (habits.words_per_day) }
                div class="habit-label" { "слов в день в среднем" }
            }
            div class="habit-card" {
                div class="habit-value" { (habits.total_study_days) }
                div class="habit-label" { "дней обучения" }
            }
            div class="habit-card" {
                div class="habit-value" { (habits.average_session_time.round()) }
                div class="habit-label" { "мин за сессию" }
            }
        }
    }
}

fn achievements(achievements: &[Achievement]) -> Markup {
    if achievements.is_empty() {
        return html! { div class="no-data" { "Достижений пока нет" } };
    }
    html! {
        @for achievement in achievements {
            div class="achievement-card" {
                div class="achievement-icon" { (achievement.icon) }
                div class="achievement-content" {
                    div class="achievement-name" { (achievement.name) }
                    div class="achievement-description" { (achievement.description) }
                    @if let Some(earned_at) = &achievement.earned_at {
                        div class="achievement-date" { "Получено: " (earned_at) }
                    }
                }
            }
        }
    }
}

fn recent_sessions(sessions: &[RecentSession]) -> Markup {
    html! {
        @for session in sessions {
            div class="session-item" {
                div class="session-start" { (session.start_time) }
                div class="session-duration" { (format_time(session.duration)) }
                div class="session-stats" {
                    (session.lessons_count) " уроков, " (session.words_count) " слов, "
                    (session.accuracy) "%"
                }
            }
        }
    }
}
