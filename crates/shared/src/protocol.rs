use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BlockId, LessonId, StudySessionId, TestId, TimeSlot, UserId, WordId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram_username: Option<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_joined: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTokenRequest {
    pub token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifyTokenResponse {
    #[serde(default)]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub id: WordId,
    pub arabic: String,
    pub translation: String,
    #[serde(default)]
    pub transcription: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub example_verse: String,
    #[serde(default)]
    pub example_translation: String,
    #[serde(default)]
    pub is_learned: bool,
    #[serde(default)]
    pub accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LessonProgress {
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub time_spent: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonSummary {
    pub id: LessonId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_title: Option<String>,
    #[serde(default)]
    pub progress: LessonProgress,
}

/// Response of `GET /lessons/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonBundle {
    pub lesson: LessonSummary,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdateRequest {
    pub word_id: WordId,
    pub is_correct: bool,
    pub lesson_id: LessonId,
    /// Seconds since the lesson run started.
    pub time_spent: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordProgress {
    #[serde(default)]
    pub is_learned: bool,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub total_attempts: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressUpdateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<WordProgress>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteLessonRequest {
    pub lesson_id: LessonId,
    pub score: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteLessonResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub lesson_completed: bool,
    #[serde(default)]
    pub all_lessons_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_id: Option<BlockId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_words: u32,
    #[serde(default)]
    pub learned_words: u32,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub total_study_time: i64,
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub today_words: u32,
    #[serde(default)]
    pub today_lessons: u32,
    #[serde(default)]
    pub today_time: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockProgressSummary {
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub lessons_completed: u32,
    #[serde(default)]
    pub total_lessons: u32,
    #[serde(default)]
    pub overall_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardBlock {
    pub id: BlockId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub total_words: u32,
    #[serde(default)]
    pub learned_words: u32,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<BlockProgressSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<String>,
}

/// Response of `GET /dashboard/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    pub stats: DashboardStats,
    pub blocks: Vec<DashboardBlock>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub id: BlockId,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockLesson {
    pub id: LessonId,
    pub title: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub progress: LessonProgress,
    #[serde(default)]
    pub words: Vec<Word>,
}

/// Response of `GET /blocks/{id}/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBundle {
    pub block: BlockInfo,
    pub lessons: Vec<BlockLesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteBlockRequest {
    pub block_id: BlockId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteBlockResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub block_completed: bool,
    #[serde(default)]
    pub next_block_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_block_id: Option<BlockId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestWord {
    pub id: WordId,
    pub arabic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcription: Option<String>,
}

fn default_passing_score() -> u32 {
    80
}

/// Response of `GET /block-test/{block_id}/start/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTestBundle {
    pub test_id: TestId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_passing_score")]
    pub passing_score: u32,
    pub words: Vec<TestWord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitBlockTestRequest {
    /// Keyed by word id; JSON object keys are strings.
    pub answers: BTreeMap<String, String>,
    pub score: u32,
    pub time_spent: u64,
    pub is_passed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitBlockTestResponse {
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub is_passed: bool,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default = "default_passing_score")]
    pub passing_score: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBlockProgress {
    pub block_id: BlockId,
    pub title: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub lessons_completed: u32,
    #[serde(default)]
    pub total_lessons: u32,
    #[serde(default)]
    pub learned_words: u32,
    #[serde(default)]
    pub total_words: u32,
    #[serde(default)]
    pub overall_accuracy: f64,
}

/// Response of `GET /user/profile/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBundle {
    pub user: UserSummary,
    pub stats: DashboardStats,
    #[serde(default)]
    pub blocks_progress: Vec<ProfileBlockProgress>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressOverview {
    #[serde(default)]
    pub total_words: u32,
    #[serde(default)]
    pub learned_words: u32,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub total_study_time: i64,
    #[serde(default)]
    pub total_sessions: u32,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub average_accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    #[serde(default)]
    pub words_learned: u32,
    #[serde(default)]
    pub lessons_completed: u32,
    #[serde(default)]
    pub time_studied: i64,
    #[serde(default)]
    pub accuracy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockProgressDetail {
    pub id: BlockId,
    pub title: String,
    #[serde(default)]
    pub total_words: u32,
    #[serde(default)]
    pub learned_words: u32,
    #[serde(default)]
    pub progress_percentage: f64,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub accuracy: f64,
}

/// Minutes studied per time of day over the last 30 days.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeDistribution {
    #[serde(default)]
    pub morning: i64,
    #[serde(default)]
    pub afternoon: i64,
    #[serde(default)]
    pub evening: i64,
    #[serde(default)]
    pub night: i64,
}

impl TimeDistribution {
    pub fn minutes(&self, slot: TimeSlot) -> i64 {
        match slot {
            TimeSlot::Morning => self.morning,
            TimeSlot::Afternoon => self.afternoon,
            TimeSlot::Evening => self.evening,
            TimeSlot::Night => self.night,
        }
    }

    pub fn total(&self) -> i64 {
        TimeSlot::ALL.iter().map(|slot| self.minutes(*slot)).sum()
    }

    /// Slot with the most minutes; the earliest slot wins ties.
    pub fn busiest(&self) -> TimeSlot {
        let mut best = TimeSlot::Morning;
        for slot in TimeSlot::ALL {
            if self.minutes(slot) > self.minutes(best) {
                best = slot;
            }
        }
        best
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudyHabits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favorite_time: Option<TimeSlot>,
    #[serde(default)]
    pub average_session_time: f64,
    #[serde(default)]
    pub words_per_day: f64,
    #[serde(default)]
    pub total_study_days: u32,
}

/// Response of `GET /progress/detailed/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedProgress {
    pub overview: ProgressOverview,
    #[serde(default)]
    pub chart_data: Vec<DailyActivity>,
    #[serde(default)]
    pub blocks_progress: Vec<BlockProgressDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_distribution: Option<TimeDistribution>,
    #[serde(default)]
    pub achievements: Vec<Achievement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_habits: Option<StudyHabits>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSession {
    pub start_time: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub lessons_count: u32,
    #[serde(default)]
    pub words_count: u32,
    #[serde(default)]
    pub accuracy: f64,
}

/// Response of `GET /progress/detail/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    #[serde(default)]
    pub weekly_progress: Vec<DailyActivity>,
    #[serde(default)]
    pub blocks_progress: Vec<ProfileBlockProgress>,
    #[serde(default)]
    pub recent_sessions: Vec<RecentSession>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: StudySessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndSessionRequest {
    pub session_id: StudySessionId,
    pub lessons_studied: Vec<LessonId>,
    pub words_reviewed: Vec<WordId>,
    pub average_accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: StudySessionId,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub lessons_count: u32,
    #[serde(default)]
    pub words_count: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndSessionResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSummary>,
}
