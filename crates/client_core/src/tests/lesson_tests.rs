use std::{sync::Arc, time::Duration};

use serde_json::json;
use shared::{
    domain::{LessonId, Stage},
    error::ErrorCode,
};

use crate::{
    document::{MemoryDocument, Toast, ToastKind},
    exercises::SequenceError,
    pages::lesson::{
        LessonPage, LessonSettings, BLOCK_TEST_UNLOCKED, EMPTY_ANSWER, LESSON_COMPLETED,
        LESSON_CONTENT,
    },
    progress::{ProgressSavePolicy, PROGRESS_SAVE_FAILED},
    support::*,
};

const LESSON: LessonId = LessonId(3);
const LESSON_ENDPOINT: &str = "/lessons/3/";

fn settings(policy: ProgressSavePolicy) -> LessonSettings {
    LessonSettings {
        answer_delay: Duration::ZERO,
        writing_delay: Duration::ZERO,
        audio_preload_timeout: Duration::from_millis(50),
        progress_policy: policy,
        exercise_seed: Some(5),
    }
}

struct Harness {
    api: Arc<ScriptedApi>,
    document: Arc<MemoryDocument>,
    page: LessonPage,
}

fn harness(word_count: usize, policy: ProgressSavePolicy, media: FakeMedia) -> Harness {
    let api = ScriptedApi::new();
    api.respond(LESSON_ENDPOINT, lesson_json(LESSON.0, &words(word_count)));
    let document = Arc::new(MemoryDocument::new());
    let page = LessonPage::new(
        LESSON,
        backend(&api),
        document.clone(),
        Arc::new(media),
        settings(policy),
    );
    Harness {
        api,
        document,
        page,
    }
}

/// Text or option that answers the current question the wanted way.
async fn answer_current(page: &mut LessonPage, correct: bool) -> Result<bool, SequenceError> {
    let sequencer = page.sequencer().expect("loaded");
    let stage = sequencer.stage();
    let index = sequencer.current_question_index().expect("pending");
    let exercises = sequencer.exercises();
    let outcome = match stage {
        Stage::TrueFalse => {
            let value = exercises.true_false.questions()[index].correct_answer == correct;
            page.answer_true_false(index, value).await?
        }
        Stage::Audio => {
            let option = exercises.audio.questions()[index]
                .options
                .iter()
                .position(|option| option.is_correct == correct)
                .unwrap_or(0);
            page.answer_audio(index, option).await?
        }
        Stage::Writing => {
            let text = if correct {
                exercises.writing.questions()[index].word.translation.clone()
            } else {
                "мимо".to_string()
            };
            page.submit_writing(&text).await?
        }
        other => panic!("nothing to answer on {other}"),
    };
    Ok(outcome.is_correct)
}

fn has_toast(document: &MemoryDocument, toast: Toast) -> bool {
    document.toasts().contains(&toast)
}

#[tokio::test]
async fn initialize_shows_first_card_and_preloads_audio() {
    let media = FakeMedia::new().failing("/media/audio/2.mp3");
    let mut h = harness(4, ProgressSavePolicy::AwaitThenContinue, media);

    h.page.initialize().await.expect("lesson loads");

    assert_eq!(h.document.text("lesson-title").as_deref(), Some("Урок 1"));
    assert!(h.document.has_class("stage-cards", "active"));
    assert!(!h.document.has_class("stage-exercise1", "active"));
    assert_eq!(h.document.width("progress-bar"), Some(0.0));
    assert_eq!(h.page.audio().len(), 3);
    assert!(!h.document.has_class("card-audio-btn", "hidden"));
    assert!(h.document.has_class("prev-card-btn", "disabled"));
    assert_eq!(h.document.text("card-example-verse").as_deref(), Some("Пример не указан"));

    assert!(h.page.next_card());
    assert!(h.document.has_class("card-audio-btn", "hidden"));
    assert!(!h.document.has_class("prev-card-btn", "disabled"));
    assert_eq!(h.document.text("cards-counter").as_deref(), Some("2/4"));
}

#[tokio::test]
async fn slow_audio_counts_as_loaded() {
    let media = FakeMedia::new().slow("/media/audio/1.mp3");
    let mut h = harness(2, ProgressSavePolicy::AwaitThenContinue, media);

    h.page.initialize().await.expect("lesson loads");

    assert!(h.page.audio().contains("/media/audio/1.mp3"));
    assert_eq!(h.page.audio().len(), 2);
}

#[tokio::test]
async fn failed_load_renders_inline_error() {
    let api = ScriptedApi::new();
    api.fail(LESSON_ENDPOINT, api_error(ErrorCode::Http, "HTTP error! status: 500"));
    let document = Arc::new(MemoryDocument::new());
    let mut page = LessonPage::new(
        LESSON,
        backend(&api),
        document.clone(),
        Arc::new(FakeMedia::new()),
        settings(ProgressSavePolicy::BestEffort),
    );

    let err = page.initialize().await.expect_err("load fails");

    assert_eq!(err.code, ErrorCode::Http);
    let html = document.html(LESSON_CONTENT).expect("error rendered");
    assert!(html.contains("Не удалось загрузить урок"));
    assert!(page.sequencer().is_none());
}

#[tokio::test]
async fn locked_lesson_shows_server_message() {
    let api = ScriptedApi::new();
    api.respond(
        LESSON_ENDPOINT,
        json!({ "error": "Сначала завершите предыдущий урок", "is_locked": true }),
    );
    let document = Arc::new(MemoryDocument::new());
    let mut page = LessonPage::new(
        LESSON,
        backend(&api),
        document.clone(),
        Arc::new(FakeMedia::new()),
        settings(ProgressSavePolicy::BestEffort),
    );

    let err = page.initialize().await.expect_err("locked");

    assert_eq!(err.code, ErrorCode::Locked);
    let html = document.html(LESSON_CONTENT).expect("error rendered");
    assert!(html.contains("Сначала завершите предыдущий урок"));
    assert!(document.navigations().is_empty());
}

#[tokio::test]
async fn unauthorized_load_leaves_for_home() {
    let api = ScriptedApi::new();
    api.fail(LESSON_ENDPOINT, api_error(ErrorCode::Unauthorized, "Не авторизован"));
    let document = Arc::new(MemoryDocument::new());
    let mut page = LessonPage::new(
        LESSON,
        backend(&api),
        document.clone(),
        Arc::new(FakeMedia::new()),
        settings(ProgressSavePolicy::BestEffort),
    );

    assert!(page.initialize().await.is_err());
    assert_eq!(document.navigations(), vec!["/".to_string()]);
}

#[tokio::test]
async fn full_run_saves_progress_and_reports_completion_once() {
    let mut h = harness(6, ProgressSavePolicy::AwaitThenContinue, FakeMedia::new());
    h.api.respond("/progress/update/", json!({ "success": true }));
    h.api.respond(
        "/lessons/complete/",
        json!({ "success": true, "lesson_completed": true, "all_lessons_completed": true, "block_id": 1 }),
    );
    h.page.initialize().await.expect("lesson loads");

    assert_eq!(h.page.start_exercises().await, Ok(Stage::TrueFalse));
    assert!(h.document.has_class("lesson-progress", "visible"));
    assert_eq!(h.document.width("progress-bar"), Some(25.0));
    assert_eq!(h.document.text("true-false-counter").as_deref(), Some("1/3"));

    let mut stages = Vec::new();
    while h.page.stage() != Some(Stage::Results) {
        stages.push(h.page.stage());
        assert!(answer_current(&mut h.page, true).await.expect("answered"));
    }
    stages.dedup();
    assert_eq!(
        stages,
        vec![Some(Stage::TrueFalse), Some(Stage::Audio), Some(Stage::Writing)]
    );

    let updates = h.api.calls_to("/progress/update/");
    assert_eq!(updates.len(), 9);
    let first = updates[0].body.as_ref().expect("body");
    assert_eq!(first["lesson_id"], 3);
    assert_eq!(first["is_correct"], true);

    let completions = h.api.calls_to("/lessons/complete/");
    assert_eq!(completions.len(), 1);
    assert_eq!(
        completions[0].body,
        Some(json!({ "lesson_id": 3, "score": 100 }))
    );
    assert_eq!(h.document.text("final-score").as_deref(), Some("100%"));
    assert!(h.document.has_class("stage-results", "active"));
    assert!(has_toast(&h.document, Toast::success(LESSON_COMPLETED)));
    assert!(has_toast(&h.document, Toast::success(BLOCK_TEST_UNLOCKED)));

    let again = h.page.show_results().await.expect("results");
    assert_eq!(again.percentage, 100);
    assert_eq!(h.api.calls_to("/lessons/complete/").len(), 1);
}

#[tokio::test]
async fn lesson_without_words_reports_completion_on_start() {
    let mut h = harness(0, ProgressSavePolicy::AwaitThenContinue, FakeMedia::new());
    h.api.respond("/lessons/complete/", json!({ "success": true, "lesson_completed": true }));
    h.page.initialize().await.expect("lesson loads");

    assert_eq!(h.page.start_exercises().await, Ok(Stage::Results));
    assert_eq!(h.document.text("final-score").as_deref(), Some("0%"));

    let completions = h.api.calls_to("/lessons/complete/");
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].body, Some(json!({ "lesson_id": 3, "score": 0 })));
    assert!(h.api.calls_to("/progress/update/").is_empty());

    h.page.show_results().await.expect("results");
    assert_eq!(h.api.calls_to("/lessons/complete/").len(), 1);
}

#[tokio::test]
async fn failed_progress_save_does_not_hold_the_lesson() {
    let mut h = harness(6, ProgressSavePolicy::BestEffort, FakeMedia::new());
    h.page.initialize().await.expect("lesson loads");
    h.page.start_exercises().await.expect("start");

    answer_current(&mut h.page, true).await.expect("answered");
    h.page.flush_progress().await;

    assert_eq!(h.document.text("true-false-counter").as_deref(), Some("2/3"));
    assert_eq!(h.api.calls_to("/progress/update/").len(), 1);
    assert!(has_toast(&h.document, Toast::error(PROGRESS_SAVE_FAILED)));
}

#[tokio::test]
async fn failed_completion_is_not_retried_within_the_run() {
    let mut h = harness(3, ProgressSavePolicy::AwaitThenContinue, FakeMedia::new());
    h.api.respond("/progress/update/", json!({ "success": true }));
    h.page.initialize().await.expect("lesson loads");
    h.page.start_exercises().await.expect("start");

    while h.page.stage() != Some(Stage::Results) {
        answer_current(&mut h.page, false).await.expect("answered");
    }
    h.page.show_results().await;

    assert_eq!(h.api.calls_to("/lessons/complete/").len(), 1);
    let errors: Vec<Toast> = h
        .document
        .toasts()
        .into_iter()
        .filter(|toast| toast.kind == ToastKind::Error)
        .collect();
    assert_eq!(errors, vec![Toast::error("Ошибка сохранения прогресса урока")]);
    assert_eq!(h.document.text("final-score").as_deref(), Some("0%"));
}

#[tokio::test]
async fn blank_writing_answer_warns_and_keeps_question() {
    let mut h = harness(6, ProgressSavePolicy::AwaitThenContinue, FakeMedia::new());
    h.api.respond("/progress/update/", json!({ "success": true }));
    h.page.initialize().await.expect("lesson loads");
    h.page.start_exercises().await.expect("start");
    while h.page.stage() != Some(Stage::Writing) {
        answer_current(&mut h.page, true).await.expect("answered");
    }
    let saved = h.api.calls_to("/progress/update/").len();

    assert_eq!(
        h.page.submit_writing("   ").await,
        Err(SequenceError::EmptyAnswer)
    );

    assert!(has_toast(&h.document, Toast::warning(EMPTY_ANSWER)));
    assert_eq!(h.api.calls_to("/progress/update/").len(), saved);
    assert_eq!(
        h.page.sequencer().and_then(|s| s.current_question_index()),
        Some(0)
    );
}

#[tokio::test]
async fn wrong_writing_answer_shows_the_translation() {
    let mut h = harness(6, ProgressSavePolicy::AwaitThenContinue, FakeMedia::new());
    h.api.respond("/progress/update/", json!({ "success": true }));
    h.page.initialize().await.expect("lesson loads");
    h.page.start_exercises().await.expect("start");
    while h.page.stage() != Some(Stage::Writing) {
        answer_current(&mut h.page, true).await.expect("answered");
    }
    let expected = h
        .page
        .sequencer()
        .map(|s| s.exercises().writing.questions()[0].word.translation.clone())
        .expect("writing question");

    assert!(!answer_current(&mut h.page, false).await.expect("answered"));

    assert_eq!(
        h.document.text("writing-feedback-0"),
        Some(format!("Неправильно. Правильный ответ: {expected}"))
    );
    assert!(h.document.has_class("writing-feedback-0", "incorrect"));
}

#[tokio::test]
async fn cards_are_frozen_once_exercises_start() {
    let mut h = harness(4, ProgressSavePolicy::AwaitThenContinue, FakeMedia::new());
    h.page.initialize().await.expect("lesson loads");
    h.page.start_exercises().await.expect("start");

    assert!(!h.page.next_card());
    assert!(!h.page.flip_card());
    assert!(matches!(
        h.page.start_exercises().await,
        Err(SequenceError::StageNotActive { .. })
    ));
}

#[tokio::test]
async fn answers_before_loading_are_rejected() {
    let h = harness(4, ProgressSavePolicy::AwaitThenContinue, FakeMedia::new());
    let mut page = h.page;
    assert_eq!(
        page.answer_true_false(0, true).await,
        Err(SequenceError::NotLoaded)
    );
    assert_eq!(page.start_exercises().await, Err(SequenceError::NotLoaded));
}

#[tokio::test]
async fn restart_allows_a_second_completion() {
    let mut h = harness(3, ProgressSavePolicy::AwaitThenContinue, FakeMedia::new());
    h.api.respond("/progress/update/", json!({ "success": true }));
    h.api.respond("/lessons/complete/", json!({ "success": true, "lesson_completed": true }));
    h.page.initialize().await.expect("lesson loads");

    for _ in 0..2 {
        h.page.start_exercises().await.expect("start");
        while h.page.stage() != Some(Stage::Results) {
            answer_current(&mut h.page, true).await.expect("answered");
        }
        h.page.restart();
        assert_eq!(h.page.stage(), Some(Stage::Cards));
        assert!(!h.document.has_class("lesson-progress", "visible"));
    }

    assert_eq!(h.api.calls_to("/lessons/complete/").len(), 2);
    assert!(has_toast(&h.document, Toast::info("Урок перезапущен")));
}
