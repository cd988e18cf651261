use std::{sync::Arc, time::Duration};

use maud::{html, Markup};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shared::{
    domain::{LessonId, Stage},
    error::ApiException,
    protocol::{CompleteLessonRequest, CompleteLessonResponse, LessonSummary, ProgressUpdateRequest, Word},
};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::{handle_page_error, DASHBOARD_PATH};
use crate::{
    api::Backend,
    audio::{preload_audio, AudioCache, MediaLoader},
    config::Settings,
    document::{Document, Toast},
    exercises::{
        Answer, AnswerOutcome, AudioQuestion, LessonResults, LessonSequencer, SequenceError,
        TrueFalseQuestion, WritingQuestion,
    },
    progress::{ProgressReporter, ProgressSavePolicy},
};

pub const LESSON_CONTENT: &str = "lesson-content";
pub const LESSON_COMPLETED: &str = "Урок завершен! 🎉";
pub const BLOCK_TEST_UNLOCKED: &str = "Все уроки блока завершены! Тест теперь доступен. 🏆";
pub const EMPTY_ANSWER: &str = "Введите ответ";

#[derive(Debug, Clone)]
pub struct LessonSettings {
    /// Pause between an answer and the next question.
    pub answer_delay: Duration,
    pub writing_delay: Duration,
    pub audio_preload_timeout: Duration,
    pub progress_policy: ProgressSavePolicy,
    pub exercise_seed: Option<u64>,
}

impl Default for LessonSettings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for LessonSettings {
    fn from(settings: &Settings) -> Self {
        Self {
            answer_delay: settings.answer_delay,
            writing_delay: settings.writing_delay,
            audio_preload_timeout: settings.audio_preload_timeout,
            progress_policy: settings.progress_policy,
            exercise_seed: settings.exercise_seed,
        }
    }
}

/// Drives one lesson run: loads the words, preloads audio, walks the
/// flashcards and the three quizzes, reports progress and completion.
pub struct LessonPage {
    lesson_id: LessonId,
    backend: Backend,
    document: Arc<dyn Document>,
    media: Arc<dyn MediaLoader>,
    settings: LessonSettings,
    progress: ProgressReporter,
    lesson: Option<LessonSummary>,
    sequencer: Option<LessonSequencer>,
    audio: AudioCache,
    started_at: Instant,
}

impl LessonPage {
    pub fn new(
        lesson_id: LessonId,
        backend: Backend,
        document: Arc<dyn Document>,
        media: Arc<dyn MediaLoader>,
        settings: LessonSettings,
    ) -> Self {
        let progress = ProgressReporter::new(
            backend.clone(),
            Arc::clone(&document),
            settings.progress_policy,
        );
        Self {
            lesson_id,
            backend,
            document,
            media,
            settings,
            progress,
            lesson: None,
            sequencer: None,
            audio: AudioCache::default(),
            started_at: Instant::now(),
        }
    }

    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    pub fn lesson(&self) -> Option<&LessonSummary> {
        self.lesson.as_ref()
    }

    pub fn sequencer(&self) -> Option<&LessonSequencer> {
        self.sequencer.as_ref()
    }

    pub fn audio(&self) -> &AudioCache {
        &self.audio
    }

    pub fn stage(&self) -> Option<Stage> {
        self.sequencer.as_ref().map(LessonSequencer::stage)
    }

    pub async fn initialize(&mut self) -> Result<(), ApiException> {
        info!(lesson_id = self.lesson_id.0, "lesson: loading");
        let bundle = match self.backend.lesson_detail(self.lesson_id).await {
            Ok(bundle) => bundle,
            Err(err) => {
                handle_page_error(
                    self.document.as_ref(),
                    LESSON_CONTENT,
                    "Не удалось загрузить урок",
                    &err,
                );
                return Err(err);
            }
        };

        self.document.set_text("lesson-title", &bundle.lesson.title);
        if let Some(block_title) = &bundle.lesson.block_title {
            self.document.set_text("lesson-block-title", block_title);
        }

        self.audio = preload_audio(
            self.media.as_ref(),
            &bundle.words,
            self.settings.audio_preload_timeout,
        )
        .await;

        let seed = self.settings.exercise_seed.unwrap_or_else(rand::random);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        debug!(seed, words = bundle.words.len(), "lesson: building exercises");
        self.sequencer = Some(LessonSequencer::new(bundle.words, &mut rng));
        self.lesson = Some(bundle.lesson);
        self.started_at = Instant::now();

        self.render_stage();
        Ok(())
    }

    pub fn next_card(&mut self) -> bool {
        self.card_action(LessonSequencer::next_card)
    }

    pub fn previous_card(&mut self) -> bool {
        self.card_action(LessonSequencer::previous_card)
    }

    pub fn go_to_card(&mut self, index: usize) -> bool {
        self.card_action(|sequencer| sequencer.go_to_card(index))
    }

    pub fn flip_card(&mut self) -> bool {
        self.card_action(LessonSequencer::flip_card)
    }

    pub fn swipe(&mut self, delta_x: f64) -> bool {
        self.card_action(|sequencer| sequencer.swipe(delta_x))
    }

    fn card_action(&mut self, action: impl FnOnce(&mut LessonSequencer) -> bool) -> bool {
        let changed = self
            .sequencer
            .as_mut()
            .filter(|sequencer| sequencer.stage() == Stage::Cards)
            .is_some_and(action);
        if changed {
            self.render_card();
        }
        changed
    }

    /// Audio of the current card, when it has any.
    pub fn current_audio(&self) -> Option<&str> {
        let word = self.sequencer.as_ref()?.current_card()?;
        let url = word.audio_url.as_deref();
        if url.is_none() {
            warn!(word_id = word.id.0, "lesson: no audio for current word");
        }
        url
    }

    /// Leaves the cards. A lesson without questions goes straight to
    /// results and reports completion there.
    pub async fn start_exercises(&mut self) -> Result<Stage, SequenceError> {
        let sequencer = self.sequencer.as_mut().ok_or(SequenceError::NotLoaded)?;
        let stage = sequencer.start_exercises()?;
        self.document.set_class("lesson-progress", "visible", true);
        info!(lesson_id = self.lesson_id.0, %stage, "lesson: exercises started");
        self.render_stage();
        if stage == Stage::Results {
            self.save_lesson_completion().await;
        }
        Ok(stage)
    }

    pub async fn answer_true_false(
        &mut self,
        question_index: usize,
        value: bool,
    ) -> Result<AnswerOutcome, SequenceError> {
        self.submit(Stage::TrueFalse, question_index, Answer::TrueFalse(value))
            .await
    }

    pub async fn answer_audio(
        &mut self,
        question_index: usize,
        option: usize,
    ) -> Result<AnswerOutcome, SequenceError> {
        self.submit(Stage::Audio, question_index, Answer::Choice(option))
            .await
    }

    pub async fn answer_writing(
        &mut self,
        question_index: usize,
        text: &str,
    ) -> Result<AnswerOutcome, SequenceError> {
        self.submit(Stage::Writing, question_index, Answer::Written(text.to_string()))
            .await
    }

    /// Enter key on the writing stage: answers whichever question is current.
    pub async fn submit_writing(&mut self, text: &str) -> Result<AnswerOutcome, SequenceError> {
        let sequencer = self.sequencer.as_ref().ok_or(SequenceError::NotLoaded)?;
        if sequencer.stage() != Stage::Writing {
            return Err(SequenceError::StageNotActive {
                requested: Stage::Writing,
                current: sequencer.stage(),
            });
        }
        let index = sequencer
            .current_question_index()
            .ok_or(SequenceError::NotAnExercise {
                stage: Stage::Writing,
            })?;
        self.answer_writing(index, text).await
    }

    async fn submit(
        &mut self,
        stage: Stage,
        question_index: usize,
        answer: Answer,
    ) -> Result<AnswerOutcome, SequenceError> {
        let sequencer = self.sequencer.as_mut().ok_or(SequenceError::NotLoaded)?;
        let outcome = match sequencer.submit_answer(stage, question_index, answer) {
            Ok(outcome) => outcome,
            Err(SequenceError::EmptyAnswer) => {
                self.document.toast(Toast::warning(EMPTY_ANSWER));
                return Err(SequenceError::EmptyAnswer);
            }
            Err(err) => {
                debug!(%stage, question_index, error = %err, "lesson: answer ignored");
                return Err(err);
            }
        };
        debug!(
            %stage,
            question_index,
            is_correct = outcome.is_correct,
            stage_score = outcome.stage_score,
            "lesson: answer recorded"
        );
        self.show_feedback(&outcome);

        self.progress
            .record(ProgressUpdateRequest {
                word_id: outcome.word_id,
                is_correct: outcome.is_correct,
                lesson_id: self.lesson_id,
                time_spent: self.started_at.elapsed().as_secs(),
            })
            .await;

        let delay = if stage == Stage::Writing {
            self.settings.writing_delay
        } else {
            self.settings.answer_delay
        };
        tokio::time::sleep(delay).await;

        let sequencer = self.sequencer.as_mut().ok_or(SequenceError::NotLoaded)?;
        let next = sequencer.advance()?;
        self.render_stage();
        if next == Stage::Results {
            self.save_lesson_completion().await;
        }
        Ok(outcome)
    }

    /// Renders the results screen and reports completion unless this run
    /// already did.
    pub async fn show_results(&mut self) -> Option<LessonResults> {
        let results = self.sequencer.as_ref()?.results();
        if self.stage() != Some(Stage::Results) {
            return None;
        }
        self.render_stage();
        self.save_lesson_completion().await;
        Some(results)
    }

    async fn save_lesson_completion(&mut self) -> Option<CompleteLessonResponse> {
        let sequencer = self.sequencer.as_mut()?;
        if !sequencer.claim_completion() {
            info!(lesson_id = self.lesson_id.0, "lesson: completion already reported");
            return None;
        }
        let results = sequencer.results();
        info!(
            lesson_id = self.lesson_id.0,
            correct = results.correct,
            total = results.total,
            percentage = results.percentage,
            "lesson: reporting completion"
        );
        let request = CompleteLessonRequest {
            lesson_id: self.lesson_id,
            score: results.percentage,
        };
        match self.backend.complete_lesson(&request).await {
            Ok(response) => {
                if response.lesson_completed {
                    self.document.toast(Toast::success(LESSON_COMPLETED));
                    if response.all_lessons_completed {
                        self.document.toast(Toast::success(BLOCK_TEST_UNLOCKED));
                    }
                }
                Some(response)
            }
            Err(err) => {
                error!(lesson_id = self.lesson_id.0, error = %err, "lesson: completion failed");
                self.document
                    .toast(Toast::error("Ошибка сохранения прогресса урока"));
                None
            }
        }
    }

    pub fn restart(&mut self) {
        let Some(sequencer) = self.sequencer.as_mut() else {
            return;
        };
        sequencer.restart();
        self.started_at = Instant::now();
        self.document.set_class("lesson-progress", "visible", false);
        self.render_stage();
        self.document.toast(Toast::info("Урок перезапущен"));
        info!(lesson_id = self.lesson_id.0, "lesson: restarted");
    }

    pub fn go_to_dashboard(&self) {
        self.document.navigate(DASHBOARD_PATH);
    }

    /// Waits for progress saves still in flight.
    pub async fn flush_progress(&mut self) {
        self.progress.drain().await;
    }

    fn render_stage(&self) {
        let Some(sequencer) = &self.sequencer else {
            return;
        };
        let document = self.document.as_ref();
        let current = sequencer.stage();
        for stage in Stage::ORDER {
            document.set_class(
                &format!("stage-{}", stage.slug()),
                "active",
                stage == current,
            );
        }
        document.set_width("progress-bar", current.progress_percent());

        let exercises = sequencer.exercises();
        match current {
            Stage::Cards => self.render_card(),
            Stage::TrueFalse => {
                self.render_counter(sequencer, current, "true-false-counter");
                if let Some(question) = exercises.true_false.current() {
                    let index = exercises.true_false.current_index();
                    document.render("true-false-content", true_false_view(question, index));
                }
            }
            Stage::Audio => {
                self.render_counter(sequencer, current, "audio-counter");
                if let Some(question) = exercises.audio.current() {
                    let index = exercises.audio.current_index();
                    document.render("audio-test-content", audio_view(question, index));
                }
            }
            Stage::Writing => {
                self.render_counter(sequencer, current, "writing-counter");
                if let Some(question) = exercises.writing.current() {
                    let index = exercises.writing.current_index();
                    document.render("writing-content", writing_view(question, index));
                }
            }
            Stage::Results => {
                let results = sequencer.results();
                document.set_text("final-score", &format!("{}%", results.percentage));
                document.set_text("results-description", results.verdict().message());
                document.render("results-breakdown", results_view(&results));
            }
        }
    }

    fn render_counter(&self, sequencer: &LessonSequencer, stage: Stage, element: &str) {
        if let Some((position, total)) = sequencer.counter(stage) {
            self.document
                .set_text(element, &format!("{position}/{total}"));
        }
    }

    fn render_card(&self) {
        let Some(sequencer) = &self.sequencer else {
            return;
        };
        let document = self.document.as_ref();
        let Some(word) = sequencer.current_card() else {
            document.render(
                LESSON_CONTENT,
                html! { div class="empty-state" { p { "В этом уроке пока нет слов" } } },
            );
            return;
        };

        document.render("card-image", card_image(word));
        document.set_text("card-arabic", or_placeholder(&word.arabic, "..."));
        document.set_text("card-transcription", &word.transcription);
        document.set_text(
            "card-translation",
            or_placeholder(&word.translation, "Перевод не указан"),
        );
        document.set_text(
            "card-example-verse",
            or_placeholder(&word.example_verse, "Пример не указан"),
        );
        document.set_text(
            "card-example-translation",
            or_placeholder(&word.example_translation, "Перевод примера не указан"),
        );
        document.set_class("card-audio-btn", "hidden", !self.audio.has_audio(word));
        document.set_class("single-card", "flipped", sequencer.is_card_flipped());
        document.set_class("prev-card-btn", "disabled", !sequencer.has_previous_card());
        document.set_class("next-card-btn", "disabled", !sequencer.has_next_card());
        document.set_text(
            "cards-counter",
            &format!("{}/{}", sequencer.card_index() + 1, sequencer.words().len()),
        );
        document.render(
            "cards-progress",
            progress_dots(sequencer.words().len(), sequencer.card_index()),
        );
    }

    fn show_feedback(&self, outcome: &AnswerOutcome) {
        let document = self.document.as_ref();
        let verdict = if outcome.is_correct { "correct" } else { "incorrect" };
        match outcome.stage {
            Stage::TrueFalse => {
                document.set_class("true-false-buttons", verdict, true);
            }
            Stage::Audio => {
                document.set_class("audio-options", verdict, true);
            }
            Stage::Writing => {
                let element = format!("writing-feedback-{}", outcome.question_index);
                let text = if outcome.is_correct {
                    "Правильно! ✓".to_string()
                } else {
                    format!("Неправильно. Правильный ответ: {}", outcome.correct_translation)
                };
                document.set_text(&element, &text);
                document.set_class(&element, verdict, true);
            }
            Stage::Cards | Stage::Results => {}
        }
    }
}

fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

fn card_image(word: &Word) -> Markup {
    html! {
        @if let Some(image_url) = &word.image_url {
            img class="word-image" src=(image_url) alt=(word.arabic);
        } @else {
            div class="word-image placeholder" { i class="fas fa-image" {} }
        }
    }
}

fn progress_dots(total: usize, active: usize) -> Markup {
    html! {
        @for index in 0..total {
            div.progress-dot.active[index == active] data-card=(index) {}
        }
    }
}

fn true_false_view(question: &TrueFalseQuestion, index: usize) -> Markup {
    let word = &question.word;
    html! {
        @if let Some(image_url) = &word.image_url {
            img class="true-false-image" src=(image_url) alt=(word.arabic);
        }
        div class="true-false-question" {
            "\"" (word.arabic) "\" означает \"" (question.displayed_translation) "\"?"
        }
        div class="true-false-buttons" id="true-false-buttons" data-question=(index) {
            button class="btn-true" data-answer="true" { "Верно" }
            button class="btn-false" data-answer="false" { "Неверно" }
        }
    }
}

fn audio_view(question: &AudioQuestion, index: usize) -> Markup {
    let word = &question.word;
    html! {
        @if let Some(image_url) = &word.image_url {
            img class="audio-test-image" src=(image_url) alt=(word.arabic);
        }
        @if let Some(audio_url) = &word.audio_url {
            button class="audio-btn-large" data-audio=(audio_url) {}
        }
        div class="audio-options" id="audio-options" data-question=(index) {
            @for (option_index, option) in question.options.iter().enumerate() {
                div class="audio-option" data-option=(option_index) { (option.text) }
            }
        }
    }
}

fn writing_view(question: &WritingQuestion, index: usize) -> Markup {
    let word = &question.word;
    html! {
        @if let Some(image_url) = &word.image_url {
            img class="writing-image" src=(image_url) alt=(word.arabic);
        }
        @if let Some(audio_url) = &word.audio_url {
            div class="writing-audio" {
                button class="audio-btn-large" data-audio=(audio_url) {}
            }
        }
        div class="writing-input-container" {
            input type="text" class="writing-input" placeholder="Напишите перевод..."
                id={ "writing-answer-" (index) } autocomplete="off";
            div class="writing-feedback" id={ "writing-feedback-" (index) } {}
        }
        button class="btn-primary" data-question=(index) { "Проверить" }
    }
}

fn results_view(results: &LessonResults) -> Markup {
    html! {
        div class="results-breakdown" {
            div class="result-row" { "Верно/Неверно: " (results.true_false.correct) "/" (results.true_false.total) }
            div class="result-row" { "Аудио: " (results.audio.correct) "/" (results.audio.total) }
            div class="result-row" { "Письмо: " (results.writing.correct) "/" (results.writing.total) }
            div class="result-total" { "Итого: " (results.correct) "/" (results.total) }
        }
    }
}
