use std::collections::HashSet;

use rand::{seq::SliceRandom, Rng};
use shared::{
    domain::{Stage, WordId},
    protocol::Word,
};
use thiserror::Error;

pub const QUESTIONS_PER_STAGE: usize = 3;
pub const AUDIO_OPTION_COUNT: usize = 4;
pub const UNKNOWN_TRANSLATION: &str = "неизвестное слово";
/// Horizontal travel (px) a swipe needs before it changes the card.
pub const SWIPE_THRESHOLD_PX: f64 = 50.0;

const TRUE_FALSE_CORRECT_PROBABILITY: f64 = 0.7;
const SIMILAR_LENGTH_TOLERANCE: usize = 3;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("stage {requested} is not active, current stage is {current}")]
    StageNotActive { requested: Stage, current: Stage },
    #[error("stage {stage} has no questions to answer")]
    NotAnExercise { stage: Stage },
    #[error("question {index} of {stage} is not current (expected {expected})")]
    StaleQuestion {
        stage: Stage,
        index: usize,
        expected: usize,
    },
    #[error("question {index} of {stage} was already answered")]
    AlreadyAnswered { stage: Stage, index: usize },
    #[error("question {index} of {stage} has not been answered yet")]
    Unanswered { stage: Stage, index: usize },
    #[error("answer does not fit stage {stage}")]
    AnswerKindMismatch { stage: Stage },
    #[error("option {option} does not exist")]
    UnknownOption { option: usize },
    #[error("answer is empty")]
    EmptyAnswer,
    #[error("lesson is not loaded")]
    NotLoaded,
}

pub trait Question {
    fn word(&self) -> &Word;
    fn is_answered(&self) -> bool;
    fn is_correct(&self) -> bool;
    fn reset(&mut self);
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrueFalseQuestion {
    pub word: Word,
    pub displayed_translation: String,
    pub correct_answer: bool,
    pub user_answer: Option<bool>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioOption {
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioQuestion {
    pub word: Word,
    pub options: Vec<AudioOption>,
    pub user_answer: Option<usize>,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WritingQuestion {
    pub word: Word,
    pub user_answer: Option<String>,
    pub is_correct: bool,
}

macro_rules! impl_question {
    ($name:ident) => {
        impl Question for $name {
            fn word(&self) -> &Word {
                &self.word
            }

            fn is_answered(&self) -> bool {
                self.user_answer.is_some()
            }

            fn is_correct(&self) -> bool {
                self.is_correct
            }

            fn reset(&mut self) {
                self.user_answer = None;
                self.is_correct = false;
            }
        }
    };
}

impl_question!(TrueFalseQuestion);
impl_question!(AudioQuestion);
impl_question!(WritingQuestion);

#[derive(Debug, Clone, PartialEq)]
pub struct StageState<Q> {
    questions: Vec<Q>,
    current_index: usize,
    score: usize,
}

impl<Q: Question> StageState<Q> {
    pub fn new(questions: Vec<Q>) -> Self {
        Self {
            questions,
            current_index: 0,
            score: 0,
        }
    }

    pub fn questions(&self) -> &[Q] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn score(&self) -> usize {
        self.score
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn current(&self) -> Option<&Q> {
        self.questions.get(self.current_index)
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.questions.len()
    }

    fn reset(&mut self) {
        self.current_index = 0;
        self.score = 0;
        for question in &mut self.questions {
            question.reset();
        }
    }

    fn answer(
        &mut self,
        stage: Stage,
        index: usize,
        apply: impl FnOnce(&mut Q) -> Result<(), SequenceError>,
    ) -> Result<AnswerOutcome, SequenceError> {
        let expected = self.current_index;
        let Some(question) = self.questions.get_mut(index).filter(|_| index == expected) else {
            return Err(SequenceError::StaleQuestion {
                stage,
                index,
                expected,
            });
        };
        if question.is_answered() {
            return Err(SequenceError::AlreadyAnswered { stage, index });
        }
        apply(question)?;

        let is_correct = question.is_correct();
        let word_id = question.word().id;
        let correct_translation = question.word().translation.clone();
        if is_correct {
            self.score += 1;
        }
        Ok(AnswerOutcome {
            stage,
            question_index: index,
            word_id,
            is_correct,
            stage_score: self.score,
            correct_translation,
        })
    }

    /// Moves past the answered current question; `true` once the stage is done.
    fn step(&mut self, stage: Stage) -> Result<bool, SequenceError> {
        let index = self.current_index;
        match self.questions.get(index) {
            Some(question) if question.is_answered() => {
                self.current_index += 1;
                Ok(self.is_finished())
            }
            Some(_) => Err(SequenceError::Unanswered { stage, index }),
            None => Ok(true),
        }
    }

    fn stage_score(&self) -> StageScore {
        StageScore {
            correct: self.score,
            total: self.questions.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSet {
    pub true_false: StageState<TrueFalseQuestion>,
    pub audio: StageState<AudioQuestion>,
    pub writing: StageState<WritingQuestion>,
}

impl ExerciseSet {
    fn reset(&mut self) {
        self.true_false.reset();
        self.audio.reset();
        self.writing.reset();
    }
}

pub fn initialize_exercises<R: Rng + ?Sized>(words: &[Word], rng: &mut R) -> ExerciseSet {
    let true_false: Vec<TrueFalseQuestion> = pick_random_words(words, QUESTIONS_PER_STAGE, rng)
        .into_iter()
        .map(|word| {
            let correct_answer = rng.gen_bool(TRUE_FALSE_CORRECT_PROBABILITY);
            let displayed_translation = if correct_answer {
                word.translation.clone()
            } else {
                wrong_translation(words, &word, rng)
            };
            TrueFalseQuestion {
                word,
                displayed_translation,
                correct_answer,
                user_answer: None,
                is_correct: false,
            }
        })
        .collect();

    let audio: Vec<AudioQuestion> = pick_random_words(words, QUESTIONS_PER_STAGE, rng)
        .into_iter()
        .map(|word| AudioQuestion {
            options: audio_options(words, &word, rng),
            word,
            user_answer: None,
            is_correct: false,
        })
        .collect();

    let used: HashSet<WordId> = true_false
        .iter()
        .map(|question| question.word.id)
        .chain(audio.iter().map(|question| question.word.id))
        .collect();
    let writing = writing_words(words, &used, rng)
        .into_iter()
        .map(|word| WritingQuestion {
            word,
            user_answer: None,
            is_correct: false,
        })
        .collect();

    ExerciseSet {
        true_false: StageState::new(true_false),
        audio: StageState::new(audio),
        writing: StageState::new(writing),
    }
}

pub fn pick_random_words<R: Rng + ?Sized>(words: &[Word], count: usize, rng: &mut R) -> Vec<Word> {
    let mut picked = words.to_vec();
    picked.shuffle(rng);
    picked.truncate(count);
    picked
}

/// Unused words first, then already-used ones until the stage is full.
fn writing_words<R: Rng + ?Sized>(
    words: &[Word],
    used: &HashSet<WordId>,
    rng: &mut R,
) -> Vec<Word> {
    let (unused, reused): (Vec<Word>, Vec<Word>) = words
        .iter()
        .cloned()
        .partition(|word| !used.contains(&word.id));
    let mut picked = pick_random_words(&unused, QUESTIONS_PER_STAGE, rng);
    let missing = QUESTIONS_PER_STAGE.saturating_sub(picked.len());
    picked.extend(pick_random_words(&reused, missing, rng));
    picked
}

/// Another word's translation for a "false" prompt.
pub fn wrong_translation<R: Rng + ?Sized>(words: &[Word], correct: &Word, rng: &mut R) -> String {
    let others: Vec<&Word> = words
        .iter()
        .filter(|word| word.id != correct.id && word.translation != correct.translation)
        .collect();
    others
        .choose(rng)
        .map(|word| word.translation.clone())
        .unwrap_or_else(|| UNKNOWN_TRANSLATION.to_string())
}

pub fn audio_options<R: Rng + ?Sized>(
    words: &[Word],
    correct: &Word,
    rng: &mut R,
) -> Vec<AudioOption> {
    let mut options = vec![AudioOption {
        text: correct.translation.clone(),
        is_correct: true,
    }];
    let mut seen: HashSet<String> = HashSet::from([correct.translation.clone()]);

    let mut others: Vec<&Word> = words.iter().filter(|word| word.id != correct.id).collect();
    others.shuffle(rng);

    let correct_len = correct.translation.chars().count();
    let similar = others
        .iter()
        .filter(|word| word.translation.chars().count().abs_diff(correct_len) <= SIMILAR_LENGTH_TOLERANCE);
    let remaining = others.iter();

    for word in similar.chain(remaining) {
        if options.len() >= AUDIO_OPTION_COUNT {
            break;
        }
        if seen.insert(word.translation.clone()) {
            options.push(AudioOption {
                text: word.translation.clone(),
                is_correct: false,
            });
        }
    }

    options.shuffle(rng);
    options
}

pub fn answers_match(answer: &str, expected: &str) -> bool {
    answer.trim().to_lowercase() == expected.trim().to_lowercase()
}

pub fn score_percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 * 100.0 / total as f64).round() as u32
}

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    TrueFalse(bool),
    Choice(usize),
    Written(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub stage: Stage,
    pub question_index: usize,
    pub word_id: WordId,
    pub is_correct: bool,
    pub stage_score: usize,
    pub correct_translation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageScore {
    pub correct: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Excellent,
    Good,
    Fair,
    Repeat,
}

impl Verdict {
    pub fn for_percentage(percentage: u32) -> Self {
        match percentage {
            90.. => Verdict::Excellent,
            70.. => Verdict::Good,
            50.. => Verdict::Fair,
            _ => Verdict::Repeat,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::Excellent => "Отличный результат! Вы прекрасно усвоили материал. 🎯",
            Verdict::Good => "Хороший результат! Продолжайте в том же духе. 💪",
            Verdict::Fair => "Неплохо, но есть куда стремиться. Повторите материал. 📚",
            Verdict::Repeat => "Рекомендуем повторить урок для лучшего усвоения. 🔄",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonResults {
    pub true_false: StageScore,
    pub audio: StageScore,
    pub writing: StageScore,
    pub correct: usize,
    pub total: usize,
    pub percentage: u32,
}

impl LessonResults {
    pub fn verdict(&self) -> Verdict {
        Verdict::for_percentage(self.percentage)
    }
}

/// State machine for one lesson run: flashcards, three quizzes, results.
#[derive(Debug, Clone)]
pub struct LessonSequencer {
    words: Vec<Word>,
    exercises: ExerciseSet,
    stage: Stage,
    card_index: usize,
    card_flipped: bool,
    completion_claimed: bool,
}

impl LessonSequencer {
    pub fn new<R: Rng + ?Sized>(words: Vec<Word>, rng: &mut R) -> Self {
        let exercises = initialize_exercises(&words, rng);
        Self::with_exercises(words, exercises)
    }

    pub fn with_exercises(words: Vec<Word>, exercises: ExerciseSet) -> Self {
        Self {
            words,
            exercises,
            stage: Stage::Cards,
            card_index: 0,
            card_flipped: false,
            completion_claimed: false,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn exercises(&self) -> &ExerciseSet {
        &self.exercises
    }

    pub fn card_index(&self) -> usize {
        self.card_index
    }

    pub fn current_card(&self) -> Option<&Word> {
        self.words.get(self.card_index)
    }

    pub fn is_card_flipped(&self) -> bool {
        self.card_flipped
    }

    pub fn has_previous_card(&self) -> bool {
        self.card_index > 0
    }

    pub fn has_next_card(&self) -> bool {
        self.card_index + 1 < self.words.len()
    }

    pub fn go_to_card(&mut self, index: usize) -> bool {
        if index >= self.words.len() {
            return false;
        }
        self.card_index = index;
        self.card_flipped = false;
        true
    }

    pub fn next_card(&mut self) -> bool {
        self.has_next_card() && self.go_to_card(self.card_index + 1)
    }

    pub fn previous_card(&mut self) -> bool {
        self.has_previous_card() && self.go_to_card(self.card_index - 1)
    }

    /// Returns the new flip state.
    pub fn flip_card(&mut self) -> bool {
        self.card_flipped = !self.card_flipped;
        self.card_flipped
    }

    /// `delta_x` is touch start minus touch end: positive moves forward.
    pub fn swipe(&mut self, delta_x: f64) -> bool {
        if delta_x.abs() <= SWIPE_THRESHOLD_PX {
            return false;
        }
        if delta_x > 0.0 {
            self.next_card()
        } else {
            self.previous_card()
        }
    }

    pub fn start_exercises(&mut self) -> Result<Stage, SequenceError> {
        if self.stage != Stage::Cards {
            return Err(SequenceError::StageNotActive {
                requested: Stage::Cards,
                current: self.stage,
            });
        }
        self.enter(Stage::TrueFalse);
        Ok(self.stage)
    }

    /// `(1-based position, total)` for the stage counter.
    pub fn counter(&self, stage: Stage) -> Option<(usize, usize)> {
        let (index, total) = match stage {
            Stage::TrueFalse => (self.exercises.true_false.current_index(), self.exercises.true_false.total()),
            Stage::Audio => (self.exercises.audio.current_index(), self.exercises.audio.total()),
            Stage::Writing => (self.exercises.writing.current_index(), self.exercises.writing.total()),
            Stage::Cards | Stage::Results => return None,
        };
        Some(((index + 1).min(total), total))
    }

    pub fn current_question_index(&self) -> Option<usize> {
        let (index, finished) = match self.stage {
            Stage::TrueFalse => (self.exercises.true_false.current_index(), self.exercises.true_false.is_finished()),
            Stage::Audio => (self.exercises.audio.current_index(), self.exercises.audio.is_finished()),
            Stage::Writing => (self.exercises.writing.current_index(), self.exercises.writing.is_finished()),
            Stage::Cards | Stage::Results => return None,
        };
        (!finished).then_some(index)
    }

    pub fn submit_answer(
        &mut self,
        stage: Stage,
        question_index: usize,
        answer: Answer,
    ) -> Result<AnswerOutcome, SequenceError> {
        if stage != self.stage {
            return Err(SequenceError::StageNotActive {
                requested: stage,
                current: self.stage,
            });
        }
        if !stage.is_exercise() {
            return Err(SequenceError::NotAnExercise { stage });
        }

        match (stage, answer) {
            (Stage::TrueFalse, Answer::TrueFalse(value)) => {
                self.exercises
                    .true_false
                    .answer(stage, question_index, |question| {
                        question.user_answer = Some(value);
                        question.is_correct = value == question.correct_answer;
                        Ok(())
                    })
            }
            (Stage::Audio, Answer::Choice(option)) => {
                self.exercises.audio.answer(stage, question_index, |question| {
                    let picked = question
                        .options
                        .get(option)
                        .ok_or(SequenceError::UnknownOption { option })?;
                    question.is_correct = picked.is_correct;
                    question.user_answer = Some(option);
                    Ok(())
                })
            }
            (Stage::Writing, Answer::Written(text)) => {
                self.exercises
                    .writing
                    .answer(stage, question_index, |question| {
                        let text = text.trim();
                        if text.is_empty() {
                            return Err(SequenceError::EmptyAnswer);
                        }
                        question.is_correct = answers_match(text, &question.word.translation);
                        question.user_answer = Some(text.to_string());
                        Ok(())
                    })
            }
            (stage, _) => Err(SequenceError::AnswerKindMismatch { stage }),
        }
    }

    /// Moves past the answered current question, entering the next stage
    /// once this one is exhausted. Returns the stage now active.
    pub fn advance(&mut self) -> Result<Stage, SequenceError> {
        let stage = self.stage;
        let finished = match stage {
            Stage::TrueFalse => self.exercises.true_false.step(stage)?,
            Stage::Audio => self.exercises.audio.step(stage)?,
            Stage::Writing => self.exercises.writing.step(stage)?,
            Stage::Cards | Stage::Results => return Err(SequenceError::NotAnExercise { stage }),
        };
        if finished {
            if let Some(next) = stage.next() {
                self.enter(next);
            }
        }
        Ok(self.stage)
    }

    fn enter(&mut self, stage: Stage) {
        let mut stage = stage;
        loop {
            self.stage = stage;
            let total = match stage {
                Stage::TrueFalse => {
                    self.exercises.true_false.reset();
                    self.exercises.true_false.total()
                }
                Stage::Audio => {
                    self.exercises.audio.reset();
                    self.exercises.audio.total()
                }
                Stage::Writing => {
                    self.exercises.writing.reset();
                    self.exercises.writing.total()
                }
                Stage::Cards | Stage::Results => return,
            };
            match stage.next() {
                Some(next) if total == 0 => stage = next,
                _ => return,
            }
        }
    }

    pub fn results(&self) -> LessonResults {
        let true_false = self.exercises.true_false.stage_score();
        let audio = self.exercises.audio.stage_score();
        let writing = self.exercises.writing.stage_score();
        let correct = true_false.correct + audio.correct + writing.correct;
        let total = true_false.total + audio.total + writing.total;
        LessonResults {
            true_false,
            audio,
            writing,
            correct,
            total,
            percentage: score_percentage(correct, total),
        }
    }

    /// Claims the single completion report of this run. Only the first call
    /// on the results stage returns `true`.
    pub fn claim_completion(&mut self) -> bool {
        if self.stage != Stage::Results || self.completion_claimed {
            return false;
        }
        self.completion_claimed = true;
        true
    }

    pub fn completion_claimed(&self) -> bool {
        self.completion_claimed
    }

    /// Back to the first card with every score and answer cleared. The
    /// selected questions are kept.
    pub fn restart(&mut self) {
        self.stage = Stage::Cards;
        self.card_index = 0;
        self.card_flipped = false;
        self.completion_claimed = false;
        self.exercises.reset();
    }
}
