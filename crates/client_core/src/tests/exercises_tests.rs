use std::collections::HashSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use shared::domain::{Stage, WordId};

use crate::{exercises::*, support::*};

fn rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Answers the current question of the active stage, correctly or not.
fn answer_current(sequencer: &mut LessonSequencer, correct: bool) -> AnswerOutcome {
    let stage = sequencer.stage();
    let index = sequencer.current_question_index().expect("question pending");
    let exercises = sequencer.exercises();
    let answer = match stage {
        Stage::TrueFalse => {
            let question = &exercises.true_false.questions()[index];
            Answer::TrueFalse(question.correct_answer == correct)
        }
        Stage::Audio => {
            let question = &exercises.audio.questions()[index];
            let option = question
                .options
                .iter()
                .position(|option| option.is_correct == correct)
                .unwrap_or(0);
            Answer::Choice(option)
        }
        Stage::Writing => {
            let question = &exercises.writing.questions()[index];
            if correct {
                Answer::Written(format!("  {}  ", question.word.translation.to_uppercase()))
            } else {
                Answer::Written("не то".to_string())
            }
        }
        other => panic!("no questions on {other}"),
    };
    sequencer
        .submit_answer(stage, index, answer)
        .expect("answer accepted")
}

fn play_through(sequencer: &mut LessonSequencer, correct: impl Fn(Stage, usize) -> bool) -> Vec<Stage> {
    let mut visited = vec![sequencer.start_exercises().expect("start")];
    while sequencer.stage() != Stage::Results {
        let stage = sequencer.stage();
        let index = sequencer.current_question_index().expect("pending");
        answer_current(sequencer, correct(stage, index));
        let next = sequencer.advance().expect("advance");
        if visited.last() != Some(&next) {
            visited.push(next);
        }
    }
    visited
}

#[test]
fn same_seed_selects_same_questions() {
    let lesson = words(8);
    let first = initialize_exercises(&lesson, &mut rng(7));
    let second = initialize_exercises(&lesson, &mut rng(7));
    assert_eq!(first, second);
}

#[test]
fn six_word_lesson_fills_every_stage() {
    let lesson = words(6);
    let set = initialize_exercises(&lesson, &mut rng(11));

    assert_eq!(set.true_false.total(), 3);
    assert_eq!(set.audio.total(), 3);
    assert_eq!(set.writing.total(), 3);

    let used: HashSet<WordId> = set
        .true_false
        .questions()
        .iter()
        .map(|question| question.word.id)
        .chain(set.audio.questions().iter().map(|question| question.word.id))
        .collect();
    let writing: Vec<WordId> = set
        .writing
        .questions()
        .iter()
        .map(|question| question.word.id)
        .collect();
    let unused_available = lesson.len() - used.len();
    let unused_picked = writing.iter().filter(|id| !used.contains(id)).count();

    assert_eq!(unused_picked, unused_available.min(3));
    assert_eq!(writing.iter().collect::<HashSet<_>>().len(), 3);
}

#[test]
fn writing_reuses_words_when_everything_was_used() {
    let lesson = words(3);
    let set = initialize_exercises(&lesson, &mut rng(3));
    assert_eq!(set.writing.total(), 3);
}

#[test]
fn small_lesson_caps_questions_at_word_count() {
    let set = initialize_exercises(&words(2), &mut rng(1));
    assert_eq!(set.true_false.total(), 2);
    assert_eq!(set.audio.total(), 2);
    assert_eq!(set.writing.total(), 2);
    for question in set.audio.questions() {
        assert_eq!(question.options.len(), 2);
    }
}

#[test]
fn wrong_translation_never_repeats_the_right_one() {
    let mut lesson = words(3);
    lesson[1].translation = lesson[0].translation.clone();
    for seed in 0..32 {
        let picked = wrong_translation(&lesson, &lesson[0], &mut rng(seed));
        assert_eq!(picked, lesson[2].translation);
    }
}

#[test]
fn wrong_translation_falls_back_for_single_word() {
    let lesson = words(1);
    assert_eq!(
        wrong_translation(&lesson, &lesson[0], &mut rng(0)),
        UNKNOWN_TRANSLATION
    );
}

#[test]
fn audio_options_dedupe_translations() {
    let mut lesson = words(6);
    lesson[1].translation = "книга".to_string();
    lesson[2].translation = "книга".to_string();
    let options = audio_options(&lesson, &lesson[0], &mut rng(5));

    let texts: HashSet<&str> = options.iter().map(|option| option.text.as_str()).collect();
    assert_eq!(texts.len(), options.len());
    assert_eq!(options.len(), AUDIO_OPTION_COUNT);
    assert_eq!(options.iter().filter(|option| option.is_correct).count(), 1);
}

#[test]
fn answers_match_ignores_case_and_outer_whitespace() {
    assert!(answers_match("  Книга ", "книга"));
    assert!(answers_match("ПУТЬ", "путь"));
    assert!(!answers_match("книги", "книга"));
}

#[test]
fn score_percentage_rounds() {
    assert_eq!(score_percentage(6, 9), 67);
    assert_eq!(score_percentage(1, 3), 33);
    assert_eq!(score_percentage(9, 9), 100);
    assert_eq!(score_percentage(0, 0), 0);
}

#[test]
fn verdict_thresholds() {
    assert_eq!(Verdict::for_percentage(100), Verdict::Excellent);
    assert_eq!(Verdict::for_percentage(90), Verdict::Excellent);
    assert_eq!(Verdict::for_percentage(89), Verdict::Good);
    assert_eq!(Verdict::for_percentage(70), Verdict::Good);
    assert_eq!(Verdict::for_percentage(50), Verdict::Fair);
    assert_eq!(Verdict::for_percentage(49), Verdict::Repeat);
}

#[test]
fn stages_run_in_order_and_score_everything() {
    let mut sequencer = LessonSequencer::new(words(6), &mut rng(21));
    let visited = play_through(&mut sequencer, |_, _| true);

    assert_eq!(
        visited,
        vec![Stage::TrueFalse, Stage::Audio, Stage::Writing, Stage::Results]
    );
    let results = sequencer.results();
    assert_eq!((results.correct, results.total, results.percentage), (9, 9, 100));
    assert_eq!(results.verdict(), Verdict::Excellent);
}

#[test]
fn six_of_nine_correct_is_sixty_seven_percent() {
    let mut sequencer = LessonSequencer::new(words(6), &mut rng(2));
    play_through(&mut sequencer, |stage, _| stage != Stage::Audio);

    let results = sequencer.results();
    assert_eq!(results.audio.correct, 0);
    assert_eq!(results.correct, 6);
    assert_eq!(results.percentage, 67);
    assert_eq!(results.verdict(), Verdict::Fair);
}

#[test]
fn empty_lesson_goes_straight_to_results() {
    let mut sequencer = LessonSequencer::new(Vec::new(), &mut rng(0));
    assert_eq!(sequencer.start_exercises(), Ok(Stage::Results));
    assert_eq!(sequencer.results().percentage, 0);
    assert!(sequencer.current_card().is_none());
}

#[test]
fn cards_and_results_take_no_answers() {
    let mut sequencer = LessonSequencer::new(words(3), &mut rng(2));
    assert_eq!(
        sequencer.submit_answer(Stage::Cards, 0, Answer::TrueFalse(true)),
        Err(SequenceError::NotAnExercise { stage: Stage::Cards })
    );

    let mut empty = LessonSequencer::new(Vec::new(), &mut rng(2));
    empty.start_exercises().expect("start");
    assert_eq!(
        empty.submit_answer(Stage::Results, 0, Answer::Written("x".to_string())),
        Err(SequenceError::NotAnExercise { stage: Stage::Results })
    );
}

#[test]
fn out_of_turn_answers_are_rejected() {
    let mut sequencer = LessonSequencer::new(words(6), &mut rng(4));

    assert_eq!(
        sequencer.submit_answer(Stage::TrueFalse, 0, Answer::TrueFalse(true)),
        Err(SequenceError::StageNotActive {
            requested: Stage::TrueFalse,
            current: Stage::Cards,
        })
    );
    sequencer.start_exercises().expect("start");
    assert!(matches!(
        sequencer.start_exercises(),
        Err(SequenceError::StageNotActive { .. })
    ));

    assert_eq!(
        sequencer.advance(),
        Err(SequenceError::Unanswered {
            stage: Stage::TrueFalse,
            index: 0,
        })
    );
    assert_eq!(
        sequencer.submit_answer(Stage::TrueFalse, 1, Answer::TrueFalse(true)),
        Err(SequenceError::StaleQuestion {
            stage: Stage::TrueFalse,
            index: 1,
            expected: 0,
        })
    );
    assert_eq!(
        sequencer.submit_answer(Stage::TrueFalse, 0, Answer::Choice(0)),
        Err(SequenceError::AnswerKindMismatch {
            stage: Stage::TrueFalse
        })
    );

    sequencer
        .submit_answer(Stage::TrueFalse, 0, Answer::TrueFalse(true))
        .expect("first answer");
    assert_eq!(
        sequencer.submit_answer(Stage::TrueFalse, 0, Answer::TrueFalse(false)),
        Err(SequenceError::AlreadyAnswered {
            stage: Stage::TrueFalse,
            index: 0,
        })
    );
}

#[test]
fn unknown_audio_option_leaves_question_open() {
    let mut sequencer = LessonSequencer::new(words(6), &mut rng(9));
    sequencer.start_exercises().expect("start");
    for _ in 0..3 {
        answer_current(&mut sequencer, true);
        sequencer.advance().expect("advance");
    }
    assert_eq!(sequencer.stage(), Stage::Audio);

    assert_eq!(
        sequencer.submit_answer(Stage::Audio, 0, Answer::Choice(9)),
        Err(SequenceError::UnknownOption { option: 9 })
    );
    assert!(sequencer
        .submit_answer(Stage::Audio, 0, Answer::Choice(0))
        .is_ok());
}

#[test]
fn blank_writing_answer_does_not_consume_the_question() {
    let mut sequencer = LessonSequencer::new(words(6), &mut rng(13));
    sequencer.start_exercises().expect("start");
    while sequencer.stage() != Stage::Writing {
        answer_current(&mut sequencer, true);
        sequencer.advance().expect("advance");
    }

    assert_eq!(
        sequencer.submit_answer(Stage::Writing, 0, Answer::Written("   ".into())),
        Err(SequenceError::EmptyAnswer)
    );
    assert_eq!(sequencer.current_question_index(), Some(0));
    let outcome = answer_current(&mut sequencer, true);
    assert!(outcome.is_correct);
    assert_eq!(outcome.stage_score, 1);
}

#[test]
fn counter_reports_one_based_position() {
    let mut sequencer = LessonSequencer::new(words(6), &mut rng(17));
    assert_eq!(sequencer.counter(Stage::Cards), None);
    sequencer.start_exercises().expect("start");
    assert_eq!(sequencer.counter(Stage::TrueFalse), Some((1, 3)));
    answer_current(&mut sequencer, true);
    sequencer.advance().expect("advance");
    assert_eq!(sequencer.counter(Stage::TrueFalse), Some((2, 3)));
}

#[test]
fn completion_is_claimed_once_per_run() {
    let mut sequencer = LessonSequencer::new(words(4), &mut rng(8));
    assert!(!sequencer.claim_completion());
    play_through(&mut sequencer, |_, _| true);

    assert!(sequencer.claim_completion());
    assert!(!sequencer.claim_completion());
    assert!(sequencer.completion_claimed());
}

#[test]
fn restart_clears_answers_and_keeps_questions() {
    let mut sequencer = LessonSequencer::new(words(6), &mut rng(30));
    let before = sequencer.exercises().clone();
    sequencer.next_card();
    sequencer.flip_card();
    play_through(&mut sequencer, |_, _| true);
    assert!(sequencer.claim_completion());

    sequencer.restart();

    assert_eq!(sequencer.stage(), Stage::Cards);
    assert_eq!(sequencer.card_index(), 0);
    assert!(!sequencer.is_card_flipped());
    assert!(!sequencer.completion_claimed());
    assert_eq!(sequencer.exercises(), &before);
    assert_eq!(sequencer.results().correct, 0);
}

#[test]
fn card_navigation_respects_bounds() {
    let mut sequencer = LessonSequencer::new(words(3), &mut rng(1));
    assert!(!sequencer.has_previous_card());
    assert!(!sequencer.previous_card());

    assert!(sequencer.flip_card());
    assert!(sequencer.next_card());
    assert!(!sequencer.is_card_flipped());
    assert!(sequencer.go_to_card(2));
    assert!(!sequencer.has_next_card());
    assert!(!sequencer.next_card());
    assert!(!sequencer.go_to_card(3));
    assert_eq!(sequencer.card_index(), 2);
}

#[test]
fn swipe_needs_more_than_threshold() {
    let mut sequencer = LessonSequencer::new(words(3), &mut rng(1));
    assert!(!sequencer.swipe(SWIPE_THRESHOLD_PX));
    assert!(sequencer.swipe(SWIPE_THRESHOLD_PX + 1.0));
    assert_eq!(sequencer.card_index(), 1);
    assert!(sequencer.swipe(-80.0));
    assert_eq!(sequencer.card_index(), 0);
}

proptest! {
    #[test]
    fn selection_invariants_hold(seed in any::<u64>(), count in 0usize..=12) {
        let lesson = words(count);
        let set = initialize_exercises(&lesson, &mut rng(seed));
        let expected = count.min(QUESTIONS_PER_STAGE);

        prop_assert_eq!(set.true_false.total(), expected);
        prop_assert_eq!(set.audio.total(), expected);
        prop_assert_eq!(set.writing.total(), expected);

        for question in set.true_false.questions() {
            prop_assert_eq!(
                question.displayed_translation == question.word.translation,
                question.correct_answer
            );
        }
        for question in set.audio.questions() {
            prop_assert_eq!(question.options.len(), count.min(AUDIO_OPTION_COUNT));
            let correct: Vec<_> = question.options.iter().filter(|option| option.is_correct).collect();
            prop_assert_eq!(correct.len(), 1);
            prop_assert_eq!(&correct[0].text, &question.word.translation);
        }
    }
}
