use std::{
    io::{self, BufRead, Write},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    app::ActivePage,
    config::load_settings,
    exercises::AnswerOutcome,
    pages::{
        block::BlockPage,
        block_test::AnswerCheck,
        lesson::LessonPage,
    },
    App, Document, Route, SequenceError,
};
use shared::{
    domain::{BlockId, LessonId, Stage},
    protocol::EndSessionRequest,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

mod terminal_document;

use terminal_document::TerminalDocument;

const ENTRY_ORIGIN: &str = "http://localhost/";

#[derive(Parser, Debug)]
struct Args {
    /// One-time login token, as handed out by the bot link.
    #[arg(long)]
    token: Option<String>,
    /// Print class and width changes too.
    #[arg(long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Dashboard,
    Progress,
    Courses,
    Profile,
    Block { id: i64 },
    Lesson { id: i64 },
    BlockTest { id: i64 },
    Logout,
}

impl Command {
    fn route(&self) -> Route {
        match self {
            Command::Dashboard => Route::Dashboard,
            Command::Progress => Route::Progress,
            Command::Courses => Route::Courses,
            Command::Profile | Command::Logout => Route::Profile,
            Command::Block { id } => Route::Block(BlockId(*id)),
            Command::Lesson { id } => Route::Lesson(LessonId(*id)),
            Command::BlockTest { id } => Route::BlockTest(BlockId(*id)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let settings = load_settings();
    let document: Arc<dyn Document> = Arc::new(TerminalDocument::new(args.verbose));
    let mut app = App::from_settings(settings, Arc::clone(&document))?;

    let entry = entry_url(&args.command.route(), args.token.as_deref())?;
    let route = app.initialize(&entry).await;
    info!(%route, "terminal: page ready");

    match args.command {
        Command::Lesson { .. } => run_lesson(&mut app).await?,
        Command::BlockTest { id } => run_block_test(&mut app, document, BlockId(id)).await?,
        Command::Logout => {
            if !app.logout() {
                println!("Выход отменен");
            }
        }
        _ => {}
    }
    Ok(())
}

fn entry_url(route: &Route, token: Option<&str>) -> Result<Url> {
    let mut url = Url::parse(ENTRY_ORIGIN)
        .and_then(|origin| origin.join(&route.path()))
        .context("failed to build entry url")?;
    if let Some(token) = token {
        url.query_pairs_mut().append_pair("token", token);
    }
    Ok(url)
}

fn read_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    io::stdout().flush().context("failed to flush stdout")?;
    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read stdin")?;
    Ok((read > 0).then(|| line.trim().to_string()))
}

async fn run_lesson(app: &mut App) -> Result<()> {
    let backend = app.backend().clone();
    let Some(ActivePage::Lesson(page)) = app.page_mut() else {
        return Ok(());
    };
    if page.sequencer().is_none() {
        return Ok(());
    }

    let session = match backend.start_study_session().await {
        Ok(started) => Some(started.session_id),
        Err(err) => {
            warn!(error = %err, "terminal: study session not started");
            None
        }
    };

    loop {
        let Some(line) = read_line("[enter] дальше, [b] назад, [s] к упражнениям: ")? else {
            return Ok(());
        };
        match line.as_str() {
            "s" => break,
            "b" => {
                page.previous_card();
            }
            _ => {
                page.flip_card();
                if !page.next_card() {
                    break;
                }
            }
        }
    }
    page.start_exercises().await?;

    while let Some(stage) = page.stage().filter(|stage| *stage != Stage::Results) {
        let Some(outcome) = answer_current(page, stage).await? else {
            return Ok(());
        };
        println!(
            "{}",
            if outcome.is_correct { "Правильно!" } else { "Неправильно" }
        );
    }

    let lesson_id = page.lesson_id();
    let results = page.show_results().await;
    page.flush_progress().await;

    if let (Some(session_id), Some(results)) = (session, results) {
        let words_reviewed = page
            .sequencer()
            .map(|sequencer| sequencer.words().iter().map(|word| word.id).collect())
            .unwrap_or_default();
        let request = EndSessionRequest {
            session_id,
            lessons_studied: vec![lesson_id],
            words_reviewed,
            average_accuracy: f64::from(results.percentage),
        };
        if let Err(err) = backend.end_study_session(&request).await {
            warn!(error = %err, "terminal: study session not closed");
        }
    }
    Ok(())
}

/// Prompts for the current question of `stage`; `None` when input ends.
async fn answer_current(page: &mut LessonPage, stage: Stage) -> Result<Option<AnswerOutcome>> {
    let Some(sequencer) = page.sequencer() else {
        return Ok(None);
    };
    let Some(index) = sequencer.current_question_index() else {
        return Ok(None);
    };
    let exercises = sequencer.exercises();

    let result = match stage {
        Stage::TrueFalse => {
            let Some(question) = exercises.true_false.current() else {
                return Ok(None);
            };
            let prompt = format!(
                "{} = {}? [y/n]: ",
                question.word.arabic, question.displayed_translation
            );
            let Some(line) = read_line(&prompt)? else {
                return Ok(None);
            };
            page.answer_true_false(index, line == "y").await
        }
        Stage::Audio => {
            let Some(question) = exercises.audio.current() else {
                return Ok(None);
            };
            println!("{} ({})", question.word.arabic, question.word.transcription);
            for (number, option) in question.options.iter().enumerate() {
                println!("  {}. {}", number + 1, option.text);
            }
            let Some(line) = read_line("Вариант: ")? else {
                return Ok(None);
            };
            let option = line
                .parse::<usize>()
                .ok()
                .and_then(|number| number.checked_sub(1))
                .unwrap_or(usize::MAX);
            page.answer_audio(index, option).await
        }
        Stage::Writing => {
            let Some(question) = exercises.writing.current() else {
                return Ok(None);
            };
            let prompt = format!("{} ({}): ", question.word.arabic, question.word.transcription);
            let Some(line) = read_line(&prompt)? else {
                return Ok(None);
            };
            page.submit_writing(&line).await
        }
        Stage::Cards | Stage::Results => return Ok(None),
    };

    match result {
        Ok(outcome) => Ok(Some(outcome)),
        Err(SequenceError::EmptyAnswer | SequenceError::UnknownOption { .. }) => {
            Box::pin(answer_current(page, stage)).await
        }
        Err(err) => Err(err.into()),
    }
}

async fn run_block_test(app: &mut App, document: Arc<dyn Document>, block_id: BlockId) -> Result<()> {
    let backend = app.backend().clone();
    let Some(ActivePage::BlockTest(page)) = app.page_mut() else {
        return Ok(());
    };
    let result = loop {
        let Some(word) = page.current_word().cloned() else {
            return Ok(());
        };
        let Some(line) = read_line(&format!("{}: ", word.arabic))? else {
            return Ok(());
        };
        if page.check_answer(&line) != AnswerCheck::Correct {
            continue;
        }
        if let Some(result) = page.next_question().await {
            break result;
        }
    };
    println!(
        "{}% ({} / {}), нужно {}%",
        result.score, result.correct, result.total, result.passing_score
    );

    if result.is_passed {
        let mut block = BlockPage::new(block_id, backend, document);
        block.submit_test_results(true).await;
    }
    Ok(())
}
