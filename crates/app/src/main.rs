//! Terminal front-end for timed quiz attempts.

mod terminal;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use exam_core::PayloadError;
use exam_core::model::{ExamStatus, QuizId, QuizKind, SubmitTrigger};
use exam_core::parse_question_set;
use services::{
    CredentialProvider, ExamConfig, ExamController, ExamDeps, ExamError, ExamRequest,
    HttpScoringClient, StaticCredentials, SubmitOutcome,
};
use tokio::sync::{Mutex, mpsc};
use tracing_subscriber::EnvFilter;

use crate::terminal::{
    HELP, LineSource, TerminalNotifier, UserCommand, parse_command, render, render_review_line,
};

/// How often the prompt loop wakes up to notice a timer-driven submission.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Exit code for a missing or malformed question set.
const EXIT_CONTRACT_VIOLATION: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "exam-cli")]
#[command(version, about = "Take a timed quiz from the terminal", long_about = None)]
struct Cli {
    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a timed attempt and submit it for scoring
    Take(TakeArgs),
    /// Validate a question file without starting an attempt
    Check {
        #[arg(value_name = "FILE")]
        questions: PathBuf,
    },
}

#[derive(Args, Debug)]
struct TakeArgs {
    #[arg(long)]
    quiz_id: u64,

    /// `grand` or `lecture`
    #[arg(long)]
    kind: QuizKind,

    /// JSON file holding the question set
    #[arg(long, value_name = "FILE")]
    questions: PathBuf,

    /// Overrides LMS_EXAM_DURATION_SECS
    #[arg(long)]
    duration_secs: Option<u32>,

    /// Overrides LMS_SUBMIT_TIMEOUT_SECS
    #[arg(long)]
    submit_timeout_secs: Option<u64>,

    /// Overrides LMS_QUIZ_BASE_URL
    #[arg(long, value_name = "URL")]
    quiz_base_url: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let outcome = match cli.command {
        Command::Take(args) => take(args).await,
        Command::Check { questions } => check(&questions),
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            if is_contract_violation(&err) {
                ExitCode::from(EXIT_CONTRACT_VIOLATION)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn is_contract_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<PayloadError>().is_some()
        || err
            .downcast_ref::<ExamError>()
            .is_some_and(ExamError::is_contract_violation)
}

fn check(path: &Path) -> anyhow::Result<ExitCode> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let questions = parse_question_set(Some(&raw))?;
    println!("{}: {} question(s)", path.display(), questions.len());
    Ok(ExitCode::SUCCESS)
}

fn load_config(args: &TakeArgs) -> anyhow::Result<ExamConfig> {
    let mut config = ExamConfig::from_env().context("invalid LMS_* environment")?;
    if let Some(raw) = &args.quiz_base_url {
        config = config.with_quiz_base_url(raw)?;
    }
    if let Some(secs) = args.duration_secs {
        config = config.with_duration_secs(secs)?;
    }
    if let Some(secs) = args.submit_timeout_secs {
        config = config.with_submit_timeout_secs(secs)?;
    }
    Ok(config)
}

/// An unreadable file is treated like an absent payload so the session
/// reports the load failure itself.
fn read_questions(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(raw) => Some(raw),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "Could not read question file");
            None
        }
    }
}

/// Stdin is read on a plain thread so a pending read never holds up shutdown.
fn spawn_line_reader() -> LineSource {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    Arc::new(Mutex::new(rx))
}

async fn next_line(lines: &LineSource) -> Option<String> {
    lines.lock().await.recv().await
}

async fn take(args: TakeArgs) -> anyhow::Result<ExitCode> {
    let config = load_config(&args)?;
    tracing::debug!(base_url = %config.quiz_base_url, timeout = ?config.submit_timeout, "Exam config");

    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(StaticCredentials::new(config.api_token.clone()));
    if config.api_token.is_none() {
        tracing::warn!("No API token configured; submitting anonymously");
    }
    let scoring = HttpScoringClient::new(&config.quiz_base_url, credentials, config.submit_timeout)
        .context("failed to build scoring client")?;

    let lines = spawn_line_reader();
    let notifier = TerminalNotifier::new(Arc::clone(&lines));
    let deps = ExamDeps::new(Arc::new(scoring), Arc::new(notifier)).with_config(&config);

    let exam = ExamController::start(
        ExamRequest {
            quiz_id: QuizId::new(args.quiz_id),
            kind: args.kind,
            questions: read_questions(&args.questions),
        },
        deps,
    )?;

    println!("{HELP}\n");
    print!("{}", render(&exam.view()));

    let mut summary_shown = false;
    loop {
        if !summary_shown && exam.status() == ExamStatus::Submitted {
            summary_shown = true;
            print_summary(&exam);
        }

        let line = tokio::select! {
            line = next_line(&lines) => line,
            () = tokio::time::sleep(POLL_INTERVAL) => continue,
        };
        let Some(line) = line else { break };
        let Some(command) = parse_command(&line) else {
            if !line.trim().is_empty() {
                println!("Unknown command. Type `h` for help.");
            }
            continue;
        };

        match command {
            UserCommand::Quit => break,
            UserCommand::Help => {
                println!("{HELP}");
                continue;
            }
            UserCommand::Next => {
                exam.go_to_next();
            }
            UserCommand::Previous => {
                exam.go_to_previous();
            }
            UserCommand::GoTo(index) => {
                if !exam.go_to(index) {
                    println!("There is no question {}.", index + 1);
                    continue;
                }
            }
            UserCommand::Pick(option) => {
                if !exam.select_current(option) {
                    println!("Answer not recorded.");
                    continue;
                }
            }
            UserCommand::Clear => {
                exam.clear_selection(exam.current_index());
            }
            UserCommand::Submit => match exam.submit(SubmitTrigger::Manual).await {
                Ok(SubmitOutcome::Submitted(_)) => {}
                Ok(SubmitOutcome::Declined) => println!("Submission cancelled."),
                Ok(SubmitOutcome::Ignored) => println!("Nothing to submit right now."),
                // The notifier has already told the user.
                Err(err) => tracing::debug!(error = %err, "Manual submission failed"),
            },
            UserCommand::Review(index) => match exam.review(index) {
                Some(review) => {
                    exam.go_to(index);
                    println!("{}", render_review_line(&review));
                }
                None => {
                    println!("Review is available once the attempt is submitted.");
                    continue;
                }
            },
        }

        print!("{}", render(&exam.view()));
    }

    exam.stop_timer();
    if exam.status() == ExamStatus::Submitted {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::warn!(attempt_id = %exam.attempt_id(), "Left the exam without submitting");
        Ok(ExitCode::FAILURE)
    }
}

fn print_summary(exam: &ExamController) {
    let view = exam.view();
    if let Some(result) = &view.result {
        println!("\nResult: {}", result.score_line());
    }
    for index in 0..view.progress.total {
        if let Some(review) = exam.review(index) {
            println!("{}", render_review_line(&review));
        }
    }
    println!("Type `r <n>` to review a question or `q` to exit.");
}
