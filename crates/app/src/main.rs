use std::fmt;
use std::io::{BufRead, Write as _};
use std::sync::Arc;
use std::time::Duration;

use services::{
    AnswerScorer, AttemptStatus, ChatClient, Clock, LlmQuestionGenerator, LlmRemediationDelegate,
    LlmScoringDelegate, NoSearch, NotesContextSource, NotesThenSearchSource, ProgressionService,
    RemediationService, SearchContextSource,
};
use storage::JsonProgressStore;
use tutor_core::engine::EngineSettings;
use tutor_core::model::{Answer, Checkpoint, CheckpointId, Curriculum, ProgressCursor};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidThreshold { raw: String },
    InvalidMaxAttempts { raw: String },
    UnreadableNotes { path: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidThreshold { raw } => write!(f, "invalid --threshold value: {raw}"),
            ArgsError::InvalidMaxAttempts { raw } => {
                write!(f, "invalid --max-attempts value: {raw}")
            }
            ArgsError::UnreadableNotes { path } => write!(f, "could not read notes file: {path}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- teach    [options]  # run the next checkpoint");
    eprintln!("  cargo run -p app -- progress [options]  # show cursor and history");
    eprintln!("  cargo run -p app -- reset    [options]  # start the curriculum over");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --progress-file <path>   where progress is stored (default progress.json)");
    eprintln!("  --notes <path>           learner notes used as study context");
    eprintln!("  --topic <name>           use a generated study plan for this topic");
    eprintln!("  --threshold <0-100>      pass threshold (default 70)");
    eprintln!("  --max-attempts <n>       attempt budget per checkpoint (default 3)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  TUTOR_PROGRESS_FILE, TUTOR_NOTES_FILE");
    eprintln!("  TUTOR_AI_API_KEY, TUTOR_AI_BASE_URL, TUTOR_AI_MODEL");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Teach,
    Progress,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "teach" => Some(Self::Teach),
            "progress" => Some(Self::Progress),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

struct Args {
    progress_file: String,
    notes: Option<String>,
    topic: Option<String>,
    threshold: f64,
    max_attempts: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut progress_file = std::env::var("TUTOR_PROGRESS_FILE")
            .unwrap_or_else(|_| "progress.json".into());
        let mut notes_path = std::env::var("TUTOR_NOTES_FILE").ok();
        let mut topic = None;
        let mut threshold = 70.0;
        let mut max_attempts = 3;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--progress-file" => {
                    progress_file = require_value(args, "--progress-file")?;
                }
                "--notes" => {
                    notes_path = Some(require_value(args, "--notes")?);
                }
                "--topic" => {
                    topic = Some(require_value(args, "--topic")?);
                }
                "--threshold" => {
                    let value = require_value(args, "--threshold")?;
                    threshold = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidThreshold { raw: value.clone() })?;
                }
                "--max-attempts" => {
                    let value = require_value(args, "--max-attempts")?;
                    max_attempts = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidMaxAttempts { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let notes = match notes_path {
            Some(path) => Some(
                std::fs::read_to_string(&path)
                    .map_err(|_| ArgsError::UnreadableNotes { path })?,
            ),
            None => None,
        };

        Ok(Self {
            progress_file,
            notes,
            topic,
            threshold,
            max_attempts,
        })
    }
}

/// The built-in course, used when no `--topic` plan is requested.
fn built_in_curriculum() -> Curriculum {
    let checkpoints = vec![
        Checkpoint::new(
            CheckpointId::new(1),
            "Tree Terminology",
            vec![
                "Define Root, Node, and Leaf".to_string(),
                "Calculate Height and Depth".to_string(),
            ],
            None,
        ),
        Checkpoint::new(
            CheckpointId::new(2),
            "Binary Search Trees (BST)",
            vec![
                "Explain BST properties".to_string(),
                "Visualize node insertion".to_string(),
            ],
            None,
        ),
    ];
    Curriculum::new(
        checkpoints
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
            .expect("built-in checkpoints are valid"),
    )
    .expect("built-in curriculum is valid")
}

fn build_service(args: &Args) -> Result<ProgressionService, Box<dyn std::error::Error>> {
    let curriculum = match &args.topic {
        Some(topic) => Curriculum::default_for_topic(topic),
        None => built_in_curriculum(),
    };

    let settings = EngineSettings {
        pass_threshold: args.threshold,
        max_attempts: args.max_attempts,
        ..EngineSettings::default()
    };

    let chat = ChatClient::from_env().with_pacing(Duration::from_secs(2));
    if !chat.enabled() {
        eprintln!(
            "note: TUTOR_AI_API_KEY is not set; questions fall back to the learning objectives"
        );
    }

    let notes = NotesContextSource::new(args.notes.clone());
    let search = SearchContextSource::new(Arc::new(NoSearch));
    let context = NotesThenSearchSource::new(notes, search);

    let service = ProgressionService::new(
        Clock::default(),
        curriculum,
        Arc::new(context),
        Arc::new(LlmQuestionGenerator::new(chat.clone(), 3)),
        AnswerScorer::new(Arc::new(LlmScoringDelegate::new(chat.clone()))),
        RemediationService::new(Arc::new(LlmRemediationDelegate::new(chat))),
        Arc::new(JsonProgressStore::new(&args.progress_file)),
        settings,
    )?;
    Ok(service)
}

fn read_answers(count: usize) -> Vec<Answer> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut answers = Vec::with_capacity(count);

    for ordinal in 1..=count {
        print!("Answer {ordinal}: ");
        let _ = std::io::stdout().flush();
        let text = lines.next().and_then(Result::ok).unwrap_or_default();
        answers.push(Answer::new(ordinal, text));
    }
    answers
}

async fn teach(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let service = build_service(args)?;

    let Some(mut state) = service.start_next().await? else {
        println!("Curriculum complete. Use `reset` to start over.");
        return Ok(());
    };

    let checkpoint = state.checkpoint().clone();
    println!("=== Checkpoint {}: {} ===", checkpoint.id(), checkpoint.topic());
    println!("Objectives:");
    for objective in checkpoint.objectives() {
        println!("  - {objective}");
    }

    loop {
        println!();
        println!("Attempt {} of {}:", state.attempt(), args.max_attempts);
        for question in state.questions() {
            println!("  Q{}: {}", question.ordinal, question.text);
        }
        println!();

        let answers = read_answers(state.questions().len());
        let progress = service.submit_answers(&mut state, answers).await?;

        println!();
        for record in &progress.records {
            println!("  Q{}: {}/100 - {}", record.ordinal, record.score, record.feedback);
        }
        println!("Average: {:.1}/100", progress.average_score);

        match progress.status {
            AttemptStatus::Retry {
                gaps, remediation, ..
            } => {
                if !gaps.is_empty() {
                    println!();
                    println!("Let's revisit:");
                    for gap in &gaps {
                        println!("  - (Q{}) {}", gap.ordinal, gap.concept);
                    }
                }
                println!();
                println!("{remediation}");
            }
            AttemptStatus::Passed {
                curriculum_complete,
            } => {
                println!();
                println!("Checkpoint passed!");
                if curriculum_complete {
                    println!("That was the last checkpoint. Curriculum complete!");
                } else {
                    println!("Run `teach` again for the next checkpoint.");
                }
                return Ok(());
            }
            AttemptStatus::Exhausted {
                curriculum_complete,
            } => {
                println!();
                println!("Out of attempts for this checkpoint; moving on.");
                if curriculum_complete {
                    println!("That was the last checkpoint. Curriculum complete!");
                } else {
                    println!("Run `teach` again for the next checkpoint.");
                }
                return Ok(());
            }
        }
    }
}

async fn show_progress(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let service = build_service(args)?;
    let cursor = service.progress().await?;
    let total = service.curriculum().len();

    println!("Checkpoint {} of {}", cursor.cursor.min(total), total);
    if cursor.is_complete(total) {
        println!("Curriculum complete.");
    } else if let Some(next) = service.next_checkpoint().await? {
        println!("Next up: {}", next.topic());
    }

    if cursor.history.is_empty() {
        println!("No checkpoints finished yet.");
        return Ok(());
    }

    println!();
    println!("History:");
    for record in &cursor.history {
        println!(
            "  checkpoint {}: {} ({} attempt(s), avg {:.1}) at {}",
            record.checkpoint_id,
            record.outcome,
            record.attempts,
            record.average_score,
            record.timestamp.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}

async fn reset(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    use storage::ProgressRepository;

    let store = JsonProgressStore::new(&args.progress_file);
    store.save(&ProgressCursor::new()).await?;
    println!("Progress reset ({}).", args.progress_file);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Teach,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Teach,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    match cmd {
        Command::Teach => teach(&args).await,
        Command::Progress => show_progress(&args).await,
        Command::Reset => reset(&args).await,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
