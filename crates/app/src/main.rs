use std::fmt;
use std::io::BufRead;
use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::SelectedAnswer;
use quiz_core::quiz::{NextOutcome, QuizMachine, ReviewItem};
use services::{QuizLoopService, SessionHistoryService};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use storage::json_bank::JsonQuestionBank;
use storage::repository::{CategoryFilter, QuestionRepository, Storage};
use storage::sample::sample_questions;
use storage::sqlite::SqliteRepository;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidLimit { raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidLimit { raw } => write!(f, "invalid --limit value: {raw}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
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
    eprintln!("  cargo run -p app -- play    [--db <sqlite_url>] [--category <name>] [--shuffle] [--limit <n>]");
    eprintln!("  cargo run -p app -- seed    [--db <sqlite_url>] [--data-dir <path>]");
    eprintln!("  cargo run -p app -- history [--db <sqlite_url>] [--limit <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite:quiz.sqlite3");
    eprintln!("  play with no --category asks interactively");
    eprintln!("  seed with no --data-dir loads the built-in bank");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_CATEGORY");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Seed,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "seed" => Some(Self::Seed),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

struct Args {
    db_url: String,
    category: Option<String>,
    data_dir: Option<String>,
    shuffle: bool,
    limit: Option<usize>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("QUIZ_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://quiz.sqlite3".into(), normalize_sqlite_url);
        let mut category = std::env::var("QUIZ_CATEGORY").ok();
        let mut data_dir = None;
        let mut shuffle = false;
        let mut limit = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--category" => {
                    category = Some(require_value(args, "--category")?);
                }
                "--data-dir" => {
                    data_dir = Some(require_value(args, "--data-dir")?);
                }
                "--shuffle" => {
                    shuffle = true;
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    let parsed: usize = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidLimit { raw: value.clone() })?;
                    limit = Some(parsed);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            category,
            data_dir,
            shuffle,
            limit,
        })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
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

    // Open + migrate SQLite at startup. Keep this in the binary glue so
    // core/services stay pure.
    prepare_sqlite_file(&args.db_url)?;

    match cmd {
        Command::Play => play(&args).await,
        Command::Seed => seed(&args).await,
        Command::History => history(&args).await,
    }
}

async fn seed(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let repo = SqliteRepository::connect(&args.db_url).await?;
    repo.migrate().await?;

    let questions = match &args.data_dir {
        Some(dir) => {
            let bank = JsonQuestionBank::load_dir(dir)?;
            log::info!("loaded {} questions from {dir}", bank.len());
            bank.load_questions(&CategoryFilter::All).await?
        }
        None => sample_questions()?,
    };

    for question in &questions {
        repo.upsert_question(question).await?;
    }
    println!("seeded {} questions into {}", questions.len(), args.db_url);
    Ok(())
}

async fn history(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::sqlite(&args.db_url).await?;
    let history = SessionHistoryService::new(Arc::clone(&storage.sessions));

    let limit = u32::try_from(args.limit.unwrap_or(20)).unwrap_or(u32::MAX);
    let items = history.list_recent(limit).await?;
    if items.is_empty() {
        println!("no sessions recorded yet");
        return Ok(());
    }

    for item in items {
        let status = if item.is_completed {
            format!("{}/{} ({}%)", item.score, item.total, item.percent)
        } else {
            "abandoned".to_string()
        };
        println!("#{:<4} {}  {}", item.id, item.started_at, status);
    }
    Ok(())
}

async fn play(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Storage::sqlite(&args.db_url).await?;

    let mut loop_svc = QuizLoopService::new(
        Clock::default_clock(),
        Arc::clone(&storage.questions),
        Arc::clone(&storage.sessions),
    )
    .with_shuffle(args.shuffle);
    if let Some(limit) = args.limit {
        loop_svc = loop_svc.with_question_limit(limit);
    }

    let filter = match &args.category {
        Some(name) if name.eq_ignore_ascii_case("all") => CategoryFilter::All,
        Some(name) => CategoryFilter::named(name.clone()),
        None => pick_category(storage.questions.as_ref()).await?,
    };

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    let mut machine = loop {
        match loop_svc.start_quiz(&filter).await {
            Ok(machine) => break machine,
            Err(e @ services::QuizServiceError::SourceUnavailable(_)) => {
                eprintln!("{e}");
                println!("retry? [y/N]");
                match lines.next().transpose()? {
                    Some(line) if line.trim().eq_ignore_ascii_case("y") => {}
                    _ => return Ok(()),
                }
            }
            Err(e) => return Err(e.into()),
        }
    };

    println!("starting quiz: {} questions", machine.progress().total);

    while !machine.is_complete() {
        print_question(&machine);

        let Some(line) = lines.next().transpose()? else {
            println!("input closed; quiz abandoned");
            return Ok(());
        };
        let input = line.trim();

        match input {
            "q" => {
                println!("quiz abandoned");
                return Ok(());
            }
            "p" => machine.previous(),
            "n" | "" => {
                if loop_svc.advance(&mut machine).await.outcome == NextOutcome::Held {
                    println!("answer this question before moving on");
                }
            }
            _ => match parse_selection(input) {
                Some(answer) => {
                    if let Err(e) = machine.select_answer(answer) {
                        println!("{e}");
                    }
                }
                None => println!("enter choice numbers (e.g. 2 or 1,3), n, p, or q"),
            },
        }
    }

    print_results(&machine);
    Ok(())
}

async fn pick_category(
    questions: &dyn QuestionRepository,
) -> Result<CategoryFilter, Box<dyn std::error::Error>> {
    let categories = questions.list_categories().await?;
    if categories.is_empty() {
        println!("no categories available; playing everything");
        return Ok(CategoryFilter::All);
    }

    println!("categories:");
    for (i, name) in categories.iter().enumerate() {
        println!("  {}. {name}", i + 1);
    }
    println!("pick a number (empty for all):");

    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(CategoryFilter::All);
    }

    match trimmed.parse::<usize>() {
        Ok(n) if n >= 1 && n <= categories.len() => {
            Ok(CategoryFilter::named(categories[n - 1].clone()))
        }
        _ => Ok(CategoryFilter::named(trimmed.to_owned())),
    }
}

/// Parses "2" into a single choice and "1,3" into a set, 1-based as shown.
fn parse_selection(input: &str) -> Option<SelectedAnswer> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    let mut indices = Vec::with_capacity(parts.len());
    for part in parts {
        let n: usize = part.parse().ok()?;
        indices.push(n.checked_sub(1)?);
    }

    match indices.as_slice() {
        [] => None,
        [single] => Some(SelectedAnswer::Single(*single)),
        _ => Some(SelectedAnswer::multiple(indices)),
    }
}

fn print_question(machine: &QuizMachine) {
    let progress = machine.progress();
    let Some(question) = machine.current_question() else {
        return;
    };

    println!();
    println!(
        "[{}/{}] ({}%) {} — {}",
        progress.position + 1,
        progress.total,
        progress.percent,
        question.category(),
        question.kind().as_str(),
    );
    println!("{}", question.text());
    for (i, choice) in question.choices().iter().enumerate() {
        let marker = match machine.selected_answer() {
            Some(answer) if answer.indices().any(|idx| idx == i) => "*",
            _ => " ",
        };
        println!("  {marker}{}. {choice}", i + 1);
    }
    if question.kind().expects_multiple() {
        println!("(select all that apply, e.g. 1,3)");
    }
    println!("> answer, n = next, p = previous, q = quit");
}

fn print_results(machine: &QuizMachine) {
    let Ok(mut review) = machine.review() else {
        return;
    };

    println!();
    println!(
        "finished: {}/{} correct ({}%)",
        review.score(),
        review.total(),
        review.percent()
    );

    loop {
        print_review_item(&review.current());
        if review.is_last() {
            break;
        }
        review.advance();
    }
}

fn print_review_item(item: &ReviewItem<'_>) {
    let verdict = if item.is_correct { "correct" } else { "incorrect" };
    println!();
    println!("{}. {} — {verdict}", item.position + 1, item.question.text());

    let choices = item.question.choices();
    let picked: Vec<usize> = item.answer.map(|a| a.indices().collect()).unwrap_or_default();
    for (i, choice) in choices.iter().enumerate() {
        let mut tags = Vec::new();
        if key_contains(item, i) {
            tags.push("correct answer");
        }
        if picked.contains(&i) {
            tags.push("your answer");
        }
        if tags.is_empty() {
            println!("     {}. {choice}", i + 1);
        } else {
            println!("     {}. {choice}  [{}]", i + 1, tags.join(", "));
        }
    }
    if item.answer.is_none() {
        println!("     no answer");
    }
}

fn key_contains(item: &ReviewItem<'_>, index: usize) -> bool {
    match item.key {
        quiz_core::model::AnswerKey::Single(key) => *key == index,
        quiz_core::model::AnswerKey::Multiple(set) => set.contains(&index),
    }
}

#[tokio::main]
async fn main() {
    // File logger so recorder warnings survive without cluttering the quiz.
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    if let Ok(log_file) = std::fs::File::create("quiz.log") {
        let _ = WriteLogger::init(LevelFilter::Info, log_config, log_file);
    }

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
