//! Multitool Assistant CLI
//!
//! A thin wrapper around multitool-core: one subcommand per feature, plus an
//! interactive session that keeps a history log until it exits.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use multitool_core::{
    classify, render_result, split_questions, Config, Dispatcher, ServiceResult, Session,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "multitool")]
#[command(about = "Route questions to an LLM, web search, weather and PDF tools")]
struct Args {
    /// Settings file (defaults to ./multitool.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Route free text through the intent router
    Query {
        /// The user request in natural language
        text: String,
    },

    /// Show weather for a location, or for the current location if omitted
    Weather { location: Option<String> },

    /// Ask questions about a PDF document
    Pdf {
        /// Path to the PDF file
        file: PathBuf,

        /// A question (repeatable; newlines split into separate questions)
        #[arg(short = 'q', long = "question")]
        questions: Vec<String>,

        /// File with one question per line
        #[arg(long = "questions-file")]
        questions_file: Option<PathBuf>,
    },

    /// Open the image search link
    Image,

    /// Open the picture explanation link
    Picture,

    /// Print the classified intent as JSON without calling any service
    Classify { text: String },

    /// Interactive session with history (default)
    Interactive,
}

// ============================================================================
// Output
// ============================================================================

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Numbered answers, one block per question
fn render_answers(answers: &[ServiceResult]) -> String {
    let mut out = String::from("Summarized Answers\n");
    for (i, answer) in answers.iter().enumerate() {
        out.push_str(&format!("**{}.** {}\n", i + 1, render_result(answer)));
    }
    out
}

fn render_history(session: &Session) -> String {
    if session.is_empty() {
        return "No history available.".to_string();
    }

    session
        .entries()
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "**{}. Feature:** {} ({})\n**Input:** {}\n**Output:** {}",
                i + 1,
                entry.feature,
                entry.recorded_at.format("%H:%M:%S"),
                entry.input,
                entry.output
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collect_questions(inline: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut questions: Vec<String> = inline.iter().flat_map(|q| split_questions(q)).collect();

    if let Some(path) = file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        questions.extend(split_questions(&content));
    }

    if questions.is_empty() {
        return Err(anyhow!("No questions provided (use -q or --questions-file)"));
    }
    Ok(questions)
}

// ============================================================================
// Interactive Session
// ============================================================================

const HELP: &str = "\
Type a question to route it, or use a command:
  :weather [location]   weather (blank = current location)
  :pdf <file>           ask questions about a PDF (end with an empty line)
  :image                image search link
  :picture              picture explanation link
  :history              show this session's history
  :help                 show this help
  :quit                 end the session";

#[derive(Debug, PartialEq)]
enum ReplCommand {
    Empty,
    Query(String),
    Weather(String),
    Pdf(PathBuf),
    Image,
    Picture,
    History,
    Help,
    Quit,
    Unknown(String),
}

fn parse_repl_line(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }

    let Some(rest) = trimmed.strip_prefix(':') else {
        return ReplCommand::Query(trimmed.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name.to_lowercase().as_str() {
        "weather" | "w" => ReplCommand::Weather(arg.to_string()),
        "pdf" if !arg.is_empty() => ReplCommand::Pdf(PathBuf::from(arg)),
        "image" => ReplCommand::Image,
        "picture" => ReplCommand::Picture,
        "history" | "h" => ReplCommand::History,
        "help" | "?" => ReplCommand::Help,
        "quit" | "q" | "exit" => ReplCommand::Quit,
        _ => ReplCommand::Unknown(trimmed.to_string()),
    }
}

/// Read questions until an empty line or end of input
fn read_questions(rl: &mut DefaultEditor) -> Result<Vec<String>> {
    let mut questions = Vec::new();
    loop {
        match rl.readline("?> ") {
            Ok(line) if line.trim().is_empty() => break,
            Ok(line) => questions.push(line.trim().to_string()),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(questions)
}

fn run_interactive(dispatcher: &Dispatcher) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    // Lives exactly as long as this loop
    let mut session = Session::new();

    println!("Multitool Chat Assistant (:help for commands)");

    loop {
        let line = match rl.readline(">> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C detected. Type :quit to exit.");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };

        let command = parse_repl_line(&line);
        if command != ReplCommand::Empty {
            let _ = rl.add_history_entry(line.as_str());
        }

        match command {
            ReplCommand::Empty => {}
            ReplCommand::Query(text) => println!("{}", dispatcher.process_query(&mut session, &text)),
            ReplCommand::Weather(location) => {
                println!("{}", dispatcher.weather_information(&mut session, &location))
            }
            ReplCommand::Pdf(path) => {
                println!("Enter your questions about the document, one per line (empty line to finish):");
                let questions = read_questions(&mut rl)?;
                if questions.is_empty() {
                    println!("No questions entered.");
                    continue;
                }
                let answers = dispatcher.summarize_pdf(&mut session, &path, &questions);
                print!("{}", render_answers(&answers));
            }
            ReplCommand::Image => println!("{}", dispatcher.image_search(&mut session)),
            ReplCommand::Picture => println!("{}", dispatcher.picture_explanation(&mut session)),
            ReplCommand::History => println!("{}", render_history(&session)),
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(cmd) => println!("Unknown command: {} (try :help)", cmd),
        }
    }

    tracing::debug!(entries = session.len(), "Session ended");
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    // Reads .env as well; missing secrets stop here, before any request is attempted
    let config = Config::load(args.config.as_deref())?;
    let dispatcher = Dispatcher::from_config(&config)?;

    // One-shot commands run in a session of their own
    let mut session = Session::new();

    match args.command.unwrap_or(Command::Interactive) {
        Command::Query { text } => println!("{}", dispatcher.process_query(&mut session, &text)),
        Command::Weather { location } => {
            let location = location.unwrap_or_default();
            println!("{}", dispatcher.weather_information(&mut session, &location));
        }
        Command::Pdf {
            file,
            questions,
            questions_file,
        } => {
            let questions = collect_questions(&questions, questions_file.as_deref())?;
            let answers = dispatcher.summarize_pdf(&mut session, &file, &questions);
            print!("{}", render_answers(&answers));
        }
        Command::Image => println!("{}", dispatcher.image_search(&mut session)),
        Command::Picture => println!("{}", dispatcher.picture_explanation(&mut session)),
        Command::Classify { text } => {
            println!("{}", serde_json::to_string_pretty(&classify(&text))?);
        }
        Command::Interactive => run_interactive(&dispatcher)?,
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
