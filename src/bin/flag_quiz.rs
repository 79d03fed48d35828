use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use flag_quiz::analytics::TracingSink;
use flag_quiz::clients::{ClientType, FlexibleClient, Workload};
use flag_quiz::config::QuizConfig;
use flag_quiz::core::{QueryConfig, QueryResolver};
use flag_quiz::facts::{CountryData, CountryExplorer, FactResolver};
use flag_quiz::game::QuizGame;
use flag_quiz::quiz::catalog::flag_questions;
use flag_quiz::quiz::{Catalog, Prompt, Question};
use flag_quiz::store;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "🏳️ Guess the country from its flag", long_about = None)]
#[command(after_help = "ENVIRONMENT VARIABLES:
    FLAG_QUIZ_CLIENT        Model provider (gemini|deepseek|mock) [default: auto-detect]
    GEMINI_API_KEY          API key for Gemini (API_KEY also accepted)
    DEEPSEEK_API_KEY        API key for DeepSeek
    FLAG_QUIZ_STORE         Fact store: memory, file:<path> or supabase
    SUPABASE_URL            Supabase project URL (with FLAG_QUIZ_STORE=supabase)
    SUPABASE_ANON_KEY       Supabase anon key (with FLAG_QUIZ_STORE=supabase)
    FLAG_QUIZ_TIMEOUT_SECS  Upper bound on one model call [default: 30]
    RUST_LOG                Log filter [default: warn]

EXAMPLES:
    flag-quiz                         # Play the built-in quiz
    flag-quiz play --client mock      # Play offline
    flag-quiz explore Japan           # Country profile
    flag-quiz countries an            # Search the country list")]
struct Args {
    /// Override the model provider: gemini, deepseek, mock
    #[arg(short, long, global = true)]
    client: Option<String>,

    /// Question set as a JSON array [default: built-in flags]
    #[arg(short, long, global = true)]
    questions: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play the quiz in the terminal
    Play,
    /// Show a detailed profile of a country from the quiz
    Explore { country: String },
    /// List the quiz countries, or those matching a query
    Countries { query: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let mut config = QuizConfig::from_env().context("invalid configuration")?;
    if let Some(raw) = &args.client {
        let client = ClientType::from_str(raw).map_err(anyhow::Error::msg)?;
        config = config.with_client(client);
    }
    let questions = load_questions(args.questions.as_deref())?;

    match args.command.unwrap_or(Command::Play) {
        Command::Play => play(&config, questions).await,
        Command::Explore { country } => explore(&config, &questions, &country).await,
        Command::Countries { query } => {
            list_countries(&Catalog::from_questions(&questions), query.as_deref());
            Ok(())
        }
    }
}

fn load_questions(path: Option<&Path>) -> Result<Vec<Question>> {
    let Some(path) = path else {
        return Ok(flag_questions());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading questions from {}", path.display()))?;
    let questions: Vec<Question> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing questions in {}", path.display()))?;
    if questions.is_empty() {
        bail!("{} contains no questions", path.display());
    }
    Ok(questions)
}

fn query_config(config: &QuizConfig) -> QueryConfig {
    QueryConfig { timeout: Some(config.generation_timeout) }
}

async fn play(config: &QuizConfig, questions: Vec<Question>) -> Result<()> {
    let client = FlexibleClient::build(&config.client, Workload::Facts)
        .with_context(|| format!("creating {} client", config.client))?;
    let resolver = FactResolver::new(QueryResolver::new(client, query_config(config)), store::open(&config.store));
    let mut game = QuizGame::start(questions, resolver, Arc::new(TracingSink))?;

    println!("🌍 Flag quiz: {} questions, facts from {}", game.session().total(), config.client);
    loop {
        while !game.session().is_finished() {
            let session = game.session();
            let question = session.current_question().clone();
            println!();
            println!("Question {}/{}", session.current_index() + 1, session.total());
            match question.prompt() {
                Prompt::Flag(url) => println!("Which country does this flag belong to? {}", url),
                Prompt::Text(text) => println!("{}", text),
            }
            for (i, option) in question.options().iter().enumerate() {
                println!("  {}) {}", i + 1, option);
            }

            let Some(choice) = read_choice(question.options().len())? else {
                println!("Bye!");
                return Ok(());
            };
            let option = &question.options()[choice];
            let Some(ticket) = game.submit_answer(option) else {
                continue;
            };

            if game.session().last_answer_correct() == Some(true) {
                println!("✅ Correct! It's {}.", question.correct_answer());
            } else {
                println!("❌ Wrong, it was {}.", question.correct_answer());
            }

            println!("Loading a fun fact about {}...", ticket.subject());
            let subject = ticket.subject().to_string();
            match ticket.wait().await {
                Ok(fact) => println!("💡 {}", fact),
                Err(e) => println!("⚠️  No fun fact for {} right now: {}", subject, e),
            }

            prompt("Press any key to continue...")?;
            if matches!(read_key()?, Key::Quit) {
                return Ok(());
            }
            game.advance();
        }

        let session = game.session();
        println!();
        println!("🏁 Final score: {}/{}", session.score(), session.total());
        prompt("Play again? [y/N] ")?;
        match read_key()? {
            Key::Char('y') | Key::Char('Y') => game.restart(),
            _ => break,
        }
    }
    Ok(())
}

async fn explore(config: &QuizConfig, questions: &[Question], country: &str) -> Result<()> {
    let client = FlexibleClient::build(&config.client, Workload::Explorer)
        .with_context(|| format!("creating {} client", config.client))?;
    let mut explorer = CountryExplorer::new(QueryResolver::new(client, query_config(config)), Catalog::from_questions(questions));

    let data = explorer.explore(country).await?;
    print_profile(&explorer, country, &data);
    Ok(())
}

fn print_profile<C: flag_quiz::LowLevelClient>(explorer: &CountryExplorer<C>, country: &str, data: &CountryData) {
    println!("🗺️  {}", country);
    if let Some(url) = explorer.catalog().flag_url(country) {
        println!("Flag: {}", url);
    }
    println!();
    println!("{}", data.flag_color_meaning);
    println!();
    for (label, value) in data.country_info.rows() {
        println!("{:<16} {}", label, value);
    }
    if !data.neighboring_countries.is_empty() {
        println!();
        println!("Neighbors: {}", data.neighboring_countries.join(", "));
        for (name, url) in explorer.neighbors_with_flags(data) {
            println!("  {} {}", name, url);
        }
    }
}

fn list_countries(catalog: &Catalog, query: Option<&str>) {
    let countries: Vec<&str> = match query {
        Some(q) => catalog.search(q),
        None => catalog.countries().collect(),
    };
    if countries.is_empty() {
        println!("No matching countries.");
    }
    for country in countries {
        println!("{}", country);
    }
}

enum Key {
    Char(char),
    Enter,
    Quit,
}

fn prompt(text: &str) -> Result<()> {
    print!("{}", text);
    io::stdout().flush()?;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Choice {
    Pick(usize),
    Quit,
    Invalid,
}

/// Parse a 1-based option number typed by the player.
fn parse_choice(input: &str, count: usize) -> Choice {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") {
        return Choice::Quit;
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Choice::Pick(n - 1),
        _ => Choice::Invalid,
    }
}

/// Zero-based option index, or `None` when the player quits. A single
/// keystroke is enough while every option has a one-digit number; longer
/// lists are answered a line at a time.
fn read_choice(count: usize) -> Result<Option<usize>> {
    let single_key = count <= 9 && io::stdin().is_terminal();
    loop {
        prompt(&format!("Your answer [1-{}, q to quit]: ", count))?;
        let input = if single_key {
            match read_key()? {
                Key::Quit => return Ok(None),
                Key::Enter => {
                    println!();
                    continue;
                }
                Key::Char(c) => {
                    println!("{}", c);
                    c.to_string()
                }
            }
        } else {
            match read_line()? {
                Some(line) => line,
                None => return Ok(None),
            }
        };
        match parse_choice(&input, count) {
            Choice::Pick(index) => return Ok(Some(index)),
            Choice::Quit => return Ok(None),
            Choice::Invalid => println!("Pick a number between 1 and {}.", count),
        }
    }
}

struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// One keystroke in a terminal, otherwise the first character of a line.
fn read_key() -> Result<Key> {
    if !io::stdin().is_terminal() {
        return read_line_key();
    }
    let Ok(_raw) = RawMode::enable() else {
        return read_line_key();
    };
    loop {
        if let Event::Key(KeyEvent { code, modifiers, kind: KeyEventKind::Press, .. }) = event::read()? {
            return Ok(match code {
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Key::Quit,
                KeyCode::Esc => Key::Quit,
                KeyCode::Enter => Key::Enter,
                KeyCode::Char(c) => Key::Char(c),
                _ => continue,
            });
        }
    }
}

/// A line from stdin, or `None` at end of input.
fn read_line() -> Result<Option<String>> {
    let mut line = String::new();
    if io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

fn read_line_key() -> Result<Key> {
    Ok(match read_line()? {
        Some(line) => line.trim().chars().next().map_or(Key::Enter, Key::Char),
        None => Key::Quit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_beyond_nine_parse_whole_numbers() {
        assert_eq!(parse_choice("12\n", 12), Choice::Pick(11));
        assert_eq!(parse_choice("10", 12), Choice::Pick(9));
        assert_eq!(parse_choice("1", 12), Choice::Pick(0));
    }

    #[test]
    fn out_of_range_and_junk_are_invalid() {
        assert_eq!(parse_choice("0", 3), Choice::Invalid);
        assert_eq!(parse_choice("4", 3), Choice::Invalid);
        assert_eq!(parse_choice("", 3), Choice::Invalid);
        assert_eq!(parse_choice("1a", 3), Choice::Invalid);
        assert_eq!(parse_choice("-1", 3), Choice::Invalid);
    }

    #[test]
    fn q_quits() {
        assert_eq!(parse_choice(" Q ", 3), Choice::Quit);
        assert_eq!(parse_choice("q", 12), Choice::Quit);
    }
}
