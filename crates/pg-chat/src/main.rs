//! A terminal chat about the database in `DATABASE_URL`.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use pg_chat::{PgQueryExecutor, SessionBuilder, Settings};
use pg_chat_openai::OpenAIProvider;
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("loaded settings: {settings:?}");

    let executor = match PgQueryExecutor::connect(&settings.database_url).await
    {
        Ok(executor) => executor,
        Err(err) => {
            eprintln!("failed to connect to the database: {err}");
            return;
        }
    };
    let schema = executor.describe_schema().await.unwrap_or_else(|err| {
        warn!("failed to describe the database schema: {err}");
        String::new()
    });

    let provider = OpenAIProvider::new(settings.openai_config());
    let (call_tx, mut call_rx) = mpsc::unbounded_channel();

    let mut builder = SessionBuilder::with_provider(provider)
        .with_system_prompt(include_str!("./system_prompt.md"))
        .on_function_call(move |call| {
            call_tx.send(call.clone()).ok();
        });
    if !schema.is_empty() {
        builder = builder.with_schema(schema);
    }
    let mut session = builder.build(executor);

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let reply_fut = session.send_message(line);
        tokio::pin!(reply_fut);
        let reply = loop {
            select! {
                reply = &mut reply_fut => break reply,
                Some(call) = call_rx.recv() => {
                    progress_bar.suspend(|| {
                        println!(
                            "{}SQL query: {}",
                            BAR_CHAR.bright_yellow(),
                            sql_query(&call.arguments).bright_white().bold()
                        );
                    });
                }
            }
        };
        progress_bar.finish_and_clear();

        match reply {
            Ok(reply) => {
                println!("{}🤖 {}", BAR_CHAR.bright_cyan(), reply.bright_white());
            }
            Err(err) => {
                println!("{}❌ {}", BAR_CHAR.bright_red(), err.red());
            }
        }
    }
}

/// Pulls the query out of the function arguments, falling back to the raw
/// arguments when they aren't the expected JSON.
fn sql_query(arguments: &str) -> String {
    serde_json::from_str::<serde_json::Value>(arguments)
        .ok()
        .and_then(|value| value.get("query")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| arguments.to_owned())
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
