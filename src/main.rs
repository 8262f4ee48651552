mod config;
mod error;
mod models;
mod openai;
mod response;
mod transcript;

use std::io::{Read, Write};
use std::process::ExitCode;

use clap::Parser;
use config::{Args, Config, API_KEY_ENV};
use error::{ChatError, Result};
use models::{Message, Role};
use response::{process_response, Reply};
use tokio::runtime::Builder;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.log_filter());

    let config = match Config::resolve(args, std::env::var(API_KEY_ENV).ok()) {
        Ok(config) => config,
        Err(err) => return fatal(&err, &mut std::io::stderr()),
    };

    let rt = match Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => return fatal(&ChatError::from(err), &mut std::io::stderr()),
    };

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    match rt.block_on(run(&config, &mut stdin.lock(), &mut stdout.lock())) {
        Ok(reply) => {
            tracing::debug!(
                outcome = ?reply.outcome,
                chars = reply.text.chars().count(),
                "finished"
            );
            ExitCode::SUCCESS
        }
        Err(err) => fatal(&err, &mut std::io::stderr()),
    }
}

/// Report an aborting error on `err_out` whatever the log filter says.
fn fatal<W: Write>(err: &ChatError, err_out: &mut W) -> ExitCode {
    tracing::debug!(error = ?err, "aborting");
    let _ = writeln!(err_out, "Error: {}", err);
    ExitCode::FAILURE
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Echo the transcript, open an assistant turn and stream the model's reply into it.
async fn run<R: Read, W: Write>(config: &Config, input: &mut R, out: &mut W) -> Result<Reply> {
    let mut raw = Vec::new();
    input.read_to_end(&mut raw)?;
    let transcript = transcript::normalize(&String::from_utf8_lossy(&raw));

    let messages = build_messages(config, &transcript);

    writeln!(out, "{}{}", transcript, transcript::BEGIN_RESPONSE)?;
    out.flush()?;

    let client = reqwest::Client::new();
    let response = openai::send_request(&client, config, messages).await?;
    let events = openai::decode_stream(response.bytes_stream());
    process_response(events, out).await
}

fn build_messages(config: &Config, transcript: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    if let Some(system) = &config.system {
        messages.push(Message::new(Role::System, system.as_str()));
    }
    messages.extend(transcript::parse_document(transcript));
    messages
}
