use clap::Parser;

use crate::error::{ChatError, Result};

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Pipe a transcript through a chat model and append its reply
#[derive(Parser, Debug)]
#[command(name = "chad-pipe", version, about, long_about = None)]
pub struct Args {
    /// Your OpenAI API key
    #[arg(long)]
    pub key: Option<String>,

    /// System level instructions to guide the model's behavior
    #[arg(long)]
    pub system: Option<String>,

    /// Chat model to use for completions
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// API base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Diagnostic verbosity: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub system: Option<String>,
    pub model: String,
    pub base_url: String,
}

impl Config {
    /// Flags win over the environment; empty values count as absent.
    pub fn resolve(args: Args, env_key: Option<String>) -> Result<Self> {
        let api_key = non_empty(args.key)
            .or_else(|| non_empty(env_key))
            .ok_or(ChatError::Configuration(API_KEY_ENV))?;

        Ok(Config {
            api_key,
            system: non_empty(args.system),
            model: args.model,
            base_url: args.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
