//! Generate command - runs the pipeline over a transcript file

use std::io::Read;
use std::path::Path;

use clap::Args;
use serde::Deserialize;
use tracing::info;

mod recovery;

use super::{bootstrap, CREDENTIAL_ENV};
use crate::domain::pipeline::InputMessage;
use crate::domain::{
    CacheKey, ConversationMessage, Pipeline, PipelineRequest, PipelineResult, RequestConfig,
};

pub use recovery::TerminalRecovery;

/// Arguments for the generate command
#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    /// Transcript file (`-` for stdin): a JSON array of `{author, text}` or `{messages: [...]}`
    #[arg(long, default_value = "-")]
    pub messages: String,

    /// Channel the conversation belongs to (cache namespace)
    #[arg(long)]
    pub channel: Option<String>,

    /// Thread id; replies are cached only when channel and thread are both set
    #[arg(long)]
    pub thread: Option<String>,

    /// Provider API key
    #[arg(long, env = CREDENTIAL_ENV, hide_env_values = true)]
    pub credential: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_output_tokens: Option<u32>,

    /// On failure, carry out the primary recovery action (at most one retry)
    #[arg(long)]
    pub recover: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Transcript {
    Bare(Vec<InputMessage>),
    Wrapped { messages: Vec<InputMessage> },
}

impl GenerateArgs {
    fn request_config(&self) -> RequestConfig {
        let mut config = RequestConfig::new(self.credential.clone().unwrap_or_default());

        if let Some(temperature) = self.temperature {
            config = config.temperature(temperature);
        }
        if let Some(tokens) = self.max_output_tokens {
            config = config.max_output_tokens(tokens);
        }

        config
    }

    fn cache_key(&self) -> Option<CacheKey> {
        match (&self.channel, &self.thread) {
            (Some(channel), Some(thread)) => Some(CacheKey::new(channel.clone(), thread.clone())),
            _ => None,
        }
    }
}

/// Run the pipeline and print the `{success, text?, error?, kind?, actions?}` JSON
pub async fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;
    let pipeline = crate::create_pipeline_with_config(&config).await?;

    let raw = read_transcript(&args.messages)?;
    let mut request = PipelineRequest::new(parse_transcript(&raw)?, args.request_config());
    if let Some(key) = args.cache_key() {
        request = request.with_cache_key(key);
    }

    let result = generate(&pipeline, request, args.recover).await?;
    info!(
        success = result.is_success(),
        attempts = result.report.attempts,
        cache_hit = result.report.cache_hit,
        elapsed_ms = result.report.elapsed.as_millis() as u64,
        "Generation finished"
    );

    println!("{}", serde_json::to_string_pretty(&result.to_output())?);
    Ok(())
}

async fn generate(
    pipeline: &Pipeline,
    request: PipelineRequest,
    recover: bool,
) -> anyhow::Result<PipelineResult> {
    let result = pipeline.run(request.clone()).await;
    if !recover {
        return Ok(result);
    }

    let Some(action) = result.actions.iter().find(|a| a.is_primary) else {
        return Ok(result);
    };

    let recovery = TerminalRecovery::new(pipeline.cache().cloned());
    action.trigger(&recovery).await?;

    if recovery.take_retry() {
        return Ok(pipeline.run(request).await);
    }

    Ok(result)
}

fn read_transcript(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut raw = String::new();
        std::io::stdin().read_to_string(&mut raw)?;
        return Ok(raw);
    }

    std::fs::read_to_string(Path::new(source))
        .map_err(|e| anyhow::anyhow!("Failed to read transcript {}: {}", source, e))
}

fn parse_transcript(raw: &str) -> anyhow::Result<Vec<ConversationMessage>> {
    let messages = match serde_json::from_str::<Transcript>(raw)? {
        Transcript::Bare(messages) | Transcript::Wrapped { messages } => messages,
    };

    Ok(messages
        .into_iter()
        .map(|m| ConversationMessage::new(m.author, m.text))
        .collect())
}
