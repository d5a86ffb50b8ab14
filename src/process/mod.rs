use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;
use tracing::warn;

use crate::llm::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole, LlmClient, XaiClient,
    XaiClientConfig, XaiError,
};
use crate::manifest::Manifest;
use crate::merge::logic::stitch;
use crate::telemetry::emit::Meta;
use crate::telemetry::ops::process::Phase as ProcessPhase;
use crate::telemetry::{self};

const MAX_RETRIES: u32 = 2;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Args)]
pub struct ProcessCmd {
    #[arg(long, default_value = "parts")]
    input_dir: PathBuf,
    #[arg(long, default_value = "processed_parts")]
    output_dir: PathBuf,
    /// Defaults to XAI_MODEL or the built-in model
    #[arg(long)]
    model: Option<String>,
    /// Prompt sent per chunk; {chunk} is replaced with the chunk text
    #[arg(long, default_value = "Rewrite this text for clarity: {chunk}")]
    prompt_template: String,
    #[arg(long, default_value = "You are a helpful assistant.")]
    system_prompt: String,
    #[arg(long, default_value_t = 1000)]
    max_tokens: u32,
    #[arg(long)]
    temperature: Option<f32>,
    /// Overrides XAI_API_KEY
    #[arg(long)]
    api_key: Option<String>,
    /// Stitch the processed parts into a single file afterwards
    #[arg(long, default_value_t = false)]
    merge: bool,
    /// Defaults to processed_<original_file> inside the output dir
    #[arg(long)]
    output_file: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

pub(crate) struct TransformSettings {
    pub model: Option<String>,
    pub prompt_template: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

fn render_prompt(template: &str, chunk: &str) -> String {
    template.replace("{chunk}", chunk)
}

fn processed_part_name(index: usize) -> String {
    format!("processed_part_{index}.txt")
}

/// One chunk through the rewrite service, retrying transient failures.
pub(crate) async fn transform_chunk(
    client: &dyn LlmClient,
    settings: &TransformSettings,
    chunk: &str,
) -> Result<ChatCompletionResponse, XaiError> {
    let request = ChatCompletionRequest {
        model: settings.model.clone(),
        messages: vec![
            ChatMessage::new(ChatRole::System, settings.system_prompt.clone()),
            ChatMessage::new(
                ChatRole::User,
                render_prompt(&settings.prompt_template, chunk),
            ),
        ],
        max_tokens: Some(settings.max_tokens),
        temperature: settings.temperature,
    };

    let mut attempt = 0u32;
    loop {
        match client.chat_completion(request.clone()).await {
            Ok(resp) => return Ok(resp),
            Err(err) if err.is_retryable() && attempt < MAX_RETRIES => {
                attempt += 1;
                warn!(attempt, "transient api error: {err}; retrying");
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[derive(Serialize, Default)]
struct UsageTotals {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl UsageTotals {
    fn add(&mut self, resp: &ChatCompletionResponse) {
        if let Some(usage) = &resp.usage {
            self.prompt_tokens += usage.prompt_tokens.unwrap_or(0);
            self.completion_tokens += usage.completion_tokens.unwrap_or(0);
            self.total_tokens += usage.total_tokens.unwrap_or(0);
        }
    }
}

pub async fn run(args: ProcessCmd) -> Result<()> {
    let started = Instant::now();
    let log = telemetry::process();
    let _g = log
        .root_span_kv([
            ("input_dir", args.input_dir.display().to_string()),
            ("output_dir", args.output_dir.display().to_string()),
            ("model", format!("{:?}", args.model)),
            ("max_tokens", args.max_tokens.to_string()),
            ("temperature", format!("{:?}", args.temperature)),
            ("merge", args.merge.to_string()),
            ("dry_run", args.dry_run.to_string()),
        ])
        .entered();

    let _lm = log.span(&ProcessPhase::LoadManifest).entered();
    let manifest = Manifest::load(&args.input_dir)?;
    drop(_lm);

    let mut client_cfg = XaiClientConfig::from_env();
    if let Some(key) = &args.api_key {
        client_cfg.api_key = Some(key.clone());
    }
    let model_name = args
        .model
        .clone()
        .unwrap_or_else(|| client_cfg.default_model.clone());

    if !args.prompt_template.contains("{chunk}") {
        log.warn("⚠️  Prompt template has no {chunk} placeholder; chunk text will not be sent");
    }

    if args.dry_run {
        let _sp = log.span(&ProcessPhase::Plan).entered();
        log.info(format!(
            "📝 Process plan — parts={} model={} merge={}",
            manifest.parts.len(),
            model_name,
            args.merge
        ));
        for part in &manifest.parts {
            log.info(format!("  {part}"));
        }
        log.info("📝 Dry run — skipping API calls");
        if telemetry::config::json_mode() {
            #[derive(Serialize)]
            struct ProcessPlan<'a> {
                input_dir: String,
                output_dir: String,
                model: &'a str,
                prompt_template: &'a str,
                system_prompt: &'a str,
                max_tokens: u32,
                temperature: Option<f32>,
                merge: bool,
                parts: &'a [String],
            }
            let plan = ProcessPlan {
                input_dir: args.input_dir.display().to_string(),
                output_dir: args.output_dir.display().to_string(),
                model: &model_name,
                prompt_template: &args.prompt_template,
                system_prompt: &args.system_prompt,
                max_tokens: args.max_tokens,
                temperature: args.temperature,
                merge: args.merge,
                parts: &manifest.parts,
            };
            log.plan(&plan)?;
        }
        return Ok(());
    }

    let client = XaiClient::new(client_cfg).context("init xAI client")?;
    let settings = TransformSettings {
        model: Some(model_name.clone()),
        prompt_template: args.prompt_template.clone(),
        system_prompt: args.system_prompt.clone(),
        max_tokens: args.max_tokens,
        temperature: args.temperature,
    };

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("create output dir {}", args.output_dir.display()))?;

    let total = manifest.parts.len();
    let mut processed_parts = Vec::with_capacity(total);
    let mut processed_texts = Vec::with_capacity(total);
    let mut usage = UsageTotals::default();

    for (i, part) in manifest.parts.iter().enumerate() {
        let path = args.input_dir.join(part);
        let chunk = fs::read_to_string(&path)
            .with_context(|| format!("read part file {}", path.display()))?;

        let _ts = log.span_kv(&ProcessPhase::Transform, [("part", part.clone())]).entered();
        log.info(format!("🧠 Processing part {}/{} — {}", i + 1, total, part));
        let response = match transform_chunk(&client, &settings, &chunk).await {
            Ok(resp) => resp,
            Err(err) => {
                match &err {
                    XaiError::MissingApiKey => {
                        log.warn("⚠️  Missing XAI_API_KEY — set it, pass --api-key, or use --dry-run.");
                    }
                    XaiError::Api { status, error } => {
                        log.warn(format!("⚠️  API error {} — {}", status, error.message));
                    }
                    XaiError::Timeout => {
                        log.warn("⚠️  Request timed out — consider increasing XAI_TIMEOUT_SECS.");
                    }
                    _ => {
                        log.warn("⚠️  API request failed — see error details below.");
                    }
                }
                return Err(anyhow::Error::new(err)
                    .context(format!("transform part {part}")));
            }
        };
        drop(_ts);
        usage.add(&response);

        let _wp = log.span(&ProcessPhase::WriteParts).entered();
        let name = processed_part_name(i + 1);
        let out_path = args.output_dir.join(&name);
        fs::write(&out_path, &response.content)
            .with_context(|| format!("write processed part {}", out_path.display()))?;
        drop(_wp);

        processed_parts.push(name);
        processed_texts.push(response.content);
    }

    let _wm = log.span(&ProcessPhase::WriteManifest).entered();
    let processed_manifest = Manifest {
        parts: processed_parts,
        created_at: Some(Utc::now()),
        ..manifest.clone()
    };
    processed_manifest.save(&args.output_dir)?;
    drop(_wm);

    log.info(format!(
        "✅ Processed {} part(s) into '{}'",
        total,
        args.output_dir.display()
    ));

    let mut merged_into = None;
    if args.merge {
        let _st = log.span(&ProcessPhase::Stitch).entered();
        let stitched = stitch(&processed_texts, manifest.chunk_overlap);
        for &i in &stitched.misses {
            log.warn(format!(
                "⚠️  No overlap found for {}; appending fully",
                processed_manifest.parts[i]
            ));
        }
        let output_file = args.output_file.clone().unwrap_or_else(|| {
            args.output_dir
                .join(format!("processed_{}", manifest.original_file))
        });
        fs::write(&output_file, &stitched.text)
            .with_context(|| format!("write merged file {}", output_file.display()))?;
        drop(_st);
        log.info(format!("✅ Merged output saved as '{}'", output_file.display()));
        merged_into = Some(output_file.display().to_string());
    }

    if telemetry::config::json_mode() {
        #[derive(Serialize)]
        struct ProcessResult {
            parts: usize,
            model: String,
            output_dir: String,
            merged_into: Option<String>,
            usage: UsageTotals,
        }
        let res = ProcessResult {
            parts: total,
            model: model_name,
            output_dir: args.output_dir.display().to_string(),
            merged_into,
            usage,
        };
        log.result_with(&res, Meta::since(started))?;
    }
    Ok(())
}
