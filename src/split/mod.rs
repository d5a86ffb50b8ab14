pub mod logic;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use crate::manifest::Manifest;
use crate::measure::LengthMetric;
use crate::telemetry::emit::Meta;
use crate::telemetry::ops::split::Phase as SplitPhase;
use crate::telemetry::{self};

use self::logic::{default_cascade, estimate_parts, recursive_split};

#[derive(Args)]
pub struct SplitCmd {
    /// Path to the input file
    input_file: PathBuf,
    #[arg(long, default_value_t = 1_000_000)]
    chunk_size: usize,
    #[arg(long, default_value_t = 20_000)]
    chunk_overlap: usize,
    #[arg(long, value_enum, default_value_t = LengthMetric::Chars)]
    length_metric: LengthMetric,
    #[arg(long, default_value = "parts")]
    output_dir: PathBuf,
    #[arg(long, default_value_t = false)]
    apply: bool,
}

fn part_name(index: usize) -> String {
    format!("part_{index}.txt")
}

pub fn run(args: SplitCmd) -> Result<()> {
    let started = Instant::now();
    let log = telemetry::split();
    let _g = log
        .root_span_kv([
            ("input_file", args.input_file.display().to_string()),
            ("chunk_size", args.chunk_size.to_string()),
            ("chunk_overlap", args.chunk_overlap.to_string()),
            ("length_metric", args.length_metric.to_string()),
            ("output_dir", args.output_dir.display().to_string()),
            ("apply", args.apply.to_string()),
        ])
        .entered();

    let _rs = log.span(&SplitPhase::ReadSource).entered();
    let content = fs::read_to_string(&args.input_file)
        .with_context(|| format!("read input file {}", args.input_file.display()))?;
    drop(_rs);

    let metric = args.length_metric;
    let total_len = metric.measure(&content);

    if !args.apply {
        let _sp = log.span(&SplitPhase::Plan).entered();
        let estimated = estimate_parts(total_len, args.chunk_size, args.chunk_overlap);
        log.info(format!(
            "📝 Split plan — input={} length={} {} chunk_size={} overlap={}",
            args.input_file.display(),
            total_len,
            metric,
            args.chunk_size,
            args.chunk_overlap
        ));
        log.info(format!(
            "   estimated parts: {estimated} → '{}'",
            args.output_dir.display()
        ));
        log.info("   Use --apply to execute.");
        if telemetry::config::json_mode() {
            #[derive(Serialize)]
            struct SplitPlan {
                input_file: String,
                total_len: usize,
                length_metric: LengthMetric,
                chunk_size: usize,
                chunk_overlap: usize,
                estimated_parts: usize,
                output_dir: String,
            }
            let plan = SplitPlan {
                input_file: args.input_file.display().to_string(),
                total_len,
                length_metric: metric,
                chunk_size: args.chunk_size,
                chunk_overlap: args.chunk_overlap,
                estimated_parts: estimated,
                output_dir: args.output_dir.display().to_string(),
            };
            log.plan(&plan)?;
        }
        return Ok(());
    }

    let _pt = log.span(&SplitPhase::Partition).entered();
    let cascade = default_cascade().context("compile separator cascade")?;
    let chunks = recursive_split(&content, &cascade, args.chunk_size, args.chunk_overlap, metric);
    drop(_pt);

    let oversized = chunks
        .iter()
        .filter(|c| metric.measure(c) > args.chunk_size)
        .count();
    if oversized > 0 {
        log.warn(format!(
            "⚠️  {oversized} part(s) exceed chunk_size={} (indivisible segments; emitted as-is)",
            args.chunk_size
        ));
    }

    let _wp = log.span(&SplitPhase::WriteParts).entered();
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("create output dir {}", args.output_dir.display()))?;
    let mut parts = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let name = part_name(i + 1);
        let path = args.output_dir.join(&name);
        fs::write(&path, chunk).with_context(|| format!("write part {}", path.display()))?;
        log.debug(format!("wrote {}", path.display()));
        parts.push(name);
    }
    drop(_wp);

    let original_file = args
        .input_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input_file.display().to_string());

    let _wm = log.span(&SplitPhase::WriteManifest).entered();
    let manifest = Manifest {
        original_file,
        chunk_size: args.chunk_size,
        chunk_overlap: args.chunk_overlap,
        length_metric: metric,
        parts,
        created_at: Some(Utc::now()),
    };
    let manifest_path = manifest.save(&args.output_dir)?;
    drop(_wm);

    log.info(format!(
        "✅ Split into {} part(s) in '{}'",
        manifest.parts.len(),
        args.output_dir.display()
    ));

    if telemetry::config::json_mode() {
        #[derive(Serialize)]
        struct SplitResult {
            parts: usize,
            oversized: usize,
            total_len: usize,
            output_dir: String,
            manifest: String,
        }
        let res = SplitResult {
            parts: manifest.parts.len(),
            oversized,
            total_len,
            output_dir: args.output_dir.display().to_string(),
            manifest: manifest_path.display().to_string(),
        };
        log.result_with(&res, Meta::since(started))?;
    }
    Ok(())
}
