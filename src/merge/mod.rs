pub mod logic;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::manifest::Manifest;
use crate::telemetry::emit::Meta;
use crate::telemetry::ops::merge::Phase as MergePhase;
use crate::telemetry::{self};

use self::logic::stitch;

#[derive(Args)]
pub struct MergeCmd {
    #[arg(long, default_value = "parts")]
    input_dir: PathBuf,
    /// Defaults to reconstructed_<original_file> inside the input dir
    #[arg(long)]
    output_file: Option<PathBuf>,
    /// Override the manifest's overlap, e.g. after a transformation that
    /// changed boundary region size
    #[arg(long)]
    chunk_overlap: Option<usize>,
}

pub fn run(args: MergeCmd) -> Result<()> {
    let started = Instant::now();
    let log = telemetry::merge();
    let _g = log
        .root_span_kv([
            ("input_dir", args.input_dir.display().to_string()),
            ("output_file", format!("{:?}", args.output_file)),
            ("chunk_overlap", format!("{:?}", args.chunk_overlap)),
        ])
        .entered();

    let _lm = log.span(&MergePhase::LoadManifest).entered();
    let manifest = Manifest::load(&args.input_dir)?;
    drop(_lm);

    let overlap = args.chunk_overlap.unwrap_or(manifest.chunk_overlap);

    let _rp = log.span(&MergePhase::ReadParts).entered();
    let mut texts = Vec::with_capacity(manifest.parts.len());
    for part in &manifest.parts {
        let path = args.input_dir.join(part);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("read part file {}", path.display()))?;
        texts.push(text);
    }
    drop(_rp);

    let _st = log.span(&MergePhase::Stitch).entered();
    let stitched = stitch(&texts, overlap);
    for &i in &stitched.misses {
        log.warn_kv(
            &format!(
                "⚠️  No overlap found for {}; appending fully",
                manifest.parts[i]
            ),
            [("part", manifest.parts[i].clone()), ("index", i.to_string())],
        );
    }
    drop(_st);

    let output_file = args.output_file.unwrap_or_else(|| {
        args.input_dir
            .join(format!("reconstructed_{}", manifest.original_file))
    });

    let _wo = log.span(&MergePhase::WriteOutput).entered();
    fs::write(&output_file, &stitched.text)
        .with_context(|| format!("write output file {}", output_file.display()))?;
    drop(_wo);

    log.info(format!(
        "✅ Reconstructed {} part(s) into '{}'",
        manifest.parts.len(),
        output_file.display()
    ));

    if telemetry::config::json_mode() {
        #[derive(Serialize)]
        struct MergeResult {
            output_file: String,
            parts: usize,
            chunk_overlap: usize,
            overlap_misses: usize,
            output_chars: usize,
        }
        let res = MergeResult {
            output_file: output_file.display().to_string(),
            parts: manifest.parts.len(),
            chunk_overlap: overlap,
            overlap_misses: stitched.misses.len(),
            output_chars: stitched.text.chars().count(),
        };
        log.result_with(&res, Meta::since(started))?;
    }
    Ok(())
}
