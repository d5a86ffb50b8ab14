use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Merge;

#[derive(Copy, Clone, Debug)]
pub enum Phase {
    LoadManifest,
    ReadParts,
    Stitch,
    WriteOutput,
}

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::LoadManifest => "load_manifest",
            Phase::ReadParts => "read_parts",
            Phase::Stitch => "stitch",
            Phase::WriteOutput => "write_output",
        }
    }
    fn span(&self) -> Span {
        match self {
            Phase::LoadManifest => info_span!("load_manifest"),
            Phase::ReadParts => info_span!("read_parts"),
            Phase::Stitch => info_span!("stitch"),
            Phase::WriteOutput => info_span!("write_output"),
        }
    }
}

impl OpMarker for Merge {
    const NAME: &'static str = "merge";
    type Phase = Phase;
    fn root_span() -> Span {
        info_span!("merge")
    }
}
