use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Process;

#[derive(Copy, Clone, Debug)]
pub enum Phase {
    Plan,
    LoadManifest,
    Transform,
    WriteParts,
    WriteManifest,
    Stitch,
}

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Plan => "plan",
            Phase::LoadManifest => "load_manifest",
            Phase::Transform => "transform",
            Phase::WriteParts => "write_parts",
            Phase::WriteManifest => "write_manifest",
            Phase::Stitch => "stitch",
        }
    }
    fn span(&self) -> Span {
        match self {
            Phase::Plan => info_span!("plan"),
            Phase::LoadManifest => info_span!("load_manifest"),
            Phase::Transform => info_span!("transform"),
            Phase::WriteParts => info_span!("write_parts"),
            Phase::WriteManifest => info_span!("write_manifest"),
            Phase::Stitch => info_span!("stitch"),
        }
    }
}

impl OpMarker for Process {
    const NAME: &'static str = "process";
    type Phase = Phase;
    fn root_span() -> Span {
        info_span!("process")
    }
}
