use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Split;

#[derive(Copy, Clone, Debug)]
pub enum Phase {
    Plan,
    ReadSource,
    Partition,
    WriteParts,
    WriteManifest,
}

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Plan => "plan",
            Phase::ReadSource => "read_source",
            Phase::Partition => "partition",
            Phase::WriteParts => "write_parts",
            Phase::WriteManifest => "write_manifest",
        }
    }
    fn span(&self) -> Span {
        match self {
            Phase::Plan => info_span!("plan"),
            Phase::ReadSource => info_span!("read_source"),
            Phase::Partition => info_span!("partition"),
            Phase::WriteParts => info_span!("write_parts"),
            Phase::WriteManifest => info_span!("write_manifest"),
        }
    }
}

impl OpMarker for Split {
    const NAME: &'static str = "split";
    type Phase = Phase;
    fn root_span() -> Span {
        info_span!("split")
    }
}
