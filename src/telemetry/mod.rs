pub mod config;
pub mod ctx;
pub mod emit;
pub mod ops;

use ctx::LogCtx;

pub fn split() -> LogCtx<ops::split::Split> {
    LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData }
}

pub fn process() -> LogCtx<ops::process::Process> {
    LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData }
}

pub fn merge() -> LogCtx<ops::merge::Merge> {
    LogCtx { json: config::logs_are_json(), _marker: std::marker::PhantomData }
}
