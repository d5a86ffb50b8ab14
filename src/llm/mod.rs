pub mod xai;

pub use xai::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatRole, LlmClient, MockClient,
    UsageMetrics, XaiClient, XaiClientConfig, XaiError,
};
