pub mod connection;
pub mod endpoints;

pub use connection::{ApiConnectionError, ChatCompletionBackend};
pub use endpoints::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, JsonSchema, JsonSchemaDefinition,
    JsonSchemaProperty, Provider, ResponseFormat, OPENROUTER_MODELS,
};
