pub mod types;
pub mod traits;
pub mod streaming;
pub mod openai;
pub mod config;
pub mod models;

pub use traits::{ChatClient, ChatRequest, ChatResponse, ChatOptions, TokenUsage};
pub use streaming::{StreamEvent, collect_stream};
pub use openai::OpenAIClient;
pub use config::{ProviderConfig, ClientFactory, HttpClientFactory};
pub use models::{Provider, ModelConfig, ApiKeys, AI_MODELS, DEFAULT_MODEL, get_model_config};
pub use types::{Message, Content, ContentPart};
