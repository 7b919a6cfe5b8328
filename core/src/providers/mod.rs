pub mod factory;
pub mod openai;

pub use factory::{PRESETS, ProviderPreset, create_provider, find_preset};
pub use openai::OpenAIProvider;
