//! External API integrations

pub mod ai_assistant;

pub use ai_assistant::AiAssistantClient;
