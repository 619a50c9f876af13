pub mod fallback_bank;
pub mod interview_service;
pub mod llm_client;
pub mod prompts;
pub mod render_service;
pub mod response_parser;
pub mod session_store;
