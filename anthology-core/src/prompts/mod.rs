//! Prompt templates.

pub mod describe;
pub mod recommend;

pub use describe::DESCRIBE_IMAGE_PROMPT;
pub use recommend::{build_messages, render_system_prompt, render_user_body};
