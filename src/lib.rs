pub mod advisory;
pub mod app;
pub mod config;
pub mod execution;
pub mod executor;
pub mod lifecycle;
pub mod prompts;
pub mod router;
pub mod session;
pub mod shared;
pub mod skills;
pub mod task;
