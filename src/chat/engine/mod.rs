//! Conversation orchestration: the chat service and delayed replies.

pub mod reply_scheduler;
pub mod service;

pub use reply_scheduler::ReplyScheduler;
pub use service::ChatService;
