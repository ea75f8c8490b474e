//! Command handlers for the tributario CLI.

pub mod ask;
pub mod config;
pub mod retrieve;
pub mod route;
pub mod topics;

pub use ask::AskCommand;
pub use config::ConfigCommand;
pub use retrieve::RetrieveCommand;
pub use route::RouteCommand;
pub use topics::TopicsCommand;
