pub mod app;
pub mod cards;
pub mod commands;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod jobs;
pub mod output;
pub mod pdf;
pub mod record;
pub mod runtime;
pub mod snap;
