pub mod common;
pub mod completions;
pub mod edit;
pub mod list;
pub mod observe;
pub mod remove;
pub mod show;
pub mod sync;
