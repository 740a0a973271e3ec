pub mod commands;
pub mod ui;
pub mod util;

pub use ui::Output;
pub use util::{CommandContext, default_repository_id, open_job_store, resolve_repo};
