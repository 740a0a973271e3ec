pub mod analysis;
pub mod document;
pub mod entity;
pub mod error;
pub mod evidence;
pub mod job;
pub mod rules;
pub mod utils;

pub use analysis::*;
pub use document::*;
pub use entity::*;
pub use error::{ErrorKind, EvidocError, Result, ResultExt};
pub use evidence::*;
pub use job::*;
pub use rules::*;
pub use utils::{ParseWithDefault, log_filter_warn};
