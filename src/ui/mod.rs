pub mod icons;
pub mod progress;
pub mod status;

pub use progress::RunUI;
pub use status::{render_list_row, render_readiness, render_status, render_usage};
