mod cleanup;
mod list;
mod services;
mod start;
mod stop;

pub use cleanup::run_cleanup;
pub use list::run_list;
pub use services::run_services;
pub use start::run_start;
pub use stop::{run_stop, run_stop_all};
