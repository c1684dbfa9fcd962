pub mod antibot;
pub mod browser_manager;
pub mod session;

pub use session::{Fetcher, SessionDriver};
