pub mod log;
pub mod page;
pub mod status;

pub use log::LogStream;
pub use page::Page;
pub use status::StatusPage;
