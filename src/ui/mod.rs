pub mod logs;
pub mod progress;
pub mod prompt;
pub mod summary;
