pub mod format;
pub mod output;
pub mod pacer;
pub mod parallel;
pub mod retry;
