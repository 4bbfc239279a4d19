mod core;
pub mod queries;

pub use self::core::{GitLabClient, RetryPolicy};
