pub mod gitlab;

pub use gitlab::{GitLabClient, GitLabProvider, QueryCache, RetryPolicy};
