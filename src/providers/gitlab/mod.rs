mod cache;
mod client;
mod provider;

pub use cache::QueryCache;
pub use client::{GitLabClient, RetryPolicy};
pub use provider::GitLabProvider;
