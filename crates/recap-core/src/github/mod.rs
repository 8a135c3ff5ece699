//! Repository hosting integration
//!
//! Resolves which repository the pipeline lives in and talks to its REST API
//! to confirm the required secrets exist and to start the workflow by hand.

pub mod client;
pub mod repo;

pub use client::{GitHubClient, Workflow, GITHUB_TOKEN_ENV};
pub use repo::RepoRef;
