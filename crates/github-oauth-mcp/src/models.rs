//! Serde models for the subset of GitHub REST fields the tools surface.

use serde::{Deserialize, Serialize};

/// An authenticated GitHub user profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub public_repos: Option<i64>,
    #[serde(default)]
    pub followers: Option<i64>,
    #[serde(default)]
    pub following: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A GitHub repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: Option<i64>,
    #[serde(default)]
    pub forks_count: Option<i64>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Repository {
    /// Star count, zero when the API omits it.
    #[must_use]
    pub fn stars(&self) -> i64 {
        self.stargazers_count.unwrap_or(0)
    }

    /// Fork count, zero when the API omits it.
    #[must_use]
    pub fn forks(&self) -> i64 {
        self.forks_count.unwrap_or(0)
    }
}
