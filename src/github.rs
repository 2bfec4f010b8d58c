//! GitHub API Client
//!
//! The observed-state adapter: everything that talks to the GitHub API
//! lives here, behind the [`LabelStore`] trait so the applier can be
//! exercised against an in-memory store in tests.

use async_trait::async_trait;
use octocrab::Octocrab;

use crate::error::{Error, Result};
use crate::report::ObservedLabel;

/// Maximum attempts for a rate-limited API call before giving up
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Encode a string for use in URL path segments (RFC 3986 with UTF-8 support)
///
/// Only unreserved characters (A-Z, a-z, 0-9, -, ., _, ~) are left
/// unencoded; everything else is percent-encoded as UTF-8 bytes. Label
/// names may contain spaces and non-ASCII characters.
fn encode_path_segment(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~' => c.to_string(),
            _ => c
                .to_string()
                .bytes()
                .map(|b| format!("%{:02X}", b))
                .collect::<String>(),
        })
        .collect()
}

fn is_not_found_error(err: &octocrab::Error) -> bool {
    err.to_string().contains("Not Found")
}

fn is_rate_limit_error(err: &octocrab::Error) -> bool {
    err.to_string().to_lowercase().contains("rate limit")
}

/// Remote label operations the reconciliation tooling depends on
///
/// The GitHub implementation is [`GitHubClient`]; tests substitute an
/// in-memory store.
#[async_trait]
pub trait LabelStore {
    /// List all labels of a repository
    async fn list_labels(&self, namespace: &str, repository: &str) -> Result<Vec<ObservedLabel>>;

    /// Create a label; unset attributes are omitted from the request
    async fn create_label(
        &self,
        namespace: &str,
        repository: &str,
        name: &str,
        color: Option<&str>,
        description: Option<&str>,
    ) -> Result<()>;

    /// Update a label in place, optionally renaming it
    async fn update_label(
        &self,
        namespace: &str,
        repository: &str,
        current_name: &str,
        new_name: Option<&str>,
        color: Option<&str>,
        description: Option<&str>,
    ) -> Result<()>;

    /// Delete a label
    async fn delete_label(&self, namespace: &str, repository: &str, name: &str) -> Result<()>;
}

/// A repository discovered while expanding a namespace target
#[derive(Debug, Clone)]
pub struct RepoSummary {
    pub namespace: String,
    pub name: String,
    pub archived: bool,
}

/// GitHub API Client
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// # Arguments
    /// - `token`: Personal access token; without one only publicly
    ///   visible data is reachable
    ///
    /// # Errors
    /// Returns `AuthenticationFailed` if a token is given but rejected
    pub async fn new(token: Option<&str>) -> Result<Self> {
        let octocrab = match token {
            Some(token) => Octocrab::builder()
                .personal_token(token.to_string())
                .build(),
            None => Octocrab::builder().build(),
        }
        .map_err(Error::GitHubApi)?;

        if token.is_some() {
            octocrab
                .current()
                .user()
                .await
                .map_err(|_| Error::AuthenticationFailed)?;
        }

        Ok(Self { octocrab })
    }

    /// Retry a rate-limited call with exponential backoff
    async fn with_backoff<T, F, Fut>(&self, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, octocrab::Error>>,
    {
        let mut delay = std::time::Duration::from_secs(1);
        let mut attempt = 1u32;

        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if is_rate_limit_error(&err) => {
                    if attempt >= MAX_RATE_LIMIT_RETRIES {
                        return Err(Error::RateLimited { attempts: attempt });
                    }
                    match self.get_rate_limit().await {
                        Ok(info) => tracing::warn!(
                            remaining = info.remaining,
                            reset_at = %info.reset_at,
                            "rate limited, backing off"
                        ),
                        Err(_) => tracing::warn!("rate limited, backing off"),
                    }
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(err) => return Err(Error::GitHubApi(err)),
            }
        }
    }

    /// List the repositories of a namespace with their archived flag
    ///
    /// A namespace of `-` lists the authenticated user's repositories;
    /// anything else is treated as an organization.
    ///
    /// # Errors
    /// Returns `RepositoryNotFound` if the namespace does not exist
    pub async fn list_repositories(&self, namespace: &str) -> Result<Vec<RepoSummary>> {
        tracing::debug!(namespace, "listing repositories");

        let page = if namespace == "-" {
            self.octocrab
                .current()
                .list_repos_for_authenticated_user()
                .per_page(100)
                .send()
                .await
        } else {
            self.octocrab
                .orgs(namespace)
                .list_repos()
                .per_page(100)
                .send()
                .await
        }
        .map_err(|e| {
            if is_not_found_error(&e) {
                Error::RepositoryNotFound(namespace.to_string())
            } else {
                Error::GitHubApi(e)
            }
        })?;

        let repos = self
            .octocrab
            .all_pages(page)
            .await
            .map_err(Error::GitHubApi)?;

        Ok(repos
            .into_iter()
            .map(|repo| RepoSummary {
                namespace: repo
                    .owner
                    .map(|owner| owner.login)
                    .unwrap_or_else(|| namespace.to_string()),
                name: repo.name,
                archived: repo.archived.unwrap_or(false),
            })
            .collect())
    }

    /// Get rate limit information
    pub async fn get_rate_limit(&self) -> Result<RateLimitInfo> {
        let rate_limit = self
            .octocrab
            .ratelimit()
            .get()
            .await
            .map_err(Error::GitHubApi)?;

        Ok(RateLimitInfo {
            limit: rate_limit.resources.core.limit as u32,
            remaining: rate_limit.resources.core.remaining as u32,
            reset_at: chrono::DateTime::from_timestamp(rate_limit.resources.core.reset as i64, 0)
                .unwrap_or_else(chrono::Utc::now),
        })
    }
}

#[async_trait]
impl LabelStore for GitHubClient {
    async fn list_labels(&self, namespace: &str, repository: &str) -> Result<Vec<ObservedLabel>> {
        tracing::debug!(namespace, repository, "listing labels");

        let mut labels = Vec::new();
        let mut page = 1u32;

        loop {
            let response = self
                .with_backoff(|| {
                    let issues = self.octocrab.issues(namespace, repository);
                    async move {
                        issues
                            .list_labels_for_repo()
                            .page(page)
                            .per_page(100)
                            .send()
                            .await
                    }
                })
                .await
                .map_err(|e| match e {
                    Error::GitHubApi(ref inner) if is_not_found_error(inner) => {
                        Error::RepositoryNotFound(format!("{}/{}", namespace, repository))
                    }
                    other => other,
                })?;

            if response.items.is_empty() {
                break;
            }

            for label in response.items {
                labels.push(ObservedLabel {
                    name: label.name,
                    color: label.color,
                    description: label.description,
                });
            }

            page += 1;
        }

        Ok(labels)
    }

    async fn create_label(
        &self,
        namespace: &str,
        repository: &str,
        name: &str,
        color: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        tracing::debug!(namespace, repository, name, "creating label");

        let route = format!("/repos/{}/{}/labels", namespace, repository);
        let mut body = serde_json::json!({ "name": name });
        if let Some(color) = color {
            body["color"] = serde_json::Value::String(color.to_string());
        }
        if let Some(description) = description {
            body["description"] = serde_json::Value::String(description.to_string());
        }

        let _created: octocrab::models::Label = self
            .with_backoff(|| {
                let octocrab = &self.octocrab;
                let route = route.clone();
                let body = body.clone();
                async move { octocrab.post(&route, Some(&body)).await }
            })
            .await?;

        Ok(())
    }

    async fn update_label(
        &self,
        namespace: &str,
        repository: &str,
        current_name: &str,
        new_name: Option<&str>,
        color: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        tracing::debug!(namespace, repository, current_name, ?new_name, "updating label");

        let route = format!(
            "/repos/{}/{}/labels/{}",
            namespace,
            repository,
            encode_path_segment(current_name)
        );
        let mut body = serde_json::json!({});
        if let Some(new_name) = new_name {
            body["new_name"] = serde_json::Value::String(new_name.to_string());
        }
        if let Some(color) = color {
            body["color"] = serde_json::Value::String(color.to_string());
        }
        if let Some(description) = description {
            body["description"] = serde_json::Value::String(description.to_string());
        }

        let _updated: octocrab::models::Label = self
            .with_backoff(|| {
                let octocrab = &self.octocrab;
                let route = route.clone();
                let body = body.clone();
                async move { octocrab.patch(&route, Some(&body)).await }
            })
            .await?;

        Ok(())
    }

    async fn delete_label(&self, namespace: &str, repository: &str, name: &str) -> Result<()> {
        tracing::debug!(namespace, repository, name, "deleting label");

        let encoded = encode_path_segment(name);
        self.with_backoff(|| {
            let issues = self.octocrab.issues(namespace, repository);
            let name = encoded.clone();
            async move { issues.delete_label(&name).await }
        })
        .await?;

        Ok(())
    }
}

/// Rate Limit Information
#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    /// Hourly limit
    pub limit: u32,

    /// Remaining usage count
    pub remaining: u32,

    /// Reset time
    pub reset_at: chrono::DateTime<chrono::Utc>,
}
