//! GitHub REST API 기반 이슈 트래커 구현.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::application::ports::IssueTracker;
use crate::domain::issue::{CommentFetch, CommentRecord, IssueRecord, RepoSlug};

const PER_PAGE: usize = 100;
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct GitHubClient {
    client: Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    /// 토큰이 없으면 비인증 요청(공개 저장소 전용)으로 동작한다.
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("github: failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn issues_endpoint(&self, repo: &RepoSlug) -> String {
        format!("{}/repos/{}/{}/issues", self.api_base, repo.owner(), repo.name())
    }

    fn request(&self, url: String) -> RequestBuilder {
        // 공통 헤더/인증 적용.
        let req = self
            .client
            .get(url)
            .header("User-Agent", "issuepilot")
            .header("Accept", "application/vnd.github+json");

        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
        let resp = req
            .send()
            .await
            .with_context(|| format!("github: failed to fetch {what}"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("github: failed to read {what} body"))?;
        if !status.is_success() {
            anyhow::bail!("github: failed to fetch {what} ({status}): {body}");
        }

        serde_json::from_str(&body).with_context(|| format!("github: invalid {what} JSON"))
    }
}

#[derive(Debug, Deserialize)]
struct IssueResponse {
    number: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    html_url: Option<String>,
    #[serde(default)]
    labels: Vec<LabelResponse>,
    #[serde(default)]
    assignees: Vec<UserResponse>,
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct UserResponse {
    #[serde(default)]
    login: String,
    #[serde(default, rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    #[serde(default)]
    user: Option<UserResponse>,
    #[serde(default)]
    author_association: Option<String>,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    html_url: String,
}

impl From<IssueResponse> for IssueRecord {
    fn from(issue: IssueResponse) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            body: issue.body,
            url: issue.html_url,
            labels: issue.labels.into_iter().map(|l| l.name).collect(),
            assignees: issue.assignees.into_iter().map(|u| u.login).collect(),
        }
    }
}

impl From<CommentResponse> for CommentRecord {
    fn from(comment: CommentResponse) -> Self {
        let user = comment.user.unwrap_or_default();
        Self {
            is_bot: user.kind.eq_ignore_ascii_case("bot"),
            author_login: user.login,
            author_association: comment.author_association.unwrap_or_default().into(),
            created_at: comment.created_at,
            body: comment.body.unwrap_or_default(),
            url: comment.html_url,
        }
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn list_open_issues(&self, repo: &RepoSlug, limit: usize) -> Result<Vec<IssueRecord>> {
        let mut issues = Vec::new();
        let mut page = 1usize;

        while issues.len() < limit {
            let req = self.request(self.issues_endpoint(repo)).query(&[
                ("state", "open".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ]);
            let items: Vec<IssueResponse> = self.get_json(req, "issues").await?;
            if items.is_empty() {
                break;
            }
            debug!(repo = %repo, page, count = items.len(), "fetched issue page");

            // issues endpoint는 PR도 함께 돌려준다.
            let remaining = limit - issues.len();
            issues.extend(
                items
                    .into_iter()
                    .filter(|it| it.pull_request.is_none())
                    .map(IssueRecord::from)
                    .take(remaining),
            );
            page += 1;
        }

        Ok(issues)
    }

    async fn fetch_issue(&self, repo: &RepoSlug, number: u64) -> Result<IssueRecord> {
        let url = format!("{}/{number}", self.issues_endpoint(repo));
        let issue: IssueResponse = self.get_json(self.request(url), "issue").await?;
        if issue.pull_request.is_some() {
            anyhow::bail!("github: {repo}#{number} is a pull request, not an issue");
        }
        Ok(issue.into())
    }

    async fn fetch_comments(&self, repo: &RepoSlug, number: u64) -> CommentFetch {
        let url = format!("{}/{number}/comments", self.issues_endpoint(repo));
        let req = self.request(url).query(&[("per_page", PER_PAGE.to_string())]);

        match self.get_json::<Vec<CommentResponse>>(req, "comments").await {
            Ok(comments) => CommentFetch::Fetched(comments.into_iter().map(Into::into).collect()),
            Err(err) => {
                warn!(repo = %repo, issue = number, error = %format!("{err:#}"), "comment fetch failed");
                CommentFetch::Failed
            }
        }
    }
}
