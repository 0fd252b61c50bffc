//! 이슈/코멘트 도메인 엔티티.

use std::fmt;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// `owner/name` 형태의 저장소 식별자.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSlug {
    owner: String,
    name: String,
}

impl RepoSlug {
    /// `owner/name` 입력을 검증해 식별자로 변환한다.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_end_matches('/');
        let Some((owner, name)) = trimmed.split_once('/') else {
            bail!("repository must look like owner/name: {input}");
        };

        let owner = owner.trim();
        let name = name.trim().trim_end_matches(".git");
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            bail!("repository must look like owner/name: {input}");
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 작업 공간 디렉터리 이름(`owner_name`).
    pub fn dir_slug(&self) -> String {
        format!("{}_{}", self.owner, self.name)
    }

    pub fn clone_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// 선택 시점에 고정되는 이슈 스냅샷.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueRecord {
    #[serde(default)]
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
}

/// 코멘트 작성자와 저장소의 관계(GitHub `author_association`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthorAssociation {
    Owner,
    Member,
    Collaborator,
    Contributor,
    FirstTimeContributor,
    FirstTimer,
    Mannequin,
    #[default]
    None,
    Other(String),
}

impl AuthorAssociation {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Owner => "OWNER",
            Self::Member => "MEMBER",
            Self::Collaborator => "COLLABORATOR",
            Self::Contributor => "CONTRIBUTOR",
            Self::FirstTimeContributor => "FIRST_TIME_CONTRIBUTOR",
            Self::FirstTimer => "FIRST_TIMER",
            Self::Mannequin => "MANNEQUIN",
            Self::None => "NONE",
            Self::Other(raw) => raw,
        }
    }

    /// 저장소 운영 주체(OWNER/MEMBER/COLLABORATOR)인지 여부.
    pub fn is_maintainer(&self) -> bool {
        matches!(self, Self::Owner | Self::Member | Self::Collaborator)
    }
}

impl From<String> for AuthorAssociation {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Self::Owner,
            "MEMBER" => Self::Member,
            "COLLABORATOR" => Self::Collaborator,
            "CONTRIBUTOR" => Self::Contributor,
            "FIRST_TIME_CONTRIBUTOR" => Self::FirstTimeContributor,
            "FIRST_TIMER" => Self::FirstTimer,
            "MANNEQUIN" => Self::Mannequin,
            "NONE" | "" => Self::None,
            _ => Self::Other(value),
        }
    }
}

impl From<AuthorAssociation> for String {
    fn from(value: AuthorAssociation) -> Self {
        value.as_str().to_string()
    }
}

/// 이슈 토론 코멘트. 조회 이후에는 읽기 전용으로 취급한다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    #[serde(default)]
    pub author_login: String,
    #[serde(default)]
    pub author_association: AuthorAssociation,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: String,
}

/// 코멘트 조회 결과. 조회 실패와 "코멘트 없음"을 구분한다.
#[derive(Debug, Clone)]
pub enum CommentFetch {
    Fetched(Vec<CommentRecord>),
    Failed,
}
