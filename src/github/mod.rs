pub mod models;

use async_trait::async_trait;
use octocrab::{Octocrab, Page};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument};

use crate::errors::AppError;
use models::{Issue, IssueDraft, Label, Milestone, User};

const PER_PAGE: u8 = 100;

#[derive(Serialize)]
struct PageParams {
    per_page: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'static str>,
}

/// Body of an issue PATCH. Every field is sent, so a cleared assignee,
/// milestone or label set is cleared remotely too.
#[derive(Debug, Serialize)]
struct IssueUpdate<'a> {
    title: &'a str,
    body: &'a str,
    assignees: Vec<String>,
    milestone: Option<u64>,
    labels: Vec<String>,
}

impl<'a> From<&'a IssueDraft> for IssueUpdate<'a> {
    fn from(draft: &'a IssueDraft) -> Self {
        Self {
            title: &draft.subject,
            body: &draft.content,
            assignees: draft.assignee_logins(),
            milestone: draft.milestone_number(),
            labels: draft.label_names(),
        }
    }
}

/// Remote operations an editing session depends on.
#[async_trait(?Send)]
pub trait IssueService {
    async fn current_user(&self) -> Result<String, AppError>;
    async fn is_collaborator(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<bool, AppError>;
    async fn assignees(&self, owner: &str, repo: &str) -> Result<Vec<User>, AppError>;
    async fn milestones(&self, owner: &str, repo: &str) -> Result<Vec<Milestone>, AppError>;
    async fn labels(&self, owner: &str, repo: &str) -> Result<Vec<Label>, AppError>;
    async fn issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, AppError>;
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        draft: &IssueDraft,
    ) -> Result<Issue, AppError>;
    async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        draft: &IssueDraft,
    ) -> Result<Issue, AppError>;
}

#[derive(Clone)]
pub struct GithubClient {
    inner: Octocrab,
}

impl GithubClient {
    pub fn new(token: Option<String>) -> Result<Self, AppError> {
        let mut builder = Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }
        Ok(Self {
            inner: builder.build()?,
        })
    }

    async fn list_all<T: DeserializeOwned>(
        &self,
        route: String,
        state: Option<&'static str>,
    ) -> Result<Vec<T>, AppError> {
        let params = PageParams {
            per_page: PER_PAGE,
            state,
        };
        let first: Page<T> = self.inner.get(&route, Some(&params)).await?;
        let items = self.inner.all_pages(first).await?;
        debug!(%route, count = items.len(), "Fetched all pages");
        Ok(items)
    }
}

#[async_trait(?Send)]
impl IssueService for GithubClient {
    async fn current_user(&self) -> Result<String, AppError> {
        Ok(self.inner.current().user().await?.login)
    }

    #[instrument(skip(self))]
    async fn is_collaborator(
        &self,
        owner: &str,
        repo: &str,
        username: &str,
    ) -> Result<bool, AppError> {
        Ok(self
            .inner
            .repos(owner, repo)
            .is_collaborator(username)
            .await?)
    }

    #[instrument(skip(self))]
    async fn assignees(&self, owner: &str, repo: &str) -> Result<Vec<User>, AppError> {
        let authors: Vec<octocrab::models::Author> = self
            .list_all(format!("/repos/{owner}/{repo}/assignees"), None)
            .await?;
        Ok(authors.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn milestones(&self, owner: &str, repo: &str) -> Result<Vec<Milestone>, AppError> {
        let milestones: Vec<octocrab::models::Milestone> = self
            .list_all(format!("/repos/{owner}/{repo}/milestones"), Some("open"))
            .await?;
        Ok(milestones.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn labels(&self, owner: &str, repo: &str) -> Result<Vec<Label>, AppError> {
        let handler = self.inner.issues(owner, repo);
        let mut page = handler
            .list_labels_for_repo()
            .per_page(PER_PAGE)
            .page(1u32)
            .send()
            .await?;
        let mut labels = Vec::new();
        loop {
            labels.extend(std::mem::take(&mut page.items).into_iter().map(Label::from));
            if page.next.is_none() {
                break;
            }
            match self
                .inner
                .get_page::<octocrab::models::Label>(&page.next)
                .await?
            {
                Some(next_page) => page = next_page,
                None => break,
            }
        }
        Ok(labels)
    }

    #[instrument(skip(self))]
    async fn issue(&self, owner: &str, repo: &str, number: u64) -> Result<Issue, AppError> {
        Ok(self.inner.issues(owner, repo).get(number).await?.into())
    }

    #[instrument(skip(self, draft), fields(subject = %draft.subject))]
    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        draft: &IssueDraft,
    ) -> Result<Issue, AppError> {
        let issues = self.inner.issues(owner, repo);
        let mut create = issues
            .create(draft.subject.clone())
            .labels(draft.label_names())
            .assignees(draft.assignee_logins());
        if !draft.content.trim().is_empty() {
            create = create.body(draft.content.clone());
        }
        if let Some(number) = draft.milestone_number() {
            create = create.milestone(number);
        }
        Ok(create.send().await?.into())
    }

    #[instrument(skip(self, draft), fields(subject = %draft.subject))]
    async fn update_issue(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        draft: &IssueDraft,
    ) -> Result<Issue, AppError> {
        let route = format!("/repos/{owner}/{repo}/issues/{number}");
        let body = IssueUpdate::from(draft);
        let issue: octocrab::models::issues::Issue =
            self.inner.patch(route, Some(&body)).await?;
        Ok(issue.into())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::session::tests_support::{issue, label};

    #[test]
    fn update_body_sends_every_field() {
        let draft = IssueDraft::from(&issue(12, "Typo"));
        let body = serde_json::to_value(IssueUpdate::from(&draft)).unwrap();
        assert_eq!(
            body,
            json!({
                "title": "Typo",
                "body": "body",
                "assignees": ["octocat"],
                "milestone": 1,
                "labels": ["bug"],
            })
        );
    }

    #[test]
    fn update_body_clears_milestone_with_null() {
        let mut draft = IssueDraft::from(&issue(12, "Typo"));
        draft.milestone = None;
        draft.assignee = None;
        draft.labels = vec![label(2, "docs")];
        let body = serde_json::to_value(IssueUpdate::from(&draft)).unwrap();
        assert_eq!(body["milestone"], serde_json::Value::Null);
        assert_eq!(body["assignees"], json!([]));
        assert_eq!(body["labels"], json!(["docs"]));
    }
}
