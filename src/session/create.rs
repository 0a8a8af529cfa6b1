use async_trait::async_trait;
use tracing::instrument;

use crate::{
    errors::AppError,
    github::{
        IssueService,
        models::{Issue, IssueDraft},
    },
    session::{IssueModifier, Prompt, SessionContext},
};

/// Opens a new issue in the session's repository.
pub struct IssueCreate {
    prompt: Box<dyn Prompt>,
}

impl IssueCreate {
    pub fn new(prompt: Box<dyn Prompt>) -> Self {
        Self { prompt }
    }
}

#[async_trait(?Send)]
impl IssueModifier for IssueCreate {
    #[instrument(skip_all)]
    async fn save(
        &self,
        service: &dyn IssueService,
        context: &SessionContext,
        draft: &IssueDraft,
    ) -> Result<Issue, AppError> {
        service
            .create_issue(&context.owner, &context.repo, draft)
            .await
    }

    async fn discard(&self, draft: &IssueDraft) -> bool {
        if draft.subject.trim().is_empty() && draft.content.trim().is_empty() {
            return true;
        }
        self.prompt
            .confirm(
                "Discard Issue?",
                "Are you sure you want to discard this issue?",
            )
            .await
    }
}
