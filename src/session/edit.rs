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

/// Updates an existing issue. The session starts from the issue's current
/// fields.
pub struct IssueEdit {
    original: Issue,
    prompt: Box<dyn Prompt>,
}

impl IssueEdit {
    pub fn new(original: Issue, prompt: Box<dyn Prompt>) -> Self {
        Self { original, prompt }
    }
}

#[async_trait(?Send)]
impl IssueModifier for IssueEdit {
    fn initial_draft(&self) -> IssueDraft {
        IssueDraft::from(&self.original)
    }

    #[instrument(skip_all, fields(number = self.original.number))]
    async fn save(
        &self,
        service: &dyn IssueService,
        context: &SessionContext,
        draft: &IssueDraft,
    ) -> Result<Issue, AppError> {
        service
            .update_issue(&context.owner, &context.repo, self.original.number, draft)
            .await
    }

    async fn discard(&self, draft: &IssueDraft) -> bool {
        if *draft == self.initial_draft() {
            return true;
        }
        self.prompt
            .confirm(
                "Discard Edit?",
                "Are you sure you want to discard these changes?",
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        FixedAnswer,
        tests_support::{FakeService, issue, label},
    };

    #[tokio::test]
    async fn unchanged_draft_discards_without_asking() {
        let original = issue(12, "Typo in README");
        let edit = IssueEdit::new(original.clone(), Box::new(FixedAnswer(false)));
        assert!(edit.discard(&IssueDraft::from(&original)).await);
    }

    #[tokio::test]
    async fn changed_draft_defers_to_prompt() {
        let original = issue(12, "Typo in README");
        let mut draft = IssueDraft::from(&original);
        draft.labels.push(label(4, "docs"));
        let edit = IssueEdit::new(original.clone(), Box::new(FixedAnswer(false)));
        assert!(!edit.discard(&draft).await);
        let edit = IssueEdit::new(original, Box::new(FixedAnswer(true)));
        assert!(edit.discard(&draft).await);
    }

    #[tokio::test]
    async fn save_updates_original_number() {
        let service = FakeService::default();
        let context = SessionContext::new("octo".into(), "hello".into(), "me".into());
        let original = issue(12, "Typo in README");
        let mut draft = IssueDraft::from(&original);
        draft.subject = "Typo in CONTRIBUTING".to_string();
        let edit = IssueEdit::new(original, Box::new(FixedAnswer(true)));

        let saved = edit.save(&service, &context, &draft).await.unwrap();
        assert_eq!(saved.number, 12);
        assert_eq!(saved.title, "Typo in CONTRIBUTING");
        assert_eq!(service.updated(), vec![(12, draft)]);
    }
}
