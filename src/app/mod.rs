use std::rc::Rc;

use anyhow::anyhow;
use tracing::{info, instrument};

use crate::{
    errors::AppError,
    github::{GithubClient, IssueService, models::Issue},
    logging,
    session::{
        FixedAnswer, IssueModifier, IssueModifyState, Prompt, SessionContext,
        create::IssueCreate,
        edit::IssueEdit,
        progress::{LogProgress, ProgressIndicator},
    },
};
use cli::{Cli, Command, FieldArgs};
use prompt::{InquirePrompt, TerminalProgress};

pub mod cli;
pub mod menu;
pub mod prompt;

const ACTION_BUFFER: usize = 100;

pub struct App {
    cli: Cli,
    owner: String,
    repo: String,
}

impl App {
    pub async fn new(cli: Cli) -> Result<Self, AppError> {
        let (Some(owner), Some(repo)) = (cli.args.owner.clone(), cli.args.repo.clone()) else {
            return Err(AppError::Other(anyhow!("owner and repo are required")));
        };
        Ok(Self { cli, owner, repo })
    }

    pub async fn run(&mut self) -> Result<(), AppError> {
        logging::init(self.cli.args.log_level)?;
        let token = self.cli.args.token.clone().ok_or(AppError::MissingToken)?;
        let client: Rc<dyn IssueService> = Rc::new(GithubClient::new(Some(token))?);
        let current_user = client.current_user().await?;
        info!(%current_user, owner = %self.owner, repo = %self.repo, "Starting session");

        let context = SessionContext::new(self.owner.clone(), self.repo.clone(), current_user);
        let (modifier, fields) = self.modifier(client.as_ref(), &context).await?;
        let progress: Box<dyn ProgressIndicator> = if fields.json {
            Box::new(LogProgress)
        } else {
            Box::new(TerminalProgress)
        };
        let mut state = IssueModifyState::new(context, Rc::clone(&client), modifier, progress);
        let (action_tx, mut action_rx) = tokio::sync::mpsc::channel(ACTION_BUFFER);
        state.register_action_tx(action_tx);

        state.load().await;
        apply_fields(&state, &fields).await?;

        let saved = if fields.interactive {
            menu::run(&state, &mut action_rx).await?
        } else {
            let issue = state
                .save()
                .await?
                .ok_or_else(|| AppError::Other(anyhow!("a non-empty --title is required")))?;
            Some(issue)
        };
        state.close();

        match saved {
            Some(issue) => report(&issue, fields.json),
            None => {
                eprintln!("Discarded.");
                Ok(())
            }
        }
    }

    async fn modifier(
        &self,
        client: &dyn IssueService,
        context: &SessionContext,
    ) -> Result<(Box<dyn IssueModifier>, FieldArgs), AppError> {
        let command = self.cli.command.clone().unwrap_or_else(|| {
            Command::Create(FieldArgs {
                interactive: true,
                ..Default::default()
            })
        });
        let prompt = |yes: bool| -> Box<dyn Prompt> {
            if yes {
                Box::new(FixedAnswer(true))
            } else {
                Box::new(InquirePrompt)
            }
        };
        match command {
            Command::Create(fields) => {
                let modifier: Box<dyn IssueModifier> =
                    Box::new(IssueCreate::new(prompt(fields.yes)));
                Ok((modifier, fields))
            }
            Command::Edit { number, fields } => {
                let issue = client.issue(&context.owner, &context.repo, number).await?;
                info!(number, title = %issue.title, "Editing existing issue");
                let modifier: Box<dyn IssueModifier> =
                    Box::new(IssueEdit::new(issue, prompt(fields.yes)));
                Ok((modifier, fields))
            }
        }
    }
}

/// Copies command-line field values into the session through its editors.
#[instrument(skip(state))]
pub async fn apply_fields(state: &IssueModifyState, fields: &FieldArgs) -> Result<(), AppError> {
    if let Some(title) = &fields.title {
        state.subject().set(title.clone());
    }
    if let Some(body) = &fields.body {
        state.content().set(body.clone());
    }
    if fields.editor {
        let body = edit::edit(state.content().get())?;
        state.content().set(body);
    }
    if let Some(assignee) = &fields.assignee {
        state.assignees().select_matching(assignee).await?;
    }
    if let Some(milestone) = &fields.milestone {
        state.milestones().select_matching(milestone).await?;
    }
    if !fields.labels.is_empty() {
        state.labels().add_named(&fields.labels).await?;
    }
    Ok(())
}

fn report(issue: &Issue, json: bool) -> Result<(), AppError> {
    if json {
        println!("{}", serde_json::to_string_pretty(issue)?);
    } else {
        println!("#{} {}\n{}", issue.number, issue.title, issue.html_url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests_support::{FakeService, label, milestone, user};

    #[tokio::test]
    async fn apply_fields_resolves_names_through_editors() {
        let service = Rc::new(FakeService::default());
        let state = IssueModifyState::new(
            SessionContext::new("octo".into(), "hello".into(), "me".into()),
            service.clone(),
            Box::new(IssueCreate::new(Box::new(FixedAnswer(true)))),
            Box::new(LogProgress),
        );
        let fields = FieldArgs {
            title: Some("Bug: crash on start".to_string()),
            body: Some("Steps".to_string()),
            assignee: Some("@Hubot".to_string()),
            milestone: Some("2".to_string()),
            labels: vec!["ui".to_string(), "bug".to_string()],
            ..Default::default()
        };

        apply_fields(&state, &fields).await.unwrap();
        let draft = state.draft();
        assert_eq!(draft.subject, "Bug: crash on start");
        assert_eq!(draft.content, "Steps");
        assert_eq!(draft.assignee, Some(user(2, "hubot")));
        assert_eq!(draft.milestone, Some(milestone(2, "v2.0")));
        assert_eq!(draft.labels, vec![label(3, "ui"), label(1, "bug")]);
    }

    #[tokio::test]
    async fn unknown_assignee_is_reported() {
        let service = Rc::new(FakeService::default());
        let state = IssueModifyState::new(
            SessionContext::new("octo".into(), "hello".into(), "me".into()),
            service.clone(),
            Box::new(IssueCreate::new(Box::new(FixedAnswer(true)))),
            Box::new(LogProgress),
        );
        let fields = FieldArgs {
            assignee: Some("nobody".to_string()),
            ..Default::default()
        };
        let err = apply_fields(&state, &fields).await.unwrap_err();
        assert_eq!(err.to_string(), "no assignee named \"nobody\" in this repository");
    }
}
