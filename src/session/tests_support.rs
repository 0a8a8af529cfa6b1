//! In-memory stand-ins for the GitHub client and the presentation layer.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    errors::AppError,
    github::{
        IssueService,
        models::{Issue, IssueDraft, Label, Milestone, User},
    },
    session::progress::ProgressIndicator,
};

pub fn user(id: u64, login: &str) -> User {
    User {
        id,
        login: login.to_string(),
    }
}

pub fn label(id: u64, name: &str) -> Label {
    Label {
        id,
        name: name.to_string(),
        color: "ededed".to_string(),
        description: None,
    }
}

pub fn milestone(number: u64, title: &str) -> Milestone {
    Milestone {
        id: number * 100,
        number,
        title: title.to_string(),
        state: Some("open".to_string()),
    }
}

pub fn issue(number: u64, title: &str) -> Issue {
    Issue {
        number,
        title: title.to_string(),
        body: Some("body".to_string()),
        html_url: format!("https://github.com/octo/hello/issues/{number}"),
        assignee: Some(user(1, "octocat")),
        milestone: Some(milestone(1, "v1.0")),
        labels: vec![label(1, "bug")],
    }
}

fn offline() -> AppError {
    AppError::Other(anyhow::anyhow!("network unreachable"))
}

#[derive(Default)]
pub struct FakeService {
    pub collaborator: Cell<Option<bool>>,
    pub label_failures: Cell<u32>,
    pub save_fails: Cell<bool>,
    pub save_gate: RefCell<Option<Rc<Notify>>>,
    pub collaborator_gate: RefCell<Option<Rc<Notify>>>,
    pub assignee_calls: Cell<u32>,
    pub milestone_calls: Cell<u32>,
    pub label_calls: Cell<u32>,
    created: RefCell<Vec<(String, IssueDraft)>>,
    updated: RefCell<Vec<(u64, IssueDraft)>>,
}

impl FakeService {
    /// `None` makes the collaborator check fail.
    pub fn with_collaborator(value: Option<bool>) -> Self {
        let service = Self::default();
        service.collaborator.set(value);
        service
    }

    pub fn gate_saves(&self) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        *self.save_gate.borrow_mut() = Some(Rc::clone(&gate));
        gate
    }

    pub fn gate_collaborator(&self) -> Rc<Notify> {
        let gate = Rc::new(Notify::new());
        *self.collaborator_gate.borrow_mut() = Some(Rc::clone(&gate));
        gate
    }

    pub fn created(&self) -> Vec<(String, IssueDraft)> {
        self.created.borrow().clone()
    }

    pub fn updated(&self) -> Vec<(u64, IssueDraft)> {
        self.updated.borrow().clone()
    }

    fn saved_issue(number: u64, draft: &IssueDraft) -> Issue {
        Issue {
            number,
            title: draft.subject.clone(),
            body: Some(draft.content.clone()),
            html_url: format!("https://github.com/octo/hello/issues/{number}"),
            assignee: draft.assignee.clone(),
            milestone: draft.milestone.clone(),
            labels: draft.labels.clone(),
        }
    }

    async fn wait_for_save(&self) -> Result<(), AppError> {
        let gate = self.save_gate.borrow().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.save_fails.get() {
            return Err(offline());
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl IssueService for FakeService {
    async fn current_user(&self) -> Result<String, AppError> {
        Ok("me".to_string())
    }

    async fn is_collaborator(
        &self,
        _owner: &str,
        _repo: &str,
        _username: &str,
    ) -> Result<bool, AppError> {
        let gate = self.collaborator_gate.borrow().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.collaborator.get().ok_or_else(offline)
    }

    async fn assignees(&self, _owner: &str, _repo: &str) -> Result<Vec<User>, AppError> {
        self.assignee_calls.set(self.assignee_calls.get() + 1);
        Ok(vec![user(1, "octocat"), user(2, "hubot")])
    }

    async fn milestones(&self, _owner: &str, _repo: &str) -> Result<Vec<Milestone>, AppError> {
        self.milestone_calls.set(self.milestone_calls.get() + 1);
        Ok(vec![milestone(1, "v1.0"), milestone(2, "v2.0")])
    }

    async fn labels(&self, _owner: &str, _repo: &str) -> Result<Vec<Label>, AppError> {
        self.label_calls.set(self.label_calls.get() + 1);
        let failures = self.label_failures.get();
        if failures > 0 {
            self.label_failures.set(failures - 1);
            return Err(offline());
        }
        Ok(vec![label(1, "bug"), label(2, "docs"), label(3, "ui")])
    }

    async fn issue(&self, _owner: &str, _repo: &str, number: u64) -> Result<Issue, AppError> {
        Ok(issue(number, "Existing issue"))
    }

    async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        draft: &IssueDraft,
    ) -> Result<Issue, AppError> {
        self.created
            .borrow_mut()
            .push((format!("{owner}/{repo}"), draft.clone()));
        self.wait_for_save().await?;
        Ok(Self::saved_issue(42, draft))
    }

    async fn update_issue(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        draft: &IssueDraft,
    ) -> Result<Issue, AppError> {
        self.updated.borrow_mut().push((number, draft.clone()));
        self.wait_for_save().await?;
        Ok(Self::saved_issue(number, draft))
    }
}

/// Records show/hide calls; clones share the log.
#[derive(Default, Clone)]
pub struct RecordingProgress {
    pub events: Rc<RefCell<Vec<String>>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }

    pub fn is_visible(&self) -> bool {
        self.events
            .borrow()
            .last()
            .is_some_and(|e| e.starts_with("show"))
    }
}

impl ProgressIndicator for RecordingProgress {
    fn show(&self, message: &str) {
        self.events.borrow_mut().push(format!("show {message}"));
    }

    fn hide(&self) {
        self.events.borrow_mut().push("hide".to_string());
    }
}
