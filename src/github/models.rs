//! Issue entities as the editing session sees them.
//!
//! These are trimmed down from the octocrab models so sessions and tests can
//! build them directly. Each has a `From` impl for its octocrab counterpart.

use octocrab::models;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Milestone {
    pub id: u64,
    pub number: u64,
    pub title: String,
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    pub html_url: String,
    pub assignee: Option<User>,
    pub milestone: Option<Milestone>,
    pub labels: Vec<Label>,
}

/// The editable fields of a session at one instant, handed to the
/// persistence hook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueDraft {
    pub subject: String,
    pub content: String,
    pub assignee: Option<User>,
    pub milestone: Option<Milestone>,
    pub labels: Vec<Label>,
}

impl IssueDraft {
    pub fn assignee_logins(&self) -> Vec<String> {
        self.assignee.iter().map(|u| u.login.clone()).collect()
    }

    pub fn label_names(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.name.clone()).collect()
    }

    pub fn milestone_number(&self) -> Option<u64> {
        self.milestone.as_ref().map(|m| m.number)
    }
}

impl From<&Issue> for IssueDraft {
    fn from(issue: &Issue) -> Self {
        Self {
            subject: issue.title.clone(),
            content: issue.body.clone().unwrap_or_default(),
            assignee: issue.assignee.clone(),
            milestone: issue.milestone.clone(),
            labels: issue.labels.clone(),
        }
    }
}

impl From<models::Author> for User {
    fn from(value: models::Author) -> Self {
        Self {
            id: value.id.0,
            login: value.login,
        }
    }
}

impl From<models::Milestone> for Milestone {
    fn from(value: models::Milestone) -> Self {
        Self {
            id: value.id.0,
            number: u64::try_from(value.number).unwrap_or_default(),
            title: value.title,
            state: value.state,
        }
    }
}

impl From<models::Label> for Label {
    fn from(value: models::Label) -> Self {
        Self {
            id: value.id.0,
            name: value.name,
            color: value.color,
            description: value.description,
        }
    }
}

impl From<models::issues::Issue> for Issue {
    fn from(value: models::issues::Issue) -> Self {
        let assignee = value
            .assignee
            .or_else(|| value.assignees.into_iter().next())
            .map(Into::into);
        Self {
            number: value.number,
            title: value.title,
            body: value.body,
            html_url: value.html_url.to_string(),
            assignee,
            milestone: value.milestone.map(Into::into),
            labels: value.labels.into_iter().map(Into::into).collect(),
        }
    }
}
