//! Menu-driven editing on the terminal.
//!
//! The menu only raises session signals; the editors are presented when the
//! corresponding [`SessionAction`] comes back on the channel.

use std::fmt;

use inquire::{MultiSelect, Select, Text};
use tokio::sync::mpsc::Receiver;
use tracing::info;

use crate::{
    errors::AppError,
    github::models::Issue,
    session::{IssueModifyState, SessionAction, editor::Candidate},
};

const NONE_CHOICE: &str = "(none)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuItem {
    Title,
    Body,
    Assignee,
    Milestone,
    Labels,
    Save,
    Discard,
}

impl MenuItem {
    const ALL: [MenuItem; 7] = [
        MenuItem::Title,
        MenuItem::Body,
        MenuItem::Assignee,
        MenuItem::Milestone,
        MenuItem::Labels,
        MenuItem::Save,
        MenuItem::Discard,
    ];
}

impl fmt::Display for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MenuItem::Title => "Edit title",
            MenuItem::Body => "Edit body",
            MenuItem::Assignee => "Choose assignee",
            MenuItem::Milestone => "Choose milestone",
            MenuItem::Labels => "Choose labels",
            MenuItem::Save => "Save",
            MenuItem::Discard => "Discard",
        };
        write!(f, "{s}")
    }
}

fn summary(state: &IssueModifyState) -> String {
    let draft = state.draft();
    let assignee = draft
        .assignee
        .as_ref()
        .map_or_else(|| NONE_CHOICE.to_string(), Candidate::display_name);
    let milestone = draft
        .milestone
        .as_ref()
        .map_or_else(|| NONE_CHOICE.to_string(), Candidate::display_name);
    let labels = if draft.labels.is_empty() {
        NONE_CHOICE.to_string()
    } else {
        draft.label_names().join(", ")
    };
    let collaborator = match state.is_collaborator().get() {
        Some(true) => "",
        _ => " (you may lack push access, some fields can be ignored)",
    };
    format!(
        "{}/{}{collaborator}\n  title: {}\n  assignee: {assignee}\n  milestone: {milestone}\n  labels: {labels}\n",
        state.context().owner,
        state.context().repo,
        draft.subject,
    )
}

/// Runs the menu until the session is saved or dismissed. Returns the saved
/// issue, if any.
pub async fn run(
    state: &IssueModifyState,
    action_rx: &mut Receiver<SessionAction>,
) -> Result<Option<Issue>, AppError> {
    let mut saved = None;
    loop {
        println!("{}", summary(state));
        let choice = Select::new("What next?", MenuItem::ALL.to_vec()).prompt()?;
        match choice {
            MenuItem::Title => {
                let title = Text::new("Title")
                    .with_initial_value(&state.subject().get())
                    .prompt()?;
                state.subject().set(title);
            }
            MenuItem::Body => {
                let body = edit::edit(state.content().get())?;
                state.content().set(body);
            }
            MenuItem::Assignee => state.go_to_assignees().await,
            MenuItem::Milestone => state.go_to_milestones().await,
            MenuItem::Labels => state.go_to_labels().await,
            MenuItem::Save => match state.save().await {
                Ok(Some(_)) => {}
                Ok(None) if !state.can_save().get() => eprintln!("A title is required."),
                Ok(None) => {}
                Err(err) => eprintln!("Failed to save issue: {err}"),
            },
            MenuItem::Discard => {
                state.dismiss().await;
            }
        }

        while let Ok(action) = action_rx.try_recv() {
            match action {
                SessionAction::GoToAssignees => pick_assignee(state).await?,
                SessionAction::GoToMilestones => pick_milestone(state).await?,
                SessionAction::GoToLabels => pick_labels(state).await?,
                SessionAction::Saved(issue) => saved = Some(*issue),
                SessionAction::Dismissed => {
                    info!(saved = saved.is_some(), "Session ended");
                    return Ok(saved);
                }
            }
        }
    }
}

/// `Ok(None)` when the user skipped the prompt, `Ok(Some(None))` when they
/// picked "(none)".
fn choose_one<T: Candidate + Clone + PartialEq>(
    prompt: &str,
    candidates: &[T],
    current: Option<&T>,
) -> Result<Option<Option<T>>, AppError> {
    let mut options = vec![NONE_CHOICE.to_string()];
    options.extend(candidates.iter().map(Candidate::display_name));
    let cursor = current
        .and_then(|c| candidates.iter().position(|x| x == c))
        .map_or(0, |i| i + 1);
    let Some(picked) = Select::new(prompt, options)
        .with_starting_cursor(cursor)
        .raw_prompt_skippable()?
    else {
        return Ok(None);
    };
    Ok(Some(
        picked
            .index
            .checked_sub(1)
            .and_then(|i| candidates.get(i).cloned()),
    ))
}

async fn pick_assignee(state: &IssueModifyState) -> Result<(), AppError> {
    let editor = state.assignees();
    let candidates = match editor.load_candidates().await {
        Ok(candidates) => candidates,
        Err(err) => {
            eprintln!("Could not load assignees: {err}");
            return Ok(());
        }
    };
    let current = editor.current_selection();
    if let Some(choice) = choose_one("Assignee", &candidates, current.as_ref())? {
        editor.select(choice);
    }
    Ok(())
}

async fn pick_milestone(state: &IssueModifyState) -> Result<(), AppError> {
    let editor = state.milestones();
    let candidates = match editor.load_candidates().await {
        Ok(candidates) => candidates,
        Err(err) => {
            eprintln!("Could not load milestones: {err}");
            return Ok(());
        }
    };
    let current = editor.current_selection();
    if let Some(choice) = choose_one("Milestone", &candidates, current.as_ref())? {
        editor.select(choice);
    }
    Ok(())
}

async fn pick_labels(state: &IssueModifyState) -> Result<(), AppError> {
    let editor = state.labels();
    let candidates = match editor.load().await {
        Ok(candidates) => candidates,
        Err(err) => {
            eprintln!("Could not load labels: {err}");
            return Ok(());
        }
    };
    let defaults: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, l)| editor.contains(l))
        .map(|(i, _)| i)
        .collect();
    let names: Vec<String> = candidates.iter().map(Candidate::display_name).collect();
    let Some(picked) = MultiSelect::new("Labels", names)
        .with_default(&defaults)
        .raw_prompt_skippable()?
    else {
        return Ok(());
    };
    for (index, label) in candidates.into_iter().enumerate() {
        let wanted = picked.iter().any(|p| p.index == index);
        if wanted {
            editor.add(label);
        } else {
            editor.remove(&label);
        }
    }
    Ok(())
}
