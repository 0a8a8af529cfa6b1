//! One editing session for a new or existing issue.
//!
//! [`IssueModifyState`] owns the editable fields, wires the assignee,
//! milestone and label editors to them, and sequences the load, save and
//! dismiss actions. Persistence itself is delegated to an [`IssueModifier`]
//! (see [`create::IssueCreate`] and [`edit::IssueEdit`]).

pub mod cache;
pub mod create;
pub mod edit;
pub mod editor;
pub mod observable;
pub mod progress;

#[cfg(test)]
pub(crate) mod tests_support;

use std::{rc::Rc, sync::Arc};

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    errors::AppError,
    github::{
        IssueService,
        models::{Issue, IssueDraft, Label, Milestone, User},
    },
};
use cache::LazyAsyncCache;
use editor::{AssigneeEditor, CandidateCache, LabelsEditor, MilestoneEditor};
use observable::Observable;
use progress::ProgressIndicator;

const SAVING_MESSAGE: &str = "Saving...";

/// Repository and user a session works against.
#[derive(Debug, Default, Clone)]
pub struct SessionContext {
    pub owner: String,
    pub repo: String,
    pub current_user: String,
}

impl SessionContext {
    pub fn new(owner: String, repo: String, current_user: String) -> Self {
        Self {
            owner,
            repo,
            current_user,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Created,
    Loading,
    Ready,
    Saving,
    Saved,
    DismissConfirming,
    Dismissed,
}

impl SessionPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Saved | Self::Dismissed)
    }
}

/// Signals a session sends to whatever presents it.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SessionAction {
    GoToAssignees,
    GoToMilestones,
    GoToLabels,
    Saved(Box<Issue>),
    Dismissed,
}

/// Persistence hooks that differ between creating and editing an issue.
#[async_trait(?Send)]
pub trait IssueModifier {
    /// Field values the session starts with.
    fn initial_draft(&self) -> IssueDraft {
        IssueDraft::default()
    }

    async fn save(
        &self,
        service: &dyn IssueService,
        context: &SessionContext,
        draft: &IssueDraft,
    ) -> Result<Issue, AppError>;

    /// Whether the session may end with `draft` unsaved.
    async fn discard(&self, draft: &IssueDraft) -> bool;
}

/// Asks the user a yes/no question.
#[async_trait(?Send)]
pub trait Prompt {
    async fn confirm(&self, title: &str, message: &str) -> bool;
}

/// Answers every prompt the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

#[async_trait(?Send)]
impl Prompt for FixedAnswer {
    async fn confirm(&self, title: &str, _message: &str) -> bool {
        debug!(title, answer = self.0, "Answering prompt");
        self.0
    }
}

/// Marks the session busy in `during` and puts it back into `fallback` when
/// dropped, unless the phase was moved elsewhere meanwhile.
struct PhaseGuard<'a> {
    phase: &'a Observable<SessionPhase>,
    during: SessionPhase,
    fallback: SessionPhase,
    busy: Option<&'a Observable<bool>>,
}

impl<'a> PhaseGuard<'a> {
    fn enter(
        phase: &'a Observable<SessionPhase>,
        during: SessionPhase,
        fallback: SessionPhase,
        busy: Option<&'a Observable<bool>>,
    ) -> Self {
        if let Some(busy) = busy {
            busy.set(true);
        }
        phase.set(during);
        Self {
            phase,
            during,
            fallback,
            busy,
        }
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if let Some(busy) = self.busy {
            busy.set(false);
        }
        if self.phase.get() == self.during {
            self.phase.set(self.fallback);
        }
    }
}

pub struct IssueModifyState {
    context: SessionContext,
    service: Rc<dyn IssueService>,
    modifier: Box<dyn IssueModifier>,
    progress: Box<dyn ProgressIndicator>,
    action_tx: Option<Sender<SessionAction>>,
    cancel: CancellationToken,

    subject: Observable<String>,
    content: Observable<String>,
    assigned_user: Observable<Option<User>>,
    assigned_milestone: Observable<Option<Milestone>>,
    assigned_labels: Observable<Vec<Label>>,
    is_collaborator: Observable<Option<bool>>,

    phase: Observable<SessionPhase>,
    saving: Observable<bool>,
    can_save: Observable<bool>,

    assignees: AssigneeEditor,
    milestones: MilestoneEditor,
    labels: LabelsEditor,
}

impl std::fmt::Debug for IssueModifyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueModifyState")
            .field("context", &self.context)
            .field("subject", &self.subject)
            .field("phase", &self.phase)
            .field("is_collaborator", &self.is_collaborator)
            .finish_non_exhaustive()
    }
}

impl IssueModifyState {
    pub fn new(
        context: SessionContext,
        service: Rc<dyn IssueService>,
        modifier: Box<dyn IssueModifier>,
        progress: Box<dyn ProgressIndicator>,
    ) -> Self {
        let IssueDraft {
            subject,
            content,
            assignee,
            milestone,
            labels,
        } = modifier.initial_draft();

        let subject = Observable::new(subject);
        let content = Observable::new(content);
        let assigned_user = Observable::new(assignee);
        let assigned_milestone = Observable::new(milestone);
        let assigned_labels = Observable::new(labels);
        let can_save = subject.map(|s| !s.trim().is_empty());

        let assignees = AssigneeEditor::new(
            assignee_cache(&service, &context),
            assigned_user.clone(),
        );
        let milestones = MilestoneEditor::new(
            milestone_cache(&service, &context),
            assigned_milestone.clone(),
        );
        let labels = LabelsEditor::new(label_cache(&service, &context), assigned_labels.clone());
        let sink = assigned_labels.clone();
        labels.on_changed(move |set| {
            sink.set(set.clone());
        });

        Self {
            context,
            service,
            modifier,
            progress,
            action_tx: None,
            cancel: CancellationToken::new(),
            subject,
            content,
            assigned_user,
            assigned_milestone,
            assigned_labels,
            is_collaborator: Observable::new(None),
            phase: Observable::new(SessionPhase::Created),
            saving: Observable::new(false),
            can_save,
            assignees,
            milestones,
            labels,
        }
    }

    pub fn register_action_tx(&mut self, action_tx: Sender<SessionAction>) {
        self.action_tx = Some(action_tx);
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn subject(&self) -> &Observable<String> {
        &self.subject
    }

    pub fn content(&self) -> &Observable<String> {
        &self.content
    }

    pub fn assigned_user(&self) -> &Observable<Option<User>> {
        &self.assigned_user
    }

    pub fn assigned_milestone(&self) -> &Observable<Option<Milestone>> {
        &self.assigned_milestone
    }

    pub fn assigned_labels(&self) -> &Observable<Vec<Label>> {
        &self.assigned_labels
    }

    /// `None` until [`load`](Self::load) has run.
    pub fn is_collaborator(&self) -> &Observable<Option<bool>> {
        &self.is_collaborator
    }

    pub fn phase(&self) -> &Observable<SessionPhase> {
        &self.phase
    }

    /// True while the subject has non-whitespace text.
    pub fn can_save(&self) -> &Observable<bool> {
        &self.can_save
    }

    pub fn is_saving(&self) -> bool {
        self.saving.get()
    }

    pub fn assignees(&self) -> &AssigneeEditor {
        &self.assignees
    }

    pub fn milestones(&self) -> &MilestoneEditor {
        &self.milestones
    }

    pub fn labels(&self) -> &LabelsEditor {
        &self.labels
    }

    pub fn draft(&self) -> IssueDraft {
        IssueDraft {
            subject: self.subject.get(),
            content: self.content.get(),
            assignee: self.assigned_user.get(),
            milestone: self.assigned_milestone.get(),
            labels: self.assigned_labels.get(),
        }
    }

    /// Stops any in-flight load or save. The session is unusable afterwards.
    pub fn close(&self) {
        info!("Closing session");
        self.cancel.cancel();
    }

    async fn send(&self, action: SessionAction) {
        if let Some(action_tx) = &self.action_tx
            && action_tx.send(action).await.is_err()
        {
            warn!("Session action receiver dropped");
        }
    }

    /// Resolves whether the current user may push to the repository. Any
    /// failure counts as "not a collaborator".
    #[instrument(skip(self), fields(owner = %self.context.owner, repo = %self.context.repo))]
    pub async fn load(&self) {
        if self.phase.get() != SessionPhase::Created {
            debug!(phase = ?self.phase.get(), "Load ignored");
            return;
        }
        let _guard = PhaseGuard::enter(
            &self.phase,
            SessionPhase::Loading,
            SessionPhase::Ready,
            None,
        );
        let SessionContext {
            owner,
            repo,
            current_user,
        } = &self.context;
        let result = tokio::select! {
            _ = self.cancel.cancelled() => {
                info!("Load cancelled");
                return;
            }
            result = self.service.is_collaborator(owner, repo, current_user) => result,
        };
        let is_collaborator = match result {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "Collaborator check failed, assuming not a collaborator");
                false
            }
        };
        info!(is_collaborator, "Loaded session");
        self.is_collaborator.set(Some(is_collaborator));
    }

    /// Persists the current fields. Returns `Ok(None)` when the call was
    /// ignored: the subject is blank, a save is already running, or the
    /// session has ended.
    #[instrument(skip(self), fields(subject = %self.subject.get()))]
    pub async fn save(&self) -> Result<Option<Issue>, AppError> {
        if self.saving.get() {
            debug!("Save already in flight, ignoring");
            return Ok(None);
        }
        if !self.can_save.get() {
            debug!("Save disabled, subject is blank");
            return Ok(None);
        }
        let phase = self.phase.get();
        if phase.is_terminal() || phase == SessionPhase::DismissConfirming {
            debug!(?phase, "Save ignored");
            return Ok(None);
        }

        // A save issued before load must leave the session loadable.
        let fallback = if phase == SessionPhase::Created {
            SessionPhase::Created
        } else {
            SessionPhase::Ready
        };
        let _guard = PhaseGuard::enter(
            &self.phase,
            SessionPhase::Saving,
            fallback,
            Some(&self.saving),
        );
        let draft = self.draft();
        let result = {
            let _progress = progress::activate(self.progress.as_ref(), SAVING_MESSAGE);
            tokio::select! {
                _ = self.cancel.cancelled() => Err(AppError::Cancelled),
                result = self.modifier.save(self.service.as_ref(), &self.context, &draft) => result,
            }
        };

        match result {
            Ok(issue) => {
                info!(number = issue.number, url = %issue.html_url, "Issue saved");
                self.phase.set(SessionPhase::Saved);
                self.send(SessionAction::Saved(Box::new(issue.clone())))
                    .await;
                self.send(SessionAction::Dismissed).await;
                Ok(Some(issue))
            }
            Err(err) => {
                error!(error = %err, "Failed to save issue");
                Err(err)
            }
        }
    }

    /// Ends the session if the modifier agrees to drop unsaved changes.
    /// Returns whether the session was dismissed.
    #[instrument(skip(self))]
    pub async fn dismiss(&self) -> bool {
        let phase = self.phase.get();
        if phase.is_terminal()
            || matches!(
                phase,
                SessionPhase::Saving | SessionPhase::DismissConfirming
            )
        {
            debug!(?phase, "Dismiss ignored");
            return false;
        }
        let fallback = if phase == SessionPhase::Created {
            SessionPhase::Created
        } else {
            SessionPhase::Ready
        };
        let _guard = PhaseGuard::enter(
            &self.phase,
            SessionPhase::DismissConfirming,
            fallback,
            None,
        );
        let confirmed = self.modifier.discard(&self.draft()).await;
        if !confirmed {
            info!("Discard declined, keeping session open");
            return false;
        }
        info!("Session dismissed");
        self.phase.set(SessionPhase::Dismissed);
        self.cancel.cancel();
        self.send(SessionAction::Dismissed).await;
        true
    }

    pub async fn go_to_assignees(&self) {
        debug!("Navigating to assignees");
        self.send(SessionAction::GoToAssignees).await;
    }

    pub async fn go_to_milestones(&self) {
        debug!("Navigating to milestones");
        self.send(SessionAction::GoToMilestones).await;
    }

    pub async fn go_to_labels(&self) {
        debug!("Navigating to labels");
        self.send(SessionAction::GoToLabels).await;
    }
}

impl Drop for IssueModifyState {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn assignee_cache(service: &Rc<dyn IssueService>, context: &SessionContext) -> CandidateCache<User> {
    let service = Rc::clone(service);
    let (owner, repo) = (context.owner.clone(), context.repo.clone());
    LazyAsyncCache::new("assignees", move || {
        let service = Rc::clone(&service);
        let (owner, repo) = (owner.clone(), repo.clone());
        async move { service.assignees(&owner, &repo).await.map_err(Arc::new) }
    })
}

fn milestone_cache(
    service: &Rc<dyn IssueService>,
    context: &SessionContext,
) -> CandidateCache<Milestone> {
    let service = Rc::clone(service);
    let (owner, repo) = (context.owner.clone(), context.repo.clone());
    LazyAsyncCache::new("milestones", move || {
        let service = Rc::clone(&service);
        let (owner, repo) = (owner.clone(), repo.clone());
        async move { service.milestones(&owner, &repo).await.map_err(Arc::new) }
    })
}

fn label_cache(service: &Rc<dyn IssueService>, context: &SessionContext) -> CandidateCache<Label> {
    let service = Rc::clone(service);
    let (owner, repo) = (context.owner.clone(), context.repo.clone());
    LazyAsyncCache::new("labels", move || {
        let service = Rc::clone(&service);
        let (owner, repo) = (owner.clone(), repo.clone());
        async move { service.labels(&owner, &repo).await.map_err(Arc::new) }
    })
}
