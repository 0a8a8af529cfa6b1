//! Sub-editors that pick related entities on behalf of a session.
//!
//! A [`SelectionEditor`] never keeps its own copy of the selection, it reads
//! and writes the parent field through [`FieldAccess`]. The [`LabelsEditor`]
//! holds a working set and pushes every change straight back to the parent.
//! Each mutation starts from the parent's labels, so writes made to the
//! parent directly are never overwritten by a stale working set.

use std::{fmt, sync::Arc};

use tracing::{debug, instrument};

use crate::{
    errors::AppError,
    github::models::{Label, Milestone, User},
    session::{
        cache::LazyAsyncCache,
        observable::{FieldAccess, Notifier, Observable, SubscriptionId},
    },
};

pub type CandidateCache<T> = LazyAsyncCache<Vec<T>, Arc<AppError>>;

pub type AssigneeEditor = SelectionEditor<User>;
pub type MilestoneEditor = SelectionEditor<Milestone>;

/// Names an entity so it can be picked from text input.
pub trait Candidate {
    const KIND: &'static str;
    fn matches(&self, query: &str) -> bool;
    fn display_name(&self) -> String;
}

impl Candidate for User {
    const KIND: &'static str = "assignee";

    fn matches(&self, query: &str) -> bool {
        self.login.eq_ignore_ascii_case(query.trim().trim_start_matches('@'))
    }

    fn display_name(&self) -> String {
        self.login.clone()
    }
}

impl Candidate for Milestone {
    const KIND: &'static str = "milestone";

    fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        self.title.eq_ignore_ascii_case(query)
            || query
                .trim_start_matches('#')
                .parse::<u64>()
                .is_ok_and(|n| n == self.number)
    }

    fn display_name(&self) -> String {
        self.title.clone()
    }
}

impl Candidate for Label {
    const KIND: &'static str = "label";

    fn matches(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query.trim())
    }

    fn display_name(&self) -> String {
        self.name.clone()
    }
}

pub struct SelectionEditor<T> {
    candidates: CandidateCache<T>,
    field: Box<dyn FieldAccess<Option<T>>>,
    selection_changed: Notifier<Option<T>>,
}

impl<T> fmt::Debug for SelectionEditor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionEditor")
            .field("candidates", &self.candidates)
            .finish_non_exhaustive()
    }
}

impl<T> SelectionEditor<T>
where
    T: Candidate + Clone + PartialEq + 'static,
{
    pub fn new(
        candidates: CandidateCache<T>,
        field: impl FieldAccess<Option<T>> + 'static,
    ) -> Self {
        Self {
            candidates,
            field: Box::new(field),
            selection_changed: Notifier::new(),
        }
    }

    #[instrument(skip(self), fields(kind = T::KIND))]
    pub async fn load_candidates(&self) -> Result<Vec<T>, AppError> {
        Ok(self.candidates.get().await?)
    }

    pub fn current_selection(&self) -> Option<T> {
        self.field.get()
    }

    pub fn select(&self, value: Option<T>) {
        debug!(
            kind = T::KIND,
            selected = ?value.as_ref().map(Candidate::display_name),
            "Selection changed"
        );
        self.field.set(value.clone());
        self.selection_changed.emit(&value);
    }

    pub fn clear(&self) {
        self.select(None);
    }

    /// Selects the loaded candidate matching `query`.
    pub async fn select_matching(&self, query: &str) -> Result<T, AppError> {
        let found = self
            .load_candidates()
            .await?
            .into_iter()
            .find(|c| c.matches(query))
            .ok_or_else(|| AppError::UnknownCandidate {
                kind: T::KIND,
                name: query.to_string(),
            })?;
        self.select(Some(found.clone()));
        Ok(found)
    }

    pub fn on_selection_changed(&self, callback: impl Fn(&Option<T>) + 'static) -> SubscriptionId {
        self.selection_changed.subscribe(callback)
    }
}

pub struct LabelsEditor {
    candidates: CandidateCache<Label>,
    field: Box<dyn FieldAccess<Vec<Label>>>,
    selected: Observable<Vec<Label>>,
}

impl fmt::Debug for LabelsEditor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelsEditor")
            .field("candidates", &self.candidates)
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl LabelsEditor {
    pub fn new(
        candidates: CandidateCache<Label>,
        field: impl FieldAccess<Vec<Label>> + 'static,
    ) -> Self {
        Self {
            candidates,
            field: Box::new(field),
            selected: Observable::new(Vec::new()),
        }
    }

    /// Seeds the working set from the parent and fetches the candidates.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Vec<Label>, AppError> {
        self.reseed();
        self.load_candidates().await
    }

    pub async fn load_candidates(&self) -> Result<Vec<Label>, AppError> {
        Ok(self.candidates.get().await?)
    }

    /// Replaces the working set with the parent's current labels and
    /// returns them.
    pub fn reseed(&self) -> Vec<Label> {
        let current = dedup(self.field.get());
        self.selected.set(current.clone());
        current
    }

    pub fn selected_labels(&self) -> Vec<Label> {
        self.reseed()
    }

    pub fn contains(&self, label: &Label) -> bool {
        self.reseed().iter().any(|l| l.name == label.name)
    }

    /// Appends `label` unless it is already selected.
    pub fn add(&self, label: Label) -> bool {
        let mut set = self.reseed();
        if set.iter().any(|l| l.name == label.name) {
            return false;
        }
        set.push(label);
        self.selected.set(set)
    }

    pub fn remove(&self, label: &Label) -> bool {
        let mut set = self.reseed();
        set.retain(|l| l.name != label.name);
        self.selected.set(set)
    }

    /// Flips membership of `label`. Returns whether it is selected afterwards.
    pub fn toggle(&self, label: Label) -> bool {
        if self.contains(&label) {
            self.remove(&label);
            false
        } else {
            self.add(label);
            true
        }
    }

    pub fn set_selected(&self, labels: Vec<Label>) {
        self.selected.set(dedup(labels));
    }

    /// Adds every label named in `names`, resolved against the candidates.
    pub async fn add_named(&self, names: &[String]) -> Result<(), AppError> {
        let candidates = self.load_candidates().await?;
        for name in names {
            let label = candidates
                .iter()
                .find(|c| c.matches(name))
                .cloned()
                .ok_or_else(|| AppError::UnknownCandidate {
                    kind: Label::KIND,
                    name: name.clone(),
                })?;
            self.add(label);
        }
        Ok(())
    }

    pub fn on_changed(&self, callback: impl Fn(&Vec<Label>) + 'static) -> SubscriptionId {
        self.selected.subscribe(callback)
    }
}

fn dedup(labels: Vec<Label>) -> Vec<Label> {
    let mut out: Vec<Label> = Vec::with_capacity(labels.len());
    for label in labels {
        if !out.iter().any(|l| l.name == label.name) {
            out.push(label);
        }
    }
    out
}
