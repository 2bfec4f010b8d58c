//! Report Application
//!
//! Replays the operations of a [`Report`] against a [`LabelStore`],
//! honoring per-kind enable flags and per-operation confirmation. Each
//! operation is attempted independently; a failure is recorded against
//! its entry and the queue continues.

use std::io::Write;

use crate::error::{Error, Result};
use crate::github::LabelStore;
use crate::render::describe_action;
use crate::report::{Disposition, Report, ReportEntry};

/// Applier configuration, one flag per operation kind
///
/// Renames follow the `modify` gate; unchanged and skip entries are
/// always no-ops.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
    pub create: bool,
    pub modify: bool,
    pub delete: bool,

    /// Execute without asking for per-operation confirmation
    pub assume_yes: bool,
}

/// User-facing side of the applier: action announcements and prompts
pub trait Interaction {
    /// Show the action about to be taken
    fn notify(&mut self, line: &str);

    /// Ask for confirmation of the announced action
    fn confirm(&mut self) -> bool;
}

/// Interactive terminal prompt ("Is this ok [Y/n]", empty input = yes)
pub struct TerminalInteraction;

impl Interaction for TerminalInteraction {
    fn notify(&mut self, line: &str) {
        println!("{line}");
    }

    fn confirm(&mut self) -> bool {
        loop {
            print!("Is this ok [Y/n]: ");
            let _ = std::io::stdout().flush();

            let mut input = String::new();
            if std::io::stdin().read_line(&mut input).is_err() {
                return false;
            }

            match input.trim().to_lowercase().as_str() {
                "" | "y" => return true,
                "n" => return false,
                _ => continue,
            }
        }
    }
}

/// Final state of one applied entry
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyStatus {
    Applied,
    SkippedByFlag,
    SkippedByUser,
    Failed(String),
}

/// Execution log line for one actionable entry
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    pub name: String,
    pub status: ApplyStatus,
}

/// Execution log of one apply run
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub results: Vec<ApplyResult>,
}

impl ApplyOutcome {
    fn record(&mut self, name: &str, status: ApplyStatus) {
        self.results.push(ApplyResult {
            name: name.to_string(),
            status,
        });
    }

    pub fn applied(&self) -> usize {
        self.count(|s| matches!(s, ApplyStatus::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| {
            matches!(s, ApplyStatus::SkippedByFlag | ApplyStatus::SkippedByUser)
        })
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ApplyStatus::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    fn count(&self, matches: impl Fn(&ApplyStatus) -> bool) -> usize {
        self.results.iter().filter(|r| matches(&r.status)).count()
    }
}

/// Replays report entries against a label store
pub struct Applier<'a, S: LabelStore> {
    store: &'a S,
    options: ApplyOptions,
}

impl<'a, S: LabelStore> Applier<'a, S> {
    pub fn new(store: &'a S, options: ApplyOptions) -> Self {
        Self { store, options }
    }

    /// Apply all enabled operations of a report, in report order
    ///
    /// The report itself is never mutated; the returned outcome is the
    /// applier's own execution log.
    pub async fn apply(
        &self,
        report: &Report,
        interaction: &mut dyn Interaction,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        for entry in &report.entries {
            let enabled = match &entry.disposition {
                Disposition::Create => self.options.create,
                Disposition::Modify { .. } | Disposition::Rename { .. } => self.options.modify,
                Disposition::Delete => self.options.delete,
                Disposition::Unchanged | Disposition::Skip { .. } => continue,
            };

            if !enabled {
                outcome.record(&entry.name, ApplyStatus::SkippedByFlag);
                continue;
            }

            if let Some(line) = describe_action(report, entry) {
                interaction.notify(&line);
            }

            if !self.options.assume_yes && !interaction.confirm() {
                outcome.record(&entry.name, ApplyStatus::SkippedByUser);
                continue;
            }

            match self.execute(report, entry).await {
                Ok(()) => outcome.record(&entry.name, ApplyStatus::Applied),
                Err(err) => {
                    tracing::error!(label = %entry.name, error = %err, "operation failed");
                    outcome.record(&entry.name, ApplyStatus::Failed(err.to_string()));
                }
            }
        }

        outcome
    }

    async fn execute(&self, report: &Report, entry: &ReportEntry) -> Result<()> {
        let namespace = &report.namespace;
        let repository = &report.repository;

        match &entry.disposition {
            Disposition::Create => {
                let spec = require_spec(report, entry)?;
                self.store
                    .create_label(
                        namespace,
                        repository,
                        &entry.name,
                        spec.normalized_color().as_deref(),
                        spec.description.as_deref(),
                    )
                    .await
            }
            Disposition::Modify { .. } => {
                let spec = require_spec(report, entry)?;
                self.store
                    .update_label(
                        namespace,
                        repository,
                        &entry.name,
                        None,
                        spec.normalized_color().as_deref(),
                        spec.description.as_deref(),
                    )
                    .await
            }
            Disposition::Rename { from, .. } => {
                let spec = require_spec(report, entry)?;
                self.store
                    .update_label(
                        namespace,
                        repository,
                        from,
                        Some(&entry.name),
                        spec.normalized_color().as_deref(),
                        spec.description.as_deref(),
                    )
                    .await
            }
            Disposition::Delete => {
                self.store
                    .delete_label(namespace, repository, &entry.name)
                    .await
            }
            Disposition::Unchanged | Disposition::Skip { .. } => Ok(()),
        }
    }
}

fn require_spec<'e>(report: &Report, entry: &'e ReportEntry) -> Result<&'e crate::spec::LabelSpec> {
    entry.spec.as_ref().ok_or_else(|| {
        Error::invalid_spec(
            report.target(),
            format!("report entry '{}' is missing its specification", entry.name),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::report::{Field, ObservedLabel, ReportFlags};
    use crate::spec::LabelSpec;

    /// In-memory label store recording every mutation
    #[derive(Default)]
    struct FakeStore {
        labels: Mutex<Vec<ObservedLabel>>,
        calls: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    impl FakeStore {
        fn with_labels(labels: Vec<ObservedLabel>) -> Self {
            Self {
                labels: Mutex::new(labels),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn names(&self) -> Vec<String> {
            self.labels
                .lock()
                .unwrap()
                .iter()
                .map(|l| l.name.clone())
                .collect()
        }

        fn check_failure(&self, name: &str) -> Result<()> {
            if self.fail_on.as_deref() == Some(name) {
                return Err(Error::RateLimited { attempts: 3 });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LabelStore for FakeStore {
        async fn list_labels(&self, _ns: &str, _repo: &str) -> Result<Vec<ObservedLabel>> {
            Ok(self.labels.lock().unwrap().clone())
        }

        async fn create_label(
            &self,
            _ns: &str,
            _repo: &str,
            name: &str,
            color: Option<&str>,
            description: Option<&str>,
        ) -> Result<()> {
            self.check_failure(name)?;
            self.calls.lock().unwrap().push(format!("create {name}"));
            self.labels.lock().unwrap().push(ObservedLabel {
                name: name.to_string(),
                color: color.unwrap_or("ededed").to_string(),
                description: description.map(str::to_string),
            });
            Ok(())
        }

        async fn update_label(
            &self,
            _ns: &str,
            _repo: &str,
            current_name: &str,
            new_name: Option<&str>,
            color: Option<&str>,
            description: Option<&str>,
        ) -> Result<()> {
            self.check_failure(current_name)?;
            self.calls
                .lock()
                .unwrap()
                .push(format!("update {current_name} -> {new_name:?}"));
            let mut labels = self.labels.lock().unwrap();
            let label = labels
                .iter_mut()
                .find(|l| l.name.eq_ignore_ascii_case(current_name))
                .expect("label exists");
            if let Some(new_name) = new_name {
                label.name = new_name.to_string();
            }
            if let Some(color) = color {
                label.color = color.to_string();
            }
            if let Some(description) = description {
                label.description = Some(description.to_string());
            }
            Ok(())
        }

        async fn delete_label(&self, _ns: &str, _repo: &str, name: &str) -> Result<()> {
            self.check_failure(name)?;
            self.calls.lock().unwrap().push(format!("delete {name}"));
            self.labels
                .lock()
                .unwrap()
                .retain(|l| !l.name.eq_ignore_ascii_case(name));
            Ok(())
        }
    }

    /// Scripted interaction for non-terminal tests
    struct Scripted {
        answers: Vec<bool>,
        prompts: Vec<String>,
    }

    impl Scripted {
        fn answering(answers: Vec<bool>) -> Self {
            Self {
                answers,
                prompts: Vec::new(),
            }
        }
    }

    impl Interaction for Scripted {
        fn notify(&mut self, line: &str) {
            self.prompts.push(line.to_string());
        }

        fn confirm(&mut self) -> bool {
            self.answers.remove(0)
        }
    }

    fn spec(name: &str, color: Option<&str>) -> LabelSpec {
        LabelSpec {
            name: name.to_string(),
            description: None,
            color: color.map(str::to_string),
            optional: false,
            aliases: Vec::new(),
        }
    }

    fn report(entries: Vec<ReportEntry>) -> Report {
        Report {
            namespace: "octo".into(),
            repository: "widgets".into(),
            sources: vec!["labels.json".into()],
            flags: ReportFlags::default(),
            entries,
            warnings: Vec::new(),
        }
    }

    fn create_entry(name: &str) -> ReportEntry {
        ReportEntry {
            name: name.to_string(),
            disposition: Disposition::Create,
            spec: Some(spec(name, Some("d73a4a"))),
            observed: None,
        }
    }

    fn delete_entry(name: &str) -> ReportEntry {
        ReportEntry {
            name: name.to_string(),
            disposition: Disposition::Delete,
            spec: None,
            observed: Some(ObservedLabel {
                name: name.to_string(),
                color: "cccccc".into(),
                description: None,
            }),
        }
    }

    fn all_enabled() -> ApplyOptions {
        ApplyOptions {
            create: true,
            modify: true,
            delete: true,
            assume_yes: true,
        }
    }

    #[tokio::test]
    async fn test_applies_enabled_operations_in_report_order() {
        let store = FakeStore::with_labels(vec![ObservedLabel {
            name: "stale".into(),
            color: "cccccc".into(),
            description: None,
        }]);
        let report = report(vec![create_entry("bug"), delete_entry("stale")]);

        let applier = Applier::new(&store, all_enabled());
        let outcome = applier.apply(&report, &mut Scripted::answering(vec![])).await;

        assert_eq!(outcome.applied(), 2);
        assert!(!outcome.has_failures());
        assert_eq!(store.calls(), vec!["create bug", "delete stale"]);
        assert_eq!(store.names(), vec!["bug"]);
    }

    #[tokio::test]
    async fn test_disabled_kinds_are_skipped_by_flag() {
        let store = FakeStore::with_labels(vec![ObservedLabel {
            name: "stale".into(),
            color: "cccccc".into(),
            description: None,
        }]);
        let report = report(vec![create_entry("bug"), delete_entry("stale")]);
        let options = ApplyOptions {
            create: true,
            assume_yes: true,
            ..Default::default()
        };

        let applier = Applier::new(&store, options);
        let outcome = applier.apply(&report, &mut Scripted::answering(vec![])).await;

        assert_eq!(outcome.applied(), 1);
        assert_eq!(outcome.skipped(), 1);
        assert_eq!(
            outcome.results[1].status,
            ApplyStatus::SkippedByFlag
        );
        // The delete was never sent to the store
        assert_eq!(store.calls(), vec!["create bug"]);
    }

    #[tokio::test]
    async fn test_rename_follows_modify_gate() {
        let store = FakeStore::with_labels(vec![ObservedLabel {
            name: "feature".into(),
            color: "cccccc".into(),
            description: None,
        }]);
        let entry = ReportEntry {
            name: "enhancement".into(),
            disposition: Disposition::Rename {
                from: "feature".into(),
                fields: vec![Field::Color],
            },
            spec: Some(spec("enhancement", Some("a2eeef"))),
            observed: None,
        };
        let report = report(vec![entry]);

        let gated = ApplyOptions {
            create: true,
            delete: true,
            assume_yes: true,
            ..Default::default()
        };
        let outcome = Applier::new(&store, gated)
            .apply(&report, &mut Scripted::answering(vec![]))
            .await;
        assert_eq!(outcome.results[0].status, ApplyStatus::SkippedByFlag);

        let enabled = ApplyOptions {
            modify: true,
            assume_yes: true,
            ..Default::default()
        };
        let outcome = Applier::new(&store, enabled)
            .apply(&report, &mut Scripted::answering(vec![]))
            .await;
        assert_eq!(outcome.applied(), 1);
        assert_eq!(store.names(), vec!["enhancement"]);
    }

    #[tokio::test]
    async fn test_user_denial_skips_single_entry() {
        let store = FakeStore::default();
        let report = report(vec![create_entry("bug"), create_entry("docs")]);
        let options = ApplyOptions {
            create: true,
            ..Default::default()
        };

        let mut interaction = Scripted::answering(vec![false, true]);
        let outcome = Applier::new(&store, options)
            .apply(&report, &mut interaction)
            .await;

        assert_eq!(outcome.results[0].status, ApplyStatus::SkippedByUser);
        assert_eq!(outcome.results[1].status, ApplyStatus::Applied);
        assert_eq!(store.names(), vec!["docs"]);
        // Both actions were announced before prompting
        assert_eq!(interaction.prompts.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_to_its_entry() {
        let store = FakeStore {
            fail_on: Some("bug".into()),
            ..Default::default()
        };
        let report = report(vec![create_entry("bug"), create_entry("docs")]);

        let outcome = Applier::new(&store, all_enabled())
            .apply(&report, &mut Scripted::answering(vec![]))
            .await;

        assert!(outcome.has_failures());
        assert!(matches!(outcome.results[0].status, ApplyStatus::Failed(_)));
        // The queue continued past the failure
        assert_eq!(outcome.results[1].status, ApplyStatus::Applied);
        assert_eq!(store.names(), vec!["docs"]);
    }

    #[tokio::test]
    async fn test_unchanged_and_skip_entries_are_noops() {
        let store = FakeStore::default();
        let entries = vec![
            ReportEntry {
                name: "bug".into(),
                disposition: Disposition::Unchanged,
                spec: Some(spec("bug", None)),
                observed: None,
            },
            ReportEntry {
                name: "question".into(),
                disposition: Disposition::Skip {
                    reason: "absent optional label".into(),
                },
                spec: Some(spec("question", None)),
                observed: None,
            },
        ];

        let outcome = Applier::new(&store, all_enabled())
            .apply(&report(entries), &mut Scripted::answering(vec![]))
            .await;

        assert!(outcome.results.is_empty());
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_entry_without_spec_fails_instead_of_panicking() {
        let store = FakeStore::default();
        let entry = ReportEntry {
            name: "bug".into(),
            disposition: Disposition::Create,
            spec: None,
            observed: None,
        };

        let outcome = Applier::new(&store, all_enabled())
            .apply(&report(vec![entry]), &mut Scripted::answering(vec![]))
            .await;

        assert!(outcome.has_failures());
        assert!(store.calls().is_empty());
    }
}
