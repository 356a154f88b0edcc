//! Clone, scan and summarize end to end

use std::sync::Arc;

use reposcan::core::cancel::CancelToken;
use reposcan::scanner::api::{
    ExecutionTime, RecordingProgress, RepositoryAcquirer, RunLayout, ScanWorkflow, ScannerRunner,
    WorkflowError, WorkflowState,
};
use reposcan::scanner::types::ReportFormat;
use tempfile::TempDir;

use crate::common::fixtures::*;

#[cfg(unix)]
#[tokio::test]
async fn test_fresh_clone_scan_and_summary() {
    let temp_dir = TempDir::new().unwrap();
    let scanner = reporting_scanner(temp_dir.path(), 3);
    let workflow = workflow(FixtureClone::new(), &scanner, fixed_layout(temp_dir.path()));
    let progress = RecordingProgress::new();

    let outcome = workflow
        .execute(SAMPLE_URL, &CancelToken::new(), &progress)
        .await
        .unwrap();

    assert_eq!(outcome.summary.total_issues, 3);
    assert_eq!(outcome.summary.severity.low, 3);
    assert!(outcome.summary.execution_time.to_string().ends_with(" sec"));
    assert!(outcome.report.contains(">> Issue: [B101:assert_used]"));
    assert_eq!(outcome.exit_code, Some(1));
    assert!(outcome.paths.report_path.exists());
    assert_eq!(
        progress.states(),
        vec![
            WorkflowState::Cloning,
            WorkflowState::Scanning,
            WorkflowState::Summarizing,
            WorkflowState::Displayed
        ]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_clean_repository_reports_zero_issues() {
    let temp_dir = TempDir::new().unwrap();
    let scanner = reporting_scanner(temp_dir.path(), 0);
    let workflow = workflow(FixtureClone::new(), &scanner, fixed_layout(temp_dir.path()));

    let outcome = workflow
        .execute(SAMPLE_URL, &CancelToken::new(), &RecordingProgress::new())
        .await
        .unwrap();

    assert_eq!(outcome.summary.total_issues, 0);
    assert!(matches!(outcome.summary.execution_time, ExecutionTime::Measured(_)));
}

#[cfg(unix)]
#[tokio::test]
async fn test_locked_target_halts_without_report() {
    let temp_dir = TempDir::new().unwrap();
    let marker = temp_dir.path().join("scanner-ran");
    let scanner = fake_scanner(
        temp_dir.path(),
        &format!("touch '{}'\necho 'Issue:' > \"$6\"", marker.display()),
    );
    let layout = fixed_layout(temp_dir.path());
    let RunLayout::Fixed(paths) = layout.clone() else {
        unreachable!()
    };
    std::fs::create_dir_all(&paths.clone_dir).unwrap();

    let backend = FixtureClone::new();
    let workflow = ScanWorkflow::new(
        RepositoryAcquirer::new(backend.clone()).with_remover(deny_removal),
        ScannerRunner::new(scanner.to_string_lossy(), ReportFormat::Text),
        layout,
    );
    let progress = RecordingProgress::new();

    let err = workflow
        .execute(SAMPLE_URL, &CancelToken::new(), &progress)
        .await
        .unwrap_err();

    assert!(err.is_permission_denied());
    assert_eq!(backend.calls(), 0);
    assert!(!marker.exists());
    assert!(!paths.report_path.exists());
    assert_eq!(
        progress.states(),
        vec![WorkflowState::Cloning, WorkflowState::Error]
    );
}

#[cfg(unix)]
#[tokio::test]
async fn test_previous_report_is_not_reused() {
    let temp_dir = TempDir::new().unwrap();
    // Scanner that exits without writing anything
    let scanner = fake_scanner(temp_dir.path(), "exit 0");
    let layout = fixed_layout(temp_dir.path());
    let RunLayout::Fixed(paths) = layout.clone() else {
        unreachable!()
    };
    std::fs::write(&paths.report_path, text_report(7)).unwrap();

    let outcome = workflow(FixtureClone::new(), &scanner, layout)
        .execute(SAMPLE_URL, &CancelToken::new(), &RecordingProgress::new())
        .await
        .unwrap();

    assert_eq!(outcome.summary.total_issues, 0);
    assert_eq!(outcome.report, "");
    // the scanner ran, so its time is measured even without a report
    assert!(matches!(
        outcome.summary.execution_time,
        ExecutionTime::Measured(_)
    ));
    assert!(outcome.summary.execution_time.to_string().ends_with(" sec"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_per_run_layout_keeps_runs_apart() {
    let temp_dir = TempDir::new().unwrap();
    let scanner = reporting_scanner(temp_dir.path(), 1);
    let root = temp_dir.path().join("runs");
    let workflow = workflow(
        FixtureClone::new(),
        &scanner,
        RunLayout::PerRun { root: root.clone() },
    );

    let first = workflow
        .execute(SAMPLE_URL, &CancelToken::new(), &RecordingProgress::new())
        .await
        .unwrap();
    let second = workflow
        .execute(SAMPLE_URL, &CancelToken::new(), &RecordingProgress::new())
        .await
        .unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert!(first.paths.clone_dir.starts_with(&root));
    assert!(first.paths.report_path.exists());
    assert!(second.paths.report_path.exists());

    assert_eq!(workflow.layout().clean().unwrap(), 2);
    assert!(!first.paths.clone_dir.exists());
}

#[tokio::test]
async fn test_clone_failure_stops_before_scan() {
    let temp_dir = TempDir::new().unwrap();
    let workflow = ScanWorkflow::new(
        RepositoryAcquirer::new(Arc::new(UnreachableClone)),
        ScannerRunner::new("reposcan-no-such-scanner", ReportFormat::Text),
        fixed_layout(temp_dir.path()),
    );
    let progress = RecordingProgress::new();

    let err = workflow
        .execute(SAMPLE_URL, &CancelToken::new(), &progress)
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Acquire(_)));
    assert!(!err.is_permission_denied());
    assert_eq!(progress.states().last(), Some(&WorkflowState::Error));
}

#[tokio::test]
async fn test_missing_scanner_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let workflow = workflow(
        FixtureClone::new(),
        std::path::Path::new("reposcan-no-such-scanner"),
        fixed_layout(temp_dir.path()),
    );

    let err = workflow
        .execute(SAMPLE_URL, &CancelToken::new(), &RecordingProgress::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::Scanner(_)));
}

#[tokio::test]
async fn test_empty_url_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let backend = FixtureClone::new();
    let workflow = workflow(
        backend.clone(),
        std::path::Path::new("bandit"),
        fixed_layout(temp_dir.path()),
    );

    let err = workflow
        .execute("   ", &CancelToken::new(), &RecordingProgress::new())
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::EmptyUrl));
    assert_eq!(backend.calls(), 0);
}

/// Real clone and real scanner; needs network access and `bandit` on PATH
#[tokio::test]
#[ignore = "network and bandit"]
async fn test_real_repository_scan() {
    use reposcan::scanner::api::GixCloneBackend;
    use std::num::NonZeroU32;

    let temp_dir = TempDir::new().unwrap();
    let workflow = ScanWorkflow::new(
        RepositoryAcquirer::new(Arc::new(GixCloneBackend::new(NonZeroU32::new(1)))),
        ScannerRunner::new("bandit", ReportFormat::Text),
        RunLayout::PerRun {
            root: temp_dir.path().to_path_buf(),
        },
    );

    let outcome = workflow
        .execute(
            "https://github.com/PyCQA/bandit.git",
            &CancelToken::new(),
            &RecordingProgress::new(),
        )
        .await
        .unwrap();

    assert!(outcome.summary.execution_time.to_string().ends_with(" sec"));
    assert!(outcome.paths.report_path.exists());
}
