use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reposcan::scanner::api::{
    AcquireError, CloneBackend, RepositoryAcquirer, RunLayout, ScanWorkflow, ScannerRunner,
};
use reposcan::scanner::error::AcquireResult;
use reposcan::scanner::types::{ReportFormat, RunPaths};

pub const SAMPLE_URL: &str = "https://example.com/acme/widgets.git";

/// Writes a small Python project instead of cloning
#[derive(Debug, Default)]
pub struct FixtureClone {
    calls: AtomicUsize,
}

impl FixtureClone {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CloneBackend for FixtureClone {
    fn clone_into(&self, _url: &str, dest: &Path, _interrupt: &AtomicBool) -> AcquireResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let write = || -> io::Result<()> {
            std::fs::create_dir_all(dest.join("app"))?;
            std::fs::write(dest.join("app/models.py"), "assert True\n")?;
            std::fs::write(
                dest.join("app/tasks.py"),
                "import subprocess\nsubprocess.call('ls', shell=True)\n",
            )
        };
        write().map_err(|e| AcquireError::Clone {
            url: SAMPLE_URL.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Always fails like an unreachable remote
#[derive(Debug, Default)]
pub struct UnreachableClone;

impl CloneBackend for UnreachableClone {
    fn clone_into(&self, url: &str, _dest: &Path, _interrupt: &AtomicBool) -> AcquireResult<()> {
        Err(AcquireError::Clone {
            url: url.to_string(),
            reason: "could not resolve host".to_string(),
        })
    }
}

/// Takes `delay` to fail, or stops early when interrupted
#[derive(Debug)]
pub struct SlowClone {
    delay: Duration,
}

impl SlowClone {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl CloneBackend for SlowClone {
    fn clone_into(&self, url: &str, _dest: &Path, interrupt: &AtomicBool) -> AcquireResult<()> {
        let started = Instant::now();
        while started.elapsed() < self.delay && !interrupt.load(Ordering::Acquire) {
            std::thread::sleep(Duration::from_millis(10));
        }
        Err(AcquireError::Clone {
            url: url.to_string(),
            reason: "connection timed out".to_string(),
        })
    }
}

pub fn deny_removal(_path: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::PermissionDenied,
        "file in use",
    ))
}

/// Text report in the scanner's format with `issues` findings
pub fn text_report(issues: usize) -> String {
    let mut report = String::from("Run started:2024-05-01 10:00:00.000000\n\nTest results:\n");
    for i in 0..issues {
        report.push_str(&format!(
            ">> Issue: [B101:assert_used] Use of assert detected.\n   Severity: Low   Confidence: High\n   Location: ./app/models.py:{}:0\n",
            i + 1
        ));
    }
    if issues == 0 {
        report.push_str("\tNo issues identified.\n");
    }
    report
}

/// Executable shell script standing in for the scanner.
///
/// It is called as `<script> -r <dir> -f <fmt> -o <report>`, so `$6` is
/// the report path.
#[cfg(unix)]
pub fn fake_scanner(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-bandit");
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Fake scanner that writes a report with `issues` findings and exits 1
/// when there are any, like the real one
#[cfg(unix)]
pub fn reporting_scanner(dir: &Path, issues: usize) -> PathBuf {
    let report_file = dir.join("canned_report.txt");
    std::fs::write(&report_file, text_report(issues)).unwrap();
    let exit = if issues > 0 { 1 } else { 0 };
    fake_scanner(
        dir,
        &format!("cp '{}' \"$6\"\nexit {}", report_file.display(), exit),
    )
}

pub fn fixed_layout(root: &Path) -> RunLayout {
    RunLayout::Fixed(RunPaths {
        clone_dir: root.join("cloned_repo"),
        report_path: root.join("bandit_report.txt"),
    })
}

pub fn workflow(backend: Arc<dyn CloneBackend>, scanner: &Path, layout: RunLayout) -> ScanWorkflow {
    ScanWorkflow::new(
        RepositoryAcquirer::new(backend),
        ScannerRunner::new(scanner.to_string_lossy(), ReportFormat::Text),
        layout,
    )
}
