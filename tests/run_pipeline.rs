//! End-to-end runs against mock city websites
//!
//! These tests wire the real pieces together - site tasks over HTTP, the
//! directory sink and the stdout-style reporter - and check what ends up in
//! the output directory and in the report.

mod common;

use std::sync::Arc;
use std::time::Duration;

use agenda_get::{
    DirSink, Orchestrator, ProgressConfig, Reporter, SilentProgress, TerminalProgress,
    prepare_output_dir,
};
use common::{
    AGENDA_BODY, mirrored, oakland_listing, san_francisco_listing, serve, serve_status,
    site_tasks,
};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use wiremock::MockServer;

#[tokio::test]
async fn healthy_sites_are_saved_and_broken_ones_reported() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/oakland",
        oakland_listing(&format!("{}/docs/oakland.pdf", server.uri())),
    )
    .await;
    serve(&server, "/docs/oakland.pdf", AGENDA_BODY).await;
    serve(&server, "/sf", san_francisco_listing("/docs/sf.pdf")).await;
    serve(&server, "/docs/sf.pdf", AGENDA_BODY).await;
    serve(&server, "/fresno", "<html><body>we moved</body></html>").await;
    serve_status(&server, "/bakersfield", 503).await;

    let root = tempdir().unwrap();
    let out_dir = root.path().join("agendas");
    prepare_output_dir(&out_dir, true).await.unwrap();

    let tasks = site_tasks(vec![
        mirrored(&server, "oakland", "/oakland"),
        mirrored(&server, "bakersfield", "/bakersfield"),
        mirrored(&server, "fresno", "/fresno"),
        mirrored(&server, "sanfrancisco", "/sf"),
    ]);
    let orchestrator = Orchestrator::new(
        Arc::new(SilentProgress::new()),
        Arc::new(DirSink::new(&out_dir)),
    );

    let mut reporter = Reporter::new(&out_dir, Vec::new());
    let summary = orchestrator
        .run(&CancellationToken::new(), tasks, &mut reporter)
        .await
        .unwrap();

    assert_eq!(summary.total, 4);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 2);

    assert_eq!(
        std::fs::read_to_string(out_dir.join("oakland.pdf")).unwrap(),
        AGENDA_BODY
    );
    assert_eq!(
        std::fs::read_to_string(out_dir.join("sanfrancisco.pdf")).unwrap(),
        AGENDA_BODY
    );
    assert!(!out_dir.join("bakersfield.pdf").exists());
    assert_eq!(
        std::fs::read_to_string(out_dir.join("fresno-error-content.html")).unwrap(),
        "<html><body>we moved</body></html>"
    );

    let report = String::from_utf8(reporter.into_inner()).unwrap();
    assert!(report.contains("bakersfield: get "));
    assert!(report.contains("status code 503"));
    assert!(report.contains("fresno-error-content.html file."));
}

#[tokio::test]
async fn cancelled_run_saves_nothing_and_reports_every_site() {
    let server = MockServer::start().await;
    serve(&server, "/oakland", oakland_listing("/docs/oakland.pdf")).await;

    let root = tempdir().unwrap();
    let tasks = site_tasks(vec![
        mirrored(&server, "oakland", "/oakland"),
        mirrored(&server, "sanfrancisco", "/sf"),
    ]);
    let orchestrator = Orchestrator::new(
        Arc::new(SilentProgress::new()),
        Arc::new(DirSink::new(root.path())),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut reporter = Reporter::new(root.path(), Vec::new());
    let summary = orchestrator.run(&cancel, tasks, &mut reporter).await.unwrap();

    assert_eq!(summary.failed, 2);
    assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    let report = String::from_utf8(reporter.into_inner()).unwrap();
    assert_eq!(report.matches("request cancelled").count(), 2);
}

#[tokio::test]
async fn terminal_progress_finishes_at_full_bar() {
    let server = MockServer::start().await;
    serve(&server, "/oakland", oakland_listing("/docs/oakland.pdf")).await;
    serve(&server, "/docs/oakland.pdf", AGENDA_BODY).await;

    let root = tempdir().unwrap();
    let config = ProgressConfig {
        interval: Duration::from_millis(5),
        bar_width: 4,
        ..ProgressConfig::default()
    };
    let progress = Arc::new(TerminalProgress::with_writer(&config, std::io::sink()));
    let orchestrator = Orchestrator::new(progress.clone(), Arc::new(DirSink::new(root.path())));

    let summary = orchestrator
        .run(
            &CancellationToken::new(),
            site_tasks(vec![mirrored(&server, "oakland", "/oakland")]),
            &mut Reporter::new(root.path(), Vec::new()),
        )
        .await
        .unwrap();

    assert!(summary.is_clean());
    assert_eq!(progress.total(), 1);
    assert_eq!(progress.completed(), 1);
    assert!(root.path().join("oakland.pdf").exists());
}
