//! CLI-facing entrypoints: publish status and template diff.

mod support;

use std::fs;
use std::path::PathBuf;

use sitesync_core::{Config, RepoSlug, TemplateManifest};
use sitesync_sync::{pipeline, RemoteError, SyncError, SyncStep};
use support::MemoryRepo;
use tempfile::TempDir;

fn config(local: PathBuf) -> Config {
    let mut config = Config::new(
        RepoSlug::new("octo", "garden"),
        RepoSlug::new("upstream", "template"),
        local,
    );
    config.content_dir = "src/site/notes".into();
    config.manifest = Some(TemplateManifest {
        tracked: vec!["layout.njk".into(), "style.scss".into(), "new.js".into()],
        deprecated: vec![],
        customization: "custom.scss".into(),
    });
    config
}

#[tokio::test]
async fn publish_status_partitions_local_against_remote_tree() {
    let vault = TempDir::new().unwrap();
    fs::write(vault.path().join("A.md"), "alpha\n").unwrap();
    fs::write(vault.path().join("B.md"), "beta\n").unwrap();
    fs::write(vault.path().join("D.md"), "delta v2\n").unwrap();

    let fork = MemoryRepo::new("octo/garden")
        .with_file("main", "src/site/notes/A.md", "alpha\n")
        .with_file("main", "src/site/notes/C.md", "gamma\n")
        .with_file("main", "src/site/notes/D.md", "delta\n")
        .with_file("main", "src/site/styles/custom-style.scss", "x");

    let partition = pipeline::publish_status(&fork, &config(vault.path().to_path_buf()))
        .await
        .expect("status");
    assert_eq!(partition.published, vec!["A.md"]);
    assert_eq!(partition.unpublished, vec!["B.md"]);
    assert_eq!(partition.changed, vec!["D.md"]);
    assert_eq!(partition.deleted, vec!["C.md"]);
}

#[tokio::test]
async fn publish_status_surfaces_listing_failure_with_step() {
    let vault = TempDir::new().unwrap();
    let fork = MemoryRepo::new("octo/garden");
    fork.fail_next("list_tree", RemoteError::RateLimited("retry later".into()));

    let err = pipeline::publish_status(&fork, &config(vault.path().to_path_buf()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SyncError::Remote {
            step: SyncStep::ListRemoteContent,
            source: RemoteError::RateLimited(_),
        }
    ));
}

#[tokio::test]
async fn template_diff_lists_only_differing_tracked_files() {
    let vault = TempDir::new().unwrap();
    let template = MemoryRepo::new("upstream/template")
        .with_file("main", "layout.njk", "<main>\n{{ content }}\n</main>\n")
        .with_file("main", "style.scss", "body {}\n")
        .with_file("main", "new.js", "export {}\n")
        .with_file("main", "custom.scss", "/* yours */\n");
    let fork = MemoryRepo::new("octo/garden")
        .with_file("main", "layout.njk", "<div>\n{{ content }}\n</div>\n")
        .with_file("main", "style.scss", "body {}\n")
        .with_file("main", "custom.scss", "/* mine */\n");

    let diffs = pipeline::template_diff(&fork, &template, &config(vault.path().to_path_buf()))
        .await
        .expect("diff");
    let paths: Vec<_> = diffs.iter().map(|d| d.path.as_str()).collect();
    assert_eq!(paths, vec!["layout.njk", "new.js"]);

    let layout = &diffs[0];
    assert!(layout.exists_in_fork);
    assert!(layout.unified_diff.contains("--- a/layout.njk"));
    assert!(layout.unified_diff.contains("-<div>"));
    assert!(layout.unified_diff.contains("+<main>"));
    assert!(!diffs[1].exists_in_fork);
}

#[tokio::test]
async fn template_sync_uses_configured_prefix() {
    let vault = TempDir::new().unwrap();
    let template = MemoryRepo::new("upstream/template")
        .with_release("v3.0.0")
        .with_file("main", "layout.njk", "v3");
    let fork = MemoryRepo::new("octo/garden");
    let mut config = config(vault.path().to_path_buf());
    config.branch_prefix = "template/".into();

    let report = pipeline::template_sync(&fork, &template, &config, false)
        .await
        .expect("sync");
    assert_eq!(report.branch.name, "template/3.0.0");
    assert!(fork.has_branch("template/3.0.0"));
}
