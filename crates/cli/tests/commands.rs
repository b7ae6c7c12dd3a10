//! End-to-end tests of the geowatch binary against a temporary deployment

mod common;

use anyhow::Result;
use common::{Deployment, GeowatchCommand};

#[test]
fn config_example_needs_no_config_file() -> Result<()> {
    let result = GeowatchCommand::bare().args(&["config", "example"]).assert_success()?;

    for family in ["mosaic", "seasonal", "sub-seasonal", "radar", "wave"] {
        assert!(result.contains_stdout(&format!("family = \"{}\"", family)), "missing {}", family);
    }
    Ok(())
}

#[test]
fn config_path_prefers_flag() -> Result<()> {
    let site = Deployment::mosaic();
    let result = geowatch!(site.config, "config", "path").assert_success()?;
    assert_eq!(result.stdout.trim(), site.config.display().to_string());
    Ok(())
}

#[test]
fn config_list_resolves_family_defaults() -> Result<()> {
    let site = Deployment::with_watches(
        r#"
[[watch]]
name = "radar-sri"
family = "radar"
dirs = ["{data}"]
"#,
    );

    let result = geowatch!(site.config, "config", "list").assert_success()?;
    assert!(result.contains_stdout("debounce_secs = 1800"));
    assert!(result.contains_stdout("retention_hours = 72"));
    assert!(result.contains_stdout("update_geoserver_radar_layers"));
    Ok(())
}

#[test]
fn missing_config_file_is_reported() -> Result<()> {
    let site = Deployment::mosaic();
    let absent = site.temp.path().join("absent.toml");

    let result = GeowatchCommand::new(&absent).args(&["check"]).assert_failure()?;
    assert!(result.contains_stderr("Config file not found"));
    Ok(())
}

#[test]
fn ansi_sequences_are_stripped() {
    assert_eq!(common::strip_ansi("\u{1b}[36micon\u{1b}[39m ok"), "icon ok");
}

#[test]
fn check_claims_and_spools_once() -> Result<()> {
    let site = Deployment::mosaic();
    site.touch("2025010100.READY");

    let first = geowatch!(site.config, "check").assert_success()?;
    assert!(first.contains_stdout("dispatched"));
    assert!(site.exists("2025010100.CHECKED"));

    let second = geowatch!(site.config, "check").assert_success()?;
    assert!(second.contains_stdout("in flight"));

    let spooled = site.spooled();
    assert_eq!(spooled.len(), 1);
    assert_eq!(spooled[0]["name"], "update_geoserver_image_mosaic");
    assert_eq!(spooled[0]["args"]["date"], "2025-01-01");
    Ok(())
}

#[test]
fn dry_run_changes_nothing() -> Result<()> {
    let site = Deployment::mosaic();
    site.touch("2025010100.READY");

    let result = geowatch!(site.config, "check", "--dry-run").assert_success()?;
    assert!(result.contains_stdout("would be claimed"));
    assert!(!site.exists("2025010100.CHECKED"));
    assert!(site.spooled().is_empty());
    Ok(())
}

#[test]
fn complete_marks_batch_published() -> Result<()> {
    let site = Deployment::mosaic();
    site.touch("2025010100.READY");
    geowatch!(site.config, "check").assert_success()?;

    geowatch!(site.config, "complete", "--watch", "icon", "--batch", "2025010100").assert_success()?;
    assert!(site.exists("2025010100.PUBLISHED.READY"));
    assert!(!site.exists("2025010100.CHECKED"));

    let after = geowatch!(site.config, "check").assert_success()?;
    assert!(after.contains_stdout("already published"));
    assert_eq!(site.spooled().len(), 1);
    Ok(())
}

#[test]
fn complete_rejects_malformed_batch() -> Result<()> {
    let site = Deployment::mosaic();
    geowatch!(site.config, "complete", "--watch", "icon", "--batch", "yesterday").assert_failure()?;
    geowatch!(site.config, "complete", "--watch", "nope", "--batch", "2025010100").assert_failure()?;
    Ok(())
}

#[test]
fn escalation_then_clear_failure() -> Result<()> {
    let site = Deployment::mosaic();
    site.touch("2025010100.READY");
    site.claim("2025010100.CHECKED", 1, 700);

    let result = geowatch!(site.config, "check").assert_success()?;
    assert!(result.contains_stdout("escalated"));
    assert!(site.sentinel.exists());
    assert!(!site.exists("2025010100.CHECKED"));

    let status = geowatch!(site.config, "status").assert_success()?;
    assert!(status.contains_stdout("after 2 attempts"));

    let stuck = geowatch!(site.config, "check").assert_success()?;
    assert!(stuck.contains_stdout("permanently failed"));

    geowatch!(site.config, "clear-failure", "--watch", "icon").assert_success()?;
    assert!(!site.sentinel.exists());

    let retried = geowatch!(site.config, "check").assert_success()?;
    assert!(retried.contains_stdout("dispatched"));
    Ok(())
}

#[test]
fn sentinel_path_overridable_from_environment() -> Result<()> {
    let site = Deployment::mosaic();
    site.touch("2025010100.READY");
    site.claim("2025010100.CHECKED", 1, 700);
    let elsewhere = site.temp.path().join("elsewhere");

    geowatch!(site.config, "check")
        .env("GEOWATCH__SENTINEL_PATH", &elsewhere.display().to_string())
        .assert_success()?;

    assert!(elsewhere.exists());
    assert!(!site.sentinel.exists());
    Ok(())
}

#[test]
fn status_shows_latest_batch_and_claim() -> Result<()> {
    let site = Deployment::mosaic();
    site.touch("2025010100.READY");
    site.touch("2025010112.READY");
    geowatch!(site.config, "check").assert_success()?;

    let status = geowatch!(site.config, "status").assert_success()?;
    assert!(status.contains_stdout("2025010112"));
    assert!(status.contains_stdout("in flight"));
    assert!(status.contains_stdout("Not running"));
    Ok(())
}

#[test]
fn watch_once_runs_a_single_tick() -> Result<()> {
    let site = Deployment::mosaic();
    site.touch("2025010100.READY");

    geowatch!(site.config, "watch", "--once").assert_success()?;

    assert!(site.exists("2025010100.CHECKED"));
    assert_eq!(site.spooled().len(), 1);
    Ok(())
}

#[test]
fn radar_complete_prunes_and_names_range() -> Result<()> {
    let site = Deployment::with_watches(
        r#"
[[watch]]
name = "radar-sri"
family = "radar"
dirs = ["{data}"]
retention_hours = 2
"#,
    );
    site.touch("202501011200.READY");
    for name in ["01-01-2025-09-00.tif", "01-01-2025-11-00.tif", "01-01-2025-12-00.tif"] {
        site.touch(&format!("files/{}", name));
    }

    let check = geowatch!(site.config, "check").assert_success()?;
    assert!(check.contains_stdout("dispatched"));

    // A newer minute arrives before the publisher reports back
    site.touch("files/01-01-2025-12-01.tif");
    site.touch("202501011201.READY");

    geowatch!(site.config, "complete", "--watch", "radar-sri", "--batch", "202501011200").assert_success()?;

    assert!(!site.exists("files/01-01-2025-09-00.tif"));
    assert!(site.exists("files/01-01-2025-11-00.tif"));
    assert!(site.exists("files/01-01-2025-12-01.tif"));
    assert!(site.exists("202501011100-202501011200.PUBLISHED.READY"));

    // Dispatch plus one catalog removal task
    let spooled = site.spooled();
    assert_eq!(spooled.len(), 2);
    assert_eq!(spooled[1]["name"], "remove_granules");

    let next = geowatch!(site.config, "check").assert_success()?;
    assert!(next.contains_stdout("dispatched"));
    assert_eq!(site.spooled().len(), 3);
    Ok(())
}

#[test]
fn prune_follows_published_range() -> Result<()> {
    let site = Deployment::with_watches(
        r#"
[[watch]]
name = "ww3"
family = "wave"
dirs = ["{data}"]
retention_hours = 24
catalog_task = ""
"#,
    );
    for name in ["01-01-2025-00.tif", "02-01-2025-00.tif", "03-01-2025-00.tif", "04-01-2025-00.tif"] {
        site.touch(&format!("hs/{}", name));
    }

    // Nothing published yet, nothing is pruned
    geowatch!(site.config, "prune").assert_success()?;
    assert!(site.exists("hs/01-01-2025-00.tif"));

    site.touch("2025010100-2025010300.PUBLISHED.READY");
    geowatch!(site.config, "prune", "--watch", "ww3").assert_success()?;

    assert!(!site.exists("hs/01-01-2025-00.tif"));
    assert!(site.exists("hs/02-01-2025-00.tif"));
    assert!(site.exists("hs/04-01-2025-00.tif"));
    // Catalog removal disabled
    assert!(site.spooled().is_empty());
    Ok(())
}
