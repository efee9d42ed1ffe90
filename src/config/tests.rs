use std::io::Write;

use super::*;

#[test]
fn defaults_leave_worker_unset() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(settings.worker.url.is_none());
    assert!(settings.worker.request_timeout.is_none());
    assert_eq!(settings.recipes.names, ["html"]);
    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.worker.url = Some("http://w1:5488/".to_string());
    raw.logging.level = Some("info".to_string());

    let overrides = WorkerOverrides {
        worker_url: Some("http://w2:5488/".to_string()),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_worker_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(
        settings.worker.url.as_ref().map(Url::as_str),
        Some("http://w2:5488/")
    );
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = WorkerOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_worker_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_worker_url_means_none() {
    let mut raw = RawSettings::default();
    raw.worker.url = Some("  ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.worker.url.is_none());
}

#[test]
fn invalid_worker_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.worker.url = Some("not a url".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid url");
    assert!(matches!(err, LoadError::Invalid { key: "worker.url", .. }));
}

#[test]
fn zero_timeout_is_rejected() {
    let mut raw = RawSettings::default();
    raw.worker.request_timeout_seconds = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "worker.request_timeout_seconds",
            ..
        }
    ));
}

#[test]
fn recipe_names_are_trimmed_and_deduplicated() {
    let mut raw = RawSettings::default();
    raw.recipes.names = Some(vec![
        "html".to_string(),
        " chrome-pdf ".to_string(),
        "chrome-pdf".to_string(),
        String::new(),
    ]);

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.recipes.names, ["html", "chrome-pdf"]);
}

#[test]
fn config_file_feeds_settings() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("tmp file");
    writeln!(
        file,
        r#"
[worker]
url = "http://w1:5488/"
request_timeout_seconds = 30

[recipes]
names = ["html", "chrome-pdf"]
"#
    )
    .expect("write config");

    let args = CliArgs::parse_from([
        "worker-delegate",
        "--config-file",
        file.path().to_str().expect("utf-8 path"),
        "script",
        "inputs.json",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(
        settings.worker.url.as_ref().map(Url::as_str),
        Some("http://w1:5488/")
    );
    assert_eq!(settings.worker.request_timeout, Some(Duration::from_secs(30)));
    assert_eq!(settings.recipes.names, ["html", "chrome-pdf"]);
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from([
        "worker-delegate",
        "render",
        "request.json",
        "--out",
        "report.pdf",
        "--worker-url",
        "http://w2:5488/",
        "--worker-timeout-seconds",
        "15",
        "--log-json",
        "true",
    ]);

    match args.command {
        Command::Render(render) => {
            assert_eq!(render.request, PathBuf::from("request.json"));
            assert_eq!(render.out, Some(PathBuf::from("report.pdf")));
            assert_eq!(
                render.overrides.worker_url.as_deref(),
                Some("http://w2:5488/")
            );
            assert_eq!(render.overrides.worker_timeout_seconds, Some(15));
            assert_eq!(render.overrides.log_json, Some(true));
        }
        other => panic!("expected render command, got {other:?}"),
    }
}

#[test]
fn parse_script_arguments() {
    let args = CliArgs::parse_from([
        "worker-delegate",
        "script",
        "inputs.json",
        "--options",
        "options.json",
    ]);

    match args.command {
        Command::Script(script) => {
            assert_eq!(script.inputs, PathBuf::from("inputs.json"));
            assert_eq!(script.options, Some(PathBuf::from("options.json")));
        }
        other => panic!("expected script command, got {other:?}"),
    }
}
