use super::*;
use fare_watcher::core::evaluator::Decision;
use fare_watcher::models::ParsedFare;
use fare_watcher::plugins::trackers::FareParser;
use fare_watcher::utils::error::ExtractionError;
use fare_watcher::{AppError, Pipeline, RunOptions};
use rstest::rstest;

#[tokio::test]
async fn test_low_fare_triggers_single_alert() -> anyhow::Result<()> {
    let config = get_test_config()?;
    let launcher = ScriptedLauncher::new(&config, &["$2,450", "Sold out", "$1,999.99"]);
    let notifier = RecordingNotifier::default();
    let parser = FareParser::default();

    let report = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await?;

    assert_eq!(report.decision, Decision::Alert(ParsedFare(1999)));
    assert_eq!(report.fares_found, 2);
    assert_eq!(report.fares_rejected, 1);
    assert!(report.alert_sent);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].origin, "LHE");
    assert_eq!(sent[0].destination, "ATL");
    assert_eq!(sent[0].formatted_price, "$1,999");
    assert_eq!(sent[0].formatted_threshold, "$2,000");
    assert_eq!(sent[0].subject(), "✈️ Flight Price Alert: LHE to ATL for $1,999!");

    assert_eq!(launcher.launches.get(), 1);
    assert_eq!(launcher.closes.get(), 1);
    Ok(())
}

#[tokio::test]
async fn test_fare_equal_to_threshold_alerts() -> anyhow::Result<()> {
    let config = get_test_config()?;
    let launcher = ScriptedLauncher::new(&config, &["$2,000"]);
    let notifier = RecordingNotifier::default();
    let parser = FareParser::default();

    let report = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await?;

    assert!(report.decision.is_alert());
    assert_eq!(notifier.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_fares_above_threshold_send_nothing() -> anyhow::Result<()> {
    let config = get_test_config()?;
    let launcher = ScriptedLauncher::new(&config, &["$2,001", "$3,100"]);
    let notifier = RecordingNotifier::default();
    let parser = FareParser::default();

    let report = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await?;

    assert_eq!(report.decision, Decision::AboveThreshold(ParsedFare(2001)));
    assert!(!report.alert_sent);
    assert!(notifier.sent().is_empty());
    assert_eq!(launcher.closes.get(), 1);
    Ok(())
}

#[tokio::test]
async fn test_only_malformed_fares_is_no_fares() -> anyhow::Result<()> {
    let config = get_test_config()?;
    let launcher = ScriptedLauncher::new(&config, &["N/A", "Call for price"]);
    let notifier = RecordingNotifier::default();
    let parser = FareParser::default();

    let report = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await?;

    assert_eq!(report.decision, Decision::NoFares);
    assert_eq!(report.fares_rejected, 2);
    assert!(notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_launch_failure_stops_before_extraction() -> anyhow::Result<()> {
    let config = get_test_config()?;
    let launcher = ScriptedLauncher::new(&config, &["$100"]).unlaunchable();
    let notifier = RecordingNotifier::default();
    let parser = FareParser::default();

    let err = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Session(_)));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(launcher.closes.get(), 0);
    assert!(notifier.sent().is_empty());
    Ok(())
}

#[rstest]
#[case(ExtractionStep::Navigate)]
#[case(ExtractionStep::AwaitReady)]
#[case(ExtractionStep::EnterRoute)]
#[case(ExtractionStep::EnterDates)]
#[case(ExtractionStep::Submit)]
#[case(ExtractionStep::AwaitResults)]
#[case(ExtractionStep::CollectFares)]
#[tokio::test]
async fn test_failure_at_each_step_releases_session_once(
    #[case] step: ExtractionStep,
) -> anyhow::Result<()> {
    let config = get_test_config()?;
    let launcher = ScriptedLauncher::new(&config, &["$100"]).failing_at(step);
    let notifier = RecordingNotifier::default();
    let parser = FareParser::default();

    let err = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await
        .unwrap_err();

    match &err {
        AppError::Extraction(e) => assert_eq!(e.step(), step),
        other => panic!("expected extraction error at {}, got {:?}", step, other),
    }
    assert_eq!(err.exit_code(), 4);
    assert_eq!(launcher.closes.get(), 1);
    assert!(notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_readiness_timeouts_are_named() -> anyhow::Result<()> {
    let config = get_test_config()?;
    let parser = FareParser::default();
    let notifier = RecordingNotifier::default();

    let launcher = ScriptedLauncher::new(&config, &[]).failing_at(ExtractionStep::AwaitReady);
    let err = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Extraction(ExtractionError::PageNotReady { timeout, .. })
            if timeout == Duration::from_secs(20)
    ));

    let launcher = ScriptedLauncher::new(&config, &[]).failing_at(ExtractionStep::AwaitResults);
    let err = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Extraction(ExtractionError::ResultsNotReady { timeout, .. })
            if timeout == Duration::from_secs(30)
    ));
    Ok(())
}

#[tokio::test]
async fn test_failure_screenshot_saved_when_configured() -> anyhow::Result<()> {
    let mut config = get_test_config()?;
    let shots = tempfile::tempdir()?;
    config.browser.screenshot_dir = Some(shots.path().to_path_buf());

    let launcher = ScriptedLauncher::new(&config, &[]).failing_at(ExtractionStep::Submit);
    let notifier = RecordingNotifier::default();
    let parser = FareParser::default();

    let result = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await;
    assert!(result.is_err());

    let names: Vec<String> = std::fs::read_dir(shots.path())?
        .map(|entry| entry.map(|e| e.file_name().to_string_lossy().to_string()))
        .collect::<Result<_, _>>()?;
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("submit_"));
    assert_eq!(launcher.closes.get(), 1);
    Ok(())
}

#[tokio::test]
async fn test_notify_failure_is_reported_after_one_attempt() -> anyhow::Result<()> {
    let config = get_test_config()?;
    let launcher = ScriptedLauncher::new(&config, &["$900"]);
    let notifier = RecordingNotifier::failing();
    let parser = FareParser::default();

    let err = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Notify(NotifyError::Transport(_))));
    assert_eq!(err.exit_code(), 5);
    assert_eq!(notifier.sent().len(), 1);
    assert_eq!(launcher.closes.get(), 1);
    Ok(())
}

#[tokio::test]
async fn test_per_day_mode_searches_each_outbound_date() -> anyhow::Result<()> {
    let config = get_test_config()?;
    let launcher = ScriptedLauncher::new(&config, &["$1,850", "$2,300"]);
    let notifier = RecordingNotifier::default();
    let parser = FareParser::default();

    let report = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions { per_day: true })
        .run()
        .await?;

    // 2026-12-10 through 2026-12-12
    assert_eq!(report.daily_lows.len(), 3);
    assert_eq!(report.fares_found, 6);
    assert_eq!(report.decision, Decision::Alert(ParsedFare(1850)));
    assert_eq!(launcher.launches.get(), 1);
    assert_eq!(launcher.closes.get(), 1);

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].daily_lows.len(), 3);
    assert_eq!(sent[0].daily_lows[0].formatted_price, "$1,850");
    assert!(sent[0].text_body().contains("LOW FARES BY DEPARTURE DATE"));
    Ok(())
}

#[tokio::test]
async fn test_report_serializes_to_json() -> anyhow::Result<()> {
    let config = get_test_config()?;
    let launcher = ScriptedLauncher::new(&config, &["$2,500"]);
    let notifier = RecordingNotifier::default();
    let parser = FareParser::default();

    let report = Pipeline::new(&config, &launcher, &parser, &notifier, RunOptions::default())
        .run()
        .await?;
    let json = serde_json::to_value(&report)?;

    assert_eq!(json["decision"]["outcome"], "above_threshold");
    assert_eq!(json["decision"]["min_price"], 2500);
    assert_eq!(json["threshold"], 2000);
    assert_eq!(json["alert_sent"], false);
    Ok(())
}
