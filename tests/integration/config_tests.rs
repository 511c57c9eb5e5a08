use super::*;
use fare_watcher::config::RECIPIENT_VAR;
use fare_watcher::utils::error::ConfigError;
use rstest::rstest;

fn load(contents: &str, env: &HashMap<String, String>) -> anyhow::Result<Result<AppConfig, ConfigError>> {
    let file = write_ini(contents)?;
    Ok(AppConfig::load(file.path(), env, today()))
}

#[test]
fn test_route_codes_normalized_and_dates_wired() -> anyhow::Result<()> {
    let config = get_test_config()?;

    assert_eq!(config.search.origin, "LHE");
    assert_eq!(config.search.destination, "ATL");
    assert_eq!(config.search.per_day().len(), 3);
    assert_eq!(config.site.outbound_date_input.as_deref(), Some("#depart-date"));
    assert_eq!(config.target.recipient, "alerts@example.com");
    Ok(())
}

#[test]
fn test_recipient_override() -> anyhow::Result<()> {
    let mut env = test_credentials();
    env.insert(RECIPIENT_VAR.to_string(), "traveller@example.com".to_string());

    let config = load(TEST_INI, &env)??;
    assert_eq!(config.target.recipient, "traveller@example.com");
    assert_eq!(config.target.sender, "alerts@example.com");
    Ok(())
}

#[rstest]
#[case("START_DATE = 2026-12-10\n", "START_DATE")]
#[case("PRICE_THRESHOLD = 2000\n", "PRICE_THRESHOLD")]
#[case("DEPARTURE = lhe\n", "DEPARTURE")]
#[case("ARRIVAL = atl\n", "ARRIVAL")]
fn test_missing_flight_key_names_field(
    #[case] line: &str,
    #[case] field: &str,
) -> anyhow::Result<()> {
    let ini = TEST_INI.replace(line, "");

    let err = load(&ini, &test_credentials())?.unwrap_err();
    assert_eq!(err.field(), Some(field));
    Ok(())
}

#[rstest]
#[case("START_DATE = 2026-12-10", "START_DATE = 10/12/2026", "START_DATE")]
#[case("END_DATE = 2026-12-12", "END_DATE = 2026-12-01", "END_DATE")]
#[case("PRICE_THRESHOLD = 2000", "PRICE_THRESHOLD = -5", "PRICE_THRESHOLD")]
#[case("PRICE_THRESHOLD = 2000", "PRICE_THRESHOLD = cheap", "PRICE_THRESHOLD")]
#[case("ARRIVAL = atl", "ARRIVAL = LHE", "ARRIVAL")]
fn test_invalid_flight_value_names_field(
    #[case] from: &str,
    #[case] to: &str,
    #[case] field: &str,
) -> anyhow::Result<()> {
    let ini = TEST_INI.replace(from, to);

    let err = load(&ini, &test_credentials())?.unwrap_err();
    assert_eq!(err.field(), Some(field));
    Ok(())
}

#[test]
fn test_past_start_date_rejected() -> anyhow::Result<()> {
    let ini = TEST_INI.replace("START_DATE = 2026-12-10", "START_DATE = 2026-10-18");

    let err = load(&ini, &test_credentials())?.unwrap_err();
    assert_eq!(err.field(), Some("START_DATE"));
    Ok(())
}

#[test]
fn test_missing_credentials_rejected() -> anyhow::Result<()> {
    let env = HashMap::from([(PASSWORD_VAR.to_string(), "app-password".to_string())]);

    let err = load(TEST_INI, &env)?.unwrap_err();
    assert!(matches!(err, ConfigError::MissingField(ref f) if f == SENDER_VAR));
    Ok(())
}

#[test]
fn test_config_error_exit_code() -> anyhow::Result<()> {
    let err = load("[FLIGHTS]\n", &test_credentials())?.unwrap_err();
    assert_eq!(fare_watcher::AppError::from(err).exit_code(), 2);
    Ok(())
}
