use chrono::NaiveDate;
use ration_forecast::data::MealCategory;
use ration_forecast::error::ForecastError;
use rstest::rstest;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::IoError(_)));

    let math_error = meal_math::MathError::InvalidInput("period must be positive".to_string());
    let forecast_error = ForecastError::from(math_error);
    assert!(matches!(forecast_error, ForecastError::InvalidParameter(_)));

    let toml_error = toml::from_str::<toml::Table>("horizon_days = ").unwrap_err();
    let forecast_error = ForecastError::from(toml_error);
    assert!(matches!(forecast_error, ForecastError::ConfigError(_)));
}

#[test]
fn test_sqlx_errors_are_classified() {
    let timed_out = ForecastError::from(sqlx::Error::PoolTimedOut);
    assert!(timed_out.is_transient());

    let missing = ForecastError::from(sqlx::Error::RowNotFound);
    assert!(matches!(missing, ForecastError::Store(_)));
    assert!(!missing.is_transient());
}

#[test]
fn test_error_display() {
    let error = ForecastError::InsufficientHistory {
        meal: MealCategory::Dinner,
        available: 5,
        required: 14,
    };
    let message = error.to_string();
    assert!(message.contains("CENA"));
    assert!(message.contains("5 training rows, need 14"));

    let error = ForecastError::DataUnavailable {
        from: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        until: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        reason: "connection refused".to_string(),
    };
    let message = error.to_string();
    assert!(message.contains("[2024-05-01, 2024-06-01)"));
    assert!(message.contains("connection refused"));
}

#[rstest]
#[case(ForecastError::TransientStore("busy".into()), "transient_store", true)]
#[case(ForecastError::WriteConflict("dup".into()), "write_conflict", false)]
#[case(ForecastError::Store("syntax".into()), "store", false)]
#[case(ForecastError::DataError("bad".into()), "data", false)]
#[case(ForecastError::ConfigError("bad".into()), "config", false)]
fn test_error_kinds(#[case] error: ForecastError, #[case] kind: &str, #[case] transient: bool) {
    assert_eq!(error.kind(), kind);
    assert_eq!(error.is_transient(), transient);
}
