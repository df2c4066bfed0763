use chrono::{Days, NaiveDate};
use ration_forecast::backtest::{run_backtest, write_csv};
use ration_forecast::config::{ForestConfig, PipelineConfig};
use ration_forecast::data::{DataLoader, MealCategory};
use ration_forecast::ForecastError;
use std::io::Write;
use tempfile::NamedTempFile;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
}

// 40 days of lunch and breakfast with a weekday pattern
fn create_export() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,meal_category,ticket_count,total_rations").unwrap();
    let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    for i in 0..40 {
        let date = start.checked_add_days(Days::new(i)).unwrap();
        let lunch = 200 + (i % 7) * 3;
        let breakfast = 60 + (i % 5);
        writeln!(file, "{},ALMUERZO,{},{}", date, lunch, lunch).unwrap();
        writeln!(file, "{},desayuno,{},{}", date, breakfast, breakfast).unwrap();
    }
    file
}

#[test]
fn test_load_csv_export() {
    let file = create_export();
    let history = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(history.len(), 80);
    assert_eq!(history.first_date(), NaiveDate::from_ymd_opt(2024, 4, 1));
    assert_eq!(history.last_date(), Some(day(10)));
    assert_eq!(history.for_meal(MealCategory::Dinner).count(), 0);
    assert_eq!(
        history.get(day(1), MealCategory::Breakfast).map(|o| o.servings_total),
        Some(60)
    );
}

#[test]
fn test_load_csv_without_ticket_column() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,meal_category,total_rations").unwrap();
    writeln!(file, "2024-05-01,CENA,80").unwrap();
    writeln!(file, "2024-05-01,Lunch,200").unwrap();

    let history = DataLoader::from_csv(file.path()).unwrap();
    assert_eq!(history.len(), 2);
    let dinner = history.get(day(1), MealCategory::Dinner).unwrap();
    assert_eq!(dinner.ticket_count, 80);
}

#[test]
fn test_load_csv_rejects_unknown_meal() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "date,meal_category,total_rations").unwrap();
    writeln!(file, "2024-05-01,MERIENDA,10").unwrap();

    let err = DataLoader::from_csv(file.path()).unwrap_err();
    assert!(matches!(err, ForecastError::DataError(_)));
}

#[test]
fn test_load_missing_file() {
    let err = DataLoader::from_csv("/nonexistent/demand.csv").unwrap_err();
    assert!(matches!(err, ForecastError::IoError(_)));
}

#[test]
fn test_backtest_compares_with_later_rows() {
    let file = create_export();
    let history = DataLoader::from_csv(file.path()).unwrap();
    let config = PipelineConfig {
        forest: ForestConfig {
            n_trees: 15,
            ..ForestConfig::default()
        },
        ..PipelineConfig::default()
    };

    // 2024-05-05 leaves six known days inside the seven-day horizon
    let report = run_backtest(&history, &config, day(5)).unwrap();
    assert_eq!(report.rows.len(), 14);
    assert_eq!(report.rows[0].date, day(5));
    assert_eq!(report.rows[0].meal, MealCategory::Breakfast);

    let known: Vec<_> = report.rows.iter().filter(|r| r.actual.is_some()).collect();
    assert_eq!(known.len(), 12);
    for row in &known {
        assert_eq!(
            row.absolute_error,
            Some((row.predicted - row.actual.unwrap()).abs())
        );
    }
    assert!(report.rows.iter().filter(|r| r.date == day(11)).all(|r| r.actual.is_none()));
    assert!(report.accuracy.contains_key(&MealCategory::Lunch));
    assert!(report.accuracy[&MealCategory::Lunch].mae < 30.0);

    let mut out = Vec::new();
    write_csv(&report.rows, &mut out).unwrap();
    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("date,meal,predicted,actual,absolute_error")
    );
    assert_eq!(lines.count(), 14);
}
