//! End-to-end checks: write a bookings file, load it, query it, export it.

use chrono::NaiveDate;
use lib::{
    BookingError, CountryFilter, Feature, GeoDistribution, LoadConfig, Metric, cancellation_rows,
    geo_rows, load_bookings, trend_rows, write_csv, write_json, write_parquet,
};
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};

const FIXTURE: &str = "\
hotel,is_canceled,lead_time,arrival_date_year,arrival_date_month,arrival_date_week_number,arrival_date_day_of_month,country,days_in_waiting_list,required_car_parking_spaces,total_of_special_requests,customer_type
Resort Hotel,0,342,2015,July,27,1,PRT,0,0,0,Transient
Resort Hotel,1,737,2015,July,27,1,PRT,,1,0,Transient
Resort Hotel,1,7,2015,July,27,2,GBR,3,0,1,Contract
City Hotel,0,13,2016,January,1,2,ESP,10,0,2,Transient-Party
City Hotel,0,14,2016,January,1,2,ESP,n/a,0,1,Transient-Party
City Hotel,yes,0,2016,March,10,5,FRA,0,1,0,Group
City Hotel,1,9,2016,March,10,5,,0,0,0,Transient
City Hotel,0,40,2017,August,31,31,PRT,0,0,3,Transient
";

fn fixture_file() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(FIXTURE.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn loads_fixture_with_coercion() {
    let file = fixture_file();
    let (bookings, report) = load_bookings(file.path(), &LoadConfig::default()).unwrap();

    assert_eq!(bookings.len(), 8);
    assert_eq!(report.total_rows, 8);
    assert_eq!(report.missing_country, 1);
    assert_eq!(report.unknown_cancellation, 1);
    assert_eq!(report.invalid_dates, 0);
    assert_eq!(bookings.years(), vec![2015, 2016, 2017]);
    assert_eq!(
        bookings.date_bounds(),
        Some((date(2015, 7, 1), date(2017, 8, 31)))
    );
    assert_eq!(bookings.countries().len(), 4);
}

#[test]
fn missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = load_bookings(&dir.path().join("absent.csv"), &LoadConfig::default()).unwrap_err();
    assert!(matches!(err, BookingError::Io(_)));
}

#[test]
fn trend_for_each_year() {
    let file = fixture_file();
    let (bookings, _) = load_bookings(file.path(), &LoadConfig::default()).unwrap();

    let trend = bookings.trend_for_year(2015);
    let days: Vec<(NaiveDate, u64)> = trend.daily.iter().map(|d| (d.date, d.bookings)).collect();
    assert_eq!(days, vec![(date(2015, 7, 1), 2), (date(2015, 7, 2), 1)]);

    let empty = bookings.trend_for_year(2020);
    assert!(empty.daily.is_empty());
    assert!(!empty.weekends.is_empty());
}

#[test]
fn geo_total_matches_rows_with_country() {
    let file = fixture_file();
    let (bookings, _) = load_bookings(file.path(), &LoadConfig::default()).unwrap();

    let all = CountryFilter::from_values(["ALL"]);
    let GeoDistribution::Values(counts) = bookings.geo_distribution(&all, Feature::BookingCount)
    else {
        panic!("expected values");
    };
    let total: f64 = counts.values().flatten().sum();
    assert_eq!(total, 7.0);
    assert_eq!(counts.get("PRT"), Some(&Some(3.0)));
}

#[test]
fn geo_waiting_days_skips_unparseable() {
    let file = fixture_file();
    let (bookings, _) = load_bookings(file.path(), &LoadConfig::default()).unwrap();

    let esp = CountryFilter::from_values(["ESP"]);
    let result = bookings.geo_distribution(&esp, Feature::DaysInWaitingList);
    let GeoDistribution::Values(values) = result else {
        panic!("expected values");
    };
    assert_eq!(values.len(), 1);
    assert_eq!(values["ESP"], Some(10.0));

    let none = CountryFilter::from_values(Vec::<&str>::new());
    assert_eq!(
        bookings.geo_distribution(&none, Feature::DaysInWaitingList),
        GeoDistribution::NoSelection
    );
}

#[test]
fn cancellations_within_range() {
    let file = fixture_file();
    let (bookings, _) = load_bookings(file.path(), &LoadConfig::default()).unwrap();

    let all = CountryFilter::All;
    let rates = bookings.cancellation_rate_by_country(&all, date(2015, 1, 1), date(2016, 12, 31));
    assert_eq!(rates["PRT"], 50.0);
    assert_eq!(rates["GBR"], 100.0);
    assert_eq!(rates["ESP"], 0.0);
    // FRA's only row has an unknown flag: counted, never canceled
    assert_eq!(rates["FRA"], 0.0);

    let later = bookings.cancellation_rate_by_country(&all, date(2017, 1, 1), date(2017, 12, 31));
    assert_eq!(later.len(), 1);
    assert_eq!(later["PRT"], 0.0);

    assert!(
        bookings
            .cancellation_rate_by_country(&all, date(2017, 1, 1), date(2015, 1, 1))
            .is_empty()
    );
}

#[test]
fn customer_metrics_cover_every_type() {
    let file = fixture_file();
    let (bookings, _) = load_bookings(file.path(), &LoadConfig::default()).unwrap();

    let rows = bookings.metrics_by_customer_type(&[Metric::CancellationRate]);
    assert_eq!(rows.len(), bookings.customer_types().len());
    let transient = rows.iter().find(|r| r.customer_type == "Transient").unwrap();
    assert_eq!(transient.value, Some(0.5));
    let group = rows.iter().find(|r| r.customer_type == "Group").unwrap();
    assert_eq!(group.value, None);

    assert!(bookings.metrics_by_customer_type(&[]).is_empty());
}

#[test]
fn exports_write_all_formats() {
    let file = fixture_file();
    let (bookings, _) = load_bookings(file.path(), &LoadConfig::default()).unwrap();
    let dir = TempDir::new().unwrap();

    let mut rows = trend_rows(&bookings.trend_for_year(2016));
    rows.extend(geo_rows(
        &bookings.geo_distribution(&CountryFilter::All, Feature::RequiredCarParkingSpaces),
        Feature::RequiredCarParkingSpaces,
    ));
    let rates = bookings.cancellation_rate_by_country(
        &CountryFilter::All,
        date(2015, 1, 1),
        date(2017, 12, 31),
    );
    rows.extend(cancellation_rows(&rates));

    let csv_path = dir.path().join("summary.csv");
    let json_path = dir.path().join("summary.json");
    let parquet_path = dir.path().join("summary.parquet");
    write_csv(&rows, &csv_path).unwrap();
    write_json(&rows, &json_path).unwrap();
    write_parquet(&rows, &parquet_path).unwrap();

    let csv_text = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv_text.starts_with("Key,Series,Value"));
    assert!(csv_text.contains("2016-01-02,number_of_bookings,2.00"));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json.as_array().map(|a| a.len()), Some(rows.len()));

    assert!(std::fs::metadata(&parquet_path).unwrap().len() > 0);
}
