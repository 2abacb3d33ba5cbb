use crate::error::BookingError;
use chrono::NaiveDate;
use log::{Log, Metadata, Record as LogRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Simple logger implementation
pub struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &LogRecord) {
        if self.enabled(record.metadata()) {
            println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// Raw CSV row as it appears in the bookings file. Every field is kept as
/// text so that coercion happens in exactly one place.
#[derive(Debug, Clone, Default)]
pub struct RawBooking {
    pub arrival_date_year: Option<String>,
    pub arrival_date_month: Option<String>,
    pub arrival_date_day_of_month: Option<String>,
    pub country: Option<String>,
    pub is_canceled: Option<String>,
    pub days_in_waiting_list: Option<String>,
    pub required_car_parking_spaces: Option<String>,
    pub total_of_special_requests: Option<String>,
    pub customer_type: Option<String>,
}

/// Column names a bookings file must carry.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "arrival_date_year",
    "arrival_date_month",
    "arrival_date_day_of_month",
    "country",
    "is_canceled",
    "days_in_waiting_list",
    "required_car_parking_spaces",
    "total_of_special_requests",
    "customer_type",
];

/// One reservation after coercion. `None` marks a value that was absent or
/// could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookingRecord {
    pub arrival_year: Option<i32>,
    pub arrival_date: Option<NaiveDate>,
    pub country: Option<String>,
    pub is_canceled: Option<bool>,
    pub days_in_waiting_list: Option<f64>,
    pub required_car_parking_spaces: Option<f64>,
    pub total_of_special_requests: Option<f64>,
    pub customer_type: Option<String>,
}

/// Configuration for reading the bookings file
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub delimiter: u8,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Counters collected while loading the bookings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub skipped_rows: usize,
    pub missing_country: usize,
    pub invalid_dates: usize,
    pub unknown_cancellation: usize,
}

/// Immutable handle over the loaded bookings.
///
/// Daily arrival counts and the known country/customer-type universes are
/// derived once in [`BookingSet::new`]; every other summary is computed on
/// demand by the query methods in `transform`.
#[derive(Debug, Clone, Default)]
pub struct BookingSet {
    records: Vec<BookingRecord>,
    daily_counts: BTreeMap<NaiveDate, u64>,
    countries: BTreeSet<String>,
    customer_types: BTreeSet<String>,
}

impl BookingSet {
    pub fn new(records: Vec<BookingRecord>) -> Self {
        let mut daily_counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        let mut countries = BTreeSet::new();
        let mut customer_types = BTreeSet::new();

        for record in &records {
            if let Some(date) = record.arrival_date {
                *daily_counts.entry(date).or_default() += 1;
            }
            if let Some(country) = &record.country {
                countries.insert(country.clone());
            }
            if let Some(customer_type) = &record.customer_type {
                customer_types.insert(customer_type.clone());
            }
        }

        Self {
            records,
            daily_counts,
            countries,
            customer_types,
        }
    }

    pub fn records(&self) -> &[BookingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bookings per arrival date, ascending.
    pub fn daily_counts(&self) -> &BTreeMap<NaiveDate, u64> {
        &self.daily_counts
    }

    /// Every country code seen in the data.
    pub fn countries(&self) -> &BTreeSet<String> {
        &self.countries
    }

    pub fn customer_types(&self) -> &BTreeSet<String> {
        &self.customer_types
    }

    /// Distinct arrival years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.records
            .iter()
            .filter_map(|r| r.arrival_year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Earliest and latest arrival date, if any row has a valid date.
    pub fn date_bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.daily_counts.keys().next()?;
        let last = self.daily_counts.keys().next_back()?;
        Some((*first, *last))
    }
}

/// Numeric booking fields that can be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    IsCanceled,
    DaysInWaitingList,
    RequiredCarParkingSpaces,
    TotalOfSpecialRequests,
}

impl Field {
    pub fn value(self, record: &BookingRecord) -> Option<f64> {
        match self {
            Field::IsCanceled => record.is_canceled.map(|c| if c { 1.0 } else { 0.0 }),
            Field::DaysInWaitingList => record.days_in_waiting_list,
            Field::RequiredCarParkingSpaces => record.required_car_parking_spaces,
            Field::TotalOfSpecialRequests => record.total_of_special_requests,
        }
    }
}

/// How a group of rows collapses into one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Number of rows in the group.
    Count,
    /// Mean of the field over rows where it is present.
    Mean(Field),
}

impl Aggregation {
    pub fn field(self) -> Option<Field> {
        match self {
            Aggregation::Count => None,
            Aggregation::Mean(field) => Some(field),
        }
    }
}

/// Chart labelling for a feature. Never read by the aggregation code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presentation {
    pub label: &'static str,
    pub title: &'static str,
    pub color_scale: &'static str,
}

/// Per-country feature for the geographic view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    BookingCount,
    CancellationRate,
    DaysInWaitingList,
    RequiredCarParkingSpaces,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::BookingCount,
        Feature::CancellationRate,
        Feature::DaysInWaitingList,
        Feature::RequiredCarParkingSpaces,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Feature::BookingCount => "booking_count",
            Feature::CancellationRate => "cancellation_rate",
            Feature::DaysInWaitingList => "days_in_waiting_list",
            Feature::RequiredCarParkingSpaces => "required_car_parking_spaces",
        }
    }

    pub fn aggregation(self) -> Aggregation {
        match self {
            Feature::BookingCount => Aggregation::Count,
            Feature::CancellationRate => Aggregation::Mean(Field::IsCanceled),
            Feature::DaysInWaitingList => Aggregation::Mean(Field::DaysInWaitingList),
            Feature::RequiredCarParkingSpaces => {
                Aggregation::Mean(Field::RequiredCarParkingSpaces)
            }
        }
    }

    pub fn presentation(self) -> Presentation {
        match self {
            Feature::BookingCount => Presentation {
                label: "Booking Count",
                title: "Booking Count by Country",
                color_scale: "Plasma",
            },
            Feature::CancellationRate => Presentation {
                label: "Cancellation Rate",
                title: "Cancellation Rate by Country",
                color_scale: "Blues",
            },
            Feature::DaysInWaitingList => Presentation {
                label: "Days in Waiting List",
                title: "Average Days in Waiting List by Country",
                color_scale: "Greens",
            },
            Feature::RequiredCarParkingSpaces => Presentation {
                label: "Required Car Parking Spaces",
                title: "Average Required Car Parking Spaces by Country",
                color_scale: "Purples",
            },
        }
    }
}

impl FromStr for Feature {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.name() == s.trim())
            .ok_or_else(|| BookingError::Data(format!("Unknown feature: {}", s)))
    }
}

/// Per-customer-type metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CancellationRate,
    AverageDaysInWaitingList,
    AverageRequiredCarParkingSpaces,
    AverageTotalOfSpecialRequests,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::CancellationRate,
        Metric::AverageDaysInWaitingList,
        Metric::AverageRequiredCarParkingSpaces,
        Metric::AverageTotalOfSpecialRequests,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::CancellationRate => "cancellation_rate",
            Metric::AverageDaysInWaitingList => "average_days_in_waiting_list",
            Metric::AverageRequiredCarParkingSpaces => "average_required_car_parking_spaces",
            Metric::AverageTotalOfSpecialRequests => "average_total_of_special_requests",
        }
    }

    pub fn field(self) -> Field {
        match self {
            Metric::CancellationRate => Field::IsCanceled,
            Metric::AverageDaysInWaitingList => Field::DaysInWaitingList,
            Metric::AverageRequiredCarParkingSpaces => Field::RequiredCarParkingSpaces,
            Metric::AverageTotalOfSpecialRequests => Field::TotalOfSpecialRequests,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::CancellationRate => "Cancellation Rate",
            Metric::AverageDaysInWaitingList => "Days in Waiting List",
            Metric::AverageRequiredCarParkingSpaces => "Required Car Parking Spaces",
            Metric::AverageTotalOfSpecialRequests => "Total of Special Requests",
        }
    }
}

impl FromStr for Metric {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.name() == s.trim())
            .ok_or_else(|| BookingError::Data(format!("Unknown metric: {}", s)))
    }
}

/// Country selection coming from the view layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CountryFilter {
    /// No restriction: every known country.
    All,
    /// Exactly these codes. May be empty, meaning nothing was selected.
    Only(BTreeSet<String>),
}

impl CountryFilter {
    /// Sentinel value meaning "every known country".
    pub const ALL_SENTINEL: &'static str = "ALL";

    /// Builds a filter from raw selector values. Any `ALL` entry wins over
    /// explicit codes; blank entries are dropped.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut codes = BTreeSet::new();
        for value in values {
            let value = value.as_ref().trim();
            if value == Self::ALL_SENTINEL {
                return CountryFilter::All;
            }
            if !value.is_empty() {
                codes.insert(value.to_string());
            }
        }
        CountryFilter::Only(codes)
    }

    /// True when the caller selected nothing at all.
    pub fn is_empty(&self) -> bool {
        matches!(self, CountryFilter::Only(codes) if codes.is_empty())
    }

    /// Effective country set against the known universe.
    pub fn resolve(&self, universe: &BTreeSet<String>) -> BTreeSet<String> {
        match self {
            CountryFilter::All => universe.clone(),
            CountryFilter::Only(codes) => codes.clone(),
        }
    }
}

/// Bookings arriving on one date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub bookings: u64,
}

/// Saturday and the Sunday after it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeekendSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Daily arrivals for one year together with its weekend bands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingTrend {
    pub year: i32,
    pub daily: Vec<DailyCount>,
    pub weekends: Vec<WeekendSpan>,
}

/// Result of a geographic query. A `None` value marks a country whose
/// rows carried no valid value for the feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GeoDistribution {
    NoSelection,
    Values(BTreeMap<String, Option<f64>>),
}

/// One (customer type, metric) cell of the long-form customer summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerMetric {
    pub customer_type: String,
    pub metric: Metric,
    pub value: Option<f64>,
}

/// Long-form row shared by all exported summaries
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub key: String,
    pub series: String,
    pub value: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn universe() -> BTreeSet<String> {
        ["ESP", "FRA", "PRT"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_sentinel_expands_to_universe() {
        let filter = CountryFilter::from_values(["PRT", "ALL"]);
        assert_eq!(filter, CountryFilter::All);
        assert_eq!(filter.resolve(&universe()), universe());
    }

    #[test]
    fn explicit_codes_are_kept_as_given() {
        let filter = CountryFilter::from_values(["PRT", " GBR ", ""]);
        let resolved = filter.resolve(&universe());
        let expected: BTreeSet<String> = ["GBR", "PRT"].iter().map(|s| s.to_string()).collect();
        assert_eq!(resolved, expected);
        assert!(!filter.is_empty());
    }

    #[test]
    fn empty_selection_is_detected() {
        let filter = CountryFilter::from_values(Vec::<String>::new());
        assert!(filter.is_empty());
        assert!(filter.resolve(&universe()).is_empty());
        assert!(!CountryFilter::All.is_empty());
    }

    #[test]
    fn feature_names_round_trip_through_from_str() {
        for feature in Feature::ALL {
            assert_eq!(feature.name().parse::<Feature>().ok(), Some(feature));
        }
        assert!("load_time".parse::<Feature>().is_err());
    }

    #[test]
    fn metric_names_parse() {
        assert_eq!(
            "average_total_of_special_requests".parse::<Metric>().ok(),
            Some(Metric::AverageTotalOfSpecialRequests)
        );
        assert!("average_lead_time".parse::<Metric>().is_err());
    }

    #[test]
    fn labels_are_distinct_per_selector() {
        let features: BTreeSet<&str> =
            Feature::ALL.iter().map(|f| f.presentation().label).collect();
        assert_eq!(features.len(), Feature::ALL.len());
        assert_eq!(Feature::BookingCount.presentation().label, "Booking Count");

        let metrics: BTreeSet<&str> = Metric::ALL.iter().map(|m| m.label()).collect();
        assert_eq!(metrics.len(), Metric::ALL.len());
        assert_eq!(
            Metric::AverageDaysInWaitingList.label(),
            "Days in Waiting List"
        );
    }

    #[test]
    fn only_booking_count_is_a_count() {
        assert_eq!(Feature::BookingCount.aggregation(), Aggregation::Count);
        for feature in &Feature::ALL[1..] {
            assert!(feature.aggregation().field().is_some());
        }
    }

    #[test]
    fn booking_set_derives_universes_and_bounds() {
        let d1 = NaiveDate::from_ymd_opt(2016, 3, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2015, 7, 1).unwrap();
        let set = BookingSet::new(vec![
            BookingRecord {
                arrival_year: Some(2016),
                arrival_date: Some(d1),
                country: Some("PRT".into()),
                customer_type: Some("Transient".into()),
                ..Default::default()
            },
            BookingRecord {
                arrival_year: Some(2015),
                arrival_date: Some(d2),
                ..Default::default()
            },
            BookingRecord {
                arrival_year: Some(2015),
                arrival_date: Some(d2),
                country: Some("FRA".into()),
                ..Default::default()
            },
        ]);

        assert_eq!(set.len(), 3);
        assert_eq!(set.years(), vec![2015, 2016]);
        assert_eq!(set.date_bounds(), Some((d2, d1)));
        assert_eq!(set.daily_counts().get(&d2), Some(&2));
        assert_eq!(set.countries().len(), 2);
        assert_eq!(set.customer_types().len(), 1);
    }

    #[test]
    fn empty_set_has_no_bounds() {
        let set = BookingSet::default();
        assert!(set.is_empty());
        assert_eq!(set.date_bounds(), None);
        assert!(set.years().is_empty());
    }
}
