use crate::structs::{
    BookingRecord, BookingSet, BookingTrend, CountryFilter, CustomerMetric, DailyCount, Feature,
    Field, GeoDistribution, Metric, WeekendSpan,
};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use log::debug;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Running totals for one group.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tally {
    /// Rows in the group, whether or not the field was present.
    pub rows: u64,
    /// Rows where the field was present.
    pub valid: u64,
    pub sum: f64,
}

impl Tally {
    fn add(&mut self, value: Option<f64>) {
        self.rows += 1;
        if let Some(v) = value {
            self.valid += 1;
            self.sum += v;
        }
    }

    fn absorb(&mut self, other: Tally) {
        self.rows += other.rows;
        self.valid += other.valid;
        self.sum += other.sum;
    }

    /// Mean over present values; `None` when nothing was present.
    pub fn mean(&self) -> Option<f64> {
        if self.valid == 0 {
            None
        } else {
            Some(self.sum / self.valid as f64)
        }
    }
}

/// Groups records by `key`, tallying `value` per group, on the rayon pool.
///
/// Records for which `key` returns `None` are left out entirely. The
/// returned map is ordered by key so results are deterministic regardless
/// of how the work was split.
pub fn tally_by<'a, K, V>(
    records: &'a [BookingRecord],
    key: K,
    value: V,
) -> BTreeMap<&'a str, Tally>
where
    K: Fn(&'a BookingRecord) -> Option<&'a str> + Sync,
    V: Fn(&BookingRecord) -> Option<f64> + Sync,
{
    records
        .par_iter()
        .fold(HashMap::new, |mut acc: HashMap<&'a str, Tally>, record| {
            if let Some(k) = key(record) {
                acc.entry(k).or_default().add(value(record));
            }
            acc
        })
        .reduce(HashMap::new, |mut left, right| {
            for (k, tally) in right {
                left.entry(k).or_default().absorb(tally);
            }
            left
        })
        .into_iter()
        .collect()
}

/// Every Saturday of `year` paired with the following Sunday.
///
/// Depends only on the calendar. A Saturday falling on 31 December pairs
/// with 1 January of the next year. Years outside chrono's `NaiveDate`
/// range (beyond +/-262143) have no representable dates and yield an
/// empty list.
pub fn weekend_spans(year: i32) -> Vec<WeekendSpan> {
    let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    let offset = (Weekday::Sat.num_days_from_monday() + 7
        - first.weekday().num_days_from_monday())
        % 7;
    let mut saturday = first.checked_add_days(Days::new(u64::from(offset)));

    let mut spans = Vec::with_capacity(53);
    while let Some(start) = saturday.filter(|d| d.year() == year) {
        let Some(end) = start.succ_opt() else {
            break;
        };
        spans.push(WeekendSpan { start, end });
        saturday = start.checked_add_days(Days::new(7));
    }
    spans
}

impl BookingSet {
    /// Daily arrivals within `year`, ascending, plus the year's weekend spans.
    pub fn trend_for_year(&self, year: i32) -> BookingTrend {
        let daily: Vec<DailyCount> = match (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year, 12, 31),
        ) {
            (Some(first), Some(last)) => self
                .daily_counts()
                .range(first..=last)
                .map(|(date, bookings)| DailyCount {
                    date: *date,
                    bookings: *bookings,
                })
                .collect(),
            _ => Vec::new(),
        };
        debug!("Trend for {}: {} days with arrivals", year, daily.len());

        BookingTrend {
            year,
            daily,
            weekends: weekend_spans(year),
        }
    }

    /// Per-country value of `feature` over the selected countries.
    ///
    /// An empty selection yields [`GeoDistribution::NoSelection`]. Countries
    /// without any row are omitted; a country whose rows all lack the
    /// feature's field maps to `None`.
    pub fn geo_distribution(&self, countries: &CountryFilter, feature: Feature) -> GeoDistribution {
        if countries.is_empty() {
            return GeoDistribution::NoSelection;
        }
        let selected = countries.resolve(self.countries());
        let field = feature.aggregation().field();

        let tallies = tally_by(
            self.records(),
            |r| r.country.as_deref().filter(|c| selected.contains(*c)),
            |r| field.and_then(|f| f.value(r)),
        );
        debug!(
            "Geo distribution of {} over {} countries",
            feature.name(),
            tallies.len()
        );

        let values = tallies
            .into_iter()
            .map(|(country, tally)| {
                let value = match field {
                    None => Some(tally.rows as f64),
                    Some(_) => tally.mean(),
                };
                (country.to_string(), value)
            })
            .collect();
        GeoDistribution::Values(values)
    }

    /// Percentage of canceled bookings per country, arrivals within
    /// `start_date..=end_date`.
    ///
    /// The denominator counts every matching row; rows with an unknown
    /// cancellation flag add nothing to the numerator. An inverted range or
    /// an empty selection yields an empty map.
    pub fn cancellation_rate_by_country(
        &self,
        countries: &CountryFilter,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> BTreeMap<String, f64> {
        if start_date > end_date || countries.is_empty() {
            return BTreeMap::new();
        }
        let selected = countries.resolve(self.countries());
        let range = start_date..=end_date;

        let tallies = tally_by(
            self.records(),
            |r| match (r.country.as_deref(), r.arrival_date) {
                (Some(c), Some(d)) if range.contains(&d) && selected.contains(c) => Some(c),
                _ => None,
            },
            |r| Field::IsCanceled.value(r),
        );

        tallies
            .into_iter()
            .filter(|(_, tally)| tally.rows > 0)
            .map(|(country, tally)| {
                (country.to_string(), 100.0 * tally.sum / tally.rows as f64)
            })
            .collect()
    }

    /// Long-form (customer type, metric, value) rows for the requested
    /// metrics, ordered by customer type and then by request order.
    /// Duplicate metrics are collapsed.
    pub fn metrics_by_customer_type(&self, metrics: &[Metric]) -> Vec<CustomerMetric> {
        let mut requested: Vec<Metric> = Vec::with_capacity(metrics.len());
        for metric in metrics {
            if !requested.contains(metric) {
                requested.push(*metric);
            }
        }
        if requested.is_empty() {
            return Vec::new();
        }

        let per_metric: Vec<(Metric, BTreeMap<&str, Tally>)> = requested
            .iter()
            .map(|metric| {
                let field = metric.field();
                let tallies = tally_by(
                    self.records(),
                    |r| r.customer_type.as_deref(),
                    |r| field.value(r),
                );
                (*metric, tallies)
            })
            .collect();

        let mut rows = Vec::with_capacity(self.customer_types().len() * requested.len());
        for customer_type in self.customer_types() {
            for (metric, tallies) in &per_metric {
                if let Some(tally) = tallies.get(customer_type.as_str()) {
                    rows.push(CustomerMetric {
                        customer_type: customer_type.clone(),
                        metric: *metric,
                        value: tally.mean(),
                    });
                }
            }
        }
        debug!(
            "Customer metrics: {} rows for {} metrics",
            rows.len(),
            requested.len()
        );
        rows
    }
}
