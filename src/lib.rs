pub mod error;
pub mod extract;
pub mod load;
pub mod structs;
pub mod transform;

// Re-export public API
pub use error::{BookingError, Result};
pub use extract::{load_bookings, read_bookings};
pub use load::{
    cancellation_rows, customer_rows, geo_rows, trend_rows, write_csv, write_json, write_parquet,
    write_weekends_csv,
};
pub use structs::{
    BookingRecord, BookingSet, BookingTrend, CountryFilter, CustomerMetric, DailyCount, Feature,
    GeoDistribution, LoadConfig, LoadReport, Metric, Presentation, SimpleLogger, SummaryRow,
    WeekendSpan,
};
pub use transform::weekend_spans;
