use crate::error::Result;
use crate::structs::{
    BookingTrend, CustomerMetric, Feature, GeoDistribution, SummaryRow, WeekendSpan,
};
use arrow_array::{Float64Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use csv::Writer;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use std::collections::BTreeMap;
use std::{fs::File, path::Path, sync::Arc};

/// Long-form rows for a booking trend, one per arrival date.
pub fn trend_rows(trend: &BookingTrend) -> Vec<SummaryRow> {
    trend
        .daily
        .iter()
        .map(|day| SummaryRow {
            key: day.date.to_string(),
            series: "number_of_bookings".to_string(),
            value: Some(day.bookings as f64),
        })
        .collect()
}

/// Long-form rows for a geographic distribution. No selection gives no rows.
pub fn geo_rows(distribution: &GeoDistribution, feature: Feature) -> Vec<SummaryRow> {
    match distribution {
        GeoDistribution::NoSelection => Vec::new(),
        GeoDistribution::Values(values) => values
            .iter()
            .map(|(country, value)| SummaryRow {
                key: country.clone(),
                series: feature.name().to_string(),
                value: *value,
            })
            .collect(),
    }
}

/// Long-form rows for per-country cancellation percentages.
pub fn cancellation_rows(rates: &BTreeMap<String, f64>) -> Vec<SummaryRow> {
    rates
        .iter()
        .map(|(country, rate)| SummaryRow {
            key: country.clone(),
            series: "cancellation_rate".to_string(),
            value: Some(*rate),
        })
        .collect()
}

/// Customer metrics are already long-form; this only renames the columns.
pub fn customer_rows(metrics: &[CustomerMetric]) -> Vec<SummaryRow> {
    metrics
        .iter()
        .map(|m| SummaryRow {
            key: m.customer_type.clone(),
            series: m.metric.name().to_string(),
            value: m.value,
        })
        .collect()
}

/// Writes summary rows to a CSV file with values formatted to two decimals.
///
/// Undefined values are written as empty fields.
///
/// # Errors
/// Returns error if file cannot be created or written to.
pub fn write_csv(rows: &[SummaryRow], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(["Key", "Series", "Value"])?;
    for row in rows {
        writer.write_record(&[
            row.key.clone(),
            row.series.clone(),
            row.value.map(|v| format!("{:.2}", v)).unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes weekend spans as `Start,End` date pairs.
pub fn write_weekends_csv(spans: &[WeekendSpan], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    let mut writer = Writer::from_writer(file);

    writer.write_record(["Start", "End"])?;
    for span in spans {
        writer.write_record(&[span.start.to_string(), span.end.to_string()])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes summary rows to a pretty-formatted JSON file. Undefined values
/// become `null`.
///
/// # Errors
/// Returns error if file cannot be created or serialization fails.
pub fn write_json(rows: &[SummaryRow], output_path: &Path) -> Result<()> {
    let file = File::create(output_path)?;
    serde_json::to_writer_pretty(file, rows)?;
    Ok(())
}

/// Writes summary rows to a Parquet file using Arrow format.
///
/// The value column is nullable so undefined aggregates survive the trip.
///
/// # Errors
/// Returns error if file cannot be created, schema is invalid, or Arrow operations fail.
pub fn write_parquet(rows: &[SummaryRow], output_path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("key", DataType::Utf8, false),
        Field::new("series", DataType::Utf8, false),
        Field::new("value", DataType::Float64, true),
    ]));

    let keys = StringArray::from_iter_values(rows.iter().map(|r| r.key.as_str()));
    let series = StringArray::from_iter_values(rows.iter().map(|r| r.series.as_str()));
    let values: Float64Array = rows.iter().map(|r| r.value).collect();

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![Arc::new(keys), Arc::new(series), Arc::new(values)],
    )?;

    let file = File::create(output_path)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}
