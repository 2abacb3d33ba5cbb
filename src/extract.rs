use crate::error::{BookingError, Result};
use crate::structs::{
    BookingRecord, BookingSet, LoadConfig, LoadReport, RawBooking, REQUIRED_COLUMNS,
};
use chrono::{Month, NaiveDate};
use csv::{ByteRecord, ReaderBuilder};
use log::debug;
use std::{fs::File, io::Read, path::Path};

/// Loads a hotel bookings file into an immutable [`BookingSet`].
///
/// Every field is coerced here: malformed numbers, unknown month names and
/// impossible dates become missing values instead of failing the load. The
/// only fatal conditions are I/O errors and a header that lacks one of the
/// required columns.
///
/// # Arguments
///
/// * `file_path` - Path to the delimited bookings file
/// * `config` - Reader settings (delimiter)
///
/// # Errors
///
/// Returns `BookingError` if the file cannot be read or a required column is missing.
pub fn load_bookings(
    file_path: &Path,
    config: &LoadConfig,
) -> Result<(BookingSet, LoadReport)> {
    debug!("Reading bookings file: {}", file_path.display());
    let file = File::open(file_path)?;
    read_bookings(file, config)
}

/// Same as [`load_bookings`] over any reader.
pub fn read_bookings<R: Read>(
    reader: R,
    config: &LoadConfig,
) -> Result<(BookingSet, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(config.delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.byte_headers()?.clone();
    let mut columns = [0usize; REQUIRED_COLUMNS.len()];
    let mut missing: Vec<&str> = Vec::new();
    for (slot, col) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
        match headers.iter().position(|h| h == col.as_bytes()) {
            Some(idx) => *slot = idx,
            None => missing.push(col),
        }
    }
    if !missing.is_empty() {
        return Err(BookingError::Data(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut report = LoadReport::default();
    let mut records = Vec::new();

    // Byte records so that bad encoding in one field never drops the row.
    for result in rdr.byte_records() {
        report.total_rows += 1;
        let raw = match result {
            Ok(record) => raw_booking(&record, &columns),
            Err(e) => {
                debug!("Skipping row {}: {}", report.total_rows, e);
                report.skipped_rows += 1;
                continue;
            }
        };

        let record = coerce_booking(raw);
        if record.country.is_none() {
            report.missing_country += 1;
        }
        if record.arrival_date.is_none() {
            report.invalid_dates += 1;
        }
        if record.is_canceled.is_none() {
            report.unknown_cancellation += 1;
        }
        records.push(record);
    }

    debug!(
        "Loaded {} rows ({} skipped, {} without country, {} without arrival date, \
         {} unknown cancellation)",
        report.total_rows,
        report.skipped_rows,
        report.missing_country,
        report.invalid_dates,
        report.unknown_cancellation
    );

    Ok((BookingSet::new(records), report))
}

/// Picks the required columns out of a byte record. A field that is not
/// valid UTF-8 is treated as absent.
fn raw_booking(record: &ByteRecord, columns: &[usize; REQUIRED_COLUMNS.len()]) -> RawBooking {
    let field = |i: usize| {
        record
            .get(columns[i])
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .map(str::to_string)
    };
    RawBooking {
        arrival_date_year: field(0),
        arrival_date_month: field(1),
        arrival_date_day_of_month: field(2),
        country: field(3),
        is_canceled: field(4),
        days_in_waiting_list: field(5),
        required_car_parking_spaces: field(6),
        total_of_special_requests: field(7),
        customer_type: field(8),
    }
}

/// Turns a raw text row into a typed record.
pub fn coerce_booking(raw: RawBooking) -> BookingRecord {
    let arrival_year = parse_whole(raw.arrival_date_year.as_deref());
    let day = parse_whole(raw.arrival_date_day_of_month.as_deref())
        .and_then(|d| u32::try_from(d).ok());
    let arrival_date = compose_arrival_date(arrival_year, raw.arrival_date_month.as_deref(), day);

    BookingRecord {
        arrival_year,
        arrival_date,
        country: parse_label(raw.country),
        is_canceled: parse_flag(raw.is_canceled.as_deref()),
        days_in_waiting_list: parse_count(raw.days_in_waiting_list.as_deref()),
        required_car_parking_spaces: parse_count(raw.required_car_parking_spaces.as_deref()),
        total_of_special_requests: parse_count(raw.total_of_special_requests.as_deref()),
        customer_type: parse_label(raw.customer_type),
    }
}

/// Trims a category label; blank and `NA`/`NULL` become absent.
pub fn parse_label(s: Option<String>) -> Option<String> {
    let s = s?;
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(s.to_string())
}

/// Cancellation flag: exactly 0 or 1, anything else is unknown.
pub fn parse_flag(s: Option<&str>) -> Option<bool> {
    let v = parse_number(s)?;
    if v == 0.0 {
        Some(false)
    } else if v == 1.0 {
        Some(true)
    } else {
        None
    }
}

/// Non-negative count such as waiting days or parking spaces.
pub fn parse_count(s: Option<&str>) -> Option<f64> {
    parse_number(s).filter(|v| *v >= 0.0)
}

/// Integer field that may have been exported as `2015` or `2015.0`.
pub fn parse_whole(s: Option<&str>) -> Option<i32> {
    let s = s?.trim();
    if let Ok(v) = s.parse::<i32>() {
        return Some(v);
    }
    let v = parse_number(Some(s))?;
    if v.fract() != 0.0 || v < i32::MIN as f64 || v > i32::MAX as f64 {
        return None;
    }
    Some(v as i32)
}

fn parse_number(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Month name ("July", "jul") or number ("7") to 1..=12.
pub fn parse_month(s: &str) -> Option<u32> {
    let s = s.trim();
    if let Ok(month) = s.parse::<Month>() {
        return Some(month.number_from_month());
    }
    s.parse::<u32>().ok().filter(|m| (1..=12).contains(m))
}

/// Builds the arrival date; `None` unless all three parts form a real date.
pub fn compose_arrival_date(
    year: Option<i32>,
    month: Option<&str>,
    day: Option<u32>,
) -> Option<NaiveDate> {
    let month = parse_month(month?)?;
    NaiveDate::from_ymd_opt(year?, month, day?)
}
