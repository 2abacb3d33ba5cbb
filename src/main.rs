use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use lib::{
    BookingError, BookingSet, CountryFilter, Feature, GeoDistribution, LoadConfig, Metric,
    SimpleLogger, SummaryRow, WeekendSpan, cancellation_rows, customer_rows, geo_rows,
    load_bookings, trend_rows, write_csv, write_json, write_parquet, write_weekends_csv,
};
use log::{debug, info};
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

static LOGGER: SimpleLogger = SimpleLogger;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// input bookings CSV file
    #[arg(short, long)]
    input_file: PathBuf,

    /// Field delimiter of the input file
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    /// Output base name (will create dir containing .csv, .json, and .parquet files)
    #[arg(short, long, default_value = "output")]
    output: String,

    /// Log level for output
    #[arg(long, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    query: Query,
}

#[derive(Subcommand, Debug)]
enum Query {
    /// Daily arrivals for one year, with weekend spans
    Trend {
        /// Arrival year (defaults to the earliest year in the data)
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// One feature per country
    Geo {
        /// Country codes (e.g., PRT,FRA) or ALL
        #[arg(short, long, value_delimiter = ',', default_value = "ALL")]
        countries: Vec<String>,

        #[arg(short, long, value_enum, default_value = "booking-count")]
        feature: Feature,
    },
    /// Cancellation percentage per country within an arrival date range
    Cancellations {
        /// Country codes (e.g., PRT,FRA) or ALL
        #[arg(short, long, value_delimiter = ',', default_value = "ALL")]
        countries: Vec<String>,

        /// First arrival date, inclusive (defaults to the earliest in the data)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Last arrival date, inclusive (defaults to the latest in the data)
        #[arg(long)]
        end_date: Option<NaiveDate>,
    },
    /// Metrics grouped by customer type
    Customers {
        #[arg(
            short,
            long,
            value_enum,
            value_delimiter = ',',
            default_value = "cancellation-rate"
        )]
        metrics: Vec<Metric>,
    },
}

fn run_query(
    bookings: &BookingSet,
    query: &Query,
) -> Result<(Vec<SummaryRow>, Option<Vec<WeekendSpan>>), BookingError> {
    match query {
        Query::Trend { year } => {
            let year = match year.or_else(|| bookings.years().first().copied()) {
                Some(year) => year,
                None => {
                    return Err(BookingError::Data(
                        "No arrival year in data and none given".to_string(),
                    ));
                }
            };
            let trend = bookings.trend_for_year(year);
            println!(
                "Hotel Bookings Trend Over Time ({}): {} days, {} weekends",
                year,
                trend.daily.len(),
                trend.weekends.len()
            );
            Ok((trend_rows(&trend), Some(trend.weekends)))
        }
        Query::Geo {
            countries,
            feature,
        } => {
            let filter = CountryFilter::from_values(countries);
            let distribution = bookings.geo_distribution(&filter, *feature);
            let presentation = feature.presentation();
            match &distribution {
                GeoDistribution::NoSelection => {
                    info!("Select countries for the distribution");
                }
                GeoDistribution::Values(values) => {
                    println!("{}: {} countries", presentation.title, values.len());
                    debug!(
                        "Legend: {} | Color scale: {}",
                        presentation.label, presentation.color_scale
                    );
                }
            }
            Ok((geo_rows(&distribution, *feature), None))
        }
        Query::Cancellations {
            countries,
            start_date,
            end_date,
        } => {
            let filter = CountryFilter::from_values(countries);
            let rates = match bookings.date_bounds() {
                Some((first, last)) => bookings.cancellation_rate_by_country(
                    &filter,
                    start_date.unwrap_or(first),
                    end_date.unwrap_or(last),
                ),
                None => {
                    info!("No arrival dates in data");
                    Default::default()
                }
            };
            println!("Cancellation Rates by Selected Countries: {}", rates.len());
            Ok((cancellation_rows(&rates), None))
        }
        Query::Customers { metrics } => {
            let rows = bookings.metrics_by_customer_type(metrics);
            if rows.is_empty() {
                info!("Select at least one metric");
            }
            let labels: Vec<&str> = metrics.iter().map(|m| m.label()).collect();
            println!(
                "Metrics by Customer Type ({}): {} rows",
                labels.join(", "),
                rows.len()
            );
            Ok((customer_rows(&rows), None))
        }
    }
}

fn main() -> Result<(), BookingError> {
    // Initialize timer and logger
    let total_start = Instant::now();
    log::set_logger(&LOGGER).map_err(|e| BookingError::Data(e.to_string()))?;

    // Acquire CLI args
    let args = Args::parse();
    if args.debug {
        log::set_max_level(log::LevelFilter::Debug);
    } else {
        log::set_max_level(log::LevelFilter::Info);
    }
    if !args.delimiter.is_ascii() {
        return Err(BookingError::Data(format!(
            "Delimiter must be a single ASCII character, got {:?}",
            args.delimiter
        )));
    }
    let config = LoadConfig {
        delimiter: args.delimiter as u8,
    };

    println!("Hotel Booking Aggregation");
    debug!(
        "Input file: {} | Delimiter: {:?} | Query: {:?}",
        args.input_file.display(),
        args.delimiter,
        args.query
    );

    // Load once, then answer the query
    println!("Loading bookings...");
    let load_start = Instant::now();
    let (bookings, report) = load_bookings(&args.input_file, &config)?;
    let load_time = load_start.elapsed();
    println!(
        "Loaded {} bookings in {:.2?} | {} countries, {} customer types",
        bookings.len(),
        load_time,
        bookings.countries().len(),
        bookings.customer_types().len()
    );
    if report.skipped_rows > 0 {
        info!("{} rows skipped as unreadable", report.skipped_rows);
    }

    let query_start = Instant::now();
    let (rows, weekends) = run_query(&bookings, &args.query)?;
    let query_time = query_start.elapsed();
    debug!("Query produced {} rows in {:.2?}", rows.len(), query_time);

    // Create output directory
    let output_dir = PathBuf::from(format!("./output/{}", args.output));
    fs::create_dir_all(&output_dir)?;
    println!(
        "Created output directory: {} | Writing output files...",
        output_dir.display()
    );
    let io_start = Instant::now();

    // Extract just the directory name for the file names (remove path separators)
    let output_name = args
        .output
        .split(['/', '\\'])
        .next_back()
        .unwrap_or(&args.output);
    let csv_path = output_dir.join(format!("{}.csv", output_name));
    let json_path = output_dir.join(format!("{}.json", output_name));
    let parquet_path = output_dir.join(format!("{}.parquet", output_name));

    write_csv(&rows, &csv_path)?;
    write_json(&rows, &json_path)?;
    write_parquet(&rows, &parquet_path)?;
    debug!("  - {}", csv_path.display());
    debug!("  - {}", json_path.display());
    debug!("  - {}", parquet_path.display());

    if let Some(spans) = weekends {
        let weekends_path = output_dir.join(format!("{}_weekends.csv", output_name));
        write_weekends_csv(&spans, &weekends_path)?;
        debug!("  - {}", weekends_path.display());
    }
    println!("All files took {:.2?}", io_start.elapsed());
    println!("\nWrote {} rows to directory: {}", rows.len(), output_dir.display());

    let total_time = total_start.elapsed();
    debug!(
        "Performance breakdown: Load={:.1}%, Query={:.1}%",
        (load_time.as_secs_f64() / total_time.as_secs_f64()) * 100.0,
        (query_time.as_secs_f64() / total_time.as_secs_f64()) * 100.0
    );
    println!("\nTotal runtime: {:.2?}", total_time);
    Ok(())
}
