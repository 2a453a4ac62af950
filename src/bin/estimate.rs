//! Command-line serving shell for price estimation.
//!
//! Stands in for the interactive form: collects attributes, calls the
//! estimator, prints the result. Attributes the user does not supply are
//! simply absent; the aligner fills them with the missing sentinel.
//!
//! Usage:
//!   estimate --pipeline PATH --schema PATH [key=value ...]
//!
//! Options:
//!   --pipeline PATH   Pipeline artifact file
//!   --schema PATH     Feature-name JSON artifact file
//!   --json            Read the record as a JSON object from stdin instead
//!                     of key=value arguments
//!
//! Examples:
//!   estimate --pipeline car_price_pipeline.vppl --schema feature_names.json \
//!       vehicle_manufacturer=TOYOTA vehicle_year=2018 current_mileage=50000
//!
//!   echo '{"vehicle_year": 2018, "wheels": "Left wheel"}' | \
//!       estimate --pipeline car_price_pipeline.vppl --schema feature_names.json --json

use std::io::Read;
use std::process::ExitCode;

use autoprice::{AttrValue, Estimator, RawRecord};

struct Args {
    pipeline: String,
    schema: String,
    json: bool,
    attributes: Vec<(String, AttrValue)>,
}

fn usage() -> ! {
    eprintln!(
        "usage: estimate --pipeline PATH --schema PATH [--json] [key=value ...]"
    );
    std::process::exit(2);
}

/// Parse a raw value the way a form would type it: integer, then float,
/// then text.
fn parse_value(raw: &str) -> AttrValue {
    if let Ok(i) = raw.parse::<i64>() {
        return AttrValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return AttrValue::Float(f);
    }
    AttrValue::Text(raw.to_string())
}

fn parse_args() -> Args {
    let mut pipeline = None;
    let mut schema = None;
    let mut json = false;
    let mut attributes = Vec::new();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--pipeline" => pipeline = args.next(),
            "--schema" => schema = args.next(),
            "--json" => json = true,
            "--help" | "-h" => usage(),
            other => {
                let Some((key, value)) = other.split_once('=') else {
                    eprintln!("error: expected key=value, got {other:?}");
                    usage();
                };
                attributes.push((key.to_string(), parse_value(value)));
            }
        }
    }

    let (Some(pipeline), Some(schema)) = (pipeline, schema) else {
        usage();
    };
    Args {
        pipeline,
        schema,
        json,
        attributes,
    }
}

/// Format a price as dollars with thousands separators, e.g. `$12,345.67`.
fn format_usd(price: f64) -> String {
    let negative = price < 0.0;
    let cents = (price.abs() * 100.0).round() as u64;
    let (whole, frac) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}${grouped}.{frac:02}")
}

fn read_json_record() -> Result<RawRecord, serde_json::Error> {
    let mut input = String::new();
    if let Err(e) = std::io::stdin().read_to_string(&mut input) {
        eprintln!("error reading stdin: {e}");
        std::process::exit(2);
    }
    serde_json::from_str(&input)
}

fn main() -> ExitCode {
    let args = parse_args();

    // Both artifacts load up front; a failure here aborts before any
    // estimate is attempted.
    let estimator = match Estimator::load(&args.pipeline, &args.schema) {
        Ok(e) => e,
        Err(err) => {
            eprintln!("error: cannot load artifacts: {err}");
            return ExitCode::from(2);
        }
    };

    let record = if args.json {
        match read_json_record() {
            Ok(record) => record,
            Err(err) => {
                eprintln!("error: invalid JSON record: {err}");
                return ExitCode::from(2);
            }
        }
    } else {
        let mut record = RawRecord::new();
        for (key, value) in args.attributes {
            record.insert(key, value);
        }
        record
    };

    match estimator.estimate_price(&record) {
        Ok(price) => {
            println!("Estimated price: {}", format_usd(price));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_parsing_prefers_integers() {
        assert_eq!(parse_value("2018"), AttrValue::Int(2018));
        assert_eq!(parse_value("1.5"), AttrValue::Float(1.5));
        assert_eq!(parse_value("TOYOTA"), AttrValue::Text("TOYOTA".into()));
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(999.5), "$999.50");
        assert_eq!(format_usd(12_345.678), "$12,345.68");
        assert_eq!(format_usd(1_234_567.0), "$1,234,567.00");
        assert_eq!(format_usd(-500.0), "-$500.00");
    }
}
