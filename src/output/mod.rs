//! Output module for the crawl's handoff file and report
//!
//! This module handles:
//! - Writing the sorted `cep` CSV consumed by the queue publisher
//! - Reading a CSV back and validating its rows
//! - Printing the end-of-run crawl report

mod csv_sink;
mod report;

pub use csv_sink::{read_postal_codes, write_postal_codes, CsvCheck, SinkError, SinkResult};
pub use report::{print_report, CrawlReport};

/// Prints the result of a CSV check to stdout
pub fn print_csv_check(check: &CsvCheck) {
    println!("=== CSV Check ===\n");
    println!("  Rows: {}", check.rows());
    println!("  Valid: {}", check.valid.len());
    println!("  Invalid: {}", check.invalid.len());
    println!("  Duplicates: {}", check.duplicates);

    if !check.invalid.is_empty() {
        println!("\nInvalid values (first 5):");
        for raw in check.invalid.iter().take(5) {
            println!("  - {:?}", raw);
        }
    }
}
