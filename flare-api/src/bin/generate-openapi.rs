//! OpenAPI Specification Generator Binary
//!
//! Writes the flare-jobs OpenAPI document as JSON to stdout.
//!
//! Usage:
//!   cargo run -p flare-api --bin generate-openapi > openapi.json

use flare_api::ApiDoc;

fn main() {
    match ApiDoc::to_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI spec: {}", e);
            std::process::exit(1);
        }
    }
}
