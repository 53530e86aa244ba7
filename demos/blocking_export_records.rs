//! Export records with labels instead of raw values.
//!
//! Run:
//! `REDCAP_API_URL=<url> REDCAP_API_TOKEN=<token> cargo run --example blocking_export_records`

use redcap_client::BlockingRedcapClient;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (Ok(url), Ok(token)) = (
        std::env::var("REDCAP_API_URL"),
        std::env::var("REDCAP_API_TOKEN"),
    ) else {
        eprintln!("Set REDCAP_API_URL and REDCAP_API_TOKEN before running this example.");
        std::process::exit(2);
    };

    let client = BlockingRedcapClient::new(url, token)?;
    let records = client.export_records(&[("rawOrLabel", "label")])?;
    println!("{}", serde_json::to_string_pretty(&records.into_value())?);
    Ok(())
}
