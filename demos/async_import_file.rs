//! Upload a local file into a file-upload field.
//!
//! Run:
//! `REDCAP_API_URL=<url> REDCAP_API_TOKEN=<token> cargo run --example async_import_file -- <record> <field> <event> <path>`

use redcap_client::{RedcapClient, Response};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (Ok(url), Ok(token)) = (
        std::env::var("REDCAP_API_URL"),
        std::env::var("REDCAP_API_TOKEN"),
    ) else {
        eprintln!("Set REDCAP_API_URL and REDCAP_API_TOKEN before running this example.");
        std::process::exit(2);
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [record, field, event, path] = args.as_slice() else {
        eprintln!("usage: async_import_file <record> <field> <event> <path>");
        std::process::exit(2);
    };

    let client = RedcapClient::new(url, token)?;
    match client.import_file(record, field, event, path, None, &[]).await? {
        Response::Success => println!("uploaded {path}"),
        other => println!("REDCap answered: {other}"),
    }
    Ok(())
}
