//! Submit a signed comprobante and poll for its authorization.
//!
//! Usage: `cargo run --example submit_and_poll --features client -- <signed-xml-path> <access-key>`

use std::time::Duration;

use sri_facturacion::client::SriClient;
use sri_facturacion::core::Environment;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let [_, xml_path, access_key] = args.as_slice() else {
        eprintln!("usage: submit_and_poll <signed-xml-path> <access-key>");
        std::process::exit(1);
    };

    let signed_xml = std::fs::read_to_string(xml_path).expect("failed to read signed XML");
    let client = SriClient::new(std::env::temp_dir()).expect("failed to build SriClient");
    let cancel = CancellationToken::new();

    let result = client
        .process_one_shot(
            &signed_xml,
            access_key,
            Environment::Test,
            Duration::from_secs(5),
            &cancel,
        )
        .await;

    match result {
        Ok(outcome) => {
            println!("final state: {:?}", outcome.state);
            println!("success: {}", outcome.success);
            for message in &outcome.messages {
                println!("  - {message}");
            }
        }
        Err(e) => eprintln!("pipeline failed: {e} (category: {})", e.category()),
    }
}
