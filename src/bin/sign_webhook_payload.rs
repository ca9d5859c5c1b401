//! Sign a webhook payload the way the receiver verifies it.
//!
//! Usage:
//!   PHOENIX_WEBHOOK_SECRET=... sign_webhook_payload '{"event_type":"case.updated"}'
//!   echo '{...}' | sign_webhook_payload

use std::io::Read;

use chain_data_gateway::app::{canonical_json, sign_payload};
use serde_json::Value;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let secret = std::env::var("PHOENIX_WEBHOOK_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("PHOENIX_WEBHOOK_SECRET is not set"))?;

    let raw = match std::env::args().nth(1) {
        Some(arg) => arg,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let payload: Value = serde_json::from_str(&raw)?;
    if !payload.is_object() {
        anyhow::bail!("payload must be a JSON object");
    }

    let signature = sign_payload(secret.as_bytes(), &payload);
    let port = std::env::var("PORT").unwrap_or_else(|_| "8001".to_string());

    println!("Canonical body: {}", canonical_json(&payload));
    println!("X-Signature:    {}", signature);
    println!("\n--------------------------------------------------\n");
    println!("curl -X POST http://localhost:{}/webhook/phoenix \\", port);
    println!("  -H 'Content-Type: application/json' \\");
    println!("  -H 'X-Signature: {}' \\", signature);
    println!("  -d '{}'", serde_json::to_string(&payload)?);

    Ok(())
}
