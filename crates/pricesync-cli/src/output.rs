use pricesync_core::Envelope;
use serde_json::Value;

use crate::error::CliError;

pub fn render(envelope: &Envelope<Value>, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(envelope)?
    } else {
        serde_json::to_string(envelope)?
    };
    println!("{payload}");
    Ok(())
}
