//! Reshape tool results into the card payloads the web front-end renders.

use serde::Serialize;
use serde_json::{json, Value};

use crate::tools::ToolName;
use crate::types::ToolResult;

/// What a front-end card needs: its card name, the input to show, the output to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardPayload {
    pub name: String,
    pub input: Value,
    pub output: Value,
}

const RANDOM_RANGE: u64 = 100;

/// Map a tool call onto its card. Unknown names pass through unchanged.
pub fn present(name: &str, input: &Value, result: &ToolResult) -> CardPayload {
    match name.parse::<ToolName>() {
        Ok(ToolName::PriceLookup) => price_card(input, result),
        Ok(ToolName::RandomDraw) => {
            let score = result.get("score").and_then(Value::as_u64).unwrap_or(0);
            random_card(score)
        }
        Ok(ToolName::RandomRawValue) => {
            let raw = result
                .get("random_number")
                .and_then(Value::as_str)
                .unwrap_or("0");
            random_card(leading_digits(raw, 8))
        }
        Ok(ToolName::ListAssets)
        | Ok(ToolName::SubmitVerification)
        | Ok(ToolName::FetchProof)
        | Err(_) => CardPayload {
            name: name.to_string(),
            input: input.clone(),
            output: result.to_value(),
        },
    }
}

fn price_card(input: &Value, result: &ToolResult) -> CardPayload {
    let symbol_in = input.get("symbol").and_then(Value::as_str).unwrap_or("");
    CardPayload {
        name: "get_price".to_string(),
        input: json!({ "symbol": symbol_in, "currency": "USD" }),
        output: json!({
            "symbol": result.get("symbol").cloned().unwrap_or_else(|| json!("")),
            "price": result.get("price").cloned().unwrap_or_else(|| json!(0)),
            "timestamp": result.get("timestamp").cloned().unwrap_or_else(|| json!(0)),
            "source": "FTSO v2",
        }),
    }
}

fn random_card(number: u64) -> CardPayload {
    CardPayload {
        name: "get_random".to_string(),
        input: json!({ "range": RANDOM_RANGE }),
        output: json!({
            "randomNumber": number,
            "range": RANDOM_RANGE,
            "isSecure": true,
            "source": "Flare Secure Random",
            "blockNumber": 0,
        }),
    }
}

/// The first `n` characters parsed as an integer; 0 if they aren't digits.
fn leading_digits(text: &str, n: usize) -> u64 {
    let prefix: String = text.chars().take(n).collect();
    prefix.parse().unwrap_or(0)
}
