// crates/ethd-cli/src/output.rs
//
// Output formatting for ethereum-cli, in the bitcoin-cli style.

use serde_json::Value;

use ethd_rpc::{registry, RpcErrorBody};

/// Text printed for a successful result. `None` for a null result, which
/// prints nothing.
pub fn format_result(result: &Value) -> Option<String> {
    match result {
        Value::Null => None,
        Value::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Object(_) | Value::Array(_) => Some(
            serde_json::to_string_pretty(result)
                .unwrap_or_else(|e| format!("JSON serialization error: {}", e)),
        ),
        Value::Number(n) => Some(n.to_string()),
    }
}

/// Text printed for an error reply. Code -1 shows the command's usage text
/// in place of the server's message.
pub fn format_error(error: &RpcErrorBody, method: &str) -> String {
    let message = match (error.code, registry::lookup(method)) {
        (-1, Some(spec)) => spec.doc.to_string(),
        _ => error.message.clone(),
    };
    format!("error code: {}\nerror message:\n{}", error.code, message)
}

pub const CONNECT_HINT: &str =
    "(make sure server is running and you are connecting to the correct RPC port)";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars() {
        assert_eq!(format_result(&json!(true)).as_deref(), Some("true"));
        assert_eq!(format_result(&json!(false)).as_deref(), Some("false"));
        assert_eq!(format_result(&json!("0xabc")).as_deref(), Some("0xabc"));
        assert_eq!(format_result(&json!(1.5)).as_deref(), Some("1.5"));
        assert_eq!(format_result(&Value::Null), None);
    }

    #[test]
    fn test_objects_are_pretty() {
        let text = format_result(&json!({"isvalid": true})).unwrap();
        assert_eq!(text, "{\n  \"isvalid\": true\n}");
    }

    #[test]
    fn test_error_shows_message() {
        let error = RpcErrorBody {
            code: -5,
            message: "Block not found".into(),
        };
        assert_eq!(
            format_error(&error, "getblock"),
            "error code: -5\nerror message:\nBlock not found"
        );
    }

    #[test]
    fn test_generic_error_shows_usage() {
        let error = RpcErrorBody {
            code: -1,
            message: "getblock() takes at least 1 arguments (0 given)".into(),
        };
        let text = format_error(&error, "getblock");
        assert!(text.starts_with("error code: -1\nerror message:\n"));
        assert!(text.contains(registry::lookup("getblock").unwrap().doc));

        // Unknown commands fall back to the server's message.
        let text = format_error(&error, "nosuchcommand");
        assert!(text.ends_with("(0 given)"));
    }
}
