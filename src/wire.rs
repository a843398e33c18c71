//! Wire-format helpers.
//!
//! Outbound bodies are assembled from already-stringified literals, so most
//! of this module is string plumbing. Replies are decoded with `serde_json`
//! for the fixed fields `m`, `t` and `kid`; the `args` fragment is sliced out
//! textually because its shape depends on the callback being dispatched.

use serde::{Deserialize, Serialize};

use crate::kont::{KontError, RpcCallback};
use crate::tokenizer::{balanced_prefix_len, split_top_level};

/// Marker preceding the argument list in a dispatch reply.
const ARGS_MARKER: &str = "\"args\":";

/// A named argument sent with a contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcValue {
    pub name: String,
    /// Wire literal, inserted into the body as-is.
    pub literal: String,
}

impl RpcValue {
    /// Use `literal` verbatim (`42`, `true`, `"text"`, `[1, 2]`).
    pub fn new(name: impl Into<String>, literal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            literal: literal.into(),
        }
    }

    /// Send `text` as a quoted string literal.
    pub fn string(name: impl Into<String>, text: &str) -> Self {
        Self::new(name, quote(text))
    }

    /// Serialize any value to JSON and send that.
    pub fn json<T: Serialize + ?Sized>(
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(name, serde_json::to_string(value)?))
    }
}

/// JSON string literal for `text`, with escaping.
pub fn quote(text: &str) -> String {
    // Serializing a &str cannot fail.
    serde_json::Value::String(text.to_string()).to_string()
}

/// `[a, b, c]` from already-stringified literals.
pub fn stringify_args<S: AsRef<str>>(args: &[S]) -> String {
    let joined = args
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}

/// `{ "a": 1, "b": 2 }`, keys in input order.
pub fn render_values(values: &[RpcValue]) -> String {
    render_object(values.iter().map(|v| (v.name.as_str(), v.literal.as_str())))
}

/// `{ "f": true, "g": true }`, advertising callbacks by name only.
pub fn render_callback_flags(callbacks: &[RpcCallback]) -> String {
    render_object(callbacks.iter().map(|c| (c.name(), "true")))
}

fn render_object<'a>(entries: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    let fields: Vec<String> = entries
        .map(|(name, literal)| format!("{}: {}", quote(name), literal))
        .collect();
    if fields.is_empty() {
        "{}".to_string()
    } else {
        format!("{{ {} }}", fields.join(", "))
    }
}

/// `contract, {values}, {callback-flags}`: the single argument that opens a
/// contract.
pub fn contract_body(contract: &str, values: &[RpcValue], callbacks: &[RpcCallback]) -> String {
    format!(
        "{}, {}, {}",
        contract,
        render_values(values),
        render_callback_flags(callbacks)
    )
}

/// Arguments of a `/kont` post: the quoted contract id and the callback
/// result, `null` when there is none.
pub fn kont_args(contract_id: &str, result: Option<&str>) -> [String; 2] {
    [
        quote(contract_id),
        result.unwrap_or("null").to_string(),
    ]
}

/// Fields the engine reads from every continuation reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KontReply {
    /// Next function to invoke.
    #[serde(default)]
    pub m: Option<String>,
    /// Status token; `Kont` keeps the contract going.
    #[serde(default)]
    pub t: Option<String>,
    /// Contract id.
    #[serde(default)]
    pub kid: Option<String>,
}

impl KontReply {
    pub fn decode(text: &str) -> Result<Self, KontError> {
        serde_json::from_str(text).map_err(|e| KontError::MalformedReply(e.to_string()))
    }
}

/// Slice the `"args":[...]` fragment out of a reply and split it.
///
/// The fragment runs from the marker to its matching closing bracket.
pub fn extract_args(reply: &str) -> Result<Vec<&str>, KontError> {
    let start = reply
        .find(ARGS_MARKER)
        .ok_or_else(|| KontError::MalformedReply("reply has no \"args\" field".to_string()))?;
    let rest = reply[start + ARGS_MARKER.len()..].trim_start();

    let len = balanced_prefix_len(rest).ok_or_else(|| {
        KontError::MalformedReply("\"args\" is not a balanced bracketed list".to_string())
    })?;

    split_top_level(&rest[..len]).map_err(|e| KontError::MalformedReply(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("abc"), "\"abc\"");
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("line\nbreak"), "\"line\\nbreak\"");
    }

    #[test]
    fn test_stringify_args() {
        assert_eq!(stringify_args(&["1", "\"two\"", "[3]"]), "[1, \"two\", [3]]");
        assert_eq!(stringify_args::<&str>(&[]), "[]");
    }

    #[test]
    fn test_render_values_keeps_order() {
        let values = vec![
            RpcValue::new("zeta", "1"),
            RpcValue::string("alpha", "x"),
            RpcValue::new("mid", "[1, 2]"),
        ];
        assert_eq!(
            render_values(&values),
            r#"{ "zeta": 1, "alpha": "x", "mid": [1, 2] }"#
        );
        assert_eq!(render_values(&[]), "{}");
    }

    #[test]
    fn test_rpc_value_json() {
        let v = RpcValue::json("pair", &(1, "b")).unwrap();
        assert_eq!(v.literal, r#"[1,"b"]"#);
    }

    #[test]
    fn test_render_callback_flags() {
        let callbacks = vec![
            RpcCallback::sync("getHand", |_| Ok(None)),
            RpcCallback::sync("seeOutcome", |_| Ok(None)),
        ];
        assert_eq!(
            render_callback_flags(&callbacks),
            r#"{ "getHand": true, "seeOutcome": true }"#
        );
    }

    #[test]
    fn test_contract_body() {
        let values = vec![RpcValue::new("wager", "5")];
        let callbacks = vec![RpcCallback::sync("getHand", |_| Ok(None))];
        assert_eq!(
            contract_body(r#"{"type":"BigNumber","hex":"0x01"}"#, &values, &callbacks),
            r#"{"type":"BigNumber","hex":"0x01"}, { "wager": 5 }, { "getHand": true }"#
        );
        assert_eq!(contract_body("\"ctc\"", &[], &[]), "\"ctc\", {}, {}");
    }

    #[test]
    fn test_kont_args() {
        assert_eq!(stringify_args(&kont_args("k-1", Some("3"))), r#"["k-1", 3]"#);
        assert_eq!(stringify_args(&kont_args("k-1", None)), r#"["k-1", null]"#);
    }

    #[test]
    fn test_reply_decode() {
        let reply = KontReply::decode(r#"{"t":"Kont","kid":"abc","m":"getHand","args":[1,2]}"#)
            .unwrap();
        assert_eq!(reply.t.as_deref(), Some("Kont"));
        assert_eq!(reply.kid.as_deref(), Some("abc"));
        assert_eq!(reply.m.as_deref(), Some("getHand"));

        let done = KontReply::decode(r#"{"t":"Done"}"#).unwrap();
        assert_eq!(done.m, None);
        assert!(matches!(
            KontReply::decode("not json"),
            Err(KontError::MalformedReply(_))
        ));
    }

    #[test]
    fn test_extract_args() {
        let reply = r#"{"t":"Kont","kid":"k","m":"f","args":[1, {"a": [2,3]}, "x"]}"#;
        assert_eq!(
            extract_args(reply).unwrap(),
            vec!["1", r#"{"a": [2,3]}"#, "\"x\""]
        );
    }

    #[test]
    fn test_extract_args_not_last_field() {
        let reply = r#"{"args": [true, 2], "t":"Kont","kid":"k","m":"f"}"#;
        assert_eq!(extract_args(reply).unwrap(), vec!["true", "2"]);
    }

    #[test]
    fn test_extract_args_empty_list() {
        let reply = r#"{"t":"Kont","kid":"k","m":"f","args":[]}"#;
        assert!(extract_args(reply).unwrap().is_empty());
    }

    #[test]
    fn test_extract_args_missing() {
        assert!(matches!(
            extract_args(r#"{"t":"Kont","m":"f"}"#),
            Err(KontError::MalformedReply(_))
        ));
        assert!(matches!(
            extract_args(r#"{"args": [1, 2"#),
            Err(KontError::MalformedReply(_))
        ));
    }
}
