//! Lazily typed wire values.
//!
//! The server never says what type an argument has. A [`MultiTyped`] keeps
//! the raw literal and lets the callback decide, at the point of use, how to
//! read it. Every coercion is independent and may fail on its own.

use std::fmt;
use std::num::ParseIntError;
use std::sync::Arc;

use thiserror::Error;

use crate::client::{ReachRpc, RpcError};
use crate::options::RpcOptions;
use crate::tokenizer::split_top_level;

/// Remote helper that renders a number as a currency string.
pub const FORMAT_CURRENCY_PATH: &str = "/stdlib/formatCurrency";

/// A literal did not have the lexical form a coercion expected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Invalid integer literal `{literal}`: {source}")]
    Int {
        literal: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Invalid boolean literal `{0}`")]
    Bool(String),

    /// Too short to carry an outer bracket pair.
    #[error("Not a bracketed literal: `{0}`")]
    NotBracketed(String),
}

/// One untyped value received from the server.
///
/// The raw text is fixed at construction. Coercions read it on demand; all
/// of them are pure except [`as_formatted_currency`](Self::as_formatted_currency),
/// which calls back into the server each time it is used.
#[derive(Clone)]
pub struct MultiTyped {
    raw: String,
    client: ReachRpc,
}

impl MultiTyped {
    /// Wrap `raw`, binding it to the endpoint used by remote-backed coercions.
    pub fn new(raw: impl Into<String>, client: ReachRpc) -> Self {
        Self {
            raw: raw.into(),
            client,
        }
    }

    /// Endpoint configuration this value was received under.
    pub fn options(&self) -> &Arc<RpcOptions> {
        self.client.options()
    }

    /// The literal exactly as it appeared on the wire.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Read the literal as a base-10 signed integer.
    pub fn as_int(&self) -> Result<i32, ParseError> {
        self.raw.parse().map_err(|source| ParseError::Int {
            literal: self.raw.clone(),
            source,
        })
    }

    /// Read the literal as `true` or `false` (ASCII case-insensitive).
    pub fn as_bool(&self) -> Result<bool, ParseError> {
        if self.raw.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if self.raw.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ParseError::Bool(self.raw.clone()))
        }
    }

    /// Split the literal into its top-level elements.
    ///
    /// An empty array or object gives an empty vector. Nested values stay
    /// unparsed until they are coerced themselves.
    pub fn as_array(&self) -> Result<Vec<MultiTyped>, ParseError> {
        Ok(split_top_level(&self.raw)?
            .into_iter()
            .map(|element| MultiTyped::new(element, self.client.clone()))
            .collect())
    }

    /// Ask the server to format the literal as currency.
    ///
    /// Issues a fresh request on every call; the result is not cached.
    pub async fn as_formatted_currency(&self, precision: u32) -> Result<String, RpcError> {
        let precision = precision.to_string();
        self.client
            .call_string(FORMAT_CURRENCY_PATH, &[self.raw.as_str(), precision.as_str()])
            .await
    }
}

impl fmt::Display for MultiTyped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for MultiTyped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MultiTyped").field(&self.raw).finish()
    }
}

impl PartialEq for MultiTyped {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::ScriptedTransport;
    use pretty_assertions::assert_eq;

    fn value(raw: &str) -> MultiTyped {
        let client = ReachRpc::with_transport(
            RpcOptions::new("localhost", 3000, "key"),
            Arc::new(ScriptedTransport::new(Vec::<String>::new())),
        );
        MultiTyped::new(raw, client)
    }

    #[test]
    fn test_as_str_is_verbatim() {
        assert_eq!(value(r#""hi there""#).as_str(), r#""hi there""#);
        assert_eq!(value("  spaced ").as_str(), "  spaced ");
    }

    #[test]
    fn test_as_int() {
        assert_eq!(value("42").as_int().unwrap(), 42);
        assert_eq!(value("-7").as_int().unwrap(), -7);
        assert!(matches!(value("abc").as_int(), Err(ParseError::Int { .. })));
        assert!(value("4.5").as_int().is_err());
        assert!(value("").as_int().is_err());
    }

    #[test]
    fn test_as_int_is_repeatable() {
        let v = value("19");
        assert_eq!(v.as_int().unwrap(), v.as_int().unwrap());
    }

    #[test]
    fn test_as_bool() {
        assert!(value("true").as_bool().unwrap());
        assert!(!value("false").as_bool().unwrap());
        assert!(value("True").as_bool().unwrap());
        assert_eq!(
            value("yes").as_bool(),
            Err(ParseError::Bool("yes".to_string()))
        );
        assert!(value("1").as_bool().is_err());
    }

    #[test]
    fn test_as_array_coerces_elements() {
        let items = value("[10, 20, 30]").as_array().unwrap();
        let ints: Vec<i32> = items.iter().map(|v| v.as_int().unwrap()).collect();
        assert_eq!(ints, vec![10, 20, 30]);
    }

    #[test]
    fn test_as_array_nested() {
        let items = value("[[1, 2], [], true]").as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_array().unwrap().len(), 2);
        assert!(items[1].as_array().unwrap().is_empty());
        assert!(items[2].as_bool().unwrap());
    }

    #[test]
    fn test_as_array_empty() {
        assert!(value("[]").as_array().unwrap().is_empty());
        assert!(value("[ ]").as_array().unwrap().is_empty());
    }

    #[test]
    fn test_as_array_on_scalar_fails() {
        assert!(matches!(
            value("7").as_array(),
            Err(ParseError::NotBracketed(_))
        ));
    }

    #[test]
    fn test_parse_error_display() {
        assert_eq!(
            ParseError::Bool("maybe".to_string()).to_string(),
            "Invalid boolean literal `maybe`"
        );
        let err = value("x1").as_int().unwrap_err();
        assert!(err.to_string().starts_with("Invalid integer literal `x1`"));
    }

    #[tokio::test]
    async fn test_as_formatted_currency_calls_server_each_time() {
        let transport = Arc::new(ScriptedTransport::new([r#""$1,234.50""#, r#""$1,234.5""#]));
        let client = ReachRpc::with_transport(
            RpcOptions::new("localhost", 3000, "key"),
            transport.clone(),
        );
        let v = MultiTyped::new("1234.5", client);

        assert_eq!(v.as_formatted_currency(2).await.unwrap(), "$1,234.50");
        assert_eq!(v.as_formatted_currency(1).await.unwrap(), "$1,234.5");

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].0, FORMAT_CURRENCY_PATH);
        assert_eq!(requests[0].1.as_deref(), Some("[1234.5, 2]"));
        assert_eq!(requests[1].1.as_deref(), Some("[1234.5, 1]"));
    }

    #[tokio::test]
    async fn test_as_formatted_currency_rejects_non_string_reply() {
        let transport = Arc::new(ScriptedTransport::new(["{\"error\": 1}"]));
        let client = ReachRpc::with_transport(RpcOptions::new("localhost", 3000, "key"), transport);

        let result = MultiTyped::new("5", client).as_formatted_currency(2).await;
        assert!(matches!(result, Err(RpcError::Decode { .. })));
    }
}
