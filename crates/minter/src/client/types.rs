//! Wire types for the cluster JSON-RPC API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a, P> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: P,
}

impl<'a, P> RpcRequest<'a, P> {
    pub fn new(id: u64, method: &'a str, params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// JSON-RPC 2.0 response envelope. Exactly one of `result` and `error` is
/// expected, but `result` may legitimately be `null`.
#[derive(Debug, Deserialize)]
pub struct RpcResponse<R> {
    pub result: Option<R>,
    pub error: Option<RpcErrorObject>,
}

/// JSON-RPC error object.
#[derive(Debug, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl RpcErrorObject {
    /// Signature carried in the error payload, if the node included one.
    pub fn signature(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        ["signature", "txSignature"]
            .iter()
            .find_map(|key| data.get(key).and_then(Value::as_str))
            .map(str::to_string)
    }
}

/// Commitment level passed with every request.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentConfig {
    pub commitment: &'static str,
}

/// Options for `getTransaction`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionConfig {
    pub commitment: &'static str,
    pub encoding: &'static str,
    pub max_supported_transaction_version: u8,
}

/// Result wrapper used by context-carrying methods such as `getBalance`.
#[derive(Debug, Deserialize)]
pub struct WithContext<T> {
    pub context: RpcContext,
    pub value: T,
}

#[derive(Debug, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

/// The parts of a `getTransaction` result diagnostics need.
#[derive(Debug, Deserialize)]
pub struct EncodedTransaction {
    pub slot: u64,
    #[serde(default)]
    pub meta: Option<TransactionMeta>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionMeta {
    #[serde(default)]
    pub err: Option<Value>,
    #[serde(default)]
    pub log_messages: Option<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let params = ("addr", CommitmentConfig { commitment: "confirmed" });
        let request = RpcRequest::new(7, "getBalance", params);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "getBalance",
                "params": ["addr", {"commitment": "confirmed"}]
            })
        );
    }

    #[test]
    fn test_error_signature_from_data() {
        let response: RpcResponse<u64> = serde_json::from_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {
                "code": -32002,
                "message": "Transaction simulation failed",
                "data": {"signature": "abc", "logs": []}
            }
        }))
        .unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32002);
        assert_eq!(error.signature().as_deref(), Some("abc"));
        assert!(response.result.is_none());
    }

    #[test]
    fn test_null_transaction_result() {
        let response: RpcResponse<EncodedTransaction> =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert!(response.result.is_none());
        assert!(response.error.is_none());
    }
}
