//! MessagePack-RPC envelopes.
//!
//! ```text
//! request       [0, msgid, method, params]
//! response      [1, msgid, error, result]
//! notification  [2, method, params]
//! ```

use pluginserver_core::{AppError, AppResult, DynamicValue};

/// Envelope type tag of a request.
pub const REQUEST: u64 = 0;
/// Envelope type tag of a response.
pub const RESPONSE: u64 = 1;
/// Envelope type tag of a notification.
pub const NOTIFICATION: u64 = 2;

/// An incoming message from the gateway.
#[derive(Debug, Clone, PartialEq)]
pub enum RpcMessage {
    /// A call expecting a response with the same `msgid`.
    Request {
        /// Caller-chosen request id.
        msgid: u32,
        /// `"<service>.<method>"`.
        method: String,
        /// Positional parameters.
        params: Vec<DynamicValue>,
    },
    /// A one-way message.
    Notification {
        /// `"<service>.<method>"`.
        method: String,
        /// Positional parameters.
        params: Vec<DynamicValue>,
    },
}

impl RpcMessage {
    /// Parses a decoded frame into an envelope.
    pub fn from_value(value: rmpv::Value) -> AppResult<Self> {
        let rmpv::Value::Array(mut fields) = value else {
            return Err(AppError::encoding("RPC message must be an array"));
        };

        let kind = fields
            .first()
            .and_then(rmpv::Value::as_u64)
            .ok_or_else(|| AppError::encoding("RPC message type must be an unsigned integer"))?;

        match (kind, fields.len()) {
            (REQUEST, 4) => {
                let params = params(fields.pop())?;
                let method = method(fields.pop())?;
                let msgid = fields
                    .pop()
                    .as_ref()
                    .and_then(rmpv::Value::as_u64)
                    .and_then(|id| u32::try_from(id).ok())
                    .ok_or_else(|| AppError::encoding("request msgid must be a u32"))?;
                Ok(Self::Request {
                    msgid,
                    method,
                    params,
                })
            }
            (NOTIFICATION, 3) => {
                let params = params(fields.pop())?;
                let method = method(fields.pop())?;
                Ok(Self::Notification { method, params })
            }
            (kind, len) => Err(AppError::encoding(format!(
                "unsupported RPC message: type {kind} with {len} fields"
            ))),
        }
    }
}

fn method(value: Option<rmpv::Value>) -> AppResult<String> {
    match value.map(DynamicValue::from_msgpack).transpose()? {
        Some(DynamicValue::String(method)) => Ok(method),
        _ => Err(AppError::encoding("RPC method must be a string")),
    }
}

fn params(value: Option<rmpv::Value>) -> AppResult<Vec<DynamicValue>> {
    match value.map(DynamicValue::from_msgpack).transpose()? {
        Some(DynamicValue::Array(params)) => Ok(params),
        Some(DynamicValue::Null) | None => Ok(Vec::new()),
        Some(single) => Ok(vec![single]),
    }
}

/// Builds a response frame. Exactly one of `error` and `result` is meaningful.
pub fn response(msgid: u32, outcome: AppResult<DynamicValue>) -> rmpv::Value {
    let (error, result) = match outcome {
        Ok(result) => (rmpv::Value::Nil, result.into_msgpack()),
        Err(e) => (rmpv::Value::from(e.to_string()), rmpv::Value::Nil),
    };
    rmpv::Value::Array(vec![
        rmpv::Value::from(RESPONSE),
        rmpv::Value::from(msgid),
        error,
        result,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pluginserver_core::ErrorKind;

    fn request(method: &str, params: rmpv::Value) -> rmpv::Value {
        rmpv::Value::Array(vec![
            rmpv::Value::from(0),
            rmpv::Value::from(3),
            rmpv::Value::from(method),
            params,
        ])
    }

    #[test]
    fn test_parses_request() {
        let msg = RpcMessage::from_value(request(
            "plugin.GetPluginInfo",
            rmpv::Value::Array(vec![rmpv::Value::Binary(b"auth".to_vec())]),
        ))
        .expect("parse");

        assert_eq!(
            msg,
            RpcMessage::Request {
                msgid: 3,
                method: "plugin.GetPluginInfo".to_string(),
                params: vec![DynamicValue::from("auth")],
            }
        );
    }

    #[test]
    fn test_bare_param_is_wrapped() {
        let msg = RpcMessage::from_value(request("plugin.GetPluginInfo", rmpv::Value::from("auth")))
            .expect("parse");
        let RpcMessage::Request { params, .. } = msg else {
            panic!("expected request");
        };
        assert_eq!(params, vec![DynamicValue::from("auth")]);
    }

    #[test]
    fn test_parses_notification() {
        let msg = RpcMessage::from_value(rmpv::Value::Array(vec![
            rmpv::Value::from(2),
            rmpv::Value::from("plugin.Ping"),
            rmpv::Value::Array(vec![]),
        ]))
        .expect("parse");
        assert!(matches!(msg, RpcMessage::Notification { .. }));
    }

    #[test]
    fn test_rejects_malformed_envelopes() {
        let cases = vec![
            rmpv::Value::from("not an array"),
            rmpv::Value::Array(vec![rmpv::Value::from(0), rmpv::Value::from(1)]),
            rmpv::Value::Array(vec![
                rmpv::Value::from(1),
                rmpv::Value::from(1),
                rmpv::Value::Nil,
                rmpv::Value::Nil,
            ]),
            request("plugin.GetPluginInfo", rmpv::Value::Array(vec![]))
                .as_array()
                .map(|fields| {
                    let mut fields = fields.clone();
                    fields[1] = rmpv::Value::from(-1);
                    rmpv::Value::Array(fields)
                })
                .expect("array"),
            request("", rmpv::Value::Nil)
                .as_array()
                .map(|fields| {
                    let mut fields = fields.clone();
                    fields[2] = rmpv::Value::from(9);
                    rmpv::Value::Array(fields)
                })
                .expect("array"),
        ];

        for case in cases {
            let err = RpcMessage::from_value(case.clone()).expect_err("malformed");
            assert_eq!(err.kind, ErrorKind::Encoding, "case {case}");
        }
    }

    #[test]
    fn test_response_shapes() {
        let ok = response(5, Ok(DynamicValue::from("x")));
        assert_eq!(
            ok,
            rmpv::Value::Array(vec![
                rmpv::Value::from(1),
                rmpv::Value::from(5),
                rmpv::Value::Nil,
                rmpv::Value::from("x"),
            ])
        );

        let err = response(6, Err(AppError::plugin_not_found("no plugin named 'x'")));
        let fields = err.as_array().expect("array");
        assert_eq!(fields[2].as_str(), Some("PLUGIN_NOT_FOUND: no plugin named 'x'"));
        assert!(fields[3].is_nil());
    }
}
