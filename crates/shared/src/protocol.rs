//! Socket.IO v4 wire codec (text packets over the Engine.IO v4 websocket
//! transport).
//!
//! Every websocket text frame is one Engine.IO packet: a single type digit
//! followed by its data. Socket.IO packets ride inside Engine.IO `message`
//! packets and have the shape
//! `<type>[<namespace>,][<ack id>][<json>]`.
//!
//! Binary packets are not used by the HostelMate server and are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Path and query used to open the websocket transport.
pub const ENGINE_IO_PATH: &str = "/socket.io/";
pub const ENGINE_IO_QUERY: &str = "EIO=4&transport=websocket";

/// Namespace used when none is given.
pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("empty packet")]
    Empty,
    #[error("unknown packet type '{0}'")]
    UnknownType(char),
    #[error("binary packets are not supported")]
    Binary,
    #[error("malformed packet: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Malformed(e.to_string())
    }
}

/// Data of the Engine.IO `open` packet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl OpenHandshake {
    /// How long the client may go without hearing from the server before the
    /// transport is considered dead.
    pub fn silence_budget(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(OpenHandshake),
    Close,
    Ping(Option<String>),
    Pong(Option<String>),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        let data = chars.as_str();
        let optional = || (!data.is_empty()).then(|| data.to_string());

        Ok(match kind {
            '0' => EnginePacket::Open(serde_json::from_str(data)?),
            '1' => EnginePacket::Close,
            '2' => EnginePacket::Ping(optional()),
            '3' => EnginePacket::Pong(optional()),
            '4' => EnginePacket::Message(data.to_string()),
            '5' => EnginePacket::Upgrade,
            '6' => EnginePacket::Noop,
            'b' => return Err(ProtocolError::Binary),
            other => return Err(ProtocolError::UnknownType(other)),
        })
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(handshake) => format!(
                "0{}",
                serde_json::to_string(handshake).unwrap_or_else(|_| "{}".to_string())
            ),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data.as_deref().unwrap_or("")),
            EnginePacket::Pong(data) => format!("3{}", data.as_deref().unwrap_or("")),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// One Socket.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Option<Value>,
    },
}

impl SocketPacket {
    /// CONNECT to the default namespace carrying an auth payload.
    pub fn connect(auth: Option<Value>) -> Self {
        SocketPacket::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: auth,
        }
    }

    pub fn disconnect() -> Self {
        SocketPacket::Disconnect {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// EVENT on the default namespace with a single argument.
    pub fn event(name: impl Into<String>, payload: Value) -> Self {
        SocketPacket::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack_id: None,
            name: name.into(),
            args: vec![payload],
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut chars = text.chars();
        let kind = chars.next().ok_or(ProtocolError::Empty)?;
        if matches!(kind, '5' | '6') {
            return Err(ProtocolError::Binary);
        }
        let mut rest = chars.as_str();

        let namespace = if rest.starts_with('/') {
            let end = rest.find(',').unwrap_or(rest.len());
            let namespace = rest[..end].to_string();
            rest = rest.get(end + 1..).unwrap_or("");
            namespace
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            Some(
                rest[..digits]
                    .parse::<u64>()
                    .map_err(|e| ProtocolError::Malformed(format!("bad ack id: {e}")))?,
            )
        } else {
            None
        };
        rest = &rest[digits..];

        let data = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str::<Value>(rest)?)
        };

        match kind {
            '0' => Ok(SocketPacket::Connect { namespace, data }),
            '1' => Ok(SocketPacket::Disconnect { namespace }),
            '2' => {
                let (name, args) = split_event(data)?;
                Ok(SocketPacket::Event {
                    namespace,
                    ack_id,
                    name,
                    args,
                })
            }
            '3' => {
                let ack_id = ack_id
                    .ok_or_else(|| ProtocolError::Malformed("ack without id".to_string()))?;
                let args = match data {
                    Some(Value::Array(args)) => args,
                    Some(other) => vec![other],
                    None => Vec::new(),
                };
                Ok(SocketPacket::Ack {
                    namespace,
                    ack_id,
                    args,
                })
            }
            '4' => Ok(SocketPacket::ConnectError { namespace, data }),
            other => Err(ProtocolError::UnknownType(other)),
        }
    }

    pub fn encode(&self) -> String {
        let (kind, namespace, ack_id, data) = match self {
            SocketPacket::Connect { namespace, data } => ('0', namespace, None, data.clone()),
            SocketPacket::Disconnect { namespace } => ('1', namespace, None, None),
            SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            } => {
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                ('2', namespace, *ack_id, Some(Value::Array(array)))
            }
            SocketPacket::Ack {
                namespace,
                ack_id,
                args,
            } => ('3', namespace, Some(*ack_id), Some(Value::Array(args.clone()))),
            SocketPacket::ConnectError { namespace, data } => ('4', namespace, None, data.clone()),
        };

        let mut out = String::new();
        out.push(kind);
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = data {
            out.push_str(&data.to_string());
        }
        out
    }

    /// Wrap in an Engine.IO message frame.
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

fn split_event(data: Option<Value>) -> Result<(String, Vec<Value>), ProtocolError> {
    let Some(Value::Array(mut items)) = data else {
        return Err(ProtocolError::Malformed(
            "event payload is not an array".to_string(),
        ));
    };
    if items.is_empty() {
        return Err(ProtocolError::Malformed("event without a name".to_string()));
    }
    let Value::String(name) = items.remove(0) else {
        return Err(ProtocolError::Malformed(
            "event name is not a string".to_string(),
        ));
    };
    Ok((name, items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_open_handshake() {
        let packet = EnginePacket::decode(
            r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        let EnginePacket::Open(open) = packet else {
            panic!("expected open packet");
        };
        assert_eq!(open.sid, "abc");
        assert_eq!(open.silence_budget(), std::time::Duration::from_millis(45_000));
    }

    #[test]
    fn ping_carries_its_payload() {
        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(None));
        assert_eq!(
            EnginePacket::decode("2probe").unwrap(),
            EnginePacket::Ping(Some("probe".to_string()))
        );
        assert_eq!(EnginePacket::Pong(None).encode(), "3");
        assert_eq!(EnginePacket::decode(""), Err(ProtocolError::Empty));
    }

    #[test]
    fn connect_carries_auth_token() {
        let frame = SocketPacket::connect(Some(json!({"token": "A1"}))).to_frame();
        assert_eq!(frame, r#"40{"token":"A1"}"#);
    }

    #[test]
    fn decodes_event_with_payload() {
        let packet = SocketPacket::decode(r#"2["notification",{"_id":"n1","message":"Pipe fixed"}]"#)
            .unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/".to_string(),
                ack_id: None,
                name: "notification".to_string(),
                args: vec![json!({"_id": "n1", "message": "Pipe fixed"})],
            }
        );
    }

    #[test]
    fn decodes_namespace_and_ack_id() {
        let packet = SocketPacket::decode(r#"2/admin,12["ping"]"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/admin".to_string(),
                ack_id: Some(12),
                name: "ping".to_string(),
                args: vec![],
            }
        );
        assert_eq!(packet.encode(), r#"2/admin,12["ping"]"#);
    }

    #[test]
    fn event_encoding_for_room_join() {
        let packet = SocketPacket::event("join_issue", json!("issue-42"));
        assert_eq!(packet.to_frame(), r#"42["join_issue","issue-42"]"#);
    }

    #[test]
    fn connect_error_and_disconnect() {
        assert_eq!(
            SocketPacket::decode(r#"4{"message":"Authentication error"}"#).unwrap(),
            SocketPacket::ConnectError {
                namespace: "/".to_string(),
                data: Some(json!({"message": "Authentication error"})),
            }
        );
        assert_eq!(SocketPacket::disconnect().to_frame(), "41");
        assert_eq!(
            SocketPacket::decode("1").unwrap(),
            SocketPacket::Disconnect {
                namespace: "/".to_string()
            }
        );
    }

    #[test]
    fn rejects_binary_and_bad_events() {
        assert_eq!(SocketPacket::decode(r#"51-["x",{}]"#), Err(ProtocolError::Binary));
        assert!(matches!(
            SocketPacket::decode(r#"2{"not":"array"}"#),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            SocketPacket::decode("2[42]"),
            Err(ProtocolError::Malformed(_))
        ));
    }
}
