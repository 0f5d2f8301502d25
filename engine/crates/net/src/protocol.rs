use serde::{Deserialize, Serialize};

/// Client-to-server message. JSON object tagged by its `Type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum ClientMessage {
    Login {
        #[serde(rename = "UserName", alias = "Username")]
        user_name: String,
    },
    GetLobbyList,
    JoinLobby {
        #[serde(rename = "ID")]
        id: u32,
    },
    LeaveLobby {
        #[serde(rename = "ID")]
        id: u32,
        #[serde(rename = "PlayerName", default, skip_serializing_if = "Option::is_none")]
        player_name: Option<String>,
    },
    IsLobbyFull {
        #[serde(rename = "ID")]
        id: u32,
    },
    OpponentMove {
        #[serde(rename = "PlayerName")]
        player_name: String,
        #[serde(rename = "PlayerMove", alias = "Cell")]
        player_move: i32,
        #[serde(rename = "ID")]
        id: u32,
    },
}

/// Server-to-client message, tagged the same way.
///
/// Relayed moves are forwarded as the raw inbound text and never pass
/// through this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum ServerMessage {
    Lobby {
        #[serde(rename = "Lobbies")]
        lobbies: Vec<LobbyWire>,
    },
    IsInLobby {
        #[serde(rename = "CurrentLobbyID")]
        current_lobby_id: u32,
    },
    SetPlayerShape {
        #[serde(rename = "PlayerX")]
        player_x: String,
        #[serde(rename = "PlayerO")]
        player_o: String,
        #[serde(rename = "Starter")]
        starter: String,
    },
}

/// One roster entry. Empty strings mark open seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyWire {
    #[serde(rename = "ID")]
    pub id: u32,
    #[serde(rename = "PlayerX")]
    pub player_x: String,
    #[serde(rename = "PlayerO")]
    pub player_o: String,
}

/// Why an inbound payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("payload is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("payload has no string \"Type\" field")]
    MissingType,

    #[error("unknown message type {0:?}")]
    UnknownKind(String),

    #[error("invalid fields for {kind}: {source}")]
    InvalidFields {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ClientMessage {
    /// Every `Type` value the server understands.
    pub const KINDS: [&'static str; 6] = [
        "Login",
        "GetLobbyList",
        "JoinLobby",
        "LeaveLobby",
        "IsLobbyFull",
        "OpponentMove",
    ];

    /// Decode one inbound line.
    pub fn decode(raw: &str) -> Result<Self, ProtocolError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(ProtocolError::Malformed)?;
        let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;
        let kind = object
            .get("Type")
            .and_then(serde_json::Value::as_str)
            .ok_or(ProtocolError::MissingType)?;

        if !Self::KINDS.iter().any(|known| *known == kind) {
            return Err(ProtocolError::UnknownKind(kind.to_string()));
        }
        let kind = kind.to_string();

        serde_json::from_value(value).map_err(|source| ProtocolError::InvalidFields { kind, source })
    }

    /// The `Type` tag of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Login { .. } => "Login",
            Self::GetLobbyList => "GetLobbyList",
            Self::JoinLobby { .. } => "JoinLobby",
            Self::LeaveLobby { .. } => "LeaveLobby",
            Self::IsLobbyFull { .. } => "IsLobbyFull",
            Self::OpponentMove { .. } => "OpponentMove",
        }
    }
}

impl ServerMessage {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_login() {
        let msg = ClientMessage::decode(r#"{"Type":"Login","UserName":"Ann"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Login {
                user_name: "Ann".into()
            }
        );
    }

    #[test]
    fn decode_login_accepts_username_spelling() {
        let msg = ClientMessage::decode(r#"{"Type":"Login","Username":"Bo"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Login {
                user_name: "Bo".into()
            }
        );
    }

    #[test]
    fn decode_get_lobby_list() {
        let msg = ClientMessage::decode(r#"{"Type":"GetLobbyList"}"#).unwrap();
        assert_eq!(msg, ClientMessage::GetLobbyList);
        assert_eq!(msg.kind(), "GetLobbyList");
    }

    #[test]
    fn decode_leave_lobby_with_and_without_name() {
        let with = ClientMessage::decode(r#"{"Type":"LeaveLobby","ID":2,"PlayerName":"Ann"}"#).unwrap();
        assert_eq!(
            with,
            ClientMessage::LeaveLobby {
                id: 2,
                player_name: Some("Ann".into())
            }
        );
        let without = ClientMessage::decode(r#"{"Type":"LeaveLobby","ID":2}"#).unwrap();
        assert_eq!(
            without,
            ClientMessage::LeaveLobby {
                id: 2,
                player_name: None
            }
        );
    }

    #[test]
    fn decode_opponent_move_cell_alias() {
        let msg =
            ClientMessage::decode(r#"{"Type":"OpponentMove","PlayerName":"Ann","Cell":4,"ID":0}"#)
                .unwrap();
        match msg {
            ClientMessage::OpponentMove {
                player_name,
                player_move,
                id,
            } => {
                assert_eq!(player_name, "Ann");
                assert_eq!(player_move, 4);
                assert_eq!(id, 0);
            }
            other => panic!("Expected OpponentMove, got {:?}", other),
        }
    }

    #[test]
    fn extra_fields_are_ignored() {
        let msg = ClientMessage::decode(r#"{"Type":"JoinLobby","ID":1,"Extra":true}"#).unwrap();
        assert_eq!(msg, ClientMessage::JoinLobby { id: 1 });
    }

    #[test]
    fn decode_errors() {
        assert!(matches!(
            ClientMessage::decode("{not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            ClientMessage::decode("[1,2]"),
            Err(ProtocolError::NotAnObject)
        ));
        assert!(matches!(
            ClientMessage::decode(r#"{"ID":1}"#),
            Err(ProtocolError::MissingType)
        ));
        assert!(matches!(
            ClientMessage::decode(r#"{"Type":7}"#),
            Err(ProtocolError::MissingType)
        ));
        match ClientMessage::decode(r#"{"Type":"StartGame"}"#) {
            Err(ProtocolError::UnknownKind(kind)) => assert_eq!(kind, "StartGame"),
            other => panic!("Expected UnknownKind, got {:?}", other),
        }
        match ClientMessage::decode(r#"{"Type":"JoinLobby","ID":"zero"}"#) {
            Err(ProtocolError::InvalidFields { kind, .. }) => assert_eq!(kind, "JoinLobby"),
            other => panic!("Expected InvalidFields, got {:?}", other),
        }
    }

    #[test]
    fn every_kind_has_a_variant() {
        let samples = [
            r#"{"Type":"Login","UserName":"a"}"#,
            r#"{"Type":"GetLobbyList"}"#,
            r#"{"Type":"JoinLobby","ID":0}"#,
            r#"{"Type":"LeaveLobby","ID":0}"#,
            r#"{"Type":"IsLobbyFull","ID":0}"#,
            r#"{"Type":"OpponentMove","PlayerName":"a","PlayerMove":1,"ID":0}"#,
        ];
        for (sample, kind) in samples.iter().zip(ClientMessage::KINDS) {
            assert_eq!(ClientMessage::decode(sample).unwrap().kind(), kind);
        }
    }

    #[test]
    fn encode_lobby_roster() {
        let msg = ServerMessage::Lobby {
            lobbies: vec![
                LobbyWire {
                    id: 0,
                    player_x: "Ann".into(),
                    player_o: String::new(),
                },
                LobbyWire {
                    id: 1,
                    player_x: String::new(),
                    player_o: String::new(),
                },
            ],
        };
        let json = msg.encode().unwrap();
        assert_eq!(
            json,
            r#"{"Type":"Lobby","Lobbies":[{"ID":0,"PlayerX":"Ann","PlayerO":""},{"ID":1,"PlayerX":"","PlayerO":""}]}"#
        );
    }

    #[test]
    fn encode_is_in_lobby() {
        let json = ServerMessage::IsInLobby { current_lobby_id: 2 }
            .encode()
            .unwrap();
        assert_eq!(json, r#"{"Type":"IsInLobby","CurrentLobbyID":2}"#);
    }

    #[test]
    fn client_messages_survive_encoding() {
        let messages = [
            ClientMessage::Login {
                user_name: "Ann".into(),
            },
            ClientMessage::GetLobbyList,
            ClientMessage::JoinLobby { id: 1 },
            ClientMessage::LeaveLobby {
                id: 2,
                player_name: Some("Bo".into()),
            },
            ClientMessage::LeaveLobby {
                id: 2,
                player_name: None,
            },
            ClientMessage::IsLobbyFull { id: 0 },
            ClientMessage::OpponentMove {
                player_name: "Ann".into(),
                player_move: 8,
                id: 0,
            },
        ];
        for msg in messages {
            let json = serde_json::to_string(&msg).unwrap();
            assert_eq!(ClientMessage::decode(&json).unwrap(), msg, "{json}");
        }
    }

    #[test]
    fn client_messages_use_canonical_field_names() {
        let login = serde_json::to_string(&ClientMessage::Login {
            user_name: "Ann".into(),
        })
        .unwrap();
        assert_eq!(login, r#"{"Type":"Login","UserName":"Ann"}"#);

        let mv = serde_json::to_string(&ClientMessage::OpponentMove {
            player_name: "Ann".into(),
            player_move: 4,
            id: 0,
        })
        .unwrap();
        assert_eq!(mv, r#"{"Type":"OpponentMove","PlayerName":"Ann","PlayerMove":4,"ID":0}"#);

        let leave = serde_json::to_string(&ClientMessage::LeaveLobby {
            id: 1,
            player_name: None,
        })
        .unwrap();
        assert_eq!(leave, r#"{"Type":"LeaveLobby","ID":1}"#);
    }

    #[test]
    fn server_messages_survive_encoding() {
        let messages = [
            ServerMessage::Lobby {
                lobbies: vec![
                    LobbyWire {
                        id: 0,
                        player_x: "Ann".into(),
                        player_o: "Bo".into(),
                    },
                    LobbyWire {
                        id: 1,
                        player_x: String::new(),
                        player_o: String::new(),
                    },
                ],
            },
            ServerMessage::Lobby { lobbies: vec![] },
            ServerMessage::IsInLobby { current_lobby_id: 2 },
            ServerMessage::SetPlayerShape {
                player_x: "Ann".into(),
                player_o: "Bo".into(),
                starter: "Bo".into(),
            },
        ];
        for msg in messages {
            let json = msg.encode().unwrap();
            let back: ServerMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(back, msg, "{json}");
        }
    }
}
