//! Wire protocol for the realtime channel. Both directions are JSON objects tagged
//! by `type`, with camelCase field names.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::group::{
    model::{CreateGroupBody, UpdateGroupBody},
    schema::GroupRole,
};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Binds the connection to the user in the access token.
    #[serde(rename_all = "camelCase")]
    Auth { token: String },

    #[serde(rename_all = "camelCase")]
    SendMessage { receiver_id: Uuid, content: String, message_type: Option<String> },

    #[serde(rename_all = "camelCase")]
    SendGroupMessage { conversation_id: Uuid, content: String, message_type: Option<String> },

    #[serde(rename_all = "camelCase")]
    RevokeMessage { message_id: Uuid },

    #[serde(rename_all = "camelCase")]
    CreateGroup { group_data: CreateGroupBody },

    #[serde(rename_all = "camelCase")]
    AddMember { group_id: Uuid, member_id: Uuid },

    #[serde(rename_all = "camelCase")]
    RemoveMember { group_id: Uuid, member_id: Uuid },

    #[serde(rename_all = "camelCase")]
    ChangeRole { group_id: Uuid, member_id: Uuid, role: GroupRole },

    #[serde(rename_all = "camelCase")]
    UpdateGroup { group_id: Uuid, update: UpdateGroupBody },

    #[serde(rename_all = "camelCase")]
    SetInviteActive { group_id: Uuid, is_active: bool },

    #[serde(rename_all = "camelCase")]
    RegenerateInviteLink { group_id: Uuid },

    #[serde(rename_all = "camelCase")]
    JoinGroup { invite_code: String },

    #[serde(rename_all = "camelCase")]
    DeleteGroup { group_id: Uuid },

    #[serde(rename_all = "camelCase")]
    SendFriendRequest { receiver_id: Uuid, message: Option<String> },

    #[serde(rename_all = "camelCase")]
    RespondToFriendRequest { request_id: Uuid, status: FriendRequestDecision },

    #[serde(rename_all = "camelCase")]
    CancelFriendRequest { request_id: Uuid },

    /// Answered with `receivedFriendRequests` on the same socket.
    GetReceivedFriendRequests,

    /// Answered with `sentFriendRequests` on the same socket.
    GetSentFriendRequests,

    /// Application-level keepalive
    Ping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FriendRequestDecision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    Online,
    Offline,
}

/// Events pushed from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    AuthSuccess { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    AuthFailed { reason: String },

    /// Direct message for the recipient
    #[serde(rename_all = "camelCase")]
    ReceiveMessage { message: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    ReceiveGroupMessage { conversation_id: Uuid, message: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    MessageRevoked { message_id: Uuid, conversation_id: Uuid, is_revoked: bool },

    #[serde(rename_all = "camelCase")]
    NewConversation { conversation: serde_json::Value, group: Option<serde_json::Value> },

    #[serde(rename_all = "camelCase")]
    UpdateLastMessage { conversation_id: Uuid, last_message: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    MemberAddedToGroup {
        group_id: Uuid,
        new_member: Uuid,
        added_by: Uuid,
        group: serde_json::Value,
    },

    #[serde(rename_all = "camelCase")]
    MemberRemovedFromGroup {
        group_id: Uuid,
        removed_member: Uuid,
        removed_by: Uuid,
        group: serde_json::Value,
    },

    #[serde(rename_all = "camelCase")]
    MemberRoleChanged {
        group_id: Uuid,
        member_id: Uuid,
        new_role: GroupRole,
        changed_by: Uuid,
        group: serde_json::Value,
    },

    #[serde(rename_all = "camelCase")]
    GroupInfoUpdated { group_id: Uuid, updated_by: Uuid, group: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    AddedToGroup { group: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    RemovedFromGroup { group_id: Uuid, conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    GroupDeleted { group_id: Uuid, conversation_id: Uuid, deleted_by: Uuid },

    #[serde(rename_all = "camelCase")]
    InviteLinkStatusUpdated { group_id: Uuid, is_active: bool, updated_by: Uuid },

    #[serde(rename_all = "camelCase")]
    InviteLinkRegenerated { group_id: Uuid, invite_link: serde_json::Value, regenerated_by: Uuid },

    #[serde(rename_all = "camelCase")]
    UserStatusChanged { user_id: Uuid, status: PresenceStatus, last_seen: Option<String> },

    #[serde(rename_all = "camelCase")]
    NewFriendRequest { request: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    FriendRequestResponse { request_id: Uuid, accepted: bool, responded_by: Uuid },

    #[serde(rename_all = "camelCase")]
    NewFriend { friend: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    FriendRequestCancelled { request_id: Uuid, cancelled_by: Uuid },

    #[serde(rename_all = "camelCase")]
    ReceivedFriendRequests { requests: serde_json::Value },

    #[serde(rename_all = "camelCase")]
    SentFriendRequests { requests: serde_json::Value },

    Pong,

    /// A socket-initiated action failed; the connection stays open.
    #[serde(rename_all = "camelCase")]
    Error { message: String },
}

/// Entity snapshot embedded in an event. A snapshot that fails to serialize is
/// logged and sent as `null`.
pub fn payload<T: Serialize>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::error!("Failed to serialize {} for an event: {}", std::any::type_name::<T>(), e);
        serde_json::Value::Null
    })
}

impl ServerMessage {
    /// The `type` tag on the wire.
    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::AuthSuccess { .. } => "authSuccess",
            ServerMessage::AuthFailed { .. } => "authFailed",
            ServerMessage::ReceiveMessage { .. } => "receiveMessage",
            ServerMessage::ReceiveGroupMessage { .. } => "receiveGroupMessage",
            ServerMessage::MessageRevoked { .. } => "messageRevoked",
            ServerMessage::NewConversation { .. } => "newConversation",
            ServerMessage::UpdateLastMessage { .. } => "updateLastMessage",
            ServerMessage::MemberAddedToGroup { .. } => "memberAddedToGroup",
            ServerMessage::MemberRemovedFromGroup { .. } => "memberRemovedFromGroup",
            ServerMessage::MemberRoleChanged { .. } => "memberRoleChanged",
            ServerMessage::GroupInfoUpdated { .. } => "groupInfoUpdated",
            ServerMessage::AddedToGroup { .. } => "addedToGroup",
            ServerMessage::RemovedFromGroup { .. } => "removedFromGroup",
            ServerMessage::GroupDeleted { .. } => "groupDeleted",
            ServerMessage::InviteLinkStatusUpdated { .. } => "inviteLinkStatusUpdated",
            ServerMessage::InviteLinkRegenerated { .. } => "inviteLinkRegenerated",
            ServerMessage::UserStatusChanged { .. } => "userStatusChanged",
            ServerMessage::NewFriendRequest { .. } => "newFriendRequest",
            ServerMessage::FriendRequestResponse { .. } => "friendRequestResponse",
            ServerMessage::NewFriend { .. } => "newFriend",
            ServerMessage::FriendRequestCancelled { .. } => "friendRequestCancelled",
            ServerMessage::ReceivedFriendRequests { .. } => "receivedFriendRequests",
            ServerMessage::SentFriendRequests { .. } => "sentFriendRequests",
            ServerMessage::Pong => "pong",
            ServerMessage::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::group::schema::PermissionSetting;
    use uuid::Uuid;

    // === ClientMessage ===

    #[test]
    fn test_client_auth_deserialize() {
        let json = r#"{"type":"auth","token":"my-jwt-token"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::Auth { token } if token == "my-jwt-token"));
    }

    #[test]
    fn test_client_send_message_deserialize() {
        let id = Uuid::now_v7();
        let json = format!(r#"{{"type":"sendMessage","receiverId":"{}","content":"Hello!"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ClientMessage::SendMessage { receiver_id, content, message_type } => {
                assert_eq!(receiver_id, id);
                assert_eq!(content, "Hello!");
                assert!(message_type.is_none());
            }
            _ => panic!("Expected SendMessage variant"),
        }
    }

    #[test]
    fn test_client_change_role_deserialize() {
        let group_id = Uuid::now_v7();
        let member_id = Uuid::now_v7();
        let json = format!(
            r#"{{"type":"changeRole","groupId":"{}","memberId":"{}","role":"admin"}}"#,
            group_id, member_id
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::ChangeRole { role: GroupRole::Admin, group_id: g, .. } if g == group_id
        ));
    }

    #[test]
    fn test_client_update_group_deserialize() {
        let group_id = Uuid::now_v7();
        let json = format!(
            r#"{{"type":"updateGroup","groupId":"{}","update":{{"name":"Core","whoCanAddMembers":"admins_moderators"}}}}"#,
            group_id
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ClientMessage::UpdateGroup { update, .. } => {
                assert_eq!(update.name.as_deref(), Some("Core"));
                assert_eq!(update.who_can_add_members, Some(PermissionSetting::AdminsModerators));
                assert_eq!(update.description, None);
            }
            _ => panic!("Expected UpdateGroup variant"),
        }
    }

    #[test]
    fn test_client_join_group_deserialize() {
        let json = r#"{"type":"joinGroup","inviteCode":"a1b2c3d4e5f60718"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::JoinGroup { invite_code } if invite_code == "a1b2c3d4e5f60718"));
    }

    #[test]
    fn test_client_create_group_deserialize() {
        let member = Uuid::now_v7();
        let json = format!(
            r#"{{"type":"createGroup","groupData":{{"name":"Core","memberIds":["{}"]}}}}"#,
            member
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ClientMessage::CreateGroup { group_data } => {
                assert_eq!(group_data.name, "Core");
                assert_eq!(group_data.member_ids, vec![member]);
                assert!(group_data.description.is_none());
            }
            _ => panic!("Expected CreateGroup variant"),
        }
    }

    #[test]
    fn test_client_friend_request_actions_deserialize() {
        let id = Uuid::now_v7();

        let json = format!(r#"{{"type":"sendFriendRequest","receiverId":"{}","message":"hi"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::SendFriendRequest { receiver_id, message: Some(m) } if receiver_id == id && m == "hi"
        ));

        let json = format!(r#"{{"type":"respondToFriendRequest","requestId":"{}","status":"rejected"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::RespondToFriendRequest { status: FriendRequestDecision::Rejected, .. }
        ));

        let json = format!(r#"{{"type":"cancelFriendRequest","requestId":"{}"}}"#, id);
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(msg, ClientMessage::CancelFriendRequest { request_id } if request_id == id));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"getReceivedFriendRequests"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GetReceivedFriendRequests));
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"getSentFriendRequests"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::GetSentFriendRequests));
    }

    #[test]
    fn test_unknown_decision_is_rejected() {
        let json = r#"{"type":"respondToFriendRequest","requestId":"550e8400-e29b-41d4-a716-446655440000","status":"maybe"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    #[test]
    fn test_client_ping_deserialize() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }

    #[test]
    fn test_invalid_type_returns_error() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"unknownType"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_required_field_returns_error() {
        let json = r#"{"type":"sendGroupMessage","conversationId":"550e8400-e29b-41d4-a716-446655440000"}"#;
        assert!(serde_json::from_str::<ClientMessage>(json).is_err());
    }

    // === ServerMessage ===

    #[test]
    fn test_event_name_matches_wire_tag() {
        let id = Uuid::now_v7();
        let events = [
            ServerMessage::ReceiveMessage { message: serde_json::json!({}) },
            ServerMessage::ReceiveGroupMessage { conversation_id: id, message: serde_json::json!({}) },
            ServerMessage::MessageRevoked { message_id: id, conversation_id: id, is_revoked: true },
            ServerMessage::NewConversation { conversation: serde_json::json!({}), group: None },
            ServerMessage::UpdateLastMessage { conversation_id: id, last_message: serde_json::json!({}) },
            ServerMessage::MemberAddedToGroup { group_id: id, new_member: id, added_by: id, group: serde_json::json!({}) },
            ServerMessage::MemberRemovedFromGroup { group_id: id, removed_member: id, removed_by: id, group: serde_json::json!({}) },
            ServerMessage::MemberRoleChanged { group_id: id, member_id: id, new_role: GroupRole::Moderator, changed_by: id, group: serde_json::json!({}) },
            ServerMessage::GroupInfoUpdated { group_id: id, updated_by: id, group: serde_json::json!({}) },
            ServerMessage::AddedToGroup { group: serde_json::json!({}) },
            ServerMessage::RemovedFromGroup { group_id: id, conversation_id: id },
            ServerMessage::GroupDeleted { group_id: id, conversation_id: id, deleted_by: id },
            ServerMessage::InviteLinkStatusUpdated { group_id: id, is_active: false, updated_by: id },
            ServerMessage::InviteLinkRegenerated { group_id: id, invite_link: serde_json::json!({}), regenerated_by: id },
            ServerMessage::UserStatusChanged { user_id: id, status: PresenceStatus::Online, last_seen: None },
            ServerMessage::ReceivedFriendRequests { requests: serde_json::json!([]) },
            ServerMessage::SentFriendRequests { requests: serde_json::json!([]) },
            ServerMessage::Pong,
            ServerMessage::Error { message: "boom".into() },
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.event_name());
        }
    }

    #[test]
    fn test_user_status_changed_serialize() {
        let uid = Uuid::now_v7();
        let msg = ServerMessage::UserStatusChanged {
            user_id: uid,
            status: PresenceStatus::Offline,
            last_seen: Some("2026-01-01T00:00:00Z".into()),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["status"], "offline");
        assert_eq!(value["userId"], uid.to_string());
        assert_eq!(value["lastSeen"], "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_member_role_changed_serialize() {
        let id = Uuid::now_v7();
        let msg = ServerMessage::MemberRoleChanged {
            group_id: id,
            member_id: id,
            new_role: GroupRole::Admin,
            changed_by: id,
            group: serde_json::json!({"name": "Team"}),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["newRole"], "admin");
        assert_eq!(value["group"]["name"], "Team");
    }

    #[test]
    fn test_payload_falls_back_to_null() {
        let unserializable = std::collections::HashMap::from([((1u8, 2u8), "pair")]);
        assert_eq!(payload(&unserializable), serde_json::Value::Null);
        assert_eq!(payload(&vec![1, 2]), serde_json::json!([1, 2]));
    }

    #[test]
    fn test_server_pong_serialize() {
        let json = serde_json::to_string(&ServerMessage::Pong).unwrap();
        assert_eq!(json, r#"{"type":"pong"}"#);
    }
}
