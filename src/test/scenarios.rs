use std::sync::Arc;

use actix::Actor;
use futures_util::future::join_all;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::schema::ConversationType,
        group::{
            model::{CreateGroupBody, UpdateGroupBody},
            schema::{GroupRole, PermissionSetting},
        },
        message::model::SendMessageData,
        websocket::{
            events::{GetOnlineUsers, Register},
            message::ServerMessage,
            presence::{ConnectionHandle, LocalPresenceRegistry},
            server::WebSocketServer,
        },
    },
    test::support::{
        attachment, Drain, FailingStorage, Harness, MemoryLastSeen, MemoryStorage, FakeClient,
    },
};

fn text(content: &str) -> SendMessageData {
    SendMessageData::new(content, None)
}

fn group_body(name: &str, member_ids: Vec<Uuid>) -> CreateGroupBody {
    CreateGroupBody { name: name.to_string(), description: None, avatar_url: None, member_ids }
}

#[actix_web::test]
async fn test_concurrent_first_messages_share_one_conversation() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;

    let sends = (0..6).map(|i| {
        let (from, to) = if i % 2 == 0 { (alice, bob) } else { (bob, alice) };
        harness.messages.send_direct_message(from, to, text(&format!("hello {i}")), None)
    });
    let sent: Vec<_> = join_all(sends).await.into_iter().map(|r| r.unwrap()).collect();

    let conversation_id = sent[0].conversation_id;
    assert!(sent.iter().all(|m| m.conversation_id == conversation_id));

    let state = harness.store.state().await;
    assert_eq!(state.conversations.len(), 1);
    assert_eq!(state.message_refs[&conversation_id].len(), 6);
    drop(state);

    let announced = recorder.named("newConversation");
    assert_eq!(announced.len(), 1);
    let recipients = &announced[0].0;
    assert_eq!(recipients.len(), 2);
    assert!(recipients.contains(&alice) && recipients.contains(&bob));
    assert_eq!(recorder.named("receiveMessage").len(), 6);
}

#[actix_web::test]
async fn test_direct_message_events_and_lookup() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;

    let first = harness.messages.send_direct_message(alice, bob, text("hi bob"), None).await.unwrap();
    assert_eq!(recorder.received_by(&bob), vec!["newConversation", "updateLastMessage", "receiveMessage"]);
    assert_eq!(recorder.received_by(&alice), vec!["newConversation", "updateLastMessage"]);

    recorder.clear();
    harness.messages.send_direct_message(bob, alice, text("hi alice"), None).await.unwrap();
    assert_eq!(recorder.received_by(&alice), vec!["updateLastMessage", "receiveMessage"]);

    let detail = harness.conversations.get_personal_between(alice, bob).await.unwrap();
    assert_eq!(detail.conversation.id, first.conversation_id);
    assert_eq!(detail.conversation._type, ConversationType::Personal);
    assert_eq!(detail.messages.len(), 2);
    assert_eq!(
        detail.conversation.last_message.as_ref().and_then(|m| m.content.as_deref()),
        Some("hi alice")
    );

    assert!(matches!(
        harness.messages.send_direct_message(alice, alice, text("me"), None).await,
        Err(error::SystemError::BadRequest(_))
    ));
    assert!(matches!(
        harness.messages.send_direct_message(alice, Uuid::now_v7(), text("ghost"), None).await,
        Err(error::SystemError::NotFound(_))
    ));
}

#[actix_web::test]
async fn test_attachment_only_message_uses_snapshot_text() {
    let (harness, _recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;

    let message = harness
        .messages
        .send_direct_message(alice, bob, SendMessageData::default(), Some(attachment("a.pdf", b"%PDF")))
        .await
        .unwrap();

    assert!(message.content.is_none());
    assert_eq!(message.file_meta.as_ref().map(|f| f.file_size), Some(4));
    let state = harness.store.state().await;
    let last = state.conversations[&message.conversation_id].last_message.clone().unwrap();
    assert_eq!(last.content.as_deref(), Some("Sent an attachment"));
}

#[actix_web::test]
async fn test_failed_upload_persists_nothing() {
    let recorder = Arc::new(crate::test::support::RecordingBroadcaster::default());
    let harness = Harness::with_storage(recorder.clone(), Arc::new(FailingStorage));
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;

    let result = harness
        .messages
        .send_direct_message(alice, bob, text("see file"), Some(attachment("a.png", b"png")))
        .await;

    assert!(matches!(result, Err(error::SystemError::InternalError(_))));
    let state = harness.store.state().await;
    assert!(state.conversations.is_empty());
    assert!(state.messages.is_empty());
    assert!(recorder.events().is_empty());
}

#[actix_web::test]
async fn test_attachment_removed_when_message_write_fails() {
    let recorder = Arc::new(crate::test::support::RecordingBroadcaster::default());
    let storage = Arc::new(MemoryStorage::default());
    let harness = Harness::with_storage(recorder.clone(), storage.clone());
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;
    let group = harness.groups.create(alice, group_body("Team", vec![bob])).await.unwrap();

    harness.store.state().await.failed_message_writes = 2;

    let direct = harness
        .messages
        .send_direct_message(alice, bob, text("doc"), Some(attachment("a.pdf", b"pdf")))
        .await;
    assert!(matches!(direct, Err(error::SystemError::DatabaseError(_))));

    let grouped = harness
        .messages
        .send_group_message(bob, group.conversation_id, text("doc"), Some(attachment("b.pdf", b"pdf")))
        .await;
    assert!(matches!(grouped, Err(error::SystemError::DatabaseError(_))));

    assert_eq!(storage.stored(), 0);
    assert!(harness.store.state().await.messages.is_empty());

    harness
        .messages
        .send_direct_message(alice, bob, text("doc"), Some(attachment("a.pdf", b"pdf")))
        .await
        .unwrap();
    assert_eq!(storage.stored(), 1);
}

#[actix_web::test]
async fn test_group_lifecycle_keeps_conversation_mirrored() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;
    let carol = harness.store.add_user("carol").await;
    let unknown = Uuid::now_v7();

    let group = harness
        .groups
        .create(alice, group_body("Team", vec![bob, unknown, bob, alice]))
        .await
        .unwrap();
    assert_eq!(group.member_ids(), vec![alice, bob]);
    assert_eq!(group.member(&alice).map(|m| m.role), Some(GroupRole::Admin));
    assert_eq!(recorder.named("newConversation")[0].0, vec![alice, bob]);

    harness.groups.add_member(group.id, carol, alice).await.unwrap();
    harness.groups.remove_member(group.id, bob, alice).await.unwrap();
    harness
        .groups
        .update_info(
            group.id,
            UpdateGroupBody { name: Some("Core".into()), avatar_url: Some(Some("a.png".into())), ..Default::default() },
            alice,
        )
        .await
        .unwrap();

    let state = harness.store.state().await;
    let saved = &state.groups[&group.id];
    let conversation = &state.conversations[&saved.conversation_id];
    assert_eq!(conversation.participant_ids, saved.member_ids());
    assert_eq!(conversation.participant_ids, vec![alice, carol]);
    assert_eq!(conversation.name.as_deref(), Some("Core"));
    assert_eq!(conversation.avatar_url.as_deref(), Some("a.png"));
    assert_eq!(conversation.group_id, Some(group.id));
    assert_eq!(saved.version, 3);
    drop(state);

    assert!(recorder.received_by(&bob).contains(&"removedFromGroup"));
    assert!(!recorder.named("memberRemovedFromGroup")[0].0.contains(&bob));
    assert_eq!(recorder.named("addedToGroup")[0].0, vec![carol]);
}

#[actix_web::test]
async fn test_rejected_operations_leave_group_unchanged() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;
    let carol = harness.store.add_user("carol").await;
    let outsider = harness.store.add_user("dave").await;

    let group = harness.groups.create(alice, group_body("Team", vec![bob, carol])).await.unwrap();
    recorder.clear();

    let attempts = vec![
        harness.groups.change_role(group.id, alice, GroupRole::Member, alice).await.err(),
        harness.groups.remove_member(group.id, alice, alice).await.err(),
        harness.groups.remove_member(group.id, carol, bob).await.err(),
        harness.groups.change_role(group.id, carol, GroupRole::Admin, bob).await.err(),
        harness.groups.add_member(group.id, outsider, bob).await.err(),
        harness.groups.add_member(group.id, bob, alice).await.err(),
        harness.groups.remove_member(group.id, outsider, alice).await.err(),
    ];

    assert!(matches!(attempts[0], Some(error::SystemError::BadRequest(_))));
    assert!(matches!(attempts[1], Some(error::SystemError::BadRequest(_))));
    assert!(matches!(attempts[2], Some(error::SystemError::Forbidden(_))));
    assert!(matches!(attempts[3], Some(error::SystemError::Forbidden(_))));
    assert!(matches!(attempts[4], Some(error::SystemError::Forbidden(_))));
    assert!(matches!(attempts[5], Some(error::SystemError::Conflict(_))));
    assert!(matches!(attempts[6], Some(error::SystemError::NotFound(_))));

    let state = harness.store.state().await;
    let saved = &state.groups[&group.id];
    assert_eq!(saved.version, 0);
    assert_eq!(saved.member_ids(), vec![alice, bob, carol]);
    assert_eq!(saved.admin_count(), 1);
    assert!(recorder.events().is_empty());
}

#[actix_web::test]
async fn test_group_field_limits_are_enforced() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;

    assert!(matches!(
        harness.groups.create(alice, group_body(&"n".repeat(101), vec![])).await,
        Err(error::SystemError::BadRequest(_))
    ));

    let group = harness.groups.create(alice, group_body("Team", vec![])).await.unwrap();
    recorder.clear();

    let long_name = UpdateGroupBody { name: Some("n".repeat(200)), ..Default::default() };
    assert!(matches!(
        harness.groups.update_info(group.id, long_name, alice).await,
        Err(error::SystemError::BadRequest(_))
    ));

    let long_description =
        UpdateGroupBody { description: Some(Some("d".repeat(600))), ..Default::default() };
    assert!(matches!(
        harness.groups.update_info(group.id, long_description, alice).await,
        Err(error::SystemError::BadRequest(_))
    ));

    let state = harness.store.state().await;
    assert_eq!(state.groups[&group.id].name, "Team");
    assert_eq!(state.groups[&group.id].version, group.version);
    drop(state);
    assert!(recorder.events().is_empty());
}

#[actix_web::test]
async fn test_member_can_leave_and_moderator_limits() {
    let (harness, _recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;
    let carol = harness.store.add_user("carol").await;
    let dave = harness.store.add_user("dave").await;

    let group =
        harness.groups.create(alice, group_body("Team", vec![bob, carol, dave])).await.unwrap();
    harness.groups.change_role(group.id, bob, GroupRole::Moderator, alice).await.unwrap();
    harness.groups.change_role(group.id, carol, GroupRole::Admin, alice).await.unwrap();

    assert!(matches!(
        harness.groups.remove_member(group.id, carol, bob).await,
        Err(error::SystemError::Forbidden(_))
    ));
    harness.groups.remove_member(group.id, dave, bob).await.unwrap();
    harness.groups.remove_member(group.id, bob, bob).await.unwrap();
    harness.groups.change_role(group.id, carol, GroupRole::Member, alice).await.unwrap();

    let group = harness.groups.get_by_id(group.id, alice).await.unwrap();
    assert_eq!(group.member_ids(), vec![alice, carol]);
    assert_eq!(group.admin_count(), 1);
    assert!(matches!(
        harness.groups.get_by_id(group.id, bob).await,
        Err(error::SystemError::Forbidden(_))
    ));
}

#[actix_web::test]
async fn test_send_permission_follows_role_and_setting() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;
    let outsider = harness.store.add_user("carol").await;

    let group = harness.groups.create(alice, group_body("Team", vec![bob])).await.unwrap();
    let conversation_id = group.conversation_id;

    harness.messages.send_group_message(bob, conversation_id, text("hi"), None).await.unwrap();

    harness
        .groups
        .update_info(
            group.id,
            UpdateGroupBody { who_can_send_messages: Some(PermissionSetting::Admins), ..Default::default() },
            alice,
        )
        .await
        .unwrap();

    assert!(matches!(
        harness.messages.send_group_message(bob, conversation_id, text("hi again"), None).await,
        Err(error::SystemError::Forbidden(_))
    ));
    assert!(matches!(
        harness.messages.send_group_message(outsider, conversation_id, text("let me in"), None).await,
        Err(error::SystemError::Forbidden(_))
    ));

    harness.groups.change_role(group.id, bob, GroupRole::Admin, alice).await.unwrap();
    recorder.clear();
    harness.messages.send_group_message(bob, conversation_id, text("admin now"), None).await.unwrap();

    let fan_out = recorder.named("receiveGroupMessage");
    assert_eq!(fan_out.len(), 1);
    assert_eq!(fan_out[0].0, vec![alice, bob]);

    let history = harness.messages.get_by_conversation(conversation_id, alice).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(matches!(
        harness.messages.get_by_conversation(conversation_id, outsider).await,
        Err(error::SystemError::Forbidden(_))
    ));
}

#[actix_web::test]
async fn test_only_sender_revokes() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;

    let message = harness.messages.send_direct_message(alice, bob, text("oops"), None).await.unwrap();

    assert!(matches!(
        harness.messages.revoke(message.id, bob).await,
        Err(error::SystemError::Forbidden(_))
    ));
    assert!(!harness.store.state().await.messages[0].is_revoked);
    assert!(matches!(
        harness.messages.revoke(Uuid::now_v7(), alice).await,
        Err(error::SystemError::NotFound(_))
    ));

    recorder.clear();
    let revoked = harness.messages.revoke(message.id, alice).await.unwrap();
    assert!(revoked.is_revoked);
    assert_eq!(revoked.content.as_deref(), Some("oops"));
    assert_eq!(recorder.named("messageRevoked")[0].0.len(), 2);

    assert!(harness.messages.revoke(message.id, alice).await.unwrap().is_revoked);
}

#[actix_web::test]
async fn test_invite_link_join_rules() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;
    let carol = harness.store.add_user("carol").await;

    let group = harness.groups.create(alice, group_body("Team", vec![bob])).await.unwrap();
    let code = group.invite_link.code.clone();

    assert!(matches!(
        harness.groups.join_by_invite_code("nope", carol).await,
        Err(error::SystemError::NotFound(_))
    ));
    assert!(matches!(
        harness.groups.join_by_invite_code(&code, bob).await,
        Err(error::SystemError::Conflict(_))
    ));

    harness.groups.set_invite_active(group.id, false, alice).await.unwrap();
    assert!(matches!(
        harness.groups.join_by_invite_code(&code, carol).await,
        Err(error::SystemError::Forbidden(_))
    ));

    let link = harness.groups.regenerate_invite_code(group.id, alice).await.unwrap();
    assert!(link.is_active);
    assert_ne!(link.code, code);
    assert_eq!(recorder.named("inviteLinkRegenerated")[0].0, vec![alice]);
    assert!(matches!(
        harness.groups.join_by_invite_code(&code, carol).await,
        Err(error::SystemError::NotFound(_))
    ));

    recorder.clear();
    let joined = harness.groups.join_by_invite_code(&link.code, carol).await.unwrap();
    assert_eq!(joined.member(&carol).map(|m| m.role), Some(GroupRole::Member));
    assert_eq!(recorder.received_by(&carol), vec!["memberAddedToGroup", "addedToGroup", "newConversation"]);
    assert_eq!(recorder.received_by(&bob), vec!["memberAddedToGroup"]);

    let state = harness.store.state().await;
    assert!(state.conversations[&group.conversation_id].has_participant(&carol));
}

#[actix_web::test]
async fn test_delete_group_cascades() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;

    let group = harness.groups.create(alice, group_body("Team", vec![bob])).await.unwrap();
    harness.messages.send_group_message(bob, group.conversation_id, text("bye"), None).await.unwrap();

    assert!(matches!(harness.groups.delete(group.id, bob).await, Err(error::SystemError::Forbidden(_))));

    recorder.clear();
    harness.groups.delete(group.id, alice).await.unwrap();

    let state = harness.store.state().await;
    assert!(state.groups.is_empty());
    assert!(state.conversations.is_empty());
    assert!(state.messages.is_empty());
    drop(state);

    assert_eq!(recorder.named("groupDeleted")[0].0, vec![alice, bob]);
    assert!(matches!(harness.groups.delete(group.id, alice).await, Err(error::SystemError::NotFound(_))));
}

#[actix_web::test]
async fn test_stale_commits_are_retried_then_reported() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;
    let carol = harness.store.add_user("carol").await;

    let group = harness.groups.create(alice, group_body("Team", vec![])).await.unwrap();

    harness.store.state().await.stale_saves = crate::constants::GROUP_COMMIT_ATTEMPTS - 1;
    harness.groups.add_member(group.id, bob, alice).await.unwrap();

    recorder.clear();
    harness.store.state().await.stale_saves = crate::constants::GROUP_COMMIT_ATTEMPTS;
    assert!(matches!(
        harness.groups.add_member(group.id, carol, alice).await,
        Err(error::SystemError::VersionConflict)
    ));

    let state = harness.store.state().await;
    assert_eq!(state.groups[&group.id].member_ids(), vec![alice, bob]);
    assert!(recorder.events().is_empty());
}

#[actix_web::test]
async fn test_concurrent_additions_both_land() {
    let (harness, _recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;
    let carol = harness.store.add_user("carol").await;

    let group = harness.groups.create(alice, group_body("Team", vec![])).await.unwrap();

    let (first, second) = futures_util::join!(
        harness.groups.add_member(group.id, bob, alice),
        harness.groups.add_member(group.id, carol, alice),
    );
    first.unwrap();
    second.unwrap();

    let state = harness.store.state().await;
    let saved = &state.groups[&group.id];
    assert_eq!(saved.members.len(), 3);
    assert!(saved.is_member(&bob) && saved.is_member(&carol));
    assert_eq!(state.conversations[&saved.conversation_id].participant_ids, saved.member_ids());
}

#[actix_web::test]
async fn test_group_message_reaches_online_members_through_server() {
    let server =
        WebSocketServer::new(Box::new(LocalPresenceRegistry::new()), Arc::new(MemoryLastSeen::default()))
            .start();
    let harness = Harness::new(Arc::new(server.clone()));
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;
    let carol = harness.store.add_user("carol").await;

    let mut clients = Vec::new();
    for user_id in [alice, carol] {
        let client = FakeClient::default().start();
        server.do_send(Register {
            user_id,
            handle: ConnectionHandle { session_id: Uuid::now_v7(), recipient: client.clone().recipient() },
        });
        clients.push(client);
    }

    let group = harness.groups.create(alice, group_body("Team", vec![bob, carol])).await.unwrap();
    server.send(GetOnlineUsers).await.unwrap();
    for client in &clients {
        client.send(Drain).await.unwrap();
    }

    let sent =
        harness.messages.send_group_message(alice, group.conversation_id, text("standup"), None).await.unwrap();
    server.send(GetOnlineUsers).await.unwrap();

    for client in &clients {
        let received = client.send(Drain).await.unwrap();
        let names: Vec<_> = received.iter().map(ServerMessage::event_name).collect();
        assert_eq!(names, vec!["updateLastMessage", "receiveGroupMessage"]);
        match &received[1] {
            ServerMessage::ReceiveGroupMessage { conversation_id, message } => {
                assert_eq!(*conversation_id, group.conversation_id);
                assert_eq!(message["id"], serde_json::json!(sent.id));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    let history = harness.messages.get_by_conversation(group.conversation_id, bob).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, sent.id);
}

#[actix_web::test]
async fn test_friend_request_flow() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;

    let request = harness.friends.send_friend_request(alice, bob, Some("hey".into())).await.unwrap();
    assert_eq!(recorder.received_by(&bob), vec!["newFriendRequest"]);
    assert!(matches!(
        harness.friends.send_friend_request(bob, alice, None).await,
        Err(error::SystemError::Conflict(_))
    ));
    assert!(matches!(
        harness.friends.accept_friend_request(alice, request.id).await,
        Err(error::SystemError::Forbidden(_))
    ));

    let incoming = harness.friends.get_friend_requests(bob).await.unwrap();
    assert_eq!(incoming.len(), 1);
    assert_eq!(harness.friends.get_received_requests(bob).await.unwrap()[0].id, request.id);
    assert!(harness.friends.get_sent_requests(bob).await.unwrap().is_empty());
    assert_eq!(harness.friends.get_sent_requests(alice).await.unwrap()[0].id, request.id);

    recorder.clear();
    let friend = harness.friends.accept_friend_request(bob, request.id).await.unwrap();
    assert_eq!(friend.id, alice);
    assert_eq!(recorder.received_by(&alice), vec!["friendRequestResponse", "newFriend"]);
    assert_eq!(recorder.received_by(&bob), vec!["newFriend"]);

    assert_eq!(harness.friends.get_friends(alice).await.unwrap()[0].id, bob);
    assert!(matches!(
        harness.friends.send_friend_request(alice, bob, None).await,
        Err(error::SystemError::Conflict(_))
    ));

    harness.friends.remove_friend(bob, alice).await.unwrap();
    assert!(matches!(
        harness.friends.remove_friend(bob, alice).await,
        Err(error::SystemError::NotFound(_))
    ));
}

#[actix_web::test]
async fn test_cancelled_request_notifies_addressee() {
    let (harness, recorder) = Harness::recording();
    let alice = harness.store.add_user("alice").await;
    let bob = harness.store.add_user("bob").await;

    let request = harness.friends.send_friend_request(alice, bob, None).await.unwrap();
    assert!(matches!(
        harness.friends.cancel_friend_request(bob, request.id).await,
        Err(error::SystemError::Forbidden(_))
    ));

    recorder.clear();
    harness.friends.cancel_friend_request(alice, request.id).await.unwrap();
    assert_eq!(recorder.received_by(&bob), vec!["friendRequestCancelled"]);
    assert!(harness.friends.get_friend_requests(bob).await.unwrap().is_empty());
}

#[actix_web::test]
async fn test_admins_only_group_walkthrough() {
    let server =
        WebSocketServer::new(Box::new(LocalPresenceRegistry::new()), Arc::new(MemoryLastSeen::default()))
            .start();
    let harness = Harness::new(Arc::new(server.clone()));
    let u1 = harness.store.add_user("u1").await;
    let u2 = harness.store.add_user("u2").await;

    let mut clients = Vec::new();
    for user_id in [u1, u2] {
        let client = FakeClient::default().start();
        server.do_send(Register {
            user_id,
            handle: ConnectionHandle { session_id: Uuid::now_v7(), recipient: client.clone().recipient() },
        });
        clients.push(client);
    }

    let group = harness.groups.create(u1, group_body("Ops", vec![])).await.unwrap();
    harness.groups.add_member(group.id, u2, u1).await.unwrap();
    harness
        .groups
        .update_info(
            group.id,
            UpdateGroupBody { who_can_send_messages: Some(PermissionSetting::Admins), ..Default::default() },
            u1,
        )
        .await
        .unwrap();

    assert!(matches!(
        harness.messages.send_group_message(u2, group.conversation_id, text("hello"), None).await,
        Err(error::SystemError::Forbidden(_))
    ));

    harness.groups.change_role(group.id, u2, GroupRole::Admin, u1).await.unwrap();
    server.send(GetOnlineUsers).await.unwrap();
    for client in &clients {
        client.send(Drain).await.unwrap();
    }

    harness.messages.send_group_message(u2, group.conversation_id, text("hello"), None).await.unwrap();
    server.send(GetOnlineUsers).await.unwrap();
    for client in &clients {
        let received = client.send(Drain).await.unwrap();
        let group_messages =
            received.iter().filter(|m| m.event_name() == "receiveGroupMessage").count();
        assert_eq!(group_messages, 1);
    }

    assert!(matches!(
        harness.groups.remove_member(group.id, u1, u1).await,
        Err(error::SystemError::BadRequest(_))
    ));
}
