use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix::prelude::*;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::service::ConversationService,
        file_upload::{FileMeta, FileStorage, UploadedFile},
        friend::service::FriendService,
        group::service::GroupService,
        message::service::MessageService,
        websocket::{broadcaster::Broadcaster, message::ServerMessage, presence::LastSeenStore},
    },
    test::memory::MemoryStore,
};

/// Stand-in for a session actor: records every event it is sent.
#[derive(Default)]
pub struct FakeClient {
    received: Vec<ServerMessage>,
}

impl Actor for FakeClient {
    type Context = Context<Self>;
}

impl Handler<ServerMessage> for FakeClient {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _ctx: &mut Context<Self>) {
        self.received.push(msg);
    }
}

/// Takes everything received so far.
#[derive(Message)]
#[rtype(result = "Vec<ServerMessage>")]
pub struct Drain;

impl Handler<Drain> for FakeClient {
    type Result = MessageResult<Drain>;

    fn handle(&mut self, _msg: Drain, _ctx: &mut Context<Self>) -> Self::Result {
        MessageResult(std::mem::take(&mut self.received))
    }
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Halt;

impl Handler<Halt> for FakeClient {
    type Result = ();

    fn handle(&mut self, _msg: Halt, ctx: &mut Context<Self>) {
        ctx.stop();
    }
}

#[derive(Default)]
pub struct MemoryLastSeen {
    entries: Mutex<HashMap<Uuid, String>>,
}

impl MemoryLastSeen {
    pub fn get(&self, user_id: &Uuid) -> Option<String> {
        self.entries.lock().unwrap().get(user_id).cloned()
    }
}

#[async_trait::async_trait]
impl LastSeenStore for MemoryLastSeen {
    async fn record(
        &self,
        user_id: Uuid,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), error::SystemError> {
        self.entries.lock().unwrap().insert(user_id, at.to_rfc3339());
        Ok(())
    }

    async fn get_many(&self, user_ids: &[Uuid]) -> Result<Vec<Option<String>>, error::SystemError> {
        let entries = self.entries.lock().unwrap();
        Ok(user_ids.iter().map(|id| entries.get(id).cloned()).collect())
    }
}

/// Broadcaster that keeps `(recipients, event)` pairs for assertions.
#[derive(Default)]
pub struct RecordingBroadcaster {
    sent: Mutex<Vec<(Vec<Uuid>, ServerMessage)>>,
}

impl RecordingBroadcaster {
    pub fn events(&self) -> Vec<(Vec<Uuid>, ServerMessage)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn named(&self, event: &str) -> Vec<(Vec<Uuid>, ServerMessage)> {
        self.events().into_iter().filter(|(_, msg)| msg.event_name() == event).collect()
    }

    /// Event names addressed to `user_id`, in emission order.
    pub fn received_by(&self, user_id: &Uuid) -> Vec<&'static str> {
        self.events()
            .iter()
            .filter(|(to, _)| to.contains(user_id))
            .map(|(_, msg)| msg.event_name())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Broadcaster for RecordingBroadcaster {
    fn notify(&self, user_ids: &[Uuid], event: ServerMessage) {
        self.sent.lock().unwrap().push((user_ids.to_vec(), event));
    }
}

/// Keeps uploads in memory and counts them.
#[derive(Default)]
pub struct MemoryStorage {
    stored: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn stored(&self) -> usize {
        self.stored.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl FileStorage for MemoryStorage {
    async fn upload(&self, file: UploadedFile) -> Result<FileMeta, error::SystemError> {
        let stored_name = format!("{}-{}", Uuid::now_v7(), file.file_name);
        self.stored.lock().unwrap().push(stored_name.clone());
        Ok(FileMeta {
            url: format!("http://localhost/uploads/{stored_name}"),
            file_type: file.content_type,
            file_name: file.file_name,
            file_size: file.bytes.len() as i64,
        })
    }

    async fn remove(&self, meta: &FileMeta) -> Result<(), error::SystemError> {
        self.stored.lock().unwrap().retain(|name| !meta.url.ends_with(name.as_str()));
        Ok(())
    }
}

pub struct FailingStorage;

#[async_trait::async_trait]
impl FileStorage for FailingStorage {
    async fn upload(&self, _file: UploadedFile) -> Result<FileMeta, error::SystemError> {
        Err(error::SystemError::InternalError("disk unavailable".into()))
    }

    async fn remove(&self, _meta: &FileMeta) -> Result<(), error::SystemError> {
        Ok(())
    }
}

pub type TestGroups = GroupService<MemoryStore, MemoryStore, MemoryStore>;
pub type TestMessages = MessageService<MemoryStore, MemoryStore, MemoryStore, MemoryStore>;
pub type TestConversations = ConversationService<MemoryStore, MemoryStore>;
pub type TestFriends = FriendService<MemoryStore, MemoryStore>;

/// Every service wired to one shared in-memory store.
pub struct Harness {
    pub store: MemoryStore,
    pub groups: TestGroups,
    pub messages: TestMessages,
    pub conversations: TestConversations,
    pub friends: TestFriends,
}

impl Harness {
    pub fn new(broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self::with_storage(broadcaster, Arc::new(MemoryStorage::default()))
    }

    pub fn with_storage(broadcaster: Arc<dyn Broadcaster>, storage: Arc<dyn FileStorage>) -> Self {
        let store = MemoryStore::default();
        let repo = Arc::new(store.clone());

        Harness {
            groups: GroupService::with_dependencies(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                broadcaster.clone(),
            ),
            messages: MessageService::with_dependencies(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                repo.clone(),
                storage,
                broadcaster.clone(),
            ),
            conversations: ConversationService::with_dependencies(repo.clone(), repo.clone()),
            friends: FriendService::with_dependencies(repo.clone(), repo, broadcaster),
            store,
        }
    }

    /// Harness plus the recorder it broadcasts to.
    pub fn recording() -> (Self, Arc<RecordingBroadcaster>) {
        let recorder = Arc::new(RecordingBroadcaster::default());
        (Self::new(recorder.clone()), recorder)
    }
}

pub fn attachment(name: &str, bytes: &[u8]) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: "application/octet-stream".to_string(),
        bytes: bytes.to_vec(),
    }
}
