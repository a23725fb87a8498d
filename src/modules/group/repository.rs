use uuid::Uuid;

use crate::{
    api::error,
    modules::{conversation::schema::ConversationEntity, group::schema::GroupEntity},
};

/// Store for the group aggregate. Every write also updates the paired
/// conversation inside the same transaction.
#[async_trait::async_trait]
pub trait GroupRepository {
    async fn find_by_id(&self, group_id: &Uuid) -> Result<Option<GroupEntity>, error::SystemError>;

    async fn find_by_invite_code(
        &self,
        code: &str,
    ) -> Result<Option<GroupEntity>, error::SystemError>;

    async fn find_by_conversation_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<GroupEntity>, error::SystemError>;

    /// Groups the user belongs to, most recently updated first.
    async fn find_all_by_member(&self, user_id: &Uuid)
    -> Result<Vec<GroupEntity>, error::SystemError>;

    async fn create_with_conversation(
        &self,
        group: &GroupEntity,
    ) -> Result<(GroupEntity, ConversationEntity), error::SystemError>;

    /// Commits `group` if its `version` is still current and mirrors it into the
    /// conversation. Returns `SystemError::VersionConflict` otherwise.
    async fn save(&self, group: &GroupEntity) -> Result<GroupEntity, error::SystemError>;

    async fn delete_with_conversation(&self, group: &GroupEntity)
    -> Result<(), error::SystemError>;
}
