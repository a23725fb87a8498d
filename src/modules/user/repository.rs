use uuid::Uuid;

use crate::{api::error, modules::user::schema::UserEntity};

#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError>;

    /// Subset of `ids` that belong to existing users, in no particular order.
    async fn find_existing_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>, error::SystemError>;
}
