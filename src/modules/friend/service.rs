use std::sync::Arc;

use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        friend::{
            model::{FriendRequestResponse, FriendResponse, IdOrInfo},
            repository::FriendRepository,
            schema::FriendRequestEntity,
        },
        user::repository::UserRepository,
        websocket::{
            broadcaster::Broadcaster,
            message::{payload, ServerMessage},
        },
    },
};

#[derive(Clone)]
pub struct FriendService<R, U>
where
    R: FriendRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    friend_repo: Arc<R>,
    user_repo: Arc<U>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl<R, U> FriendService<R, U>
where
    R: FriendRepository + Send + Sync,
    U: UserRepository + Send + Sync,
{
    pub fn with_dependencies(
        friend_repo: Arc<R>,
        user_repo: Arc<U>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        FriendService { friend_repo, user_repo, broadcaster }
    }

    async fn find_user(&self, user_id: &Uuid) -> Result<FriendResponse, error::SystemError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .map(FriendResponse::from)
            .ok_or_else(|| error::SystemError::not_found("User not found"))
    }

    async fn find_request(&self, request_id: &Uuid) -> Result<FriendRequestEntity, error::SystemError> {
        self.friend_repo
            .find_request_by_id(request_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Friend request not found"))
    }

    pub async fn get_friends(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendResponse>, error::SystemError> {
        self.friend_repo.find_friends(&user_id).await
    }

    pub async fn remove_friend(
        &self,
        user_id: Uuid,
        friend_id: Uuid,
    ) -> Result<(), error::SystemError> {
        if !self.friend_repo.delete_friendship(&user_id, &friend_id).await? {
            return Err(error::SystemError::not_found("Friendship not found"));
        }
        Ok(())
    }

    pub async fn send_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: Option<String>,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        if receiver_id == sender_id {
            return Err(error::SystemError::bad_request("Cannot send friend request to yourself"));
        }

        self.user_repo
            .find_by_id(&receiver_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Receiver user not found"))?;

        let (already_friends, pending) = tokio::try_join!(
            self.friend_repo.are_friends(&sender_id, &receiver_id),
            self.friend_repo.find_request_between(&sender_id, &receiver_id),
        )?;

        if already_friends {
            return Err(error::SystemError::conflict("Users are already friends"));
        }

        if pending.is_some() {
            return Err(error::SystemError::conflict("Friend request already exists"));
        }

        let request = self.friend_repo.create_request(&sender_id, &receiver_id, &message).await?;

        let from = self.find_user(&sender_id).await?;
        self.broadcaster.notify(
            &[receiver_id],
            ServerMessage::NewFriendRequest {
                request: payload(&FriendRequestResponse {
                    id: request.id,
                    from: IdOrInfo::Info(from),
                    to: IdOrInfo::Id(receiver_id),
                    message: request.message.clone(),
                    created_at: request.created_at,
                }),
            },
        );

        Ok(request)
    }

    pub async fn accept_friend_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<FriendResponse, error::SystemError> {
        let request = self.friend_repo.accept_request_atomic(&request_id, &user_id).await?;

        let (sender, receiver) =
            tokio::try_join!(self.find_user(&request.from_user_id), self.find_user(&user_id))?;

        tracing::info!("Users {} and {} are now friends", request.from_user_id, user_id);

        self.broadcaster.notify(
            &[request.from_user_id],
            ServerMessage::FriendRequestResponse { request_id, accepted: true, responded_by: user_id },
        );
        self.broadcaster
            .notify(&[request.from_user_id], ServerMessage::NewFriend { friend: payload(&receiver) });
        self.broadcaster.notify(&[user_id], ServerMessage::NewFriend { friend: payload(&sender) });

        Ok(sender)
    }

    pub async fn decline_friend_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let request = self.find_request(&request_id).await?;

        if request.to_user_id != user_id {
            return Err(error::SystemError::forbidden(
                "You are not allowed to decline this friend request",
            ));
        }

        self.friend_repo.delete_request(&request_id).await?;

        self.broadcaster.notify(
            &[request.from_user_id],
            ServerMessage::FriendRequestResponse { request_id, accepted: false, responded_by: user_id },
        );

        Ok(())
    }

    pub async fn cancel_friend_request(
        &self,
        user_id: Uuid,
        request_id: Uuid,
    ) -> Result<(), error::SystemError> {
        let request = self.find_request(&request_id).await?;

        if request.from_user_id != user_id {
            return Err(error::SystemError::forbidden(
                "You are not allowed to cancel this friend request",
            ));
        }

        self.friend_repo.delete_request(&request_id).await?;

        self.broadcaster.notify(
            &[request.to_user_id],
            ServerMessage::FriendRequestCancelled { request_id, cancelled_by: user_id },
        );

        Ok(())
    }

    pub async fn get_received_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        self.friend_repo.find_requests_to_user(&user_id).await
    }

    pub async fn get_sent_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        self.friend_repo.find_requests_from_user(&user_id).await
    }

    /// Incoming requests first, then outgoing.
    pub async fn get_friend_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let (requests_to, requests_from) = tokio::try_join!(
            self.get_received_requests(user_id),
            self.get_sent_requests(user_id),
        )?;

        let mut all = Vec::with_capacity(requests_to.len() + requests_from.len());
        all.extend(requests_to);
        all.extend(requests_from);
        Ok(all)
    }
}
