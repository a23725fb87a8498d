use actix_cors::Cors;
use actix_web::{
    self, http, App, HttpServer,
    middleware::{Logger, from_fn},
    web,
};
use std::sync::{Arc, LazyLock};

use actix::Actor;

use crate::{
    configs::{connect_database, connect_redis, init_tracing},
    middlewares::authentication,
    modules::{
        conversation::{repository_pg::ConversationPgRepository, service::ConversationService},
        file_upload::{LocalFileStorage, UploadConfig},
        friend::{repository_pg::FriendRepositoryPg, service::FriendService},
        group::{repository_pg::GroupPgRepository, service::GroupService},
        message::{repository_pg::MessageRepositoryPg, service::MessageService},
        user::repository_pg::UserRepositoryPg,
        websocket::{
            broadcaster::Broadcaster,
            presence::{LastSeenStore, LocalPresenceRegistry, RedisLastSeenStore},
            server::WebSocketServer,
        },
    },
};

mod api;
mod configs;
mod constants;
mod middlewares;
mod modules;
#[cfg(test)]
mod test;
mod utils;

pub static ENV: LazyLock<constants::Env> = LazyLock::new(|| {
    dotenvy::dotenv().ok();
    constants::Env::default()
});

#[actix_web::get("/")]
async fn health_check() -> &'static str {
    "Server is running"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    LazyLock::force(&ENV);
    init_tracing();
    tracing::info!("Environment variables loaded");

    let db_pool =
        connect_database().await.map_err(|_| std::io::Error::other("Database connection error"))?;

    let redis_pool = connect_redis().map_err(|_| std::io::Error::other("Redis connection error"))?;

    let user_repo = Arc::new(UserRepositoryPg::new(db_pool.clone()));
    let conversation_repo = Arc::new(ConversationPgRepository::new(db_pool.clone()));
    let group_repo = Arc::new(GroupPgRepository::new(db_pool.clone()));
    let message_repo = Arc::new(MessageRepositoryPg::new(db_pool.clone()));
    let friend_repo = Arc::new(FriendRepositoryPg::new(db_pool.clone()));

    let storage = web::Data::new(LocalFileStorage::new(UploadConfig::from_env()));

    let last_seen: Arc<dyn LastSeenStore> = Arc::new(RedisLastSeenStore::new(redis_pool));
    let ws_server =
        WebSocketServer::new(Box::new(LocalPresenceRegistry::new()), last_seen.clone()).start();
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(ws_server.clone());

    let conversation_service = web::Data::new(ConversationService::with_dependencies(
        conversation_repo.clone(),
        user_repo.clone(),
    ));
    let group_service = web::Data::new(GroupService::with_dependencies(
        group_repo.clone(),
        conversation_repo.clone(),
        user_repo.clone(),
        broadcaster.clone(),
    ));
    let message_service = web::Data::new(MessageService::with_dependencies(
        message_repo,
        conversation_repo,
        group_repo,
        user_repo.clone(),
        storage.clone().into_inner(),
        broadcaster.clone(),
    ));
    let friend_service =
        web::Data::new(FriendService::with_dependencies(friend_repo, user_repo, broadcaster));

    let ws_server = web::Data::new(ws_server);
    let last_seen = web::Data::new(last_seen);

    tracing::info!("Starting server at http://{}:{}", ENV.ip.as_str(), ENV.port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&ENV.frontend_url)
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
            .allowed_headers(vec![http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(conversation_service.clone())
            .app_data(group_service.clone())
            .app_data(message_service.clone())
            .app_data(friend_service.clone())
            .app_data(storage.clone())
            .app_data(ws_server.clone())
            .app_data(last_seen.clone())
            .service(health_check)
            .configure(modules::file_upload::route::configure)
            .configure(modules::websocket::route::configure_socket)
            .service(
                web::scope("/api")
                    .wrap(from_fn(authentication))
                    .configure(modules::conversation::route::configure)
                    .configure(modules::message::route::configure)
                    .configure(modules::group::route::configure)
                    .configure(modules::friend::route::configure)
                    .configure(modules::websocket::route::configure),
            )
    })
    .bind((ENV.ip.as_str(), ENV.port))?
    .workers(2)
    .run()
    .await
}
