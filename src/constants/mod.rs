/// Attachments above this size are rejected by the file storage adapter.
pub const DEFAULT_MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Text parts of a multipart form larger than this are rejected.
pub const MAX_FORM_FIELD_SIZE: usize = 64 * 1024;

/// Bounded retries for optimistic group commits.
pub const GROUP_COMMIT_ATTEMPTS: usize = 3;

pub struct Env {
    pub jwt_secret: String,
    pub database_url: String,
    pub redis_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
    pub upload_dir: String,
    pub upload_base_url: String,
    pub max_upload_size: usize,
    pub log_level: String,
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");
        let redis_url = std::env::var("REDIS_URL")
            .expect("REDIS_URL must be set in .env file or environment variable");

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");

        let upload_dir = std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string());
        let upload_base_url = std::env::var("UPLOAD_BASE_URL")
            .unwrap_or_else(|_| format!("http://{ip}:{port}/uploads"));
        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .map(|v| v.parse::<usize>().expect("MAX_UPLOAD_SIZE must be a valid usize integer"))
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE);

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Env {
            jwt_secret,
            database_url,
            redis_url,
            frontend_url,
            ip,
            port,
            upload_dir,
            upload_base_url,
            max_upload_size,
            log_level,
        }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
