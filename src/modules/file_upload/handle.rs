use std::collections::HashMap;

use actix_multipart::Multipart;
use actix_web::{get, web, HttpResponse};
use futures_util::TryStreamExt;

use crate::api::error;
use crate::constants::MAX_FORM_FIELD_SIZE;
use crate::modules::file_upload::{schema::UploadedFile, service::LocalFileStorage};

/// Text fields plus at most one attachment of a multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub file: Option<UploadedFile>,
}

impl MultipartForm {
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Reads the whole form. The part named `file` is the attachment; reading stops
/// as soon as it exceeds `max_file_size`. Every other part is capped at
/// `MAX_FORM_FIELD_SIZE`.
pub async fn read_multipart(
    mut payload: Multipart,
    max_file_size: usize,
) -> Result<MultipartForm, error::Error> {
    let mut form = MultipartForm::default();

    while let Some(mut field) =
        payload.try_next().await.map_err(|e| error::Error::bad_request(e.to_string()))?
    {
        let content_disposition = field
            .content_disposition()
            .ok_or_else(|| error::Error::bad_request("Missing content disposition"))?;

        let name = content_disposition.get_name().unwrap_or_default().to_string();
        let filename = content_disposition.get_filename().map(str::to_string);

        let limit = if filename.is_some() { max_file_size } else { MAX_FORM_FIELD_SIZE };

        let mut bytes = Vec::new();
        while let Some(chunk) =
            field.try_next().await.map_err(|e| error::Error::bad_request(e.to_string()))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > limit {
                let what = if filename.is_some() { "File".to_string() } else { format!("Field '{name}'") };
                return Err(error::Error::PayloadTooLarge(
                    format!("{what} exceeds maximum allowed size of {limit} bytes").into(),
                ));
            }
        }

        match filename {
            Some(file_name) if name == "file" => {
                // Browsers do not always send a part content type.
                let content_type = field
                    .content_type()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| {
                        mime_guess::from_path(&file_name).first_or_octet_stream().to_string()
                    });

                form.file = Some(UploadedFile { file_name, content_type, bytes });
            }
            _ => {
                let value = String::from_utf8(bytes)
                    .map_err(|_| error::Error::bad_request(format!("Field '{name}' is not valid UTF-8")))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

#[get("/uploads/{file_name}")]
pub async fn serve_upload(
    storage: web::Data<LocalFileStorage>,
    file_name: web::Path<String>,
) -> Result<HttpResponse, error::Error> {
    let path = storage.resolve(&file_name).ok_or_else(|| error::Error::not_found("File not found"))?;

    let bytes = tokio::fs::read(&path).await.map_err(|_| error::Error::not_found("File not found"))?;
    let content_type = mime_guess::from_path(&path).first_or_octet_stream();

    Ok(HttpResponse::Ok().content_type(content_type.to_string()).body(bytes))
}

#[cfg(test)]
mod tests {
    use actix_multipart::test::create_form_data_payload_and_headers;
    use actix_web::{error::PayloadError, web::Bytes};
    use futures_util::stream;

    use super::*;

    fn form(name: &str, filename: Option<&str>, body: Vec<u8>) -> Multipart {
        let (payload, headers) = create_form_data_payload_and_headers(
            name,
            filename.map(str::to_string),
            None,
            Bytes::from(body),
        );
        Multipart::new(&headers, stream::iter([Ok::<_, PayloadError>(payload)]))
    }

    #[actix_web::test]
    async fn test_reads_text_field() {
        let parsed = read_multipart(form("content", None, b"hello".to_vec()), 16).await.unwrap();
        assert_eq!(parsed.text("content"), Some("hello"));
        assert!(parsed.file.is_none());
    }

    #[actix_web::test]
    async fn test_reads_file_part_and_guesses_type() {
        let parsed = read_multipart(form("file", Some("cat.png"), vec![1, 2, 3]), 16).await.unwrap();
        let file = parsed.file.unwrap();
        assert_eq!(file.file_name, "cat.png");
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.bytes, vec![1, 2, 3]);
    }

    #[actix_web::test]
    async fn test_oversized_file_is_rejected() {
        let result = read_multipart(form("file", Some("big.bin"), vec![0; 17]), 16).await;
        assert!(matches!(result, Err(error::Error::PayloadTooLarge(_))));
    }

    #[actix_web::test]
    async fn test_oversized_text_field_is_rejected() {
        let body = vec![b'a'; MAX_FORM_FIELD_SIZE + 1];
        let result = read_multipart(form("content", None, body), usize::MAX).await;
        assert!(matches!(result, Err(error::Error::PayloadTooLarge(_))));
    }
}
