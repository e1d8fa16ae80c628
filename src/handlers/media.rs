/// Serving stored post images
use actix_web::{web, HttpResponse};

use crate::error::{AppError, Result};
use crate::media::MediaStore;

/// `/media/{path}`. Unknown or out-of-root paths are a 404.
pub async fn serve_media(
    path: web::Path<String>,
    store: web::Data<MediaStore>,
) -> Result<HttpResponse> {
    let rel = path.into_inner();
    let full = store
        .resolve(&rel)
        .ok_or_else(|| AppError::NotFound(format!("media '{}'", rel)))?;

    let bytes = tokio::fs::read(&full)
        .await
        .map_err(|_| AppError::NotFound(format!("media '{}'", rel)))?;
    let mime = mime_guess::from_path(&full).first_or_octet_stream();

    Ok(HttpResponse::Ok().content_type(mime.as_ref()).body(bytes))
}
