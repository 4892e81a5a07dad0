use crate::{
    AppState,
    errors::AppError,
    flash::{Flash, FlashRedirect},
    policy, render,
};
use axum::{
    body::Body,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::{CookieJar, SignedCookieJar};
use http::{HeaderMap, HeaderValue, header};
use std::fmt::Write;
use tokio_util::io::ReaderStream;

pub async fn health() -> &'static str {
    "OK"
}

pub async fn index(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    raw: CookieJar,
) -> (SignedCookieJar, CookieJar, Html<String>) {
    let (jar, raw, mut flash) = Flash::take(jar, raw);

    let files = match state.storage.list().await {
        Ok(files) => files,
        Err(err) => {
            tracing::error!("Failed to list storage directory: {}", err);
            flash = Some(Flash::error(format!("Could not list files: {err}")));
            Vec::new()
        }
    };

    (jar, raw, Html(render::index_page(&files, flash.as_ref())))
}

pub async fn upload(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let result = match multipart {
        Ok(multipart) => receive_upload(&state, multipart).await,
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    };

    match result {
        Ok(name) => {
            tracing::info!("Stored upload {}", name);
            let flash = Flash::success(format!("File \"{name}\" uploaded successfully"));
            FlashRedirect::new(jar, flash).into_response()
        }
        Err(err @ AppError::TooLarge(_)) => {
            tracing::warn!("Rejected upload: {}", err);
            // The body was not consumed, so answer with the page directly
            // instead of asking the browser to follow a redirect.
            let files = match state.storage.list().await {
                Ok(files) => files,
                Err(list_err) => {
                    tracing::error!("Failed to list storage directory: {}", list_err);
                    Vec::new()
                }
            };
            let page = render::index_page(&files, Some(&Flash::error(err.to_string())));
            (err.status(), Html(page)).into_response()
        }
        Err(err) => {
            tracing::warn!("Rejected upload: {}", err);
            FlashRedirect::new(jar, Flash::error(err.to_string())).into_response()
        }
    }
}

/// Streams the `file` field into storage and returns the stored name.
async fn receive_upload(state: &AppState, mut multipart: Multipart) -> Result<String, AppError> {
    let limit = state.config.max_upload_bytes;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::from_multipart(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(AppError::NoFileSelected);
        }
        if !policy::is_extension_allowed(&filename) {
            return Err(AppError::DisallowedType);
        }
        let name = policy::sanitize(&filename);
        if name.is_empty() || !policy::is_extension_allowed(&name) {
            return Err(AppError::InvalidFilename);
        }

        // Dropping `upload` on any early return discards the partial file.
        let mut upload = state.storage.create(&name).await?;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::from_multipart(e, limit))?
        {
            upload.write(&chunk).await?;
        }
        upload.commit().await?;

        return Ok(name);
    }

    Err(AppError::NoFileSelected)
}

pub async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    jar: SignedCookieJar,
) -> Result<Response, FlashRedirect> {
    let (file, size) = match state.storage.open(&filename).await.map_err(AppError::from) {
        Ok(found) => found,
        Err(AppError::NotFound) => {
            tracing::info!("Download of missing file {:?}", filename);
            return Err(FlashRedirect::new(jar, Flash::error("File not found")));
        }
        Err(err) => {
            tracing::error!("Download of {:?} failed: {}", filename, err);
            return Err(FlashRedirect::new(
                jar,
                Flash::error(format!("Download failed: {err}")),
            ));
        }
    };

    let Some(headers) = attachment_headers(&filename, size) else {
        return Err(FlashRedirect::new(
            jar,
            Flash::error(AppError::InvalidFilename.to_string()),
        ));
    };

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((headers, body).into_response())
}

fn attachment_headers(filename: &str, size: u64) -> Option<HeaderMap> {
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    let quoted = fallback.replace('\\', "\\\\").replace('"', "\\\"");
    let mut disposition = format!("attachment; filename=\"{quoted}\"");
    if !filename.is_ascii() {
        let _ = write!(
            disposition,
            "; filename*=UTF-8''{}",
            urlencoding::encode(filename)
        );
    }

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime::APPLICATION_OCTET_STREAM.as_ref()).ok()?,
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).ok()?,
    );
    Some(headers)
}

pub async fn delete(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    jar: SignedCookieJar,
) -> FlashRedirect {
    let flash = match state.storage.delete(&filename).await.map_err(AppError::from) {
        Ok(()) => {
            tracing::info!("Deleted {}", filename);
            Flash::success(format!("File \"{filename}\" deleted successfully"))
        }
        Err(AppError::NotFound) => Flash::error("File not found"),
        Err(err) => {
            tracing::error!("Deleting {:?} failed: {}", filename, err);
            Flash::error(format!("Delete failed: {err}"))
        }
    };

    FlashRedirect::new(jar, flash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_keeps_the_name() {
        let headers = attachment_headers("notes.txt", 5).unwrap();
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"notes.txt\""
        );
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(headers[header::CONTENT_LENGTH], "5");
    }

    #[test]
    fn attachment_quotes_are_escaped() {
        let headers = attachment_headers("a\"b.txt", 1).unwrap();
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"a\\\"b.txt\""
        );
    }

    #[test]
    fn non_ascii_names_get_an_extended_parameter() {
        let headers = attachment_headers("grüße.pdf", 1).unwrap();
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"gr__e.pdf\"; filename*=UTF-8''gr%C3%BC%C3%9Fe.pdf"
        );
    }

    #[test]
    fn control_characters_are_refused() {
        assert!(attachment_headers("bad\nname.txt", 1).is_none());
    }
}
