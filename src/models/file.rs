use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct FileUploadResponse {
    pub message: String,
    pub url: String,
}
