pub mod auth;
pub mod command;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod init;
pub mod job;
pub mod manifest;
pub mod render;
pub mod server;
pub mod upload;

pub use error::RenderError;

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "ERROR" => tracing::error!(tag = tag, "{}", message),
        "WARN" => tracing::warn!(tag = tag, "{}", message),
        "DEBUG" => tracing::debug!(tag = tag, "{}", message),
        _ => tracing::info!(tag = tag, "{}", message),
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}

pub(crate) fn loge(message: impl AsRef<str>) {
    logv("ERROR", message.as_ref());
}

pub(crate) fn logd(message: impl AsRef<str>) {
    logv("DEBUG", message.as_ref());
}
