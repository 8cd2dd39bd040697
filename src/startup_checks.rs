use crate::Config;
use crate::storage::StorageConfig;
use crate::transform::color::parse_color;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Storage directory does not exist: {0}")]
    StorageDirectoryMissing(String),

    #[error("Storage directory is not readable: {0}")]
    StorageDirectoryUnreadable(#[from] std::io::Error),

    #[error("S3 bucket name is empty")]
    BucketNameMissing,

    #[error("Default background is not a valid colour: {0}")]
    InvalidDefaultBackground(String),

    #[error("Default quality {0} is above 100 and will be clamped")]
    QualityOutOfRange(u8),
}

impl StartupCheckError {
    /// Critical failures stop the server from starting.
    pub fn is_critical(&self) -> bool {
        !matches!(self, StartupCheckError::QualityOutOfRange(_))
    }
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    match &config.storage {
        StorageConfig::Filesystem(fs_config) => {
            let directory = Path::new(&fs_config.directory);
            if !directory.exists() {
                error!("Storage directory does not exist: {:?}", directory);
                errors.push(StartupCheckError::StorageDirectoryMissing(
                    directory.display().to_string(),
                ));
            } else {
                match tokio::fs::read_dir(directory).await {
                    Ok(_) => info!("Storage directory is accessible: {:?}", directory),
                    Err(e) => {
                        error!("Storage directory is not accessible: {}", e);
                        errors.push(StartupCheckError::StorageDirectoryUnreadable(e));
                    }
                }
            }
        }
        StorageConfig::S3(s3_config) => {
            if s3_config.bucket.trim().is_empty() {
                error!("S3 storage configured without a bucket name");
                errors.push(StartupCheckError::BucketNameMissing);
            } else {
                info!("S3 bucket: {}", s3_config.bucket);
            }
            if let Some(endpoint) = &s3_config.endpoint {
                info!("S3 endpoint override: {}", endpoint);
            }
        }
    }

    let transform = &config.transform;
    if parse_color(&transform.default_background).is_err() {
        error!(
            "Default background is not a valid colour: {}",
            transform.default_background
        );
        errors.push(StartupCheckError::InvalidDefaultBackground(
            transform.default_background.clone(),
        ));
    }

    if transform.default_quality > 100 {
        warn!(
            "Default quality {} is above 100, it will be clamped",
            transform.default_quality
        );
        errors.push(StartupCheckError::QualityOutOfRange(transform.default_quality));
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
