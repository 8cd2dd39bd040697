use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    Client,
    config::{Credentials, Region},
    error::DisplayErrorContext,
};
use tracing::{debug, error};

use crate::storage::{BlobStore, S3Config, StorageError, StoredObject};

pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub async fn new(config: &S3Config) -> Result<Self, StorageError> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::Backend("S3 bucket name is empty".to_string()));
        }

        let mut aws_config_builder = aws_config::defaults(BehaviorVersion::latest());

        // Without a region the default provider chain decides
        if let Some(region) = &config.region {
            aws_config_builder = aws_config_builder.region(Region::new(region.clone()));
        }

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials =
                Credentials::new(access_key, secret_key, None, None, "henkan-s3-store");
            aws_config_builder = aws_config_builder.credentials_provider(credentials);
        }

        let aws_config = aws_config_builder.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
            .force_path_style(config.force_path_style);
        if let Some(endpoint) = &config.endpoint {
            s3_config = s3_config.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(s3_config.build()),
            bucket: config.bucket.clone(),
        })
    }
}

#[async_trait]
impl BlobStore for S3Store {
    async fn fetch(&self, key: &str) -> Result<StoredObject, StorageError> {
        debug!("Fetching s3://{}/{}", self.bucket, key);

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_no_such_key())
                    || err
                        .raw_response()
                        .is_some_and(|response| response.status().as_u16() == 404);

                if missing {
                    return Err(StorageError::NotFound(key.to_string()));
                }

                error!("S3 GetObject failed for {}: {}", key, DisplayErrorContext(&err));
                return Err(StorageError::Backend(DisplayErrorContext(&err).to_string()));
            }
        };

        let content_type = output.content_type().map(str::to_string);
        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(StoredObject {
            bytes: body.into_bytes().to_vec(),
            content_type,
        })
    }

    fn name(&self) -> &str {
        "s3"
    }
}
