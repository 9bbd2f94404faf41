use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use super::{MetadataClient, RemoteLicenseRecord};
use crate::config::RemoteConfig;
use crate::error::MetadataError;
use crate::workspace::pom;

/// Reads published POMs from a Maven repository (Maven Central by default).
pub struct MavenCentralClient {
    client: Client,
    base_url: String,
}

impl MavenCentralClient {
    pub fn new(config: &RemoteConfig) -> Result<Self, MetadataError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("license-compat/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn artifact_url(&self, group_id: &str, artifact_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            group_id.replace('.', "/"),
            artifact_id
        )
    }

    /// Body of `url`, or `None` when the repository does not have it.
    async fn get_text(&self, url: &str) -> Result<Option<String>, MetadataError> {
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.text().await?)),
            status => Err(MetadataError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }),
        }
    }

    /// License names of the latest release of `identifier`.
    pub async fn fetch_one(
        &self,
        identifier: &str,
    ) -> Result<Option<RemoteLicenseRecord>, MetadataError> {
        let Some((group_id, artifact_id)) = identifier.split_once(':') else {
            return Err(MetadataError::MalformedCoordinate(identifier.to_string()));
        };
        let base = self.artifact_url(group_id, artifact_id);

        let Some(metadata) = self.get_text(&format!("{base}/maven-metadata.xml")).await? else {
            debug!(identifier, "artifact not found in repository");
            return Ok(None);
        };
        let Some(version) = pom::metadata_version(&metadata)? else {
            return Ok(None);
        };

        let pom_url = format!("{base}/{version}/{artifact_id}-{version}.pom");
        let Some(pom_xml) = self.get_text(&pom_url).await? else {
            return Ok(None);
        };
        let names = pom::license_names(&pom_xml)?;
        Ok(Some(RemoteLicenseRecord::from_names(identifier, names)))
    }
}

impl MetadataClient for MavenCentralClient {
    fn fetch_batch<'a>(
        &'a self,
        identifiers: &'a [String],
    ) -> BoxFuture<'a, Result<Vec<RemoteLicenseRecord>, MetadataError>> {
        Box::pin(async move {
            let results = join_all(identifiers.iter().map(|id| self.fetch_one(id))).await;

            let mut records = Vec::new();
            for (identifier, result) in identifiers.iter().zip(results) {
                match result {
                    Ok(Some(record)) => records.push(record),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(identifier = %identifier, error = %e, "cannot fetch license metadata")
                    }
                }
            }
            Ok(records)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_url() {
        let config = RemoteConfig {
            base_url: "https://repo.example.org/maven2/".to_string(),
            ..RemoteConfig::default()
        };
        let client = MavenCentralClient::new(&config).unwrap();
        assert_eq!(
            client.artifact_url("org.apache.commons", "commons-lang3"),
            "https://repo.example.org/maven2/org/apache/commons/commons-lang3"
        );
    }

    #[tokio::test]
    async fn test_malformed_identifier_is_rejected_locally() {
        let client = MavenCentralClient::new(&RemoteConfig::default()).unwrap();
        assert!(matches!(
            client.fetch_one("no-colon").await,
            Err(MetadataError::MalformedCoordinate(_))
        ));
    }
}
