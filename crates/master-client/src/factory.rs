use std::sync::Arc;

use async_trait::async_trait;
use namespace::{
    BlockMasterClient, ConnectionError, FileSystemMasterClient, MasterClientFactory,
    MasterEndpoint, SecurityConfig, TransportConfig,
};
use reqwest::Client;
use tracing::info;

use crate::{HttpBlockMasterClient, HttpFileSystemMasterClient, MasterConnection};

/// Process-wide source of HTTP master clients.
///
/// Build one per process and share it (behind an `Arc`) with every session;
/// all clients it hands out reuse the same connection pool.
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    http: Client,
    transport: TransportConfig,
}

impl HttpClientFactory {
    pub fn new(transport: TransportConfig) -> Result<Self, ConnectionError> {
        let http = Client::builder()
            .timeout(transport.request_timeout())
            .build()
            .map_err(|e| ConnectionError::Transport {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self { http, transport })
    }

    async fn connect(
        &self,
        endpoint: &MasterEndpoint,
        security: &SecurityConfig,
    ) -> Result<MasterConnection, ConnectionError> {
        let connection = MasterConnection::new(
            self.http.clone(),
            endpoint,
            security,
            self.transport.clone(),
        )?;
        let version = connection.handshake().await?;
        info!(
            %endpoint,
            %version,
            authentication = %security.authentication,
            "connected to namespace master"
        );
        Ok(connection)
    }
}

#[async_trait]
impl MasterClientFactory for HttpClientFactory {
    async fn acquire_file_system_master_client(
        &self,
        endpoint: &MasterEndpoint,
        security: &SecurityConfig,
    ) -> Result<Arc<dyn FileSystemMasterClient>, ConnectionError> {
        let connection = self.connect(endpoint, security).await?;
        Ok(Arc::new(HttpFileSystemMasterClient::new(connection)))
    }

    async fn acquire_block_master_client(
        &self,
        endpoint: &MasterEndpoint,
        security: &SecurityConfig,
    ) -> Result<Arc<dyn BlockMasterClient>, ConnectionError> {
        let connection = self.connect(endpoint, security).await?;
        Ok(Arc::new(HttpBlockMasterClient::new(connection)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> HttpClientFactory {
        HttpClientFactory::new(TransportConfig {
            max_attempts: 1,
            ..TransportConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn acquisition_performs_handshake() {
        let mut server = mockito::Server::new_async().await;
        let version = server
            .mock("GET", "/api/v1/master/version")
            .with_status(200)
            .with_body(r#"{"version":"1.4.0"}"#)
            .expect(2)
            .create_async()
            .await;

        let endpoint = MasterEndpoint::parse(&server.host_with_port()).unwrap();
        let factory = factory();
        factory
            .acquire_file_system_master_client(&endpoint, &SecurityConfig::default())
            .await
            .unwrap();
        factory
            .acquire_block_master_client(&endpoint, &SecurityConfig::default())
            .await
            .unwrap();
        version.assert_async().await;
    }

    #[tokio::test]
    async fn failed_handshake_fails_acquisition() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/master/version")
            .with_status(200)
            .with_body("<html>not a master</html>")
            .create_async()
            .await;

        let endpoint = MasterEndpoint::parse(&server.host_with_port()).unwrap();
        let result = factory()
            .acquire_file_system_master_client(&endpoint, &SecurityConfig::default())
            .await;
        assert!(matches!(result, Err(ConnectionError::Handshake { .. })));
    }
}
