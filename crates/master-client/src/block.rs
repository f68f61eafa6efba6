use async_trait::async_trait;
use namespace::{BlockMasterClient, ByteCount, NamespaceError, WorkerInfo};
use tracing::debug;

use crate::connection::MasterConnection;

/// [`BlockMasterClient`] over HTTP/JSON.
///
/// Transient failures are retried by the underlying [`MasterConnection`].
#[derive(Debug)]
pub struct HttpBlockMasterClient {
    connection: MasterConnection,
}

impl HttpBlockMasterClient {
    pub fn new(connection: MasterConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl BlockMasterClient for HttpBlockMasterClient {
    async fn capacity_bytes(&self) -> Result<ByteCount, NamespaceError> {
        self.connection
            .get_master("capacity_bytes", "capacity-bytes")
            .await
    }

    async fn used_bytes(&self) -> Result<ByteCount, NamespaceError> {
        self.connection.get_master("used_bytes", "used-bytes").await
    }

    async fn worker_info_list(&self) -> Result<Vec<WorkerInfo>, NamespaceError> {
        self.connection
            .get_master("worker_info_list", "worker-info-list")
            .await
    }

    async fn close(&self) -> Result<(), NamespaceError> {
        if self.connection.close() {
            debug!(endpoint = %self.connection.endpoint(), "block master client closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use namespace::{MasterEndpoint, SecurityConfig, TransportConfig, WorkerId, WorkerState};
    use reqwest::Client;

    use super::*;

    fn client(server: &mockito::Server) -> HttpBlockMasterClient {
        let endpoint = MasterEndpoint::parse(&server.host_with_port()).unwrap();
        let connection = MasterConnection::new(
            Client::new(),
            &endpoint,
            &SecurityConfig::default(),
            TransportConfig::default(),
        )
        .unwrap();
        HttpBlockMasterClient::new(connection)
    }

    #[tokio::test]
    async fn reads_capacity_and_usage() {
        let mut server = mockito::Server::new_async().await;
        let _capacity = server
            .mock("GET", "/api/v1/master/capacity-bytes")
            .with_status(200)
            .with_body("1099511627776")
            .create_async()
            .await;
        let _used = server
            .mock("GET", "/api/v1/master/used-bytes")
            .with_status(200)
            .with_body("4096")
            .create_async()
            .await;

        let client = client(&server);
        assert_eq!(
            client.capacity_bytes().await.unwrap(),
            ByteCount::new(1 << 40)
        );
        assert_eq!(client.used_bytes().await.unwrap(), ByteCount::new(4096));
    }

    #[tokio::test]
    async fn decodes_worker_list() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/master/worker-info-list")
            .with_status(200)
            .with_body(
                r#"[{"id":3,"address":"worker-3:29998","state":"LIVE",
                     "capacityBytes":1024,"usedBytes":0,"lastContactSec":2}]"#,
            )
            .create_async()
            .await;

        let workers = client(&server).worker_info_list().await.unwrap();
        assert_eq!(workers.len(), 1);
        assert_eq!(workers[0].id, WorkerId::new(3));
        assert_eq!(workers[0].state, WorkerState::Live);
        assert_eq!(workers[0].last_contact_sec, 2);
    }
}
