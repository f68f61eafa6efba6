use async_trait::async_trait;
use namespace::{
    CreateDirectoryOptions, CreateFileOptions, DeleteOptions, FileStatus, FileSystemMasterClient,
    NamespaceError, NamespacePath, SetAttributeOptions,
};
use tracing::debug;

use crate::connection::{decode, Idempotency, MasterConnection};

/// [`FileSystemMasterClient`] over HTTP/JSON.
#[derive(Debug)]
pub struct HttpFileSystemMasterClient {
    connection: MasterConnection,
}

impl HttpFileSystemMasterClient {
    pub fn new(connection: MasterConnection) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl FileSystemMasterClient for HttpFileSystemMasterClient {
    async fn create_file(
        &self,
        path: &NamespacePath,
        options: &CreateFileOptions,
    ) -> Result<(), NamespaceError> {
        self.connection
            .post_path(
                "create_file",
                path,
                "create-file",
                Idempotency::NonIdempotent,
                options,
            )
            .await
            .map(drop)
    }

    async fn create_directory(
        &self,
        path: &NamespacePath,
        options: &CreateDirectoryOptions,
    ) -> Result<(), NamespaceError> {
        self.connection
            .post_path(
                "create_directory",
                path,
                "create-directory",
                Idempotency::NonIdempotent,
                options,
            )
            .await
            .map(drop)
    }

    async fn delete(
        &self,
        path: &NamespacePath,
        options: &DeleteOptions,
    ) -> Result<(), NamespaceError> {
        self.connection
            .post_path("delete", path, "delete", Idempotency::NonIdempotent, options)
            .await
            .map(drop)
    }

    async fn get_status(&self, path: &NamespacePath) -> Result<FileStatus, NamespaceError> {
        let body = self
            .connection
            .post_path(
                "get_status",
                path,
                "get-status",
                Idempotency::Idempotent,
                &serde_json::json!({}),
            )
            .await?;
        decode(&body)
    }

    async fn set_attribute(
        &self,
        path: &NamespacePath,
        options: &SetAttributeOptions,
    ) -> Result<(), NamespaceError> {
        self.connection
            .post_path(
                "set_attribute",
                path,
                "set-attribute",
                Idempotency::Idempotent,
                options,
            )
            .await
            .map(drop)
    }

    async fn close(&self) -> Result<(), NamespaceError> {
        if self.connection.close() {
            debug!(endpoint = %self.connection.endpoint(), "file system master client closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use namespace::{map_path, ConnectionError, MasterEndpoint, SecurityConfig, TransportConfig};
    use reqwest::Client;

    use super::*;
    use crate::connection::PATH_PARAM;

    fn path_query(path: &str) -> Matcher {
        Matcher::UrlEncoded(PATH_PARAM.into(), path.into())
    }

    fn client(server: &mockito::Server) -> HttpFileSystemMasterClient {
        let endpoint = MasterEndpoint::parse(&server.host_with_port()).unwrap();
        let transport = TransportConfig {
            max_attempts: 1,
            ..TransportConfig::default()
        };
        let connection =
            MasterConnection::new(Client::new(), &endpoint, &SecurityConfig::default(), transport)
                .unwrap();
        HttpFileSystemMasterClient::new(connection)
    }

    #[tokio::test]
    async fn create_file_posts_options() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/paths/create-file")
            .match_query(path_query("/usertable/user1"))
            .match_body(Matcher::PartialJson(serde_json::json!({ "recursive": true })))
            .with_status(200)
            .create_async()
            .await;

        client(&server)
            .create_file(&map_path("usertable", "user1"), &CreateFileOptions::default())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_file_conflict_is_already_exists() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/paths/create-file")
            .match_query(path_query("/usertable/user1"))
            .with_status(409)
            .with_body(r#"{"statusCode":"ALREADY_EXISTS","message":"/usertable/user1 already exists"}"#)
            .create_async()
            .await;

        let path = map_path("usertable", "user1");
        let err = client(&server)
            .create_file(&path, &CreateFileOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, NamespaceError::AlreadyExists { path });
    }

    #[tokio::test]
    async fn delete_sends_recursive_flag() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/paths/delete")
            .match_query(path_query("/usertable"))
            .match_body(Matcher::Json(serde_json::json!({ "recursive": true })))
            .with_status(200)
            .create_async()
            .await;

        client(&server)
            .delete(&NamespacePath::default_directory(), &DeleteOptions::recursive())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_status_decodes_record() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/paths/get-status")
            .match_query(path_query("/usertable/user1"))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "path": "/usertable/user1",
                    "name": "user1",
                    "folder": false,
                    "length": 0,
                    "owner": "bench",
                    "group": "bench",
                    "mode": 420,
                    "pinned": true,
                    "creationTime": "2024-01-01T00:00:00Z",
                    "lastModificationTime": "2024-01-02T00:00:00Z"
                }"#,
            )
            .create_async()
            .await;

        let status = client(&server)
            .get_status(&map_path("usertable", "user1"))
            .await
            .unwrap();
        assert_eq!(status.name, "user1");
        assert!(status.pinned);
        assert!(!status.folder);
    }

    #[tokio::test]
    async fn malformed_status_is_a_serialization_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/paths/get-status")
            .match_query(path_query("/usertable/user1"))
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = client(&server)
            .get_status(&map_path("usertable", "user1"))
            .await
            .unwrap_err();
        assert!(matches!(err, NamespaceError::Serialization { .. }));
    }

    #[tokio::test]
    async fn set_attribute_with_defaults_sends_empty_object() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/paths/set-attribute")
            .match_query(path_query("/usertable/user1"))
            .match_body(Matcher::Json(serde_json::json!({})))
            .with_status(200)
            .create_async()
            .await;

        client(&server)
            .set_attribute(&map_path("usertable", "user1"), &SetAttributeOptions::default())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn dot_segment_keys_reach_the_master_unchanged() {
        let mut server = mockito::Server::new_async().await;
        let client = client(&server);
        for key in [".", "..", "a/../b"] {
            let path = map_path("usertable", key);
            let mock = server
                .mock("POST", "/api/v1/paths/delete")
                .match_query(path_query(path.as_str()))
                .with_status(200)
                .expect(1)
                .create_async()
                .await;

            client.delete(&path, &DeleteOptions::default()).await.unwrap();
            mock.assert_async().await;
            mock.remove_async().await;
        }
    }

    #[tokio::test]
    async fn not_found_names_the_path_that_was_sent() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/v1/paths/get-status")
            .match_query(path_query("/usertable/.."))
            .with_status(404)
            .with_body(r#"{"statusCode":"NOT_FOUND","message":"no such path"}"#)
            .create_async()
            .await;

        let path = map_path("usertable", "..");
        let err = client(&server).get_status(&path).await.unwrap_err();
        assert_eq!(err, NamespaceError::NotFound { path });
    }

    #[tokio::test]
    async fn close_is_idempotent_and_final() {
        let server = mockito::Server::new_async().await;
        let client = client(&server);
        client.close().await.unwrap();
        client.close().await.unwrap();
        let err = client
            .delete(&map_path("usertable", "user1"), &DeleteOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, NamespaceError::Connection(ConnectionError::Closed));
    }
}
