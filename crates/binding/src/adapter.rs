use std::collections::HashSet;

use namespace::{
    classify, map_path, unsupported, AdapterConfig, ConnectionError, CreateFileOptions,
    DeleteOptions, NamespaceError, ResultCode, SetAttributeOptions, Verb,
};
use tracing::debug;

use crate::{ClientContext, CleanupReport, Db, InitError, Record, Session};

/// [`Db`] implementation backed by a namespace master.
///
/// One instance per harness thread. `init` opens a [`Session`]; every verb maps
/// `(table, key)` to `/table/key` and issues the matching namespace call.
#[derive(Debug)]
pub struct NamespaceDb {
    config: AdapterConfig,
    context: ClientContext,
    session: Option<Session>,
}

impl NamespaceDb {
    pub fn new(config: AdapterConfig, context: ClientContext) -> Self {
        Self {
            config,
            context,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    fn session_or_closed(&self) -> Result<&Session, NamespaceError> {
        self.session
            .as_ref()
            .ok_or(NamespaceError::Connection(ConnectionError::Closed))
    }
}

impl Db for NamespaceDb {
    fn init(&mut self) -> Result<(), InitError> {
        if self.session.as_ref().is_some_and(Session::is_open) {
            return Ok(());
        }
        let session = Session::open(&self.config, self.context.clone())?;
        self.session = Some(session);
        Ok(())
    }

    fn cleanup(&mut self) -> CleanupReport {
        match self.session.take() {
            Some(mut session) => session.close(),
            None => CleanupReport::default(),
        }
    }

    fn insert(&self, table: &str, key: &str, _values: &Record) -> ResultCode {
        let path = map_path(table, key);
        let outcome = self.session_or_closed().and_then(|session| {
            session.run(|client| {
                let path = &path;
                async move {
                    // Replace whatever a previous run left at the key.
                    if let Err(error) = client.delete(path, &DeleteOptions::default()).await {
                        debug!(%path, %error, "pre-insert delete ignored");
                    }
                    client.create_file(path, &CreateFileOptions::default()).await
                }
            })
        });
        classify(Verb::Insert, &path, &outcome)
    }

    fn read(
        &self,
        table: &str,
        key: &str,
        _fields: Option<&HashSet<String>>,
        result: &mut Record,
    ) -> ResultCode {
        let path = map_path(table, key);
        let outcome = self
            .session_or_closed()
            .and_then(|session| {
                session.run(|client| {
                    let path = &path;
                    async move { client.get_status(path).await }
                })
            })
            .and_then(|status| {
                serde_json::to_vec(&status).map_err(|e| NamespaceError::Serialization {
                    message: e.to_string(),
                })
            });
        let code = classify(Verb::Read, &path, &outcome);
        if let Ok(bytes) = outcome {
            result.insert(path.to_string(), bytes);
        }
        code
    }

    fn update(&self, table: &str, key: &str, _values: &Record) -> ResultCode {
        let path = map_path(table, key);
        let outcome = self.session_or_closed().and_then(|session| {
            session.run(|client| {
                let path = &path;
                async move {
                    client
                        .set_attribute(path, &SetAttributeOptions::default())
                        .await
                }
            })
        });
        classify(Verb::Update, &path, &outcome)
    }

    fn delete(&self, table: &str, key: &str) -> ResultCode {
        let path = map_path(table, key);
        let outcome = self.session_or_closed().and_then(|session| {
            session.run(|client| {
                let path = &path;
                async move { client.delete(path, &DeleteOptions::default()).await }
            })
        });
        classify(Verb::Delete, &path, &outcome)
    }

    fn scan(
        &self,
        _table: &str,
        _start_key: &str,
        _record_count: usize,
        _fields: Option<&HashSet<String>>,
        _result: &mut Vec<Record>,
    ) -> ResultCode {
        unsupported(Verb::Scan)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use namespace::testing::{InMemoryClientFactory, InMemoryNamespace};
    use namespace::FileStatus;

    use super::*;

    fn db(namespace: &InMemoryNamespace) -> NamespaceDb {
        let factory = InMemoryClientFactory::new(namespace.clone());
        let context = ClientContext::new(Arc::new(factory), 1).unwrap();
        let mut db = NamespaceDb::new(AdapterConfig::default(), context);
        db.init().unwrap();
        db
    }

    #[test]
    fn insert_creates_file_at_mapped_path() {
        let namespace = InMemoryNamespace::new();
        let mut db = db(&namespace);
        assert_eq!(db.insert("usertable", "user1", &Record::new()), ResultCode::Ok);
        let status = namespace.status(&map_path("usertable", "user1")).unwrap();
        assert!(!status.folder);
        db.cleanup();
    }

    #[test]
    fn insert_over_existing_key_replaces_it() {
        let namespace = InMemoryNamespace::new();
        let mut db = db(&namespace);
        assert_eq!(db.insert("t", "k", &Record::new()), ResultCode::Ok);
        namespace.clear_calls();
        assert_eq!(db.insert("t", "k", &Record::new()), ResultCode::Ok);
        assert_eq!(namespace.calls(), vec!["delete /t/k", "create_file /t/k"]);
        db.cleanup();
    }

    #[test]
    fn insert_over_non_empty_directory_is_ok() {
        let namespace = InMemoryNamespace::new();
        let mut db = db(&namespace);
        assert_eq!(db.insert("t", "k/child", &Record::new()), ResultCode::Ok);
        namespace.clear_calls();

        // The delete is rejected and create_file reports AlreadyExists.
        assert_eq!(db.insert("t", "k", &Record::new()), ResultCode::Ok);
        assert_eq!(namespace.calls(), vec!["delete /t/k", "create_file /t/k"]);
        assert!(namespace.status(&map_path("t", "k")).unwrap().folder);
        assert!(namespace.exists(&map_path("t", "k/child")));
        db.cleanup();
    }

    #[test]
    fn read_stores_status_under_path_key() {
        let namespace = InMemoryNamespace::new();
        let mut db = db(&namespace);
        db.insert("usertable", "user1", &Record::new());

        let mut result = Record::new();
        assert_eq!(
            db.read("usertable", "user1", None, &mut result),
            ResultCode::Ok
        );
        assert_eq!(result.len(), 1);
        let status: FileStatus = serde_json::from_slice(&result["/usertable/user1"]).unwrap();
        assert_eq!(status.path.as_str(), "/usertable/user1");
        db.cleanup();
    }

    #[test]
    fn read_of_missing_key_leaves_result_untouched() {
        let namespace = InMemoryNamespace::new();
        let mut db = db(&namespace);
        let mut result = Record::new();
        result.insert("existing".into(), vec![1]);
        assert_eq!(db.read("t", "absent", None, &mut result), ResultCode::Error);
        assert_eq!(result.len(), 1);
        db.cleanup();
    }

    #[test]
    fn update_requires_existing_key() {
        let namespace = InMemoryNamespace::new();
        let mut db = db(&namespace);
        assert_eq!(db.update("t", "k", &Record::new()), ResultCode::Error);
        db.insert("t", "k", &Record::new());
        assert_eq!(db.update("t", "k", &Record::new()), ResultCode::Ok);
        db.cleanup();
    }

    #[test]
    fn delete_of_missing_key_is_an_error() {
        let namespace = InMemoryNamespace::new();
        let mut db = db(&namespace);
        db.insert("t", "k", &Record::new());
        assert_eq!(db.delete("t", "k"), ResultCode::Ok);
        assert_eq!(db.delete("t", "k"), ResultCode::Error);
        db.cleanup();
    }

    #[test]
    fn scan_is_not_implemented_and_makes_no_calls() {
        let namespace = InMemoryNamespace::new();
        let mut db = db(&namespace);
        namespace.clear_calls();
        let mut rows = Vec::new();
        assert_eq!(
            db.scan("t", "k", 10, None, &mut rows),
            ResultCode::NotImplemented
        );
        assert!(rows.is_empty());
        assert!(namespace.calls().is_empty());
        db.cleanup();
    }

    #[test]
    fn verbs_before_init_report_error() {
        let factory = InMemoryClientFactory::default();
        let context = ClientContext::new(Arc::new(factory), 1).unwrap();
        let db = NamespaceDb::new(AdapterConfig::default(), context);
        assert_eq!(db.insert("t", "k", &Record::new()), ResultCode::Error);
        assert_eq!(db.delete("t", "k"), ResultCode::Error);
        let mut rows = Vec::new();
        assert_eq!(
            db.scan("t", "k", 1, None, &mut rows),
            ResultCode::NotImplemented
        );
    }

    #[test]
    fn init_is_idempotent() {
        let namespace = InMemoryNamespace::new();
        let factory = Arc::new(InMemoryClientFactory::new(namespace.clone()));
        let context = ClientContext::new(factory.clone(), 1).unwrap();
        let mut db = NamespaceDb::new(AdapterConfig::default(), context);
        db.init().unwrap();
        db.init().unwrap();
        assert_eq!(factory.acquired(), 2);
        db.cleanup();
        assert!(db.cleanup().is_clean());
    }
}
