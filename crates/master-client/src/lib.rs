//! nsbench namespace master client.
//!
//! Implements the [`namespace::FileSystemMasterClient`],
//! [`namespace::BlockMasterClient`] and [`namespace::MasterClientFactory`]
//! ports over the master's HTTP/JSON surface.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** URL construction, security headers, status-code mapping,
//! retries with back-off and connection pooling all live here. The binding sees
//! only the port traits.
//!
//! ## Wire protocol
//!
//! Base URL `http://{host}:{port}/api/v1`. Namespace operations are
//! `POST /paths/{path}/{action}` with the options record as JSON body; the path
//! is embedded segment by segment, so `/usertable/user1` becomes
//! `paths//usertable/user1/create-file`. Block introspection is
//! `GET /master/{resource}`. Failures carry
//! `{"statusCode": "...", "message": "..."}`.
//!
//! ## Connection pooling
//!
//! [`HttpClientFactory`] owns a single `reqwest::Client`; every client it hands
//! out shares that connection pool.

mod block;
mod connection;
mod factory;
mod file_system;
mod wire;

pub use block::HttpBlockMasterClient;
pub use connection::MasterConnection;
pub use factory::HttpClientFactory;
pub use file_system::HttpFileSystemMasterClient;
