//! MyAEGEE registry connector.
//!
//! Logs in to the MyAEGEE core API and lists the memberships of one body as
//! [`dirsync_core::RegistryMember`] records.
//!
//! # Example
//!
//! ```no_run
//! use dirsync_connector_myaegee::{MyAegeeClient, MyAegeeConfig, MyAegeeCredentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MyAegeeClient::new(
//!     &MyAegeeConfig::default(),
//!     MyAegeeCredentials::new("username", "password"),
//! )?;
//! let members = client.body_members(117).await?;
//! println!("{} members", members.len());
//! # Ok(())
//! # }
//! ```

mod client;
mod error;

pub use client::{MyAegeeClient, MyAegeeConfig, MyAegeeCredentials, DEFAULT_BASE_URL};
pub use error::{MyAegeeError, MyAegeeResult};
