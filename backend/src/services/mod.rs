//! Clients for the external collaborators of the mint pipeline.
//!
//! Each collaborator sits behind a trait so the orchestrator can be driven by
//! any implementation:
//!
//! - [`MediaStore`] - content-addressed file storage ([`IpfsStore`])
//! - [`ContractInvoker`] - contract execution ([`WalletBridge`])
//! - [`PostRecorder`] - social feed persistence ([`ParsePostRecorder`])

pub mod contract;
pub mod posts;
pub mod store;

pub use contract::{create_item_call, ContractCall, ContractInvoker, WalletBridge, MINT_ABI};
pub use posts::{ParsePostRecorder, PostRecorder};
pub use store::{IpfsStore, MediaStore};
