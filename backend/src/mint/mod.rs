//! Mint orchestration.
//!
//! [`MintOrchestrator::submit`] runs one mint attempt end to end:
//!
//! 1. Validates the draft (no side effects on failure)
//! 2. Uploads the image, then the audio
//! 3. Assembles the metadata document and uploads it
//! 4. Calls `createItem(uriOfToken)` with the mint price
//! 5. Records the feed post once the transaction succeeded
//!
//! ```text
//! Idle ─▶ Validating ─▶ Uploading ─▶ AwaitingTransaction ─▶ Recording ─▶ Idle
//!              │             │                │                  │
//!              └─────────────┴────────────────┴──────────────────┴──▶ Idle
//! ```
//!
//! Only one attempt runs at a time per orchestrator; a concurrent call fails
//! with [`MintError::Busy`]. No step is retried.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::notifications::{Notification, NotificationHub};
use crate::config::MintConfig;
use crate::error::{ContractError, MintError, MintResult, RecordError, UploadError};
use crate::metadata::{MintMetadata, METADATA_CONTENT_TYPE};
use crate::models::{
    AssetKind, AssetUri, AuthorIdentity, Category, DraftMint, FeedPost, MediaFile, RecordedPost,
    TxReceipt,
};
use crate::services::{
    create_item_call, ContractInvoker, IpfsStore, MediaStore, ParsePostRecorder, PostRecorder,
    WalletBridge,
};
use crate::validation::{validate_draft, validate_metadata};

/// Logical name under which media files are stored.
pub const NFT_FILE_NAME: &str = "nft";

pub const MSG_IN_PROGRESS: &str = "Minting in progress";
pub const MSG_IN_PROGRESS_DESC: &str = "Your minting is in progress";
pub const MSG_SUCCESS: &str = "Congrats! Your NFT has been created!";
pub const MSG_SUCCESS_NOTE: &str = "Note: Check the Feed to see your post!";
pub const MSG_INCOMPLETE: &str = "Not all fields filled in! Please fill in all fields and then re-submit.";
pub const MSG_NOT_CONNECTED: &str = "You need to have your wallet connected to Mint NFTs";
pub const MSG_NOT_CONNECTED_DESC: &str =
    "In order to use this feature, you have to connect your wallet to this website.";
pub const MSG_MINT_ERROR: &str = "NFT Mint Error";
pub const MSG_CANCELLED: &str = "Transaction cancelled";
pub const MSG_CANCELLED_DESC: &str = "You rejected the transaction in your wallet. No NFT was minted.";
pub const MSG_BUSY: &str = "A mint is already in progress. Wait for it to finish before submitting again.";

/// What to do when the image or audio upload fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadFailurePolicy {
    /// Log, warn the user, and mint with a `null` URI for the failed asset.
    #[default]
    Continue,
    /// Stop the attempt at the first failed upload.
    Abort,
}

/// Where an attempt currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum MintStage {
    Idle = 0,
    Validating = 1,
    Uploading = 2,
    AwaitingTransaction = 3,
    Recording = 4,
}

impl MintStage {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Validating,
            2 => Self::Uploading,
            3 => Self::AwaitingTransaction,
            4 => Self::Recording,
            _ => Self::Idle,
        }
    }
}

/// Contract and pipeline settings for an orchestrator.
#[derive(Debug, Clone)]
pub struct MintSettings {
    pub contract_address: String,
    pub price_wei: u128,
    pub step_timeout: Duration,
    pub upload_policy: UploadFailurePolicy,
}

impl From<&MintConfig> for MintSettings {
    fn from(config: &MintConfig) -> Self {
        Self {
            contract_address: config.contract_address.clone(),
            price_wei: config.mint_price_wei,
            step_timeout: config.step_timeout,
            upload_policy: config.upload_policy,
        }
    }
}

/// Result of a successful mint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintOutcome {
    pub title: String,
    pub category: Category,
    pub image_uri: Option<AssetUri>,
    pub audio_uri: Option<AssetUri>,
    pub metadata_uri: AssetUri,
    pub tx_hash: String,
    /// `None` when no post was recorded because the audio upload failed.
    pub post: Option<RecordedPost>,
}

/// Coordinates uploads, the contract call and the feed post.
pub struct MintOrchestrator {
    store: Arc<dyn MediaStore>,
    contract: Arc<dyn ContractInvoker>,
    posts: Arc<dyn PostRecorder>,
    notifier: NotificationHub,
    settings: MintSettings,
    busy: AtomicBool,
    stage: AtomicU8,
}

/// Releases the busy flag on every exit path.
struct BusyGuard<'a> {
    busy: &'a AtomicBool,
    stage: &'a AtomicU8,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.stage.store(MintStage::Idle as u8, Ordering::SeqCst);
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl MintOrchestrator {
    pub fn new(
        store: Arc<dyn MediaStore>,
        contract: Arc<dyn ContractInvoker>,
        posts: Arc<dyn PostRecorder>,
        notifier: NotificationHub,
        settings: MintSettings,
    ) -> Self {
        Self {
            store,
            contract,
            posts,
            notifier,
            settings,
            busy: AtomicBool::new(false),
            stage: AtomicU8::new(MintStage::Idle as u8),
        }
    }

    /// Build the production clients from configuration.
    pub fn from_config(config: &MintConfig) -> Self {
        let store = IpfsStore::new(&config.ipfs_api_url, &config.ipfs_gateway);
        let contract = WalletBridge::new(&config.wallet_bridge_url);
        let posts = ParsePostRecorder::new(&config.parse_server_url, &config.parse_app_id)
            .with_master_key(config.parse_master_key.clone());

        Self::new(
            Arc::new(store),
            Arc::new(contract),
            Arc::new(posts),
            NotificationHub::new(),
            MintSettings::from(config),
        )
    }

    pub fn notifier(&self) -> &NotificationHub {
        &self.notifier
    }

    pub fn posts(&self) -> &Arc<dyn PostRecorder> {
        &self.posts
    }

    pub fn settings(&self) -> &MintSettings {
        &self.settings
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn stage(&self) -> MintStage {
        MintStage::from_u8(self.stage.load(Ordering::SeqCst))
    }

    fn set_stage(&self, stage: MintStage) {
        log::debug!("mint stage -> {:?}", stage);
        self.stage.store(stage as u8, Ordering::SeqCst);
    }

    fn acquire(&self) -> MintResult<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| MintError::Busy)?;
        Ok(BusyGuard {
            busy: &self.busy,
            stage: &self.stage,
        })
    }

    /// Run one mint attempt.
    ///
    /// Exactly one feed post is created when the transaction succeeds (unless
    /// the audio URI is missing), none otherwise. Every exit leaves the
    /// orchestrator idle.
    pub async fn submit(
        &self,
        draft: &DraftMint,
        identity: Option<&AuthorIdentity>,
    ) -> MintResult<MintOutcome> {
        let _guard = match self.acquire() {
            Ok(guard) => guard,
            Err(e) => {
                self.notifier.notify(Notification::warning(MSG_MINT_ERROR, MSG_BUSY));
                return Err(e);
            }
        };

        self.set_stage(MintStage::Validating);
        let valid = match validate_draft(draft) {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!("draft rejected: {}", e);
                self.notifier.notify(Notification::error(MSG_MINT_ERROR, MSG_INCOMPLETE));
                return Err(e.into());
            }
        };

        let identity = match identity {
            Some(identity) => identity,
            None => {
                self.notifier
                    .notify(Notification::error(MSG_NOT_CONNECTED, MSG_NOT_CONNECTED_DESC));
                return Err(MintError::NotAuthenticated);
            }
        };

        self.notifier
            .notify(Notification::info(MSG_IN_PROGRESS, MSG_IN_PROGRESS_DESC));

        self.set_stage(MintStage::Uploading);
        let image = self.upload_media(&valid.image, AssetKind::Image).await?;
        let audio = self.upload_media(&valid.audio, AssetKind::Audio).await?;

        let metadata =
            MintMetadata::assemble(&valid.title, image.as_ref(), audio.as_ref(), valid.category);
        let metadata_uri = self.upload_metadata(&metadata).await?;

        self.set_stage(MintStage::AwaitingTransaction);
        let receipt = self.mint_token(&metadata_uri).await?;

        self.set_stage(MintStage::Recording);
        let post = match &audio {
            Some(audio) => {
                let post = FeedPost {
                    image: image.clone(),
                    audio: audio.clone(),
                    title: valid.title.clone(),
                    category: valid.category,
                    author_pfp: identity.pfp.clone(),
                    author_address: identity.eth_address.clone(),
                    author_username: identity.username.clone(),
                    created_at: None,
                };
                Some(self.record_post(&post, &receipt).await?)
            }
            None => {
                log::warn!("no audio URI, feed post skipped for {}", receipt.tx_hash);
                None
            }
        };

        let mut done = Notification::success(
            MSG_SUCCESS,
            format!(
                "{}\nTitle: {}\nCategory: {}",
                MSG_SUCCESS_NOTE, valid.title, valid.category
            ),
        );
        if let Some(image) = &image {
            done = done.with_preview(image.as_str());
        }
        self.notifier.notify(done);

        Ok(MintOutcome {
            title: valid.title,
            category: valid.category,
            image_uri: image,
            audio_uri: audio,
            metadata_uri,
            tx_hash: receipt.tx_hash,
            post,
        })
    }

    /// Await `fut`, mapping an elapsed step timeout with `on_timeout`.
    async fn bounded<T, E>(
        &self,
        fut: impl Future<Output = Result<T, E>>,
        on_timeout: impl FnOnce(u64) -> E,
    ) -> Result<T, E> {
        match tokio::time::timeout(self.settings.step_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(self.settings.step_timeout.as_secs())),
        }
    }

    /// Upload an image or audio file, applying the upload failure policy.
    async fn upload_media(&self, file: &MediaFile, asset: AssetKind) -> MintResult<Option<AssetUri>> {
        let result = self
            .bounded(self.store.save(NFT_FILE_NAME, file, asset), |secs| {
                UploadError::Timeout { asset, secs }
            })
            .await;

        match result {
            Ok(uri) => Ok(Some(uri)),
            Err(e) => {
                log::error!("Error uploading NFT {} to IPFS: {}", asset, e);
                match self.settings.upload_policy {
                    UploadFailurePolicy::Continue => {
                        self.notifier.notify(Notification::warning(
                            format!("Error uploading NFT {} to IPFS", asset),
                            format!("{}. Minting continues without it.", e),
                        ));
                        Ok(None)
                    }
                    UploadFailurePolicy::Abort => {
                        self.notifier
                            .notify(Notification::error(MSG_MINT_ERROR, e.to_string()));
                        Err(e.into())
                    }
                }
            }
        }
    }

    /// Validate and upload the metadata document. Failure always aborts.
    async fn upload_metadata(&self, metadata: &MintMetadata) -> MintResult<AssetUri> {
        let value = metadata.to_value().map_err(|e| self.fail_metadata(e.to_string()))?;
        if let Err(e) = validate_metadata(&value) {
            log::error!("assembled metadata rejected: {}", e);
            self.notifier
                .notify(Notification::error(MSG_MINT_ERROR, e.to_string()));
            return Err(e.into());
        }

        let bytes = metadata.to_bytes().map_err(|e| self.fail_metadata(e.to_string()))?;
        let file = MediaFile::new(metadata.file_name(), METADATA_CONTENT_TYPE, bytes);

        self.bounded(
            self.store.save(&file.file_name, &file, AssetKind::Metadata),
            |secs| UploadError::Timeout {
                asset: AssetKind::Metadata,
                secs,
            },
        )
        .await
        .map_err(|e| {
            log::error!("Error uploading NFT metadata to IPFS: {}", e);
            self.notifier
                .notify(Notification::error(MSG_MINT_ERROR, e.to_string()));
            e.into()
        })
    }

    fn fail_metadata(&self, message: String) -> MintError {
        self.notifier
            .notify(Notification::error(MSG_MINT_ERROR, message.clone()));
        UploadError::InvalidResponse {
            asset: AssetKind::Metadata,
            message,
        }
        .into()
    }

    /// Submit the paid `createItem` call.
    async fn mint_token(&self, metadata_uri: &AssetUri) -> MintResult<TxReceipt> {
        let call = create_item_call(
            &self.settings.contract_address,
            metadata_uri.as_str(),
            self.settings.price_wei,
        );

        let result = self
            .bounded(self.contract.execute(&call), |secs| {
                ContractError::transport(format!("transaction timed out after {}s", secs))
            })
            .await;

        match result {
            Ok(receipt) => {
                log::info!("token minted in {}", receipt.tx_hash);
                Ok(receipt)
            }
            Err(e) if e.is_user_rejection() => {
                log::info!("transaction rejected by user: {}", e);
                self.notifier
                    .notify(Notification::warning(MSG_CANCELLED, MSG_CANCELLED_DESC));
                Err(MintError::TransactionRejected(e))
            }
            Err(e) => {
                log::error!("transaction failed: {}", e);
                self.notifier
                    .notify(Notification::error(MSG_MINT_ERROR, e.message.clone()));
                Err(MintError::Transaction(e))
            }
        }
    }

    async fn record_post(&self, post: &FeedPost, receipt: &TxReceipt) -> MintResult<RecordedPost> {
        self.bounded(self.posts.save(post), RecordError::Timeout)
            .await
            .map_err(|source| {
                log::error!("feed post for {} not recorded: {}", receipt.tx_hash, source);
                self.notifier.notify(Notification::error(
                    MSG_MINT_ERROR,
                    format!(
                        "Your NFT was minted ({}) but the feed post could not be saved: {}",
                        receipt.tx_hash, source
                    ),
                ));
                MintError::PostNotRecorded {
                    tx_hash: receipt.tx_hash.clone(),
                    source,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::notifications::NotificationLevel;
    use crate::error::{RecordResult, UploadResult, ValidationError};
    use crate::services::ContractCall;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::{broadcast, Notify};

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeStore {
        /// Queued replies, one per `save` call.
        replies: Mutex<VecDeque<UploadResult<AssetUri>>>,
        saved: Mutex<Vec<(String, AssetKind, Vec<u8>)>>,
        /// When set, `save` waits for a permit before answering.
        gate: Option<Arc<Notify>>,
    }

    impl FakeStore {
        fn with_uris(uris: &[&str]) -> Self {
            let store = Self::default();
            {
                let mut replies = store.replies.lock().unwrap();
                for uri in uris {
                    replies.push_back(Ok(AssetUri::new(*uri)));
                }
            }
            store
        }

        fn push_reply(&self, reply: UploadResult<AssetUri>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        fn saved(&self) -> Vec<(String, AssetKind, Vec<u8>)> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MediaStore for FakeStore {
        async fn save(&self, name: &str, file: &MediaFile, asset: AssetKind) -> UploadResult<AssetUri> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.saved
                .lock()
                .unwrap()
                .push((name.to_string(), asset, file.bytes.clone()));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(AssetUri::new(format!("ipfs://{}", asset))))
        }
    }

    struct FakeContract {
        reply: ContractResult,
        calls: Mutex<Vec<ContractCall>>,
        delay: Option<Duration>,
    }

    type ContractResult = Result<TxReceipt, ContractError>;

    impl FakeContract {
        fn ok() -> Self {
            Self::replying(Ok(TxReceipt {
                tx_hash: "0xfeed".into(),
            }))
        }

        fn replying(reply: ContractResult) -> Self {
            Self {
                reply,
                calls: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        fn calls(&self) -> Vec<ContractCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ContractInvoker for FakeContract {
        async fn execute(&self, call: &ContractCall) -> Result<TxReceipt, ContractError> {
            self.calls.lock().unwrap().push(call.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.reply.clone()
        }
    }

    #[derive(Default)]
    struct FakePosts {
        saved: Mutex<Vec<FeedPost>>,
        fail: bool,
    }

    impl FakePosts {
        fn saved(&self) -> Vec<FeedPost> {
            self.saved.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PostRecorder for FakePosts {
        async fn save(&self, post: &FeedPost) -> RecordResult<RecordedPost> {
            if self.fail {
                return Err(RecordError::Api {
                    status: 500,
                    message: "internal".into(),
                });
            }
            self.saved.lock().unwrap().push(post.clone());
            Ok(RecordedPost {
                object_id: format!("post{}", self.saved.lock().unwrap().len()),
                post: post.clone(),
            })
        }

        async fn list(&self, account: Option<&str>) -> RecordResult<Vec<RecordedPost>> {
            Ok(self
                .saved()
                .into_iter()
                .filter(|p| account.map_or(true, |a| p.author_address == a))
                .enumerate()
                .map(|(i, post)| RecordedPost {
                    object_id: format!("post{}", i + 1),
                    post,
                })
                .collect())
        }
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    struct Harness {
        store: Arc<FakeStore>,
        contract: Arc<FakeContract>,
        posts: Arc<FakePosts>,
        orchestrator: Arc<MintOrchestrator>,
        notifications: broadcast::Receiver<Notification>,
    }

    fn settings(policy: UploadFailurePolicy) -> MintSettings {
        MintSettings {
            contract_address: "0x7dE3085b3190B3a787822Ee16F23be010f5F8686".into(),
            price_wei: 10_000_000_000_000_000,
            step_timeout: Duration::from_secs(5),
            upload_policy: policy,
        }
    }

    fn harness_with(
        store: FakeStore,
        contract: FakeContract,
        posts: FakePosts,
        settings: MintSettings,
    ) -> Harness {
        let store = Arc::new(store);
        let contract = Arc::new(contract);
        let posts = Arc::new(posts);
        let hub = NotificationHub::new();
        let notifications = hub.subscribe();
        let orchestrator = Arc::new(MintOrchestrator::new(
            store.clone(),
            contract.clone(),
            posts.clone(),
            hub,
            settings,
        ));
        Harness {
            store,
            contract,
            posts,
            orchestrator,
            notifications,
        }
    }

    fn harness(contract: FakeContract) -> Harness {
        harness_with(
            FakeStore::with_uris(&["ipfs://img1", "ipfs://aud1", "ipfs://meta1"]),
            contract,
            FakePosts::default(),
            settings(UploadFailurePolicy::Continue),
        )
    }

    fn midnight() -> DraftMint {
        DraftMint {
            title: "Midnight".into(),
            category: "Jazz".into(),
            image: Some(MediaFile::new("cover.png", "image/png", vec![0x89, 0x50])),
            audio: Some(MediaFile::new("track.mp3", "audio/mpeg", vec![0x49, 0x44, 0x33])),
        }
    }

    fn identity() -> AuthorIdentity {
        AuthorIdentity {
            username: "miles".into(),
            eth_address: "0xabc0000000000000000000000000000000000def".into(),
            pfp: Some("https://ipfs.io/ipfs/QmPfp".into()),
        }
    }

    fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
        let mut out = Vec::new();
        while let Ok(n) = rx.try_recv() {
            out.push(n);
        }
        out
    }

    // -------------------------------------------------------------------------
    // Tests
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_successful_mint_records_one_post() {
        let mut h = harness(FakeContract::ok());

        let outcome = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap();

        assert_eq!(outcome.metadata_uri.as_str(), "ipfs://meta1");
        assert_eq!(outcome.tx_hash, "0xfeed");

        let posts = h.posts.saved();
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.image.as_ref().unwrap().as_str(), "ipfs://img1");
        assert_eq!(post.audio.as_str(), "ipfs://aud1");
        assert_eq!(post.title, "Midnight");
        assert_eq!(post.category, Category::Jazz);
        assert_eq!(post.author_username, "miles");
        assert_eq!(post.author_address, identity().eth_address);
        assert_eq!(post.author_pfp, identity().pfp);

        let json = serde_json::to_value(post).unwrap();
        assert_eq!(json["postImg"], "ipfs://img1");
        assert_eq!(json["postAudio"], "ipfs://aud1");
        assert_eq!(json["postTitle"], "Midnight");
        assert_eq!(json["postCategory"], "Jazz");

        let notes = drain(&mut h.notifications);
        assert_eq!(notes.first().unwrap().message, MSG_IN_PROGRESS);
        let last = notes.last().unwrap();
        assert_eq!(last.level, NotificationLevel::Success);
        assert_eq!(last.message, MSG_SUCCESS);
        assert_eq!(last.preview.as_deref(), Some("ipfs://img1"));
        assert!(last.description.contains("Midnight"));
        assert!(last.description.contains("Jazz"));

        assert!(!h.orchestrator.is_busy());
        assert_eq!(h.orchestrator.stage(), MintStage::Idle);
    }

    #[tokio::test]
    async fn test_upload_order_and_metadata_bytes() {
        let h = harness(FakeContract::ok());
        h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap();

        let saved = h.store.saved();
        assert_eq!(saved.len(), 3);
        assert_eq!((saved[0].0.as_str(), saved[0].1), ("nft", AssetKind::Image));
        assert_eq!((saved[1].0.as_str(), saved[1].1), ("nft", AssetKind::Audio));
        assert_eq!((saved[2].0.as_str(), saved[2].1), ("Midnight.json", AssetKind::Metadata));
        assert_eq!(
            String::from_utf8(saved[2].2.clone()).unwrap(),
            r#"{"name":"Midnight","image":"ipfs://img1","audio":"ipfs://aud1","attributes":[{"category":"Jazz"}]}"#
        );

        let calls = h.contract.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function_name, "createItem");
        assert_eq!(calls[0].params["uriOfToken"], "ipfs://meta1");
        assert_eq!(calls[0].msg_value, "10000000000000000");
    }

    #[tokio::test]
    async fn test_incomplete_drafts_have_no_side_effects() {
        let full = midnight();
        let drafts = vec![
            DraftMint { title: String::new(), ..full.clone() },
            DraftMint { category: String::new(), ..full.clone() },
            DraftMint { image: None, ..full.clone() },
            DraftMint { audio: None, ..full.clone() },
            DraftMint::default(),
        ];

        for draft in drafts {
            let mut h = harness(FakeContract::ok());
            let err = h.orchestrator.submit(&draft, Some(&identity())).await.unwrap_err();

            assert!(matches!(err, MintError::Validation(ValidationError::MissingFields(_))));
            assert!(h.store.saved().is_empty());
            assert!(h.contract.calls().is_empty());
            assert!(h.posts.saved().is_empty());
            assert!(!h.orchestrator.is_busy());

            let notes = drain(&mut h.notifications);
            assert_eq!(notes.len(), 1);
            assert_eq!(notes[0].description, MSG_INCOMPLETE);
        }
    }

    #[tokio::test]
    async fn test_missing_identity() {
        let h = harness(FakeContract::ok());
        let err = h.orchestrator.submit(&midnight(), None).await.unwrap_err();
        assert!(matches!(err, MintError::NotAuthenticated));
        assert!(h.store.saved().is_empty());
    }

    #[tokio::test]
    async fn test_user_rejection_shows_cancellation() {
        let mut h = harness(FakeContract::replying(Err(ContractError::new(
            Some(4001),
            "MetaMask Tx Signature: User denied transaction signature.",
        ))));

        let err = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap_err();

        assert!(matches!(err, MintError::TransactionRejected(_)));
        assert!(h.posts.saved().is_empty());
        assert!(!h.orchestrator.is_busy());

        let last = drain(&mut h.notifications).pop().unwrap();
        assert_eq!(last.message, MSG_CANCELLED);
        assert_eq!(last.description, MSG_CANCELLED_DESC);
        assert_ne!(last.message, MSG_MINT_ERROR);
    }

    #[tokio::test]
    async fn test_other_contract_error_uses_provider_message() {
        let mut h = harness(FakeContract::replying(Err(ContractError::new(
            Some(-32000),
            "insufficient funds for gas * price + value",
        ))));

        let err = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap_err();

        assert!(matches!(err, MintError::Transaction(_)));
        assert!(h.posts.saved().is_empty());

        let last = drain(&mut h.notifications).pop().unwrap();
        assert_eq!(last.level, NotificationLevel::Error);
        assert_eq!(last.message, MSG_MINT_ERROR);
        assert_eq!(last.description, "insufficient funds for gas * price + value");
    }

    #[tokio::test]
    async fn test_image_failure_continues_with_null_image() {
        let store = FakeStore::default();
        store.push_reply(Err(UploadError::Rejected {
            asset: AssetKind::Image,
            status: 500,
            message: "node down".into(),
        }));
        store.push_reply(Ok(AssetUri::new("ipfs://aud1")));
        store.push_reply(Ok(AssetUri::new("ipfs://meta1")));
        let mut h = harness_with(
            store,
            FakeContract::ok(),
            FakePosts::default(),
            settings(UploadFailurePolicy::Continue),
        );

        let outcome = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap();

        assert!(outcome.image_uri.is_none());
        let metadata: serde_json::Value = serde_json::from_slice(&h.store.saved()[2].2).unwrap();
        assert!(metadata["image"].is_null());
        assert_eq!(h.posts.saved().len(), 1);
        assert!(h.posts.saved()[0].image.is_none());

        let notes = drain(&mut h.notifications);
        assert!(notes
            .iter()
            .any(|n| n.level == NotificationLevel::Warning && n.message.contains("image")));
    }

    #[tokio::test]
    async fn test_image_failure_aborts_in_strict_mode() {
        let store = FakeStore::default();
        store.push_reply(Err(UploadError::Http {
            asset: AssetKind::Image,
            message: "connection refused".into(),
        }));
        let h = harness_with(
            store,
            FakeContract::ok(),
            FakePosts::default(),
            settings(UploadFailurePolicy::Abort),
        );

        let err = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap_err();

        assert!(matches!(err, MintError::Upload(_)));
        assert_eq!(h.store.saved().len(), 1);
        assert!(h.contract.calls().is_empty());
        assert!(h.posts.saved().is_empty());
    }

    #[tokio::test]
    async fn test_audio_failure_mints_without_post() {
        let store = FakeStore::default();
        store.push_reply(Ok(AssetUri::new("ipfs://img1")));
        store.push_reply(Err(UploadError::Http {
            asset: AssetKind::Audio,
            message: "reset".into(),
        }));
        store.push_reply(Ok(AssetUri::new("ipfs://meta1")));
        let h = harness_with(
            store,
            FakeContract::ok(),
            FakePosts::default(),
            settings(UploadFailurePolicy::Continue),
        );

        let outcome = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap();

        assert!(outcome.post.is_none());
        assert_eq!(h.contract.calls().len(), 1);
        assert!(h.posts.saved().is_empty());
    }

    #[tokio::test]
    async fn test_metadata_failure_always_aborts() {
        let store = FakeStore::with_uris(&["ipfs://img1", "ipfs://aud1"]);
        store.push_reply(Err(UploadError::Http {
            asset: AssetKind::Metadata,
            message: "timeout".into(),
        }));
        let h = harness_with(
            store,
            FakeContract::ok(),
            FakePosts::default(),
            settings(UploadFailurePolicy::Continue),
        );

        let err = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap_err();
        assert!(matches!(err, MintError::Upload(ref e) if e.asset() == Some(AssetKind::Metadata)));
        assert!(h.contract.calls().is_empty());
    }

    #[tokio::test]
    async fn test_post_failure_is_surfaced() {
        let h = harness_with(
            FakeStore::with_uris(&["ipfs://img1", "ipfs://aud1", "ipfs://meta1"]),
            FakeContract::ok(),
            FakePosts {
                fail: true,
                ..Default::default()
            },
            settings(UploadFailurePolicy::Continue),
        );

        let err = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap_err();
        match err {
            MintError::PostNotRecorded { tx_hash, .. } => assert_eq!(tx_hash, "0xfeed"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!h.orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_second_submit_while_busy() {
        let gate = Arc::new(Notify::new());
        let store = FakeStore {
            gate: Some(gate.clone()),
            ..FakeStore::with_uris(&["ipfs://img1", "ipfs://aud1", "ipfs://meta1"])
        };
        let h = harness_with(
            store,
            FakeContract::ok(),
            FakePosts::default(),
            settings(UploadFailurePolicy::Continue),
        );

        let first = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.submit(&midnight(), Some(&identity())).await })
        };

        while h.orchestrator.stage() != MintStage::Uploading {
            tokio::task::yield_now().await;
        }
        assert!(h.orchestrator.is_busy());

        let err = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap_err();
        assert!(matches!(err, MintError::Busy));

        for _ in 0..3 {
            gate.notify_one();
            tokio::task::yield_now().await;
        }
        let outcome = first.await.unwrap().unwrap();
        assert_eq!(outcome.tx_hash, "0xfeed");
        assert_eq!(h.posts.saved().len(), 1);
        assert!(!h.orchestrator.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transaction_timeout_releases_flag() {
        let contract = FakeContract {
            delay: Some(Duration::from_secs(60)),
            ..FakeContract::ok()
        };
        let h = harness_with(
            FakeStore::with_uris(&["ipfs://img1", "ipfs://aud1", "ipfs://meta1"]),
            contract,
            FakePosts::default(),
            settings(UploadFailurePolicy::Continue),
        );

        let err = h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap_err();
        match err {
            MintError::Transaction(e) => assert!(e.message.contains("timed out")),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(h.posts.saved().is_empty());
        assert!(!h.orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_fake_feed_filters_by_account() {
        let h = harness(FakeContract::ok());
        h.orchestrator.submit(&midnight(), Some(&identity())).await.unwrap();

        let mine = h.orchestrator.posts().list(Some(&identity().eth_address)).await.unwrap();
        assert_eq!(mine.len(), 1);
        let theirs = h.orchestrator.posts().list(Some("0x0")).await.unwrap();
        assert!(theirs.is_empty());
    }
}
