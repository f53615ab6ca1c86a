//! Command router: one [`InboundEvent`] in, exactly one [`OutboundReply`] out.
//!
//! Every failure is turned into a text reply here; nothing propagates to the
//! transport.

use std::{sync::Arc, time::Duration};

use {
    futures::StreamExt,
    tracing::{debug, info, warn},
};

use {
    teledrive_common::types::{Attachment, InboundEvent, OutboundReply},
    teledrive_storage::{StorageError, StorageGateway},
};

use crate::config::RouterConfig;

const WELCOME_TEXT: &str = "Hi, I'm your personal drive. Send me a file to upload it, \
                            or use /list, /get <name> and /share <name>.";
const FALLBACK_TEXT: &str = "Send a file (as a document) to upload it.";
const EMPTY_BUCKET_TEXT: &str = "The bucket is empty.";
const MISSING_FILENAME_TEXT: &str =
    "That file has no name. Rename it and send it again as a document.";
const FETCH_FAILED_TEXT: &str = "Error: could not download the file from Telegram.";
const BACKEND_FAILED_TEXT: &str = "Error: storage is unavailable right now, try again later.";

/// Commands the bot understands. Matching is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    List,
    Get,
    Share,
}

impl Command {
    pub const ALL: [Self; 4] = [Self::Start, Self::List, Self::Get, Self::Share];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(Self::Start),
            "list" => Some(Self::List),
            "get" => Some(Self::Get),
            "share" => Some(Self::Share),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::List => "list",
            Self::Get => "get",
            Self::Share => "share",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Start => "Show what this bot does",
            Self::List => "List stored files",
            Self::Get => "Download a file: /get <name>",
            Self::Share => "Get a temporary link: /share <name>",
        }
    }

    fn usage(self) -> String {
        format!("Usage: /{} <file name>", self.name())
    }
}

/// Stateless dispatcher over a shared storage handle.
pub struct Router {
    storage: Arc<dyn StorageGateway>,
    config: RouterConfig,
}

impl Router {
    pub fn new(storage: Arc<dyn StorageGateway>, config: RouterConfig) -> Self {
        Self { storage, config }
    }

    pub async fn dispatch(&self, event: InboundEvent) -> OutboundReply {
        match event {
            InboundEvent::Command { name, arg_text, .. } => {
                self.dispatch_command(&name, &arg_text).await
            },
            InboundEvent::Attachment(attachment) => self.upload(attachment).await,
            InboundEvent::Other => OutboundReply::text(FALLBACK_TEXT),
        }
    }

    async fn dispatch_command(&self, name: &str, arg_text: &str) -> OutboundReply {
        let Some(command) = Command::from_name(name) else {
            debug!(command = name, "unknown command");
            return OutboundReply::Text(unknown_command_text(name));
        };

        match command {
            Command::Start => OutboundReply::text(WELCOME_TEXT),
            Command::List => self.list().await,
            Command::Get => match object_name(arg_text) {
                Some(name) => self.get(&name).await,
                None => OutboundReply::Text(command.usage()),
            },
            Command::Share => match object_name(arg_text) {
                Some(name) => self.share(&name).await,
                None => OutboundReply::Text(command.usage()),
            },
        }
    }

    async fn upload(&self, attachment: Attachment) -> OutboundReply {
        let Some(name) = attachment.filename.filter(|n| !n.trim().is_empty()) else {
            return OutboundReply::text(MISSING_FILENAME_TEXT);
        };

        let limit = self.config.max_upload_bytes;
        if let Some(size) = attachment.size
            && size > limit
        {
            return OutboundReply::Text(too_large_text(&name, size, limit));
        }

        let data = match attachment.source.fetch().await {
            Ok(data) => data,
            Err(e) => {
                warn!(object = %name, error = %e, "failed to fetch attachment");
                return OutboundReply::text(FETCH_FAILED_TEXT);
            },
        };
        // The declared size may be missing or wrong.
        if data.len() as u64 > limit {
            return OutboundReply::Text(too_large_text(&name, data.len() as u64, limit));
        }

        let bytes = data.len();
        match self.storage.put_object(&name, data).await {
            Ok(()) => {
                info!(bucket = self.storage.bucket(), object = %name, bytes, "file uploaded");
                OutboundReply::Text(format!("Uploaded: {name}"))
            },
            Err(e) => storage_failure("upload", &name, e),
        }
    }

    async fn list(&self) -> OutboundReply {
        let limit = self.config.list_limit;
        let mut names = Vec::new();
        let mut truncated = false;

        let mut objects = self.storage.list_objects();
        while let Some(item) = objects.next().await {
            match item {
                Ok(_) if names.len() == limit => {
                    truncated = true;
                    break;
                },
                Ok(name) => names.push(name),
                Err(e) => return storage_failure("list", self.storage.bucket(), e),
            }
        }

        if names.is_empty() {
            return OutboundReply::text(EMPTY_BUCKET_TEXT);
        }

        let mut text = format!("Files:\n{}", names.join("\n"));
        if truncated {
            text.push_str(&format!("\n(showing the first {limit} files)"));
        }
        OutboundReply::Text(text)
    }

    async fn get(&self, name: &str) -> OutboundReply {
        match self.storage.get_object(name).await {
            Ok(data) => {
                debug!(object = name, bytes = data.len(), "sending file");
                OutboundReply::Document {
                    filename: name.to_string(),
                    data,
                }
            },
            Err(e) => storage_failure("get", name, e),
        }
    }

    async fn share(&self, name: &str) -> OutboundReply {
        let ttl = self.config.share_ttl;
        match self.storage.presigned_url(name, ttl).await {
            Ok(url) => OutboundReply::Text(format!("URL ({}): {url}", describe_ttl(ttl))),
            Err(e) => storage_failure("share", name, e),
        }
    }
}

/// The object name from the text after the command. Inner whitespace is
/// kept as sent so any stored name can be addressed.
fn object_name(arg_text: &str) -> Option<String> {
    let name = arg_text.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn storage_failure(operation: &'static str, target: &str, err: StorageError) -> OutboundReply {
    match err {
        StorageError::NotFound { name } => OutboundReply::Text(format!("Error: file not found: {name}")),
        other => {
            warn!(operation, object = target, error = %other, "storage operation failed");
            OutboundReply::text(BACKEND_FAILED_TEXT)
        },
    }
}

fn unknown_command_text(name: &str) -> String {
    let known: Vec<String> = Command::ALL
        .iter()
        .map(|c| format!("/{}", c.name()))
        .collect();
    format!("Unknown command: /{name}. Available: {}", known.join(", "))
}

fn too_large_text(name: &str, size: u64, limit: u64) -> String {
    format!("{name} is too large ({size} bytes). The limit is {limit} bytes.")
}

/// `3600s` -> `1h`, `90s` -> `90s`, `600s` -> `10m`.
fn describe_ttl(ttl: Duration) -> String {
    let secs = ttl.as_secs();
    if secs > 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs > 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        async_trait::async_trait,
        bytes::Bytes,
        futures::stream::BoxStream,
        rstest::rstest,
        std::sync::atomic::{AtomicUsize, Ordering},
        teledrive_common::types::AttachmentSource,
        teledrive_storage::MemoryGateway,
    };

    const ENDPOINT: &str = "http://minio:9000";

    /// Wraps a [`MemoryGateway`] and counts every backend call.
    struct CountingGateway {
        inner: MemoryGateway,
        calls: AtomicUsize,
    }

    impl CountingGateway {
        fn new() -> Self {
            Self {
                inner: MemoryGateway::new(ENDPOINT, "drive"),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn hit(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl StorageGateway for CountingGateway {
        fn bucket(&self) -> &str {
            self.inner.bucket()
        }

        async fn ensure_bucket(&self) -> teledrive_storage::Result<()> {
            self.hit();
            self.inner.ensure_bucket().await
        }

        async fn put_object(&self, name: &str, data: Bytes) -> teledrive_storage::Result<()> {
            self.hit();
            self.inner.put_object(name, data).await
        }

        fn list_objects(&self) -> BoxStream<'_, teledrive_storage::Result<String>> {
            self.hit();
            self.inner.list_objects()
        }

        async fn get_object(&self, name: &str) -> teledrive_storage::Result<Bytes> {
            self.hit();
            self.inner.get_object(name).await
        }

        async fn presigned_url(
            &self,
            name: &str,
            ttl: Duration,
        ) -> teledrive_storage::Result<String> {
            self.hit();
            self.inner.presigned_url(name, ttl).await
        }
    }

    /// Counts fetches; fails when `fail` is set.
    struct ProbeSource {
        data: Bytes,
        fetches: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl AttachmentSource for ProbeSource {
        async fn fetch(&self) -> teledrive_common::Result<Bytes> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(teledrive_common::Error::message("connection reset"))
            } else {
                Ok(self.data.clone())
            }
        }
    }

    fn setup() -> (Arc<CountingGateway>, Router) {
        let gateway = Arc::new(CountingGateway::new());
        let router = Router::new(
            Arc::clone(&gateway) as Arc<dyn StorageGateway>,
            RouterConfig::default(),
        );
        (gateway, router)
    }

    fn command(name: &str, args: &[&str]) -> InboundEvent {
        InboundEvent::Command {
            name: name.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            arg_text: args.join(" "),
        }
    }

    fn text(reply: &OutboundReply) -> &str {
        reply
            .as_text()
            .unwrap_or_else(|| panic!("expected text reply, got {reply:?}"))
    }

    async fn upload(router: &Router, name: &str, data: &'static [u8]) -> OutboundReply {
        router
            .dispatch(InboundEvent::Attachment(Attachment::from_bytes(name, data)))
            .await
    }

    #[tokio::test]
    async fn upload_list_get_share_scenario() {
        let (_gateway, router) = setup();

        let reply = upload(&router, "report.pdf", b"0123456789").await;
        assert_eq!(text(&reply), "Uploaded: report.pdf");

        let reply = router.dispatch(command("list", &[])).await;
        assert!(text(&reply).lines().any(|l| l == "report.pdf"));

        let reply = router.dispatch(command("get", &["report.pdf"])).await;
        assert_eq!(reply, OutboundReply::Document {
            filename: "report.pdf".into(),
            data: Bytes::from_static(b"0123456789"),
        });

        let reply = router.dispatch(command("share", &["report.pdf"])).await;
        let body = text(&reply);
        assert!(body.starts_with("URL (1h): "), "{body}");
        let url = body.trim_start_matches("URL (1h): ");
        assert!(url.starts_with("http://minio:9000/"), "{url}");
    }

    #[tokio::test]
    async fn start_replies_with_welcome() {
        let (gateway, router) = setup();
        let reply = router.dispatch(command("start", &[])).await;
        assert_eq!(text(&reply), WELCOME_TEXT);
        assert_eq!(gateway.calls(), 0);
    }

    #[rstest]
    #[case("get", "Usage: /get <file name>")]
    #[case("share", "Usage: /share <file name>")]
    #[tokio::test]
    async fn missing_argument_replies_usage_without_backend_call(
        #[case] name: &str,
        #[case] usage: &str,
    ) {
        let (gateway, router) = setup();
        let reply = router.dispatch(command(name, &[])).await;
        assert_eq!(text(&reply), usage);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn get_missing_object_names_it() {
        let (_gateway, router) = setup();
        let reply = router.dispatch(command("get", &["ghost.txt"])).await;
        assert!(matches!(reply, OutboundReply::Text(_)));
        assert_eq!(text(&reply), "Error: file not found: ghost.txt");
    }

    #[tokio::test]
    async fn share_missing_object_fails_fast() {
        let (_gateway, router) = setup();
        let reply = router.dispatch(command("share", &["ghost.txt"])).await;
        assert_eq!(text(&reply), "Error: file not found: ghost.txt");
    }

    #[tokio::test]
    async fn share_links_differ_per_call() {
        let (_gateway, router) = setup();
        upload(&router, "a.txt", b"a").await;
        let first = router.dispatch(command("share", &["a.txt"])).await;
        let second = router.dispatch(command("share", &["a.txt"])).await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn names_with_spaces_are_addressable() {
        let (_gateway, router) = setup();
        upload(&router, "my report.pdf", b"x").await;
        let reply = router.dispatch(command("get", &["my", "report.pdf"])).await;
        assert!(matches!(reply, OutboundReply::Document { ref filename, .. } if filename == "my report.pdf"));
    }

    #[tokio::test]
    async fn names_keep_inner_whitespace() {
        let (_gateway, router) = setup();
        upload(&router, "a  b.txt", b"x").await;

        let reply = router
            .dispatch(InboundEvent::from_text("/get a  b.txt", None))
            .await;
        assert!(matches!(reply, OutboundReply::Document { ref filename, .. } if filename == "a  b.txt"));

        let reply = router
            .dispatch(InboundEvent::from_text("/get a b.txt", None))
            .await;
        assert_eq!(text(&reply), "Error: file not found: a b.txt");
    }

    #[tokio::test]
    async fn list_empty_bucket() {
        let (_gateway, router) = setup();
        let reply = router.dispatch(command("list", &[])).await;
        assert_eq!(text(&reply), EMPTY_BUCKET_TEXT);
    }

    #[tokio::test]
    async fn list_caps_at_limit() {
        let (gateway, router) = setup();
        let stored: Vec<String> = (0..75).map(|i| format!("file-{i:03}.txt")).collect();
        for name in &stored {
            gateway
                .inner
                .put_object(name, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }

        let reply = router.dispatch(command("list", &[])).await;
        let body = text(&reply);
        let listed = body
            .lines()
            .filter(|line| stored.iter().any(|s| s == line))
            .count();
        assert_eq!(listed, 50);
        assert!(body.ends_with("(showing the first 50 files)"), "{body}");
    }

    #[tokio::test]
    async fn list_under_limit_is_not_marked_truncated() {
        let (_gateway, router) = setup();
        upload(&router, "a.txt", b"a").await;
        upload(&router, "b.txt", b"b").await;
        let reply = router.dispatch(command("list", &[])).await;
        assert_eq!(text(&reply), "Files:\na.txt\nb.txt");
    }

    #[tokio::test]
    async fn list_respects_configured_limit() {
        let gateway = Arc::new(MemoryGateway::new(ENDPOINT, "drive"));
        for name in ["a", "b", "c"] {
            gateway.put_object(name, Bytes::new()).await.unwrap();
        }
        let router = Router::new(gateway, RouterConfig {
            list_limit: 2,
            ..Default::default()
        });
        let reply = router.dispatch(command("list", &[])).await;
        assert_eq!(text(&reply), "Files:\na\nb\n(showing the first 2 files)");
    }

    #[tokio::test]
    async fn upload_overwrites_existing_object() {
        let (gateway, router) = setup();
        upload(&router, "a.txt", b"old").await;
        upload(&router, "a.txt", b"new").await;
        assert_eq!(&gateway.inner.get_object("a.txt").await.unwrap()[..], b"new");
    }

    #[rstest]
    #[case(None)]
    #[case(Some(""))]
    #[case(Some("   "))]
    #[tokio::test]
    async fn upload_without_filename_is_rejected(#[case] filename: Option<&str>) {
        let (gateway, router) = setup();
        let fetches = Arc::new(AtomicUsize::new(0));
        let attachment = Attachment {
            filename: filename.map(str::to_string),
            size: Some(1),
            source: Box::new(ProbeSource {
                data: Bytes::from_static(b"x"),
                fetches: Arc::clone(&fetches),
                fail: false,
            }),
        };
        let reply = router.dispatch(InboundEvent::Attachment(attachment)).await;
        assert_eq!(text(&reply), MISSING_FILENAME_TEXT);
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_never_fetched() {
        let (gateway, router) = setup();
        let fetches = Arc::new(AtomicUsize::new(0));
        let attachment = Attachment {
            filename: Some("huge.iso".into()),
            size: Some(RouterConfig::default().max_upload_bytes + 1),
            source: Box::new(ProbeSource {
                data: Bytes::new(),
                fetches: Arc::clone(&fetches),
                fail: false,
            }),
        };
        let reply = router.dispatch(InboundEvent::Attachment(attachment)).await;
        assert!(text(&reply).starts_with("huge.iso is too large"));
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_replies_with_error() {
        let (gateway, router) = setup();
        let attachment = Attachment {
            filename: Some("a.txt".into()),
            size: None,
            source: Box::new(ProbeSource {
                data: Bytes::new(),
                fetches: Arc::new(AtomicUsize::new(0)),
                fail: true,
            }),
        };
        let reply = router.dispatch(InboundEvent::Attachment(attachment)).await;
        assert_eq!(text(&reply), FETCH_FAILED_TEXT);
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn backend_outage_replies_generic_error() {
        let (gateway, router) = setup();
        upload(&router, "a.txt", b"a").await;
        gateway.inner.set_available(false);

        for event in [
            command("list", &[]),
            command("get", &["a.txt"]),
            command("share", &["a.txt"]),
        ] {
            let reply = router.dispatch(event).await;
            assert_eq!(text(&reply), BACKEND_FAILED_TEXT);
        }
        let reply = upload(&router, "b.txt", b"b").await;
        assert_eq!(text(&reply), BACKEND_FAILED_TEXT);
    }

    #[tokio::test]
    async fn other_events_get_fallback_prompt() {
        let (gateway, router) = setup();
        let reply = router.dispatch(InboundEvent::Other).await;
        assert_eq!(text(&reply), FALLBACK_TEXT);
        assert_eq!(gateway.calls(), 0);
    }

    #[rstest]
    #[case("delete")]
    #[case("LIST")]
    #[case("Get")]
    #[tokio::test]
    async fn unknown_commands_are_named(#[case] name: &str) {
        let (gateway, router) = setup();
        let reply = router.dispatch(command(name, &["x"])).await;
        let body = text(&reply);
        assert!(body.starts_with(&format!("Unknown command: /{name}.")), "{body}");
        assert!(body.contains("/list"));
        assert_eq!(gateway.calls(), 0);
    }

    #[rstest]
    #[case(3600, "1h")]
    #[case(7200, "2h")]
    #[case(600, "10m")]
    #[case(90, "90s")]
    #[case(0, "0s")]
    fn ttl_descriptions(#[case] secs: u64, #[case] expected: &str) {
        assert_eq!(describe_ttl(Duration::from_secs(secs)), expected);
    }

    #[test]
    fn command_names_round_trip() {
        for command in Command::ALL {
            assert_eq!(Command::from_name(command.name()), Some(command));
        }
        assert_eq!(Command::from_name("help"), None);
    }
}
