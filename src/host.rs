//! Document-level conversion on behalf of a host.
//!
//! The host owns the documents and the user-facing notifications; the
//! [`Session`] reads a document through it, converts it and writes it back.

use std::{
    collections::HashSet,
    fmt::Debug,
    future::Future,
    hash::Hash,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

use tokio::io::AsyncWriteExt as _;
use tracing::{error, info};

use crate::{
    convert::{BookmarkConverter, ConvertError},
    progress::{ConversionReporter, Tally},
    resolver::Resolver,
    scanner::MarkerOccurrence,
};

pub trait Host: Sync {
    type Handle: Clone + Eq + Hash + Debug + Send + Sync;
    type Error: std::error::Error + Send + Sync + 'static;

    fn read_text(
        &self,
        handle: &Self::Handle,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;

    fn write_text(
        &self,
        handle: &Self::Handle,
        text: String,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    fn notify(&self, message: &str);
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError<E> {
    #[error("a conversion of {0} is already running")]
    AlreadyRunning(String),
    #[error("failed to read document: {0}")]
    Read(E),
    #[error("failed to write document: {0}")]
    Write(E),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentOutcome {
    /// The document has no marker and was not written.
    NoMarkers,
    Converted(Tally),
}

/// Forwards driver events to the host as notifications.
pub struct HostReporter<'h, H> {
    host: &'h H,
}

impl<'h, H> HostReporter<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self { host }
    }
}

impl<H: Host> ConversionReporter for HostReporter<'_, H> {
    fn found(&self, count: usize) {
        self.host
            .notify(&format!("找到 {count} 個需要轉換的書籤，開始處理..."));
    }

    fn converted(&self, _occurrence: &MarkerOccurrence, title: &str) {
        self.host.notify(&format!("✅ 成功轉換: {title}"));
    }

    fn failed(&self, occurrence: &MarkerOccurrence, _reason: &str) {
        self.host
            .notify(&format!("❌ 轉換失敗: {}", occurrence.target_url));
    }

    fn skipped(&self, occurrence: &MarkerOccurrence, _error: &ConvertError) {
        self.host
            .notify(&format!("❌ 處理書籤時發生錯誤: {}", occurrence.target_url));
    }
}

/// Removes the handle from the in-flight set when the conversion ends,
/// however it ends.
struct InFlight<'s, K: Eq + Hash> {
    running: &'s Mutex<HashSet<K>>,
    handle: K,
}

impl<K: Eq + Hash> Drop for InFlight<'_, K> {
    fn drop(&mut self) {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.handle);
    }
}

pub struct Session<H: Host, R> {
    host: H,
    converter: BookmarkConverter<R>,
    running: Mutex<HashSet<H::Handle>>,
}

impl<H: Host, R: Resolver + Sync> Session<H, R> {
    pub fn new(host: H, converter: BookmarkConverter<R>) -> Self {
        Self {
            host,
            converter,
            running: Mutex::new(HashSet::new()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    fn begin(
        &self,
        handle: &H::Handle,
    ) -> Result<InFlight<'_, H::Handle>, SessionError<H::Error>> {
        let mut running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !running.insert(handle.clone()) {
            return Err(SessionError::AlreadyRunning(format!("{handle:?}")));
        }
        Ok(InFlight {
            running: &self.running,
            handle: handle.clone(),
        })
    }

    /// Converts the document behind `handle` and writes it back. A second
    /// call for the same handle is refused while the first one runs.
    pub async fn convert_document(
        &self,
        handle: &H::Handle,
    ) -> Result<DocumentOutcome, SessionError<H::Error>> {
        let _guard = self.begin(handle)?;
        let result = self.convert_document_inner(handle).await;
        if let Err(e) = &result {
            error!(?handle, %e, "bookmark conversion failed");
            self.host.notify("轉換書籤時發生錯誤，請查看控制台");
        }
        result
    }

    async fn convert_document_inner(
        &self,
        handle: &H::Handle,
    ) -> Result<DocumentOutcome, SessionError<H::Error>> {
        let text = self
            .host
            .read_text(handle)
            .await
            .map_err(SessionError::Read)?;
        let reporter = HostReporter::new(&self.host);
        let state = self.converter.convert_with(&text, &reporter).await;
        let tally = state.tally();
        // Every marker found is counted, whatever became of it.
        if tally.total() == 0 {
            self.host.notify("未找到需要轉換的書籤模式");
            return Ok(DocumentOutcome::NoMarkers);
        }
        self.host
            .write_text(handle, state.into_text())
            .await
            .map_err(SessionError::Write)?;
        info!(?handle, total = tally.total(), "bookmark conversion written");
        self.host.notify("書籤轉換完成！");
        Ok(DocumentOutcome::Converted(tally))
    }
}

/// Documents are files; notifications go to stderr. With `dry_run` the
/// converted document is printed to stdout instead of replacing the file.
#[derive(Debug, Default)]
pub struct FsHost {
    pub dry_run: bool,
}

impl Host for FsHost {
    type Handle = PathBuf;
    type Error = std::io::Error;

    async fn read_text(&self, handle: &PathBuf) -> Result<String, std::io::Error> {
        tokio::fs::read_to_string(handle).await
    }

    async fn write_text(&self, handle: &PathBuf, text: String) -> Result<(), std::io::Error> {
        if self.dry_run {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(text.as_bytes()).await?;
            stdout.flush().await
        } else {
            tokio::fs::write(handle, text).await
        }
    }

    fn notify(&self, message: &str) {
        eprintln!("{message}");
    }
}
