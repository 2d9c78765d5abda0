//! In-memory doubles for unit tests.

use super::{DatabaseClient, DatabaseHandle, HandleSlot};
use crate::Result;
use crate::error::PluginError;
use crate::logging::{LogRequest, PluginLogger};
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Client double with failure switches and call counters.
#[derive(Debug, Default)]
pub(crate) struct FakeClient {
    slot: HandleSlot<usize>,
    fail_connect: AtomicBool,
    fail_close: AtomicBool,
    connect_calls: AtomicUsize,
    close_calls: AtomicUsize,
    database_calls: AtomicUsize,
}

impl FakeClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn set_fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.slot.current().is_some()
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn database_calls(&self) -> usize {
        self.database_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatabaseClient for FakeClient {
    type Database = FakeDatabase;

    async fn connect(&self) -> Result<()> {
        let serial = self.connect_calls.fetch_add(1, Ordering::SeqCst);
        let mut lease = self.slot.lease();
        let connection = lease.live.take().unwrap_or(serial);

        // Stands in for the ping; concurrent callers interleave here
        tokio::task::yield_now().await;

        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(PluginError::connection_failed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        if !self.slot.install(lease, connection) {
            return Err(PluginError::ClientClosed);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_close.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
            return Err(PluginError::disconnection_failed(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "socket closed mid-shutdown",
            )));
        }

        let _ = self.slot.take();
        // Stands in for the driver shutdown
        tokio::task::yield_now().await;
        Ok(())
    }

    fn database(&self, name: &str) -> Result<FakeDatabase> {
        self.database_calls.fetch_add(1, Ordering::SeqCst);

        if !self.is_connected() {
            return Err(PluginError::ClientClosed);
        }

        Ok(FakeDatabase {
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FakeDatabase {
    name: String,
}

impl DatabaseHandle for FakeDatabase {
    type Collection<T: Send + Sync> = FakeCollection<T>;

    fn name(&self) -> &str {
        &self.name
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> FakeCollection<T> {
        FakeCollection {
            namespace: format!("{}.{name}", self.name),
            _document: PhantomData,
        }
    }
}

pub(crate) struct FakeCollection<T> {
    namespace: String,
    _document: PhantomData<fn() -> T>,
}

impl<T> FakeCollection<T> {
    pub(crate) fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl<T> PartialEq for FakeCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
    }
}

impl<T> std::fmt::Debug for FakeCollection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FakeCollection")
            .field(&self.namespace)
            .finish()
    }
}

/// Logger that keeps every request it receives.
#[derive(Debug, Default)]
pub(crate) struct RecordingLogger {
    entries: Mutex<Vec<LogRequest>>,
}

impl RecordingLogger {
    pub(crate) fn entries(&self) -> Vec<LogRequest> {
        self.entries.lock().unwrap().clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl PluginLogger for RecordingLogger {
    fn log(&self, request: LogRequest) {
        self.entries.lock().unwrap().push(request);
    }
}
