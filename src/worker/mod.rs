//! Tokenization worker pool.
//!
//! Requests go round-robin to a fixed set of threads over std `mpsc`
//! channels; responses come back on one shared channel tagged with the
//! correlation id of their request. Completion order across requests is
//! arbitrary.

use crate::model::{EntryId, TokenSpan};
use crate::tokenizer::tokenize;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the worker pool.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// A worker thread could not be started.
    #[error("failed to spawn tokenizer worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// All workers are gone (panicked or shut down).
    #[error("tokenizer workers disconnected")]
    Disconnected,
}

/// Ties a response to the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId(pub u64);

/// A line sent to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeRequest {
    /// Entry the line belongs to.
    pub id: EntryId,
    /// Text to tokenize.
    pub raw_text: String,
    /// Strip ANSI styling while tokenizing.
    pub strip_styling: bool,
    /// Echoed back on the response.
    pub correlation_id: CorrelationId,
}

/// Tokenizer output for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizeResponse {
    /// Copied from the request.
    pub correlation_id: CorrelationId,
    /// Tokenized spans.
    pub spans: Vec<TokenSpan>,
}

/// Fixed pool of tokenizer threads.
///
/// Requests are dealt round-robin; responses arrive on one shared channel in
/// completion order.
pub struct TokenizerPool {
    senders: Vec<Sender<TokenizeRequest>>,
    responses: Receiver<TokenizeResponse>,
    handles: Vec<JoinHandle<()>>,
    next_correlation: u64,
    next_worker: usize,
}

impl TokenizerPool {
    /// Start `threads` workers (at least one).
    pub fn spawn(threads: usize) -> Result<Self, WorkerError> {
        let (response_tx, responses) = mpsc::channel();
        let mut senders = Vec::new();
        let mut handles = Vec::new();

        for n in 0..threads.max(1) {
            let (request_tx, request_rx) = mpsc::channel();
            let response_tx = response_tx.clone();
            let handle = thread::Builder::new()
                .name(format!("tokenizer-{n}"))
                .spawn(move || run_worker(request_rx, response_tx))
                .map_err(WorkerError::Spawn)?;
            senders.push(request_tx);
            handles.push(handle);
        }
        debug!(threads = senders.len(), "tokenizer pool started");

        Ok(Self {
            senders,
            responses,
            handles,
            next_correlation: 0,
            next_worker: 0,
        })
    }

    /// Number of worker threads.
    pub fn threads(&self) -> usize {
        self.senders.len()
    }

    /// Queue one line for tokenization.
    pub fn submit(
        &mut self,
        id: EntryId,
        raw_text: String,
        strip_styling: bool,
    ) -> Result<CorrelationId, WorkerError> {
        if self.senders.is_empty() {
            return Err(WorkerError::Disconnected);
        }
        let correlation_id = CorrelationId(self.next_correlation);
        self.next_correlation += 1;

        let worker = self.next_worker % self.senders.len();
        self.next_worker = self.next_worker.wrapping_add(1);

        self.senders[worker]
            .send(TokenizeRequest {
                id,
                raw_text,
                strip_styling,
                correlation_id,
            })
            .map_err(|_| WorkerError::Disconnected)?;
        Ok(correlation_id)
    }

    /// Block for the next response from any worker.
    pub fn recv(&self) -> Result<TokenizeResponse, WorkerError> {
        self.responses.recv().map_err(|_| WorkerError::Disconnected)
    }

    /// Tokenize a batch in parallel and wait for every result.
    ///
    /// Results come back in completion order. Responses that don't belong to
    /// this batch are dropped.
    pub fn tokenize_all(
        &mut self,
        jobs: Vec<(EntryId, String)>,
        strip_styling: bool,
    ) -> Result<Vec<(EntryId, Vec<TokenSpan>)>, WorkerError> {
        let mut pending = HashMap::with_capacity(jobs.len());
        for (id, raw_text) in jobs {
            let correlation_id = self.submit(id.clone(), raw_text, strip_styling)?;
            pending.insert(correlation_id, id);
        }

        let mut results = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let response = self.recv()?;
            match pending.remove(&response.correlation_id) {
                Some(id) => results.push((id, response.spans)),
                None => warn!(
                    correlation_id = response.correlation_id.0,
                    "dropping tokenizer response with no pending request"
                ),
            }
        }
        Ok(results)
    }

    /// Close the request channels and join every worker.
    pub fn shutdown(&mut self) {
        self.senders.clear();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("tokenizer worker panicked");
            }
        }
    }
}

impl Drop for TokenizerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(requests: Receiver<TokenizeRequest>, responses: Sender<TokenizeResponse>) {
    while let Ok(request) = requests.recv() {
        let spans = tokenize(&request.raw_text, request.strip_styling);
        let response = TokenizeResponse {
            correlation_id: request.correlation_id,
            spans,
        };
        if responses.send(response).is_err() {
            break;
        }
    }
}
