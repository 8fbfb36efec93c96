//! Interactive availability session.
//!
//! Edits to the region or dates arrive on a channel. Each edit restarts a
//! quiet-period timer; when it expires the latest state is aggregated. Every
//! request gets a sequence number, a newer request aborts the one in flight,
//! and only the result of the newest request reaches the chart surface.

pub mod commands;
pub mod surface;

pub use commands::{parse_command, SessionCommand};
pub use surface::{ChartSurface, TerminalSurface};

use crate::analysis::{aggregate, AvailabilityQuery};
use crate::catalog::ImageryCatalog;
use crate::error::AvailabilityError;
use crate::models::AvailabilityTable;
use crate::region::Region;
use std::future::pending;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

/// A user edit.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// A newly drawn region, replacing any previous one.
    SetRegion(Region),
    /// Remove the drawn region.
    ClearRegion,
    /// New start date text.
    SetStart(String),
    /// New end date text.
    SetEnd(String),
}

type Outcome = (AvailabilityQuery, Result<AvailabilityTable, AvailabilityError>);

struct InFlight {
    seq: u64,
    handle: JoinHandle<Outcome>,
}

/// Debounced, sequenced aggregation loop feeding a chart surface.
pub struct AvailabilitySession<S> {
    catalog: Arc<dyn ImageryCatalog>,
    surface: S,
    debounce: Duration,
    region: Option<Region>,
    start: String,
    end: String,
    seq: u64,
}

impl<S: ChartSurface> AvailabilitySession<S> {
    pub fn new(catalog: Arc<dyn ImageryCatalog>, surface: S, debounce: Duration) -> Self {
        Self {
            catalog,
            surface,
            debounce,
            region: None,
            start: String::new(),
            end: String::new(),
            seq: 0,
        }
    }

    /// Initial date text.
    pub fn with_dates(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start = start.into();
        self.end = end.into();
        self
    }

    /// Initial region; the first query runs one quiet period after start.
    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Process edits until the channel closes and all work is drained.
    /// Returns the surface.
    pub async fn run(mut self, mut edits: mpsc::Receiver<Edit>) -> S {
        let mut deadline = self.region.as_ref().map(|_| Instant::now() + self.debounce);
        let mut in_flight: Option<InFlight> = None;
        let mut edits_open = true;

        loop {
            if !edits_open && deadline.is_none() && in_flight.is_none() {
                break;
            }

            tokio::select! {
                edit = edits.recv(), if edits_open => match edit {
                    Some(edit) => {
                        self.apply(edit);
                        deadline = Some(Instant::now() + self.debounce);
                    }
                    None => {
                        debug!("Edit stream closed");
                        edits_open = false;
                    }
                },
                _ = wait_until(deadline) => {
                    deadline = None;
                    self.trigger(&mut in_flight);
                }
                (seq, joined) = join(&mut in_flight) => {
                    in_flight = None;
                    self.complete(seq, joined);
                }
            }
        }

        if let Some(stale) = in_flight {
            stale.handle.abort();
        }
        self.surface
    }

    fn apply(&mut self, edit: Edit) {
        debug!("Edit: {:?}", edit);
        match edit {
            Edit::SetRegion(region) => self.region = Some(region),
            Edit::ClearRegion => self.region = None,
            Edit::SetStart(text) => self.start = text,
            Edit::SetEnd(text) => self.end = text,
        }
    }

    /// Issue a new request for the current state, cancelling the previous one.
    fn trigger(&mut self, in_flight: &mut Option<InFlight>) {
        // Any earlier result is stale once the state changed, even when
        // the new state issues no request.
        self.seq += 1;
        let seq = self.seq;

        if let Some(previous) = in_flight.take() {
            debug!("Cancelling request #{}", previous.seq);
            previous.handle.abort();
        }

        let Some(region) = self.region.clone() else {
            debug!("No region drawn, request #{} suppressed", seq);
            return;
        };

        let query = match AvailabilityQuery::parse(region, &self.start, &self.end) {
            Ok(query) => query,
            Err(e) => {
                self.surface.fail(seq, &e);
                return;
            }
        };

        info!("Request #{}: {} {} .. {}", seq, query.region, query.start, query.end);
        let catalog = Arc::clone(&self.catalog);
        let handle = tokio::spawn(async move {
            let result = aggregate(catalog.as_ref(), &query).await;
            (query, result)
        });
        *in_flight = Some(InFlight { seq, handle });
    }

    fn complete(&mut self, seq: u64, joined: Result<Outcome, JoinError>) {
        if seq != self.seq {
            debug!("Dropping stale result #{} (latest #{})", seq, self.seq);
            return;
        }

        match joined {
            Ok((query, Ok(table))) => self.surface.show(seq, &query, &table),
            Ok((_, Err(e))) => self.surface.fail(seq, &e),
            Err(e) => self.surface.fail(seq, &AvailabilityError::Task(e.to_string())),
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn join(in_flight: &mut Option<InFlight>) -> (u64, Result<Outcome, JoinError>) {
    match in_flight {
        Some(request) => (request.seq, (&mut request.handle).await),
        None => pending().await,
    }
}
