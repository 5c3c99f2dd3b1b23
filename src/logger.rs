// src/logger.rs
// FaultLogger — the ingestion entry point handed to request pipelines

use crate::error::Result;
use crate::fault::{Fault, FaultParams, RequestContext};
use crate::store::{RecordOutcome, SqlFaultStore};
use std::sync::Arc;
use tracing::warn;

/// The callable surface a host process wires its error handling into.
///
/// Holds the store and the reporting identity explicitly — there is no
/// process-wide registration; construct one per application and pass it
/// where faults are caught.
pub struct FaultLogger {
    store: Arc<SqlFaultStore>,
    application_name: String,
    machine_name: String,
    rollup_per_server: bool,
}

impl FaultLogger {
    pub fn new(
        store: Arc<SqlFaultStore>,
        application_name: impl Into<String>,
        machine_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            application_name: application_name.into(),
            machine_name: machine_name.into(),
            rollup_per_server: false,
        }
    }

    /// Roll duplicates up per origin host instead of globally: the same
    /// error on two machines stays two records.
    pub fn with_rollup_per_server(mut self, enabled: bool) -> Self {
        self.rollup_per_server = enabled;
        self
    }

    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// Report a live error value, without request context.
    pub async fn report<E>(&self, err: &E) -> Result<RecordOutcome>
    where
        E: std::error::Error,
    {
        let mut fault = Fault::from_error(
            err,
            &self.application_name,
            &self.machine_name,
            self.rollup_per_server,
            None,
        );
        self.record(&mut fault).await
    }

    /// Report a live error value together with the HTTP context it happened in.
    pub async fn report_with_context<E>(
        &self,
        err: &E,
        context: RequestContext,
    ) -> Result<RecordOutcome>
    where
        E: std::error::Error,
    {
        let mut fault = Fault::from_error(
            err,
            &self.application_name,
            &self.machine_name,
            self.rollup_per_server,
            Some(context),
        );
        self.record(&mut fault).await
    }

    /// Report an error from decomposed fields (no live error value).
    pub async fn report_parts(
        &self,
        error_type: &str,
        source: &str,
        message: &str,
        detail: &str,
        context: Option<RequestContext>,
    ) -> Result<RecordOutcome> {
        let mut fault = Fault::from_parts(FaultParams {
            application_name: &self.application_name,
            machine_name: &self.machine_name,
            error_type,
            source,
            message,
            detail,
            rollup_per_server: self.rollup_per_server,
            context,
        })?;
        self.record(&mut fault).await
    }

    async fn record(&self, fault: &mut Fault) -> Result<RecordOutcome> {
        match self.store.record(fault).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // Never swallow: surface to the caller, who decides drop/retry.
                warn!(app = %self.application_name, error = %e, "failed to record fault");
                Err(e)
            }
        }
    }
}
