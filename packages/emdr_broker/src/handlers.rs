//! Per-variant request handlers.
//!
//! Each runs with the session table lock held by the caller and only queues
//! frames, so none of them await.

use emdr_wire::{Envelope, Params};
use tracing::{debug, info};

use crate::broadcast::{Delivery, deliver, send_to};
use crate::connection::ConnectionHandle;
use crate::error::DispatchError;
use crate::metrics::BrokerMetrics;
use crate::session::{JoinOutcome, SessionTable};

/// Broker-wide values the handlers read.
pub(crate) struct HandlerContext<'a> {
    pub join_url_base: &'a str,
    pub metrics: &'a BrokerMetrics,
}

impl HandlerContext<'_> {
    fn record(&self, delivery: Delivery) {
        self.metrics
            .frames_delivered(delivery.delivered as u64, delivery.dropped as u64);
    }
}

/// Append `sid=<id>` to the join page URL.
pub fn build_session_url(base: &str, sid: &str) -> String {
    let separator = if base.contains('?') {
        if base.ends_with('?') || base.ends_with('&') {
            ""
        } else {
            "&"
        }
    } else {
        "?"
    };
    format!("{base}{separator}sid={sid}")
}

pub(crate) fn create_session(
    table: &mut SessionTable,
    ctx: &HandlerContext<'_>,
    host: &ConnectionHandle,
) -> Result<(), DispatchError> {
    let sid = table.create_session(host);
    ctx.metrics.session_created();

    let session_url = build_session_url(ctx.join_url_base, &sid);
    debug!(conn_id = %host.id(), %session_url, "sending session url");
    let response = Envelope::CreateSessionResponse {
        accepted: true,
        session_url,
    };
    ctx.record(send_to(&response, host));
    Ok(())
}

pub(crate) fn join_session(
    table: &mut SessionTable,
    ctx: &HandlerContext<'_>,
    client: &ConnectionHandle,
    sid: &str,
) -> Result<(), DispatchError> {
    let outcome = table.join_session(sid, client);
    let accepted = outcome.is_accepted();
    ctx.metrics.join(accepted);
    ctx.record(send_to(&Envelope::JoinSessionResponse { accepted }, client));

    match outcome {
        JoinOutcome::Accepted { host } => {
            ctx.record(send_to(
                &Envelope::JoinSessionResponse { accepted: true },
                &host,
            ));
            Ok(())
        }
        JoinOutcome::Rejected => Err(DispatchError::UnknownSession(sid.to_string())),
    }
}

/// Fan `params` out to its session.
///
/// Frames off the wire never carry an empty sid here: the broker already turned
/// those into [`DispatchError::MissingSid`] at decode. The check covers direct callers.
pub(crate) fn update_params(
    table: &mut SessionTable,
    ctx: &HandlerContext<'_>,
    sender: &ConnectionHandle,
    params: Params,
) -> Result<(), DispatchError> {
    if params.sid.is_empty() {
        return Err(DispatchError::MissingSid);
    }
    let recipients = table
        .recipients(&params.sid)
        .ok_or_else(|| DispatchError::UnknownSession(params.sid.clone()))?;

    let sid = params.sid.clone();
    let delivery = deliver(&Envelope::Params(params), &recipients);
    ctx.record(delivery);
    info!(
        session_id = %sid,
        conn_id = %sender.id(),
        delivered = delivery.delivered,
        skipped = delivery.skipped,
        "params broadcast"
    );
    Ok(())
}
