//! Routes a decoded envelope to its handler.

use emdr_wire::Envelope;

use crate::connection::ConnectionHandle;
use crate::error::DispatchError;
use crate::handlers::{self, HandlerContext};
use crate::session::SessionTable;

pub(crate) fn dispatch(
    table: &mut SessionTable,
    ctx: &HandlerContext<'_>,
    conn: &ConnectionHandle,
    envelope: Envelope,
) -> Result<(), DispatchError> {
    match envelope {
        Envelope::CreateSessionRequest => handlers::create_session(table, ctx, conn),
        Envelope::JoinSessionRequest { sid } => handlers::join_session(table, ctx, conn, &sid),
        Envelope::Params(params) => handlers::update_params(table, ctx, conn, params),
        response @ (Envelope::CreateSessionResponse { .. }
        | Envelope::JoinSessionResponse { .. }) => {
            Err(DispatchError::UnknownVariant(response.variant_name()))
        }
    }
}
