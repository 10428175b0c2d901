use ironvnc_connector::{
    ClientConnector, ClientConnectorState, ConnectionResult, ConnectorResult, Sequence as _, State as _,
};
use ironvnc_core::WriteBuf;

use crate::framed::{Framed, FramedRead, FramedWrite};

/// Drives the connection sequence to completion over the framed stream.
#[instrument(skip_all)]
pub async fn connect<S>(framed: &mut Framed<S>, mut connector: ClientConnector) -> ConnectorResult<ConnectionResult>
where
    S: Sync + FramedRead + FramedWrite,
{
    let mut buf = WriteBuf::new();

    info!("Begin connection procedure");

    let result = loop {
        single_connect_step(framed, &mut connector, &mut buf).await?;

        if let ClientConnectorState::Connected { result } = connector.state {
            break result;
        }
    };

    info!("Connected with success");

    Ok(result)
}

pub async fn single_connect_step<S>(
    framed: &mut Framed<S>,
    connector: &mut ClientConnector,
    buf: &mut WriteBuf,
) -> ConnectorResult<ironvnc_connector::Written>
where
    S: FramedWrite + FramedRead,
{
    buf.clear();

    let written = if let Some(next_message_hint) = connector.next_message_hint() {
        debug!(connector.state = connector.state.name(), "Wait for message");

        let message = framed
            .read_by_hint(next_message_hint)
            .await
            .map_err(|e| ironvnc_connector::custom_err!("read frame by hint", e))?;

        trace!(length = message.len(), "Message received");

        connector.step(&message, buf)?
    } else {
        connector.step_no_input(buf)?
    };

    if let Some(response_len) = written.size() {
        debug_assert_eq!(buf.filled_len(), response_len);
        let response = buf.filled();
        trace!(response_len, "Send response");
        framed
            .write_all(response)
            .await
            .map_err(|e| ironvnc_connector::custom_err!("write all", e))?;
    }

    Ok(written)
}
