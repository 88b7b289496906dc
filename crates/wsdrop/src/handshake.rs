//! Handshake producer. Announces the client with one INITIAL envelope.

use wsdrop_core::Envelope;

use crate::error::ProducerError;
use crate::session::Session;

pub async fn send_initial(session: Session, identity: String) -> Result<(), ProducerError> {
    let frame = Envelope::initial(identity.clone().into_bytes()).encode()?;
    tracing::info!(identity, "sending initial message");
    session.write_frame(frame).await?;
    Ok(())
}
