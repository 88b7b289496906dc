use crate::*;

use wsdrop::{Session, SessionError, SessionState};

/// Concurrent writers over a real socket: every frame arrives intact and
/// each writer's frames stay in order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_never_interleave() -> Result<()> {
    let mut server = spawn_server(ServerScript::default()).await?;
    let (session, _inbound) = Session::connect(&server.url).await?;

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let session = session.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    let frame = serde_json::json!({ "writer": w, "seq": i, "pad": "x".repeat(512) });
                    session.write_frame(frame.to_string().into_bytes()).await?;
                }
                Ok::<_, SessionError>(())
            })
        })
        .collect();
    for writer in writers {
        writer.await??;
    }

    let mut next = [0u64; 4];
    for frame in server.frames(200).await? {
        let value: serde_json::Value = serde_json::from_str(&frame)?;
        let w = value["writer"].as_u64().context("writer")? as usize;
        assert_eq!(value["seq"].as_u64(), Some(next[w]));
        next[w] += 1;
    }
    assert_eq!(next, [50; 4]);

    session.close();
    session.closed().await;
    assert_eq!(session.state(), SessionState::Closed);
    assert!(matches!(
        session.write_frame(b"late".to_vec()).await,
        Err(SessionError::Closed)
    ));
    Ok(())
}

/// Graceful close sends a close frame; the server sees the stream end.
#[tokio::test]
async fn graceful_close_reaches_the_server() -> Result<()> {
    let mut server = spawn_server(ServerScript::default()).await?;
    let (session, mut inbound) = Session::connect(&server.url).await?;

    session.write_frame(b"only".to_vec()).await?;
    assert_eq!(server.next_frame().await?, "only");

    session.close();
    tokio::time::timeout(WAIT, session.closed())
        .await
        .context("session did not close")?;
    assert!(tokio::time::timeout(WAIT, inbound.recv()).await?.is_none());
    assert!(server.remaining().await?.is_empty());
    Ok(())
}
