use crate::*;

use wsdrop::{ConnectError, ProducerError, SessionError};

/// Nothing listening: the run fails before any producer starts.
#[tokio::test]
async fn refused_connection_is_a_dial_error() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let mut config = WsdropConfig::default();
    config.server.url = format!("ws://{addr}/ws");

    let err = Client::new(config)
        .run(std::future::pending())
        .await
        .expect_err("dial should fail");
    assert!(matches!(err, ConnectError::Dial { .. }), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn non_websocket_scheme_is_rejected() {
    let mut config = WsdropConfig::default();
    config.server.url = "http://127.0.0.1:1/ws".into();

    let err = Client::new(config)
        .run(std::future::pending())
        .await
        .expect_err("scheme should be rejected");
    assert!(matches!(err, ConnectError::UnsupportedScheme(_)), "got {err:?}");
}

/// Secure WebSocket URLs are refused up front instead of failing mid-dial.
#[tokio::test]
async fn wss_scheme_is_rejected() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let mut config = WsdropConfig::default();
    config.server.url = format!("wss://{}/ws", listener.local_addr()?);

    let err = Client::new(config)
        .run(std::future::pending())
        .await
        .expect_err("wss should be rejected");
    assert!(matches!(&err, ConnectError::UnsupportedScheme(s) if s == "wss"), "got {err:?}");
    Ok(())
}

/// An unreadable file fails the transfer only; the handshake still goes out.
#[tokio::test]
async fn missing_file_does_not_block_the_handshake() -> Result<()> {
    let dir = ScratchDir::new("missing");
    let server = spawn_server(ServerScript::default()).await?;

    let (config, entropy) = client_for(&server, &dir.path().join("absent.txt"));
    let outcome = client(config, entropy).run(std::future::pending()).await?;
    let RunOutcome::Completed { handshake, transfer, .. } = outcome else {
        anyhow::bail!("run was interrupted");
    };
    handshake?;
    assert!(matches!(transfer, Err(ProducerError::Read { .. })));

    let (initials, chunks) = partition(&server.remaining().await?)?;
    assert_eq!(initials.len(), 1);
    assert!(chunks.is_empty());
    Ok(())
}

/// The server closing mid-session ends the run without an interrupt.
#[tokio::test]
async fn server_close_ends_the_run() -> Result<()> {
    let dir = ScratchDir::new("server-close");
    let file = dir.write("test.txt", &[7u8; 64 * 1024]);
    let server = spawn_server(ServerScript {
        close_after: Some(1),
        ..Default::default()
    })
    .await?;

    let (mut config, entropy) = client_for(&server, &file);
    config.transfer.max_chunk_bytes = 1024;
    config.transfer.close_when_done = false;

    let outcome = tokio::time::timeout(WAIT, client(config, entropy).run(std::future::pending()))
        .await
        .context("run did not end after server close")??;
    let RunOutcome::Completed { handshake, transfer, inbound } = outcome else {
        anyhow::bail!("run was interrupted");
    };
    assert_eq!(inbound.frames, 0);

    // Whatever lost the race saw a closed session, never a hang.
    for result in [handshake.err(), transfer.err()].into_iter().flatten() {
        assert!(
            matches!(
                result,
                ProducerError::Session(SessionError::Closed | SessionError::Transport(_))
            ),
            "got {result:?}"
        );
    }
    Ok(())
}

/// Interrupt while the session is idle returns promptly.
#[tokio::test]
async fn interrupt_stops_an_idle_session() -> Result<()> {
    let dir = ScratchDir::new("interrupt");
    let file = dir.write("test.txt", b"hi");
    let mut server = spawn_server(ServerScript::default()).await?;

    let (mut config, entropy) = client_for(&server, &file);
    config.transfer.close_when_done = false;

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let run = client(config, entropy).run(async {
        let _ = stop_rx.await;
    });
    let trigger = async {
        // Both producers have written before the interrupt.
        let frames = server.frames(2).await;
        let _ = stop_tx.send(());
        frames
    };

    let (outcome, frames) = tokio::time::timeout(WAIT, async { tokio::join!(run, trigger) })
        .await
        .context("interrupt did not stop the run")?;
    assert!(matches!(outcome?, RunOutcome::Interrupted));
    assert_eq!(frames?.len(), 2);
    Ok(())
}
