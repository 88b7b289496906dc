use crate::*;

use wsdrop_core::chunk::{content_digest, Reassembler};

/// Default run: one handshake frame, then the file in two halves under a
/// suffixed remote name.
#[tokio::test]
async fn handshake_and_two_halves() -> Result<()> {
    let dir = ScratchDir::new("halves");
    let file = dir.write("test.txt", b"0123456789");
    let server = spawn_server(ServerScript::default()).await?;

    let (mut config, entropy) = client_for(&server, &file);
    config.transfer.max_chunk_bytes = 0;

    let outcome = client(config, entropy).run(std::future::pending()).await?;
    let RunOutcome::Completed { handshake, transfer, .. } = outcome else {
        anyhow::bail!("run was interrupted");
    };
    handshake?;
    let report = transfer?;
    assert_eq!(report.file_name, "test42.txt");
    assert_eq!(report.parts, 2);
    assert_eq!(report.bytes, 10);

    let frames = server.remaining().await?;
    let (initials, chunks) = partition(&frames)?;
    assert_eq!(initials, vec!["wsdrop client 42".to_string()]);
    assert_eq!(chunks.len(), 2);

    assert_eq!(chunks[0].file_name, "test42.txt");
    assert_eq!(&chunks[0].data[..], b"01234");
    assert_eq!(chunks[0].sequence, 1);
    assert!(!chunks[0].is_last);

    assert_eq!(&chunks[1].data[..], b"56789");
    assert_eq!(chunks[1].sequence, 2);
    assert!(chunks[1].is_last);
    Ok(())
}

/// A larger file crosses many frames and still reassembles byte for byte.
#[tokio::test]
async fn large_file_reassembles_with_matching_digest() -> Result<()> {
    let dir = ScratchDir::new("large");
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let file = dir.write("blob.bin", &content);
    let server = spawn_server(ServerScript::default()).await?;

    let (mut config, entropy) = client_for(&server, &file);
    config.transfer.max_chunk_bytes = 16 * 1024;

    let outcome = client(config, entropy).run(std::future::pending()).await?;
    let RunOutcome::Completed { transfer, .. } = outcome else {
        anyhow::bail!("run was interrupted");
    };
    let report = transfer?;
    assert_eq!(report.file_name, "blob42.bin");
    assert_eq!(report.parts, 13);
    assert_eq!(report.digest, content_digest(&content));

    let (_, chunks) = partition(&server.remaining().await?)?;
    assert_eq!(chunks.len(), 13);

    let mut reassembler = Reassembler::new();
    let mut done = None;
    for chunk in chunks {
        done = reassembler.accept(chunk)?;
    }
    let done = done.context("last chunk did not complete the file")?;
    assert_eq!(done.file_name, "blob42.bin");
    assert_eq!(&done.content[..], &content[..]);
    Ok(())
}

/// A configured remote name is sent verbatim, without a suffix.
#[tokio::test]
async fn configured_remote_name_is_used() -> Result<()> {
    let dir = ScratchDir::new("remote-name");
    let file = dir.write("local.txt", b"abc");
    let server = spawn_server(ServerScript::default()).await?;

    let (mut config, entropy) = client_for(&server, &file);
    config.transfer.remote_name = "upload.log".into();

    client(config, entropy).run(std::future::pending()).await?;

    let (_, chunks) = partition(&server.remaining().await?)?;
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].file_name, "upload.log");
    assert!(chunks[0].is_last);
    Ok(())
}
