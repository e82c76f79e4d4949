//! Run an exec session against an in-process fake server.
//!
//! The server echoes stdin back on stdout, writes a line to stderr, and
//! reports a non-zero exit code on the error channel.
//!
//! Run with: cargo run -p kstream --example exec-loopback

use kstream::frame::{ChannelCodec, Framing, ERROR, STDERR, STDIN, STDOUT};
use kstream::mux::{exec, MuxError};
use kstream::transport::{memory_pair, MessageSink, MessageSource};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), MuxError> {
    let framing = Framing::Base64;
    let (client, server) = memory_pair(16);
    let (client_rx, client_tx) = client.into_split();
    let (mut server_rx, mut server_tx) = server.into_split();

    let server = tokio::spawn(async move {
        let codec = ChannelCodec::new(framing);
        while let Some(message) = server_rx.recv().await? {
            let frame = codec.decode(message)?;
            if frame.channel != STDIN {
                continue;
            }
            server_tx.send(codec.encode(STDOUT, &frame.payload)?).await?;
            server_tx
                .send(codec.encode(STDERR, b"fake-server: done\n")?)
                .await?;
            let status = br#"{"status":"Failure","reason":"NonZeroExitCode","details":{"causes":[{"reason":"ExitCode","message":"2"}]}}"#;
            server_tx.send(codec.encode(ERROR, status)?).await?;
            break;
        }
        server_tx.close().await?;
        Ok::<_, MuxError>(())
    });

    let code = exec(
        client_rx,
        client_tx,
        framing,
        CancellationToken::new(),
        |streams| async move {
            streams.control.resize(120, 40).await?;
            streams.stdin.write(b"hello from the client\n").await?;
            let stdout = streams.stdout.read_to_end().await?;
            let stderr = streams.stderr.read_to_end().await?;
            print!("stdout: {}", String::from_utf8_lossy(&stdout));
            print!("stderr: {}", String::from_utf8_lossy(&stderr));
            Ok(())
        },
    )
    .await?;

    server
        .await
        .map_err(|err| MuxError::Join(err.to_string()))??;
    println!("exit code: {code}");
    Ok(())
}
