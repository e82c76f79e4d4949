use std::future::poll_fn;
use std::pin::Pin;

use futures_core::Stream;
use kstream_watch::{watch_stream, LineReader, LineReaderConfig, WatchError, WatchStream};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cmd::{install_ctrlc_handler, runtime, WatchArgs};
use crate::exit::{io_error, watch_error, CliResult, SUCCESS};
use crate::output::{print_event, OutputFormat};

type Body = Box<dyn AsyncRead + Unpin + Send>;

pub fn run(args: WatchArgs, format: OutputFormat) -> CliResult<i32> {
    let cancel = CancellationToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let rt = runtime()?;
    let result = rt.block_on(watch(args, cancel, format));
    // A stdin read may still be parked on the blocking pool.
    rt.shutdown_background();
    result
}

async fn watch(args: WatchArgs, cancel: CancellationToken, format: OutputFormat) -> CliResult<i32> {
    let body: Body = match &args.file {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };

    let mut config = LineReaderConfig::default();
    if let Some(max) = args.max_line_length {
        config.max_line_length = max;
    }
    let reader = LineReader::with_config(body, config);
    let stream = watch_stream::<_, serde_json::Value>(reader, cancel);
    print_events(stream, args.count, format).await
}

async fn print_events(
    mut stream: WatchStream<serde_json::Value>,
    count: Option<usize>,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut printed = 0usize;
    let mut skipped = 0usize;

    while let Some(item) = poll_fn(|cx| Pin::new(&mut stream).poll_next(cx)).await {
        match item {
            Ok((event_type, object)) => {
                print_event(event_type, &object, format);
                printed += 1;
                if count.is_some_and(|count| printed >= count) {
                    stream.stop();
                    break;
                }
            }
            Err(err) if err.is_terminal() => return Err(watch_error("watch failed", err)),
            Err(WatchError::Status(status)) => warn!(%status, "server reported watch error"),
            Err(err) => {
                skipped += 1;
                warn!(error = %err, "skipping watch line");
            }
        }
    }

    info!(events = printed, skipped, "watch finished");
    Ok(SUCCESS)
}
