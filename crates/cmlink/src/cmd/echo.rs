use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cmlink_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use cmlink_transport::{IpcStream, UnixDomainSocket};
use tracing::{debug, info, warn};

use crate::cmd::{Context, EchoArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};

/// How often a blocked read wakes up to check for Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

enum ReadDisposition {
    Poll,
    Disconnected,
    Skip,
    Fatal(CliError),
}

pub fn run(args: EchoArgs, ctx: &Context) -> CliResult<i32> {
    let listener =
        UnixDomainSocket::bind(&ctx.socket).map_err(|err| transport_error("bind failed", err))?;
    info!(path = %listener.path().display(), "echo peer listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone(), listener.path().to_path_buf())?;

    let mut echoed = 0usize;
    while running.load(Ordering::SeqCst) && args.count.is_none_or(|count| echoed < count) {
        let stream = listener
            .accept()
            .map_err(|err| transport_error("accept failed", err))?;
        if !running.load(Ordering::SeqCst) {
            break;
        }
        if let Some(creds) = stream.peer_credentials() {
            info!(uid = creds.uid, pid = creds.pid, "client connected");
        }

        let remaining = args.count.map(|count| count - echoed);
        echoed += serve(stream, &running, remaining)?;
    }

    info!(echoed, "echo peer stopped");
    Ok(SUCCESS)
}

/// Echo frames back to one client until it disconnects or the limit is hit.
fn serve(stream: IpcStream, running: &AtomicBool, remaining: Option<usize>) -> CliResult<usize> {
    let config = FrameConfig {
        read_timeout: Some(POLL_INTERVAL),
        ..FrameConfig::default()
    };
    let write_half = stream
        .try_clone()
        .map_err(|err| transport_error("stream clone failed", err))?;
    let mut writer = FrameWriter::with_config_ipc(write_half, config.clone())
        .map_err(|err| frame_error("stream setup failed", err))?;
    let mut reader = FrameReader::with_config_ipc(stream, config)
        .map_err(|err| frame_error("stream setup failed", err))?;

    let mut echoed = 0;
    while running.load(Ordering::SeqCst) && remaining.is_none_or(|limit| echoed < limit) {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(err) => match classify_read_error(err) {
                ReadDisposition::Poll | ReadDisposition::Skip => continue,
                ReadDisposition::Disconnected => break,
                ReadDisposition::Fatal(cli_err) => return Err(cli_err),
            },
        };

        echoed += 1;
        debug!(size = frame.len(), "echoing frame");
        // The client may already have hung up; keep draining what it sent.
        if let Err(err) = writer.write_frame(&frame) {
            warn!(error = %err, "echo send failed");
        }
    }

    debug!(echoed, "client done");
    Ok(echoed)
}

fn classify_read_error(err: FrameError) -> ReadDisposition {
    if err.is_end_of_stream() {
        return ReadDisposition::Disconnected;
    }
    match err {
        FrameError::PayloadTooLarge { .. } => {
            warn!(error = %err, "skipping oversized frame");
            ReadDisposition::Skip
        }
        FrameError::Io(ref io)
            if matches!(
                io.kind(),
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
            ) =>
        {
            ReadDisposition::Poll
        }
        other => ReadDisposition::Fatal(frame_error("receive failed", other)),
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>, path: PathBuf) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
        // Wake a blocked accept().
        let _ = std::os::unix::net::UnixStream::connect(&path);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
