use cmlink_frame::Frame;
use tracing::info;

use crate::cmd::{Context, SendArgs};
use crate::exit::{session_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};

pub fn run(args: SendArgs, ctx: &Context) -> CliResult<i32> {
    if args.count == 0 {
        return Err(CliError::new(USAGE, "--count must be greater than zero"));
    }

    let frame = Frame::from(args.payload.resolve()?);
    let send_limit = ctx.session_config().send_limit;
    if frame.wire_size() > send_limit {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "payload too large ({} bytes on the wire, limit {send_limit})",
                frame.wire_size()
            ),
        ));
    }

    let session = ctx.connect()?;
    for _ in 0..args.count {
        session
            .post(frame.clone())
            .map_err(|err| session_error("send failed", err))?;
    }
    // Flushes the queue before closing the socket.
    session.shutdown();

    info!(count = args.count, size = frame.len(), "frames sent");
    Ok(SUCCESS)
}
