use crate::cmd::{Context, RequestArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::print_frame;

pub fn run(args: RequestArgs, ctx: &Context) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let session = ctx.connect()?;

    let response = session
        .request(payload)
        .map_err(|err| session_error("request failed", err))?;
    print_frame(&response, ctx.format);

    session.shutdown();
    Ok(SUCCESS)
}
