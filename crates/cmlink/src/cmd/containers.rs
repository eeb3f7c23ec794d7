use cmlink_control::DEFAULT_HIDDEN_NAMES;

use crate::cmd::{ContainersArgs, Context, StartArgs, StatusArgs, UuidArgs};
use crate::exit::{control_error, CliResult, SUCCESS};
use crate::output::{print_ack, print_config, print_containers, print_state};

pub fn list(args: ContainersArgs, ctx: &Context) -> CliResult<i32> {
    let hidden = if args.all {
        Vec::new()
    } else {
        DEFAULT_HIDDEN_NAMES.iter().map(|s| s.to_string()).collect()
    };
    let communicator = ctx.communicator(hidden)?;

    let items = communicator
        .containers()
        .map_err(|err| control_error("listing containers failed", err))?;
    print_containers(&items, ctx.format);

    communicator.shutdown();
    Ok(SUCCESS)
}

pub fn start(args: StartArgs, ctx: &Context) -> CliResult<i32> {
    let communicator = ctx.communicator(Vec::new())?;
    communicator
        .start_container(&args.uuid, &args.key)
        .map_err(|err| control_error("start failed", err))?;
    print_ack("started", &args.uuid, ctx.format);

    communicator.shutdown();
    Ok(SUCCESS)
}

pub fn stop(args: UuidArgs, ctx: &Context) -> CliResult<i32> {
    let communicator = ctx.communicator(Vec::new())?;
    communicator
        .stop_container(&args.uuid)
        .map_err(|err| control_error("stop failed", err))?;
    // The command is only queued; shutdown writes it out.
    communicator.shutdown();

    print_ack("stop requested", &args.uuid, ctx.format);
    Ok(SUCCESS)
}

pub fn switch(args: UuidArgs, ctx: &Context) -> CliResult<i32> {
    let communicator = ctx.communicator(Vec::new())?;
    communicator
        .switch_to(&args.uuid)
        .map_err(|err| control_error("switch failed", err))?;
    communicator.shutdown();

    print_ack("switch requested", &args.uuid, ctx.format);
    Ok(SUCCESS)
}

pub fn status(args: StatusArgs, ctx: &Context) -> CliResult<i32> {
    let communicator = ctx.communicator(Vec::new())?;

    if args.config {
        let config = communicator
            .container_config(&args.uuid)
            .map_err(|err| control_error("config query failed", err))?;
        print_config(&config, ctx.format);
    } else {
        let state = communicator
            .container_state(&args.uuid)
            .map_err(|err| control_error("status query failed", err))?;
        print_state(&args.uuid, state, ctx.format);
    }

    communicator.shutdown();
    Ok(SUCCESS)
}
