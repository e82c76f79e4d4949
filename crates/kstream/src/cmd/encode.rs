use kstream_frame::ChannelCodec;

use crate::cmd::{read_input, EncodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_message, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = match &args.data {
        Some(data) => data.as_bytes().to_vec(),
        None => read_input(args.file.as_deref())?,
    };

    let codec = ChannelCodec::new(args.protocol.framing());
    let message = codec
        .encode(args.channel, &payload)
        .map_err(|err| frame_error("encode failed", err))?;

    print_message(&message, args.channel, args.protocol, format);
    Ok(SUCCESS)
}
