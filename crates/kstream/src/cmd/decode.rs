use bytes::Bytes;
use kstream_frame::{ChannelCodec, Framing};
use kstream_transport::Message;

use crate::cmd::{read_input, DecodeArgs};
use crate::exit::{frame_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let framing = args.protocol.framing();
    if args.data.is_some() && framing == Framing::Binary {
        return Err(CliError::new(
            USAGE,
            "--data only applies to text framings; use --file or stdin for binary frames",
        ));
    }

    let input = match &args.data {
        Some(data) => data.as_bytes().to_vec(),
        None => read_input(args.file.as_deref())?,
    };
    let message = to_message(input, framing)?;

    let frame = ChannelCodec::new(framing)
        .decode(message)
        .map_err(|err| frame_error("decode failed", err))?;

    print_frame(&frame, args.protocol, format);
    Ok(SUCCESS)
}

/// Text framings tolerate the trailing newline a shell or editor adds.
fn to_message(input: Vec<u8>, framing: Framing) -> CliResult<Message> {
    match framing {
        Framing::Binary => Ok(Message::Binary(Bytes::from(input))),
        Framing::Base64 => {
            let text = String::from_utf8(input)
                .map_err(|_| CliError::new(DATA_INVALID, "text frame is not valid UTF-8"))?;
            Ok(Message::Text(text.trim_end_matches(['\r', '\n']).to_string()))
        }
    }
}
