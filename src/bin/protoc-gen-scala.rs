use std::io::{Error, ErrorKind, Read, Result, Write};

use bytes::Bytes;
use prost::Message;

fn main() -> Result<()> {
    env_logger::init();

    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    let buf = Bytes::from(buf);

    let response = scalagen::Config::new().run_plugin(&buf).map_err(|error| {
        Error::new(
            ErrorKind::InvalidInput,
            format!("invalid CodeGeneratorRequest: {}", error),
        )
    })?;

    let mut out = Vec::new();
    response.encode(&mut out).map_err(|error| {
        Error::new(
            ErrorKind::InvalidData,
            format!("failed to encode CodeGeneratorResponse: {}", error),
        )
    })?;
    std::io::stdout().write_all(&out)?;

    Ok(())
}
