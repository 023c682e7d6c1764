//! In-process client used to drive a running request loop.

use std::fs::OpenOptions;
use std::io::Write;
use std::time::Duration;

use conduit_config::ChannelPaths;
use conduit_protocol::record::encode;
use conduit_protocol::{
    BlockingRequest, ClientId, Command, Recipient, RequestPublisher, ResponseChannel, Status,
};

const ACK_TIMEOUT: Duration = Duration::from_secs(2);
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);
const STALL_TIMEOUT: Duration = Duration::from_secs(1);

/// Status and payload lines received by a waiting client.
pub type Reply = (Status, Vec<String>);

/// Performs one blocking exchange as client `id`.
pub fn request(paths: &ChannelPaths, id: u32, tokens: &[&str]) -> Result<Reply, String> {
    let client = ClientId::new(id).ok_or("client id must be non-zero")?;
    let mut channel = ResponseChannel::create(client, paths.response_channel(id))
        .map_err(|error| error.to_string())?;
    let mut publisher =
        RequestPublisher::connect(paths.request_alias()).map_err(|error| error.to_string())?;
    let command = Command::new(tokens.iter().copied()).map_err(|error| error.to_string())?;
    let (status, payload) = BlockingRequest::new(&mut channel, command)
        .map_err(|error| error.to_string())?
        .publish(&mut publisher)
        .map_err(|error| error.to_string())?
        .await_ack(ACK_TIMEOUT)
        .and_then(|awaiting| awaiting.await_status(STATUS_TIMEOUT))
        .map_err(|error| error.to_string())?;
    let mut lines = Vec::new();
    payload
        .drain(STALL_TIMEOUT, |line| {
            lines.push(line.to_owned());
            Ok(())
        })
        .map_err(|error| error.to_string())?;
    Ok((status, lines))
}

/// Publishes a fire-and-forget request.
pub fn notify(paths: &ChannelPaths, tokens: &[&str]) -> Result<(), String> {
    let record = encode(Recipient::Anonymous, tokens.iter().copied())
        .map_err(|error| error.to_string())?;
    RequestPublisher::connect(paths.request_alias())
        .and_then(|mut publisher| publisher.publish(&record))
        .map_err(|error| error.to_string())
}

/// Appends raw bytes to the request channel, bypassing all validation.
pub fn inject(paths: &ChannelPaths, bytes: &[u8]) -> Result<(), String> {
    OpenOptions::new()
        .write(true)
        .open(paths.request_alias())
        .and_then(|mut channel| channel.write_all(bytes))
        .map_err(|error| error.to_string())
}
