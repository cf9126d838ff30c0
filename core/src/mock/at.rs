use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use hal_abstractions::{AtTransport, WifiError};

/// AT transport replaying canned responses
///
/// Every exchange pops the next queued response; once the queue is empty
/// the bare success prompt is returned.
#[derive(Default)]
pub struct ScriptedAt {
    responses: VecDeque<Result<Vec<u8>, WifiError>>,
    /// Commands with their payload, as sent
    pub sent: Vec<Vec<u8>>,
    pub resets: usize,
}

impl ScriptedAt {
    pub const OK: &'static [u8] = b"\r\nOK\r\n> ";

    /// Queue a successful reply carrying `body`
    pub fn reply(&mut self, body: &str) -> &mut Self {
        let mut response = Vec::from(&b"\r\n"[..]);
        response.extend_from_slice(body.as_bytes());
        response.extend_from_slice(Self::OK);
        self.responses.push_back(Ok(response));
        self
    }

    /// Queue a raw reply
    pub fn raw(&mut self, response: &[u8]) -> &mut Self {
        self.responses.push_back(Ok(response.to_vec()));
        self
    }

    /// Queue a transport failure
    pub fn fail(&mut self, e: WifiError) -> &mut Self {
        self.responses.push_back(Err(e));
        self
    }

    /// Commands as text, payloads included
    pub fn sent_text(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect()
    }
}

impl AtTransport for ScriptedAt {
    async fn reset(&mut self) -> Result<(), WifiError> {
        self.resets += 1;
        Ok(())
    }

    async fn exchange(
        &mut self,
        command: &[u8],
        payload: &[u8],
        response: &mut [u8],
    ) -> Result<usize, WifiError> {
        let mut sent = command.to_vec();
        sent.extend_from_slice(payload);
        self.sent.push(sent);

        let reply = self
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(Self::OK.to_vec()))?;
        if reply.len() > response.len() {
            return Err(WifiError::BufferTooSmall);
        }
        response[..reply.len()].copy_from_slice(&reply);
        Ok(reply.len())
    }
}
