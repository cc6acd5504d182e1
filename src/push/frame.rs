//! STOMP 1.2 frames as carried in WebSocket text messages.

use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Self { command: command.into(), headers: Vec::new(), body: String::new() }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a header; STOMP says repeated headers keep the first.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    fn escapes_headers(command: &str) -> bool {
        command != "CONNECT" && command != "CONNECTED"
    }

    pub fn encode(&self) -> String {
        let escape = Self::escapes_headers(&self.command);
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (k, v) in &self.headers {
            if escape {
                out.push_str(&escape_header(k));
                out.push(':');
                out.push_str(&escape_header(v));
            } else {
                out.push_str(k);
                out.push(':');
                out.push_str(v);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.get("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parses one frame from the front of `input`.
    ///
    /// Returns the frame (or `None` for a heart-beat EOL) and the unparsed rest.
    pub fn parse(input: &str) -> ClientResult<(Option<Frame>, &str)> {
        let trimmed = input.trim_start_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Ok((None, ""));
        }
        let (head, rest) = trimmed
            .split_once("\n\n")
            .or_else(|| trimmed.split_once("\r\n\r\n"))
            .ok_or_else(|| ClientError::Push("incomplete STOMP frame".into()))?;

        let mut lines = head.lines();
        let command = lines
            .next()
            .map(|l| l.trim_end_matches('\r').to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ClientError::Push("STOMP frame without command".into()))?;
        let unescape = Self::escapes_headers(&command);

        let mut headers = Vec::new();
        for line in lines {
            let line = line.trim_end_matches('\r');
            let (k, v) = line
                .split_once(':')
                .ok_or_else(|| ClientError::Push(format!("malformed STOMP header: {}", line)))?;
            if unescape {
                headers.push((unescape_header(k)?, unescape_header(v)?));
            } else {
                headers.push((k.to_string(), v.to_string()));
            }
        }

        let frame_len = headers
            .iter()
            .find(|(k, _)| k == "content-length")
            .and_then(|(_, v)| v.parse::<usize>().ok());
        let (body, rest) = match frame_len {
            Some(len) if rest.len() > len && rest.as_bytes()[len] == 0 && rest.is_char_boundary(len) => {
                (&rest[..len], &rest[len + 1..])
            }
            _ => rest
                .split_once('\0')
                .ok_or_else(|| ClientError::Push("STOMP frame without NUL terminator".into()))?,
        };

        Ok((Some(Frame { command, headers, body: body.to_string() }), rest))
    }

    /// Parses every frame in a WebSocket message, skipping heart-beats.
    pub fn parse_all(mut input: &str) -> ClientResult<Vec<Frame>> {
        let mut frames = Vec::new();
        loop {
            let (frame, rest) = Self::parse(input)?;
            match frame {
                Some(frame) => frames.push(frame),
                None => break,
            }
            input = rest;
        }
        Ok(frames)
    }
}

fn escape_header(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape_header(s: &str) -> ClientResult<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(ClientError::Push(format!("invalid STOMP header escape: \\{}", other.unwrap_or(' '))))
            }
        }
    }
    Ok(out)
}
