use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

/// Line-oriented `text/event-stream` decoder.
///
/// Fields accumulate until a blank line; multi-line `data` is joined with `\n`.
/// Comment lines (leading `:`) and events without data are dropped.
#[derive(Debug, Default)]
pub struct SseCodec {
    pending: SseEvent,
    has_data: bool,
}

impl SseCodec {
    fn take_line(src: &mut BytesMut) -> Option<String> {
        let pos = src.iter().position(|b| *b == b'\n')?;
        let mut line = src.split_to(pos + 1);
        line.truncate(pos);
        if line.last() == Some(&b'\r') {
            line.truncate(pos - 1);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Returns an event when the line completes one.
    fn feed(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        match field {
            "data" => {
                if self.has_data {
                    self.pending.data.push('\n');
                }
                self.pending.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.pending.event = Some(value.to_string()),
            "id" => self.pending.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let ev = std::mem::take(&mut self.pending);
        let had = std::mem::replace(&mut self.has_data, false);
        had.then_some(ev)
    }
}

impl Decoder for SseCodec {
    type Item = SseEvent;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(line) = Self::take_line(src) {
            if let Some(ev) = self.feed(&line) {
                return Ok(Some(ev));
            }
        }
        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(ev) = self.decode(src)? {
            return Ok(Some(ev));
        }
        if !src.is_empty() {
            let rest = String::from_utf8_lossy(src.chunk()).into_owned();
            src.clear();
            if let Some(ev) = self.feed(&rest) {
                return Ok(Some(ev));
            }
        }
        // an unterminated final event still counts
        Ok(self.dispatch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &str) -> Vec<SseEvent> {
        let mut codec = SseCodec::default();
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(ev) = codec.decode(&mut buf).expect("decode") {
            out.push(ev);
        }
        while let Some(ev) = codec.decode_eof(&mut buf).expect("decode eof") {
            out.push(ev);
        }
        out
    }

    #[test]
    fn splits_events_on_blank_lines() {
        let evs = decode_all("data: [1]\n\ndata: END\n\n");
        let data: Vec<&str> = evs.iter().map(|e| e.data.as_str()).collect();
        assert_eq!(data, vec!["[1]", "END"]);
    }

    #[test]
    fn joins_multiline_data_and_skips_comments() {
        let evs = decode_all(": keepalive\r\nevent: chunk\r\ndata: [\r\ndata: 2]\r\nid: 7\r\n\r\n");
        assert_eq!(
            evs,
            vec![SseEvent {
                event: Some("chunk".to_string()),
                data: "[\n2]".to_string(),
                id: Some("7".to_string()),
            }]
        );
    }

    #[test]
    fn waits_for_split_frames() {
        let mut codec = SseCodec::default();
        let mut buf = BytesMut::from("data: E");
        assert_eq!(codec.decode(&mut buf).expect("decode"), None);
        buf.extend_from_slice(b"ND\n\n");
        let ev = codec.decode(&mut buf).expect("decode").expect("event");
        assert_eq!(ev.data, "END");
    }

    #[test]
    fn unterminated_event_is_flushed_at_eof() {
        let evs = decode_all("data: [3]");
        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].data, "[3]");
    }
}
