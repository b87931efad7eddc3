use embedded_io_async::Read;
use heapless::{String, Vec};

use crate::record::Record;

pub const LINE_BUFFER_SIZE: usize = 64;

/// Decodes records from a byte stream produced by a [`crate::sampler::Sampler`].
///
/// Blank lines, `#` comments and lines that do not parse are skipped so a
/// reader attached mid-stream resynchronizes at the next line feed. Invalid
/// UTF-8 bytes are dropped from a line before it is parsed.
pub struct RecordReader<S: Read> {
    stream: S,
    line_buffer: Vec<u8, LINE_BUFFER_SIZE>,
    discarding: bool,
}

impl<S: Read> RecordReader<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            line_buffer: Vec::new(),
            discarding: false,
        }
    }

    /// Returns the next valid record or `None` once the stream ends.
    pub async fn next_record(&mut self) -> Option<Record> {
        loop {
            if !self.read_line().await {
                return None;
            }
            let mut text: String<LINE_BUFFER_SIZE> = String::new();
            for chunk in self.line_buffer.utf8_chunks() {
                if !chunk.invalid().is_empty() {
                    debug!("Dropping {} invalid UTF-8 bytes", chunk.invalid().len());
                }
                // a subset of line_buffer always fits
                let _ = text.push_str(chunk.valid());
            }
            let line = text.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                trace!("UART.RX comment> {}", line);
                continue;
            }
            match line.parse::<Record>() {
                Ok(record) => {
                    trace!("UART.RX> {}", line);
                    return Some(record);
                }
                Err(_e) => warn!("Skipping invalid record line '{}'", line),
            }
        }
    }

    // Fills `line_buffer` with the next complete line, `false` at end of stream.
    async fn read_line(&mut self) -> bool {
        self.line_buffer.clear();
        loop {
            let mut char_buf = [0u8; 1];
            match self.stream.read(&mut char_buf).await {
                Ok(0) => {
                    if !self.line_buffer.is_empty() {
                        debug!("End of stream, dropping partial line of length {}", self.line_buffer.len());
                    }
                    return false;
                }
                Ok(_) => match char_buf[0] {
                    b'\n' => {
                        if self.discarding {
                            self.discarding = false;
                            continue;
                        }
                        return true;
                    }
                    b'\r' => continue,
                    _ if self.discarding => continue,
                    byte => {
                        if self.line_buffer.push(byte).is_err() {
                            warn!("Line exceeds {} bytes, discarding", LINE_BUFFER_SIZE);
                            self.line_buffer.clear();
                            self.discarding = true;
                        }
                    }
                },
                Err(_e) => {
                    if self.line_buffer.is_empty() {
                        warn!("Read error");
                    } else {
                        warn!("Read error, discarding partial line");
                        self.line_buffer.clear();
                        self.discarding = true;
                    }
                }
            };
        }
    }
}

#[cfg(test)]
pub mod tests {
    use std::vec::Vec;

    use super::*;

    async fn read_all(data: &[u8]) -> Vec<Record> {
        let mut reader = RecordReader::new(data);
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().await {
            records.push(record);
        }
        records
    }

    #[tokio::test]
    async fn reads_sampler_output() {
        let records = read_all(b"4.000,300\n4.004,301\n4.008,1023\n").await;
        assert_eq!(records, [Record::new(4000, 300), Record::new(4004, 301), Record::new(4008, 1023)]);
    }

    #[tokio::test]
    async fn skips_comments_blank_lines_and_garbage() {
        let data = b"# adc stream\n\n1.000,10\r\n   \ngarbage\n2.000,20\n1.000,4096\n3.000,30\n";
        let records = read_all(data).await;
        assert_eq!(records, [Record::new(1000, 10), Record::new(2000, 20), Record::new(3000, 30)]);
    }

    #[tokio::test]
    async fn resynchronizes_after_partial_first_line() {
        // attached in the middle of "12.345,678\n"
        let records = read_all(b".345,678\n12.349,679\n").await;
        assert_eq!(records, [Record::new(12_349, 679)]);
    }

    #[tokio::test]
    async fn discards_overlong_line() {
        let mut data = Vec::new();
        data.extend_from_slice(b"1.000,1\n");
        data.extend(core::iter::repeat_n(b'9', LINE_BUFFER_SIZE * 2));
        data.extend_from_slice(b"2.000,2\n3.000,3\n");
        let records = read_all(&data).await;
        assert_eq!(records, [Record::new(1000, 1), Record::new(3000, 3)]);
    }

    #[tokio::test]
    async fn drops_invalid_utf8_bytes() {
        let records = read_all(b"\xff\xfe,1\n1.000,5\xff\n2.0\xfe00,6\n5.000,5\n").await;
        assert_eq!(records, [Record::new(1000, 5), Record::new(2000, 6), Record::new(5000, 5)]);
    }

    /// Serves `data` one byte at a time and fails once before each offset in `errors_at`.
    struct FlakyStream<'a> {
        data: &'a [u8],
        position: usize,
        errors_at: Vec<usize>,
    }

    impl embedded_io_async::ErrorType for FlakyStream<'_> {
        type Error = embedded_io_async::ErrorKind;
    }

    impl Read for FlakyStream<'_> {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
            if let Some(index) = self.errors_at.iter().position(|at| *at == self.position) {
                self.errors_at.remove(index);
                return Err(embedded_io_async::ErrorKind::Other);
            }
            match self.data.get(self.position) {
                Some(byte) if !buf.is_empty() => {
                    buf[0] = *byte;
                    self.position += 1;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    async fn read_all_flaky(data: &[u8], errors_at: &[usize]) -> Vec<Record> {
        let stream = FlakyStream {
            data,
            position: 0,
            errors_at: errors_at.to_vec(),
        };
        let mut reader = RecordReader::new(stream);
        let mut records = Vec::new();
        while let Some(record) = reader.next_record().await {
            records.push(record);
        }
        records
    }

    #[tokio::test]
    async fn read_error_on_line_boundary_keeps_next_line() {
        let records = read_all_flaky(b"1.000,1\n2.000,2\n3.000,3\n", &[8]).await;
        assert_eq!(records, [Record::new(1000, 1), Record::new(2000, 2), Record::new(3000, 3)]);
    }

    #[tokio::test]
    async fn read_error_mid_line_drops_only_that_line() {
        let records = read_all_flaky(b"1.000,1\n2.000,2\n3.000,3\n", &[11]).await;
        assert_eq!(records, [Record::new(1000, 1), Record::new(3000, 3)]);
    }

    #[tokio::test]
    async fn drops_partial_trailing_line() {
        let mut reader = RecordReader::new(&b"1.000,1\n2.00"[..]);
        assert_eq!(reader.next_record().await, Some(Record::new(1000, 1)));
        assert_eq!(reader.next_record().await, None);
        assert_eq!(reader.next_record().await, None);
    }

    #[tokio::test]
    async fn empty_stream_has_no_records() {
        assert!(read_all(b"").await.is_empty());
    }
}
