//! Line assembly over byte chunks that may split lines or UTF-8 sequences.

/// Accumulates bytes and yields complete `\n`-terminated lines.
#[derive(Debug, Default)]
pub struct LineAssembler {
    carry: Vec<u8>,
}

impl LineAssembler {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut rest = chunk;
        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.carry.extend_from_slice(&rest[..pos]);
            lines.push(decode_line(&self.carry));
            self.carry.clear();
            rest = &rest[pos + 1..];
        }
        self.carry.extend_from_slice(rest);
        lines
    }

    /// The trailing unterminated line, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.carry.is_empty() {
            return None;
        }
        let line = decode_line(&self.carry);
        self.carry.clear();
        Some(line)
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_across_chunks() {
        let mut asm = LineAssembler::default();
        assert!(asm.push(b"one").is_empty());
        assert_eq!(asm.push(b" two\nthree\r\n\nfour"), vec!["one two", "three", ""]);
        assert_eq!(asm.finish(), Some("four".to_string()));
        assert_eq!(asm.finish(), None);
    }

    #[test]
    fn test_split_utf8_sequence() {
        let text = "naïve\n".as_bytes();
        let mut asm = LineAssembler::default();
        assert!(asm.push(&text[..3]).is_empty());
        assert_eq!(asm.push(&text[3..]), vec!["naïve"]);
    }
}
