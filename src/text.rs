use std::io::{self, Write};

/// Expand `echo -e` escapes. The flag is true when `\c` cut the output short.
pub fn unescape(input: &str) -> (String, bool) {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\\' => out.push('\\'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'c' => return (out, true),
            'e' => out.push('\x1b'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0' => {
                let mut value = 0u32;
                for _ in 0..3 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            value = value * 8 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value & 0xff).unwrap_or('\0'));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    (out, false)
}

/// Writes file contents to an output, optionally numbering lines.
///
/// Line numbers continue across files, matching `cat -n a b`.
pub struct Concatenator {
    number: bool,
    next_line: usize,
}

impl Concatenator {
    pub fn new(number: bool) -> Self {
        Self {
            number,
            next_line: 1,
        }
    }

    /// Write one file's bytes. A missing final newline is added so the next
    /// file starts on its own line.
    pub fn write(&mut self, content: &[u8], out: &mut impl Write) -> io::Result<()> {
        if content.is_empty() {
            return Ok(());
        }
        if self.number {
            for line in content.split_inclusive(|b| *b == b'\n') {
                write!(out, "{:>6}\t", self.next_line)?;
                out.write_all(line)?;
                self.next_line += 1;
            }
        } else {
            out.write_all(content)?;
        }
        if !content.ends_with(b"\n") {
            out.write_all(b"\n")?;
        }
        Ok(())
    }
}
