use std::io;

/// Builder for script bodies handed to a shell interpreter (multi-line allowed).
///
/// Invariants:
/// - Each pushed line must not contain `\n`, `\r`, or `\0` (prevents Rust formatting from changing
///   runtime behavior and keeps interpolated values from injecting extra statements).
/// - Indentation is applied by the builder, four spaces per level.
/// - `build()` joins lines with `\n` and ensures a trailing newline when non-empty.
#[derive(Debug, Default)]
pub struct ShellFile {
    lines: Vec<String>,
    depth: usize,
}

impl ShellFile {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            depth: 0,
        }
    }

    /// Push one logical line (no embedded newlines) at the current indentation.
    pub fn push(&mut self, line: impl Into<String>) -> &mut Self {
        let line = line.into();
        if line.is_empty() {
            self.lines.push(line);
        } else {
            self.lines.push(format!("{}{}", "    ".repeat(self.depth), line));
        }
        self
    }

    pub fn extend<I, S>(&mut self, lines: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for l in lines {
            self.push(l);
        }
        self
    }

    /// Push `line` one level shallower than the current depth (`else`, `} catch {`).
    pub fn outdent(&mut self, line: impl Into<String>) -> &mut Self {
        let depth = self.depth;
        self.depth = depth.saturating_sub(1);
        self.push(line);
        self.depth = depth;
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    /// Push `open`, then lines pushed by `body` one level deeper, then `close`.
    pub fn block<F>(&mut self, open: impl Into<String>, close: impl Into<String>, body: F) -> &mut Self
    where
        F: FnOnce(&mut ShellFile),
    {
        self.push(open);
        self.depth += 1;
        body(self);
        self.depth -= 1;
        self.push(close);
        self
    }

    pub fn build(&self) -> io::Result<String> {
        for (i, l) in self.lines.iter().enumerate() {
            if l.contains('\n') || l.contains('\r') || l.contains('\0') {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("script line {i} contains a newline or NUL; use atomic lines"),
                ));
            }
        }

        if self.lines.is_empty() {
            return Ok(String::new());
        }

        let mut out = self.lines.join("\n");
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }
}
