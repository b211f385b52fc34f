use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};
use std::path::Path;

use dump_common::{Compression, DumpError, DumpResult};

/// Sequential byte sink with `open`/`write`/`close` (component A). The
/// dump engine never reasons about what's on the other side — a plain
/// file, standard output, or (not mandated by this crate, see
/// `Compression`) a compressing wrapper all look the same from here.
pub trait Sink: fmt::Debug {
    fn open(&mut self) -> DumpResult<()>;
    fn write(&mut self, bytes: &[u8]) -> DumpResult<()>;
    fn close(&mut self) -> DumpResult<()>;

    fn write_str(&mut self, s: &str) -> DumpResult<()> {
        self.write(s.as_bytes())
    }
}

enum Destination {
    Stdout(Option<BufWriter<Stdout>>),
    File { path: std::path::PathBuf, handle: Option<BufWriter<File>> },
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Stdout(_) => write!(f, "Destination::Stdout"),
            Destination::File { path, .. } => write!(f, "Destination::File({})", path.display()),
        }
    }
}

/// The only sink variant this crate ships: a plain, uncompressed byte
/// stream to a filesystem path or standard output (the "standard-output
/// sentinel" of §6 is an empty path).
#[derive(Debug)]
pub struct PlainSink {
    destination: Destination,
}

impl PlainSink {
    pub fn to_stdout() -> Self {
        PlainSink {
            destination: Destination::Stdout(None),
        }
    }

    pub fn to_path(path: impl AsRef<Path>) -> Self {
        PlainSink {
            destination: Destination::File {
                path: path.as_ref().to_path_buf(),
                handle: None,
            },
        }
    }

    /// §6 — destination may be a filesystem path or the standard-output
    /// sentinel, which this crate treats as an empty path.
    pub fn for_path(path: &str) -> Self {
        if path.is_empty() {
            PlainSink::to_stdout()
        } else {
            PlainSink::to_path(path)
        }
    }
}

impl Sink for PlainSink {
    fn open(&mut self) -> DumpResult<()> {
        match &mut self.destination {
            Destination::Stdout(handle) => {
                *handle = Some(BufWriter::new(io::stdout()));
            }
            Destination::File { path, handle } => {
                let file = File::create(path)?;
                *handle = Some(BufWriter::new(file));
            }
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> DumpResult<()> {
        match &mut self.destination {
            Destination::Stdout(Some(w)) => w.write_all(bytes)?,
            Destination::File { handle: Some(w), .. } => w.write_all(bytes)?,
            _ => return Err(DumpError::Sink("sink was written to before it was opened".into())),
        }
        Ok(())
    }

    fn close(&mut self) -> DumpResult<()> {
        match &mut self.destination {
            Destination::Stdout(handle) => {
                if let Some(w) = handle {
                    w.flush()?;
                }
                *handle = None;
            }
            Destination::File { handle, .. } => {
                if let Some(w) = handle {
                    w.flush()?;
                }
                *handle = None;
            }
        }
        Ok(())
    }
}

/// Picks the sink implementation for the configured [`Compression`]
/// variant. `None` is the only variant this crate mandates (§6); an
/// embedder adding a codec implements [`Sink`] directly rather than
/// extending this function.
pub fn sink_for(compression: &Compression, path: &str) -> DumpResult<Box<dyn Sink>> {
    match compression {
        Compression::None => Ok(Box::new(PlainSink::for_path(path))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn writes_to_a_file_and_reads_back() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("dump-core-sink-test-{}.sql", std::process::id()));
        let mut sink = PlainSink::to_path(&path);
        sink.open().unwrap();
        sink.write_str("-- header\n").unwrap();
        sink.write_str("INSERT INTO `t` VALUES (1);\n").unwrap();
        sink.close().unwrap();

        let mut contents = String::new();
        File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "-- header\nINSERT INTO `t` VALUES (1);\n");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn writing_before_open_is_a_sink_error() {
        let mut sink = PlainSink::to_stdout();
        assert!(sink.write_str("x").is_err());
    }
}
