//! Line-oriented output targets shared by the built-in backends

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Where a backend writes its lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSpec {
    Stderr,
    Stdout,
    File(PathBuf),
}

impl TargetSpec {
    /// `stderr`, `stdout`, or a file path
    pub fn parse(value: &str) -> Self {
        match value {
            "stderr" | "-" => Self::Stderr,
            "stdout" => Self::Stdout,
            path => Self::File(PathBuf::from(path)),
        }
    }

    /// Read the `target` param, falling back to `default`
    pub fn from_params(params: &HashMap<String, String>, default: TargetSpec) -> Self {
        params
            .get("target")
            .map(|value| Self::parse(value))
            .unwrap_or(default)
    }
}

impl fmt::Display for TargetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stderr => f.write_str("stderr"),
            Self::Stdout => f.write_str("stdout"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

enum Sink {
    Stderr(io::Stderr),
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

/// An opened target
pub struct LineTarget {
    spec: TargetSpec,
    sink: Sink,
}

impl LineTarget {
    /// Open the target; files are created (with parent directories) and
    /// appended to
    pub fn open(spec: TargetSpec) -> io::Result<Self> {
        let sink = match &spec {
            TargetSpec::Stderr => Sink::Stderr(io::stderr()),
            TargetSpec::Stdout => Sink::Stdout(io::stdout()),
            TargetSpec::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Sink::File(BufWriter::new(file))
            }
        };
        Ok(Self { spec, sink })
    }

    pub fn spec(&self) -> &TargetSpec {
        &self.spec
    }

    /// Write pre-formatted bytes (normally whole lines)
    pub fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match &mut self.sink {
            Sink::Stderr(out) => out.lock().write_all(buf),
            Sink::Stdout(out) => out.lock().write_all(buf),
            Sink::File(out) => out.write_all(buf),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Stderr(out) => out.flush(),
            Sink::Stdout(out) => out.flush(),
            Sink::File(out) => out.flush(),
        }
    }
}

impl fmt::Debug for LineTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineTarget")
            .field("spec", &self.spec)
            .finish()
    }
}

/// Lock a backend mutex, recovering the state if a writer panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
