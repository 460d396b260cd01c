//! AmigaDOS startup-sequence generation.
//!
//! [`StartupSequence`] is an append-only list of script lines. Typed helpers
//! emit one fixed-syntax line per AmigaDOS command; [`StartupSequence::block`]
//! replays an existing script. Serialization is deterministic.
//!
//! # Example
//!
//! ```rust
//! use hdf_builder::build::startup::StartupSequence;
//!
//! let mut seq = StartupSequence::new();
//! seq.comment(Some("generated"));
//! seq.assign("Games", "My Games");
//! seq.wait(2);
//! assert_eq!(
//!     seq.build(),
//!     "; generated\nassign Games: \"dh0:My Games\"\nwait 2 secs\n"
//! );
//! ```

use crate::build::merge::SCRIPT_DIR;
use crate::error::{describe, IoContext, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the boot script inside the script directory.
pub const STARTUP_SEQUENCE: &str = "startup-sequence";

/// Device the finished hard disk boots as.
pub const TARGET_DEVICE: &str = "dh0:";

/// Device a floppy script refers to itself by before it is relocated.
pub const TRANSIENT_DEVICE: &str = "df0:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupSequence {
    lines: Vec<String>,
    target_device: String,
    transient_device: String,
}

impl Default for StartupSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl StartupSequence {
    pub fn new() -> Self {
        Self::with_devices(TARGET_DEVICE, TRANSIENT_DEVICE)
    }

    /// Builder targeting `target_device`, stripping `transient_device` from replayed blocks.
    pub fn with_devices(target_device: &str, transient_device: &str) -> Self {
        Self {
            lines: Vec::new(),
            target_device: target_device.to_string(),
            transient_device: transient_device.to_string(),
        }
    }

    /// `assign <source>: <device><dest>`
    ///
    /// A missing trailing `:` is added to `source`; `dest` is rooted on the
    /// target device unless it already is.
    pub fn assign(&mut self, source: &str, dest: &str) -> &mut Self {
        let source = if source.ends_with(':') {
            source.to_string()
        } else {
            format!("{}:", source)
        };
        let dest = if dest.starts_with(&self.target_device) {
            dest.to_string()
        } else {
            format!("{}{}", self.target_device, dest)
        };
        self.push(format!("assign {} {}", quote(&source), quote(&dest)))
    }

    /// `;` or `; <text>`
    pub fn comment(&mut self, text: Option<&str>) -> &mut Self {
        match text {
            Some(text) => self.push(format!("; {}", text)),
            None => self.push(";".to_string()),
        }
    }

    /// `echo "<message>"`
    pub fn echo(&mut self, message: &str) -> &mut Self {
        self.push(format!("echo \"{}\"", message))
    }

    pub fn info(&mut self) -> &mut Self {
        self.push("info".to_string())
    }

    /// `wait <seconds> secs`
    pub fn wait(&mut self, seconds: u32) -> &mut Self {
        self.push(format!("wait {} secs", seconds))
    }

    /// `wait 1 secs`
    pub fn wait_default(&mut self) -> &mut Self {
        self.wait(1)
    }

    pub fn cd(&mut self, path: &str) -> &mut Self {
        self.push(format!("cd {}", quote(path)))
    }

    pub fn execute(&mut self, path: &str) -> &mut Self {
        self.push(format!("execute {}", quote(path)))
    }

    /// Append a preformatted line as is.
    pub fn raw_line(&mut self, line: &str) -> &mut Self {
        self.push(line.to_string())
    }

    /// Append every line of `text`, removing references to the transient device.
    ///
    /// A script captured from an unpacked floppy names its own files through
    /// the floppy device; once merged into the hard disk those paths resolve
    /// relative to the current directory instead.
    pub fn block(&mut self, text: &str) -> &mut Self {
        for line in text.split('\n') {
            let line = line.replace(&self.transient_device, "");
            self.lines.push(line);
        }
        self
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Serialized script with exactly one trailing line break.
    pub fn build(&self) -> String {
        format!("{}\n", self)
    }

    /// Write the script to `<root>/s/startup-sequence`, creating `s` if needed.
    ///
    /// The file is encoded as ISO-8859-1, the native Amiga character set.
    pub fn write_to(&self, root: &Path) -> Result<PathBuf> {
        let sdir = root.join(SCRIPT_DIR);
        fs::create_dir_all(&sdir).io_context(|| describe("creating script directory", &sdir))?;
        let path = sdir.join(STARTUP_SEQUENCE);
        fs::write(&path, encode_latin1(&self.build())).io_context(|| describe("writing", &path))?;
        log::info!("wrote '{}' ({} lines)", path.display(), self.lines.len());
        Ok(path)
    }

    fn push(&mut self, line: String) -> &mut Self {
        self.lines.push(line);
        self
    }
}

impl fmt::Display for StartupSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

/// Read an existing script, decoding it as ISO-8859-1.
pub fn read_script(path: &Path) -> Result<String> {
    let bytes = fs::read(path).io_context(|| describe("reading script", path))?;
    Ok(bytes.iter().map(|&b| b as char).collect())
}

fn encode_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Wrap `token` in double quotes if it contains a space.
///
/// Embedded quotes are not escaped; AmigaDOS path names cannot contain them.
pub fn quote(token: &str) -> String {
    if token.contains(' ') {
        format!("\"{}\"", token)
    } else {
        token.to_string()
    }
}
