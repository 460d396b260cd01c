//! Injection of common shell commands from a tools volume.

use crate::artifact::filesystem::{first_child_dir, join_mkdir};
use crate::artifact::xdftool::DiskImageTool;
use crate::build::merge::COMMAND_DIR;
use crate::build::scratch::ScratchDir;
use crate::build::volumes;
use crate::error::{HdfError, IoContext, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Commands the generated startup-sequence and a usable shell depend on.
pub const DEFAULT_COMMANDS: &[&str] = &["type", "dir", "cd", "echo", "assign", "info", "wait"];

/// Copy `names` from the `c` directory of `commands_volume` into `target_dir/c`.
///
/// The volume is unpacked into a scratch directory that is removed before
/// returning, on success or failure. A command absent from the volume is an
/// error; boot scripts calling it would otherwise break silently.
pub fn inject_commands(
    tool: &dyn DiskImageTool,
    commands_volume: &Path,
    target_dir: &Path,
    names: &[String],
) -> Result<PathBuf> {
    let cdir = join_mkdir(target_dir, COMMAND_DIR)?;

    let scratch = ScratchDir::new()?;
    volumes::unpack(tool, commands_volume, scratch.path())?;
    let volume_root = first_child_dir(scratch.path())?.ok_or_else(|| {
        HdfError::integrity(commands_volume, "unpacked commands volume has no root directory")
    })?;
    let source_cdir = volume_root.join(COMMAND_DIR);

    for name in names {
        let src = source_cdir.join(name);
        if !src.is_file() {
            return Err(HdfError::MissingCommand {
                name: name.clone(),
                path: src,
            });
        }
        let dst = cdir.join(name);
        fs::copy(&src, &dst).io_context(|| {
            format!("copying command '{}' to '{}'", src.display(), dst.display())
        })?;
        log::debug!("injected command '{}'", name);
    }
    log::info!(
        "injected {} command(s) into '{}'",
        names.len(),
        cdir.display()
    );

    scratch.close()?;
    Ok(cdir)
}

/// [`DEFAULT_COMMANDS`] as owned strings.
pub fn default_commands() -> Vec<String> {
    DEFAULT_COMMANDS.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    /// Unpacks a "Workbench" volume whose `c` directory holds `available`.
    struct CommandsVolume {
        available: Vec<&'static str>,
        scratch_seen: RefCell<Option<PathBuf>>,
    }

    impl DiskImageTool for CommandsVolume {
        fn unpack(&self, _: &Path, dest_dir: &Path) -> Result<()> {
            *self.scratch_seen.borrow_mut() = Some(dest_dir.to_path_buf());
            let cdir = dest_dir.join("Workbench/c");
            fs::create_dir_all(&cdir).unwrap();
            for cmd in &self.available {
                fs::write(cdir.join(cmd), format!("binary {cmd}")).unwrap();
            }
            fs::write(dest_dir.join("Workbench.xdfmeta"), "").unwrap();
            Ok(())
        }
        fn pack(&self, _: &Path, _: &Path, _: u64) -> Result<()> {
            unreachable!()
        }
        fn list(&self, _: &Path) -> Result<String> {
            Ok("Workbench  VOLUME  ofs\n".to_string())
        }
        fn format(&self, _: &Path, _: &str) -> Result<()> {
            unreachable!()
        }
        fn create(&self, _: &Path, _: &str, _: u64) -> Result<()> {
            unreachable!()
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn fixture() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let adf = temp.path().join("wb.adf");
        fs::write(&adf, "").unwrap();
        (temp, adf)
    }

    #[test]
    fn test_inject_copies_exactly_named_commands() {
        let (temp, adf) = fixture();
        let tool = CommandsVolume {
            available: vec!["type", "dir", "cd", "echo", "assign", "list", "ed"],
            scratch_seen: RefCell::new(None),
        };
        let target = temp.path().join("root");
        fs::create_dir(&target).unwrap();

        let cdir = inject_commands(
            &tool,
            &adf,
            &target,
            &names(&["type", "dir", "cd", "echo", "assign"]),
        )
        .unwrap();

        let found: BTreeSet<String> = fs::read_dir(&cdir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        let expected: BTreeSet<String> = names(&["type", "dir", "cd", "echo", "assign"])
            .into_iter()
            .collect();
        assert_eq!(found, expected);
        assert_eq!(fs::read_to_string(cdir.join("dir")).unwrap(), "binary dir");
        assert!(!tool.scratch_seen.borrow().as_ref().unwrap().exists());
    }

    #[test]
    fn test_inject_keeps_existing_commands() {
        let (temp, adf) = fixture();
        let tool = CommandsVolume {
            available: vec!["echo"],
            scratch_seen: RefCell::new(None),
        };
        let target = temp.path().join("root");
        fs::create_dir_all(target.join("c")).unwrap();
        fs::write(target.join("c/List"), "list").unwrap();

        inject_commands(&tool, &adf, &target, &names(&["echo"])).unwrap();

        assert!(target.join("c/List").exists());
        assert!(target.join("c/echo").exists());
    }

    #[test]
    fn test_missing_command_fails_and_cleans_scratch() {
        let (temp, adf) = fixture();
        let tool = CommandsVolume {
            available: vec!["echo"],
            scratch_seen: RefCell::new(None),
        };
        let target = temp.path().join("root");
        fs::create_dir(&target).unwrap();

        let err = inject_commands(&tool, &adf, &target, &names(&["echo", "wait"])).unwrap_err();

        match err {
            HdfError::MissingCommand { name, .. } => assert_eq!(name, "wait"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!tool.scratch_seen.borrow().as_ref().unwrap().exists());
    }

    #[test]
    fn test_default_commands() {
        assert_eq!(default_commands().len(), DEFAULT_COMMANDS.len());
        assert!(default_commands().contains(&"assign".to_string()));
    }
}
