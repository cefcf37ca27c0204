//! External tool invocations and the argv conventions they follow

use super::probe::SquashfsParams;
use crate::config::ToolPaths;
use crate::firmware::defaults::{JFFS2, SQUASHFS_1, SQUASHFS_2};
use crate::firmware::paths::WorkPaths;
use std::fmt;
use std::path::{Path, PathBuf};

/// One external process to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// What the command works on (partition or directory name), used in logs
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child; inherits ours when `None`
    pub current_dir: Option<PathBuf>,
}

impl ToolCommand {
    /// Create a command with no arguments
    pub fn new<L: Into<String>, P: Into<String>>(label: L, program: P) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Create a command from a tool string such as `unsquashfs` or `sudo unsquashfs`
    ///
    /// The first word is the program, any further words become leading arguments.
    pub fn tool<L: Into<String>>(label: L, tool: &str) -> Self {
        let mut parts = tool.split_whitespace();
        let program = parts.next().unwrap_or_default();
        Self::new(label, program).args(parts)
    }

    /// Append one argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command inside `dir`
    pub fn in_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// `<extractor> -d <name>_out <name>`
fn extract_command(program: &str, name: &str, paths: &WorkPaths) -> ToolCommand {
    ToolCommand::tool(name, program)
        .args(["-d".to_string(), WorkPaths::extract_dir_name(name), name.to_string()])
        .in_dir(paths.root())
}

/// Extraction batch for unpack: both squashfs partitions and the jffs2 partition
pub fn extraction_commands(tools: &ToolPaths, paths: &WorkPaths) -> Vec<ToolCommand> {
    vec![
        extract_command(&tools.unsquashfs, SQUASHFS_1, paths),
        extract_command(&tools.unsquashfs, SQUASHFS_2, paths),
        extract_command(&tools.jefferson, JFFS2, paths),
    ]
}

/// Removal batch for full cleanup: `rm -rf <name>_out` per extracted partition
pub fn removal_commands(tools: &ToolPaths, paths: &WorkPaths) -> Vec<ToolCommand> {
    [SQUASHFS_1, SQUASHFS_2, JFFS2]
        .iter()
        .map(|name| {
            let dir = WorkPaths::extract_dir_name(name);
            ToolCommand::tool(dir.clone(), &tools.rm)
                .args(["-rf".to_string(), dir])
                .in_dir(paths.root())
        })
        .collect()
}

/// `unsquashfs -s <name>`: print the superblock of a squashfs partition
pub fn probe_command(tools: &ToolPaths, paths: &WorkPaths, name: &str) -> ToolCommand {
    ToolCommand::tool(name, &tools.unsquashfs)
        .args(["-s", name])
        .in_dir(paths.root())
}

/// `mksquashfs <name>_out <name>_new -comp <codec> -b <block size>`
pub fn repack_command(
    tools: &ToolPaths,
    paths: &WorkPaths,
    name: &str,
    params: &SquashfsParams,
) -> ToolCommand {
    ToolCommand::tool(name, &tools.mksquashfs)
        .arg(WorkPaths::extract_dir_name(name))
        .arg(WorkPaths::staging_name(name))
        .args([
            "-comp".to_string(),
            params.compression.clone(),
            "-b".to_string(),
            params.block_size.to_string(),
        ])
        .in_dir(paths.root())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_commands_follow_tool_conventions() {
        let paths = WorkPaths::new("/fw");
        let cmds = extraction_commands(&ToolPaths::default(), &paths);

        let rendered: Vec<String> = cmds.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "unsquashfs -d squashfs_1_out squashfs_1",
                "unsquashfs -d squashfs_2_out squashfs_2",
                "jefferson -d jffs2_out jffs2",
            ]
        );
        assert!(cmds.iter().all(|c| c.current_dir == Some(PathBuf::from("/fw"))));
        assert_eq!(cmds[2].label, "jffs2");
    }

    #[test]
    fn test_tool_string_with_wrapper() {
        let cmd = ToolCommand::tool("squashfs_1", "sudo  unsquashfs").arg("-s");
        assert_eq!(cmd.program, "sudo");
        assert_eq!(cmd.args, vec!["unsquashfs", "-s"]);
    }

    #[test]
    fn test_removal_commands() {
        let cmds = removal_commands(&ToolPaths::default(), &WorkPaths::default());
        let rendered: Vec<String> = cmds.iter().map(ToString::to_string).collect();
        assert_eq!(
            rendered,
            vec![
                "rm -rf squashfs_1_out",
                "rm -rf squashfs_2_out",
                "rm -rf jffs2_out",
            ]
        );
    }

    #[test]
    fn test_probe_and_repack_commands() {
        let tools = ToolPaths {
            mksquashfs: "/opt/bin/mksquashfs".into(),
            ..ToolPaths::default()
        };
        let paths = WorkPaths::default();
        let params = SquashfsParams {
            compression: "xz".into(),
            block_size: 131072,
        };

        assert_eq!(
            probe_command(&tools, &paths, "squashfs_1").to_string(),
            "unsquashfs -s squashfs_1"
        );
        assert_eq!(
            repack_command(&tools, &paths, "squashfs_1", &params).to_string(),
            "/opt/bin/mksquashfs squashfs_1_out squashfs_1_new -comp xz -b 131072"
        );
    }
}
