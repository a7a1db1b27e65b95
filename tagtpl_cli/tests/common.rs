use std::path::Path;
use std::path::PathBuf;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn tagtpl_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("tagtpl"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("TAGTPL_LOG");
	cmd
}

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> std::io::Result<PathBuf> {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	std::fs::write(&path, contents)?;

	Ok(path)
}
