use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use sha2::Digest;
use sha2::Sha256;

use crate::TagtplError;
use crate::TagtplResult;

/// Folder below the cache root that holds compiled templates.
pub const CACHE_SUBFOLDER: &str = "tagtpl";
/// Extension of compiled template files.
pub const ARTIFACT_EXTENSION: &str = "tpl";

/// Compiled templates on disk, keyed by the absolute path of their source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCache {
	root: PathBuf,
}

impl CompiledCache {
	/// The cache root must already exist and be writable.
	pub fn new(root: impl AsRef<Path>) -> TagtplResult<Self> {
		let root = root.as_ref();
		let directory_error = |reason: String| {
			TagtplError::CacheDirectory {
				path: root.display().to_string(),
				reason,
			}
		};

		let root = root
			.canonicalize()
			.map_err(|e| directory_error(e.to_string()))?;
		if !root.is_dir() {
			return Err(directory_error("not a directory".to_string()));
		}

		let check = root.join(format!(".tagtpl-write-check-{}", std::process::id()));
		fs::write(&check, b"").map_err(|e| directory_error(e.to_string()))?;
		let _ = fs::remove_file(&check);

		Ok(Self { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	/// `<root>/tagtpl/<h[0:2]>/<h[2:4]>/<h>.tpl` where `h` hashes `source`.
	pub fn artifact_path(&self, source: &Path) -> PathBuf {
		let hash = path_hash(source);

		self.root
			.join(CACHE_SUBFOLDER)
			.join(&hash[0..2])
			.join(&hash[2..4])
			.join(format!("{hash}.{ARTIFACT_EXTENSION}"))
	}

	/// Load the artifact for `source` when it is fresh.
	pub fn load(&self, source: &Path) -> Option<String> {
		let artifact = self.artifact_path(source);
		if !is_fresh(&artifact, source) {
			return None;
		}

		fs::read_to_string(&artifact).ok()
	}

	/// Atomically replace the artifact for `source` with `contents`.
	pub fn store(&self, source: &Path, contents: &str) -> TagtplResult<PathBuf> {
		let artifact = self.artifact_path(source);
		let write_error = |reason: String| {
			TagtplError::CacheWrite {
				path: artifact.display().to_string(),
				reason,
			}
		};

		let Some(cache_dir) = artifact.parent() else {
			return Err(write_error("artifact has no parent directory".to_string()));
		};
		fs::create_dir_all(cache_dir).map_err(|e| write_error(e.to_string()))?;

		let temp_path = artifact.with_extension(format!(
			"{ARTIFACT_EXTENSION}.tmp-{}-{}",
			std::process::id(),
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.map_or(0, |duration| duration.as_nanos())
		));

		fs::write(&temp_path, contents).map_err(|e| write_error(e.to_string()))?;
		inherit_permissions(cache_dir, &temp_path);

		if let Err(e) = fs::rename(&temp_path, &artifact) {
			let _ = fs::remove_file(&temp_path);
			return Err(write_error(e.to_string()));
		}

		tracing::debug!(artifact = %artifact.display(), "wrote compiled template");
		Ok(artifact)
	}
}

/// Lowercase hex SHA-256 of a path.
pub fn path_hash(path: &Path) -> String {
	let mut hasher = Sha256::new();
	hasher.update(path.to_string_lossy().as_bytes());
	hex::encode(hasher.finalize())
}

/// An artifact is fresh when it is non-empty and not older than its source.
pub fn is_fresh(artifact: &Path, source: &Path) -> bool {
	let Ok(artifact_meta) = fs::metadata(artifact) else {
		return false;
	};
	if artifact_meta.len() == 0 {
		return false;
	}

	let Ok(source_meta) = fs::metadata(source) else {
		return false;
	};

	match (artifact_meta.modified(), source_meta.modified()) {
		(Ok(artifact_time), Ok(source_time)) => artifact_time >= source_time,
		_ => false,
	}
}

#[cfg(unix)]
fn inherit_permissions(dir: &Path, file: &Path) {
	use std::os::unix::fs::PermissionsExt;

	let Ok(metadata) = fs::metadata(dir) else {
		return;
	};
	let mode = metadata.permissions().mode() & 0o666;
	let _ = fs::set_permissions(file, fs::Permissions::from_mode(mode));
}

#[cfg(not(unix))]
fn inherit_permissions(_dir: &Path, _file: &Path) {}
