use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

/// A template located on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
	/// The logical name the template was requested by.
	pub name: String,
	/// The search directory it was found in.
	pub dir: PathBuf,
	/// Absolute path of the template file.
	pub path: PathBuf,
}

/// Ordered, de-duplicated list of canonical template directories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
	dirs: Vec<PathBuf>,
}

impl SearchPath {
	pub fn new<I, P>(dirs: I) -> Self
	where
		I: IntoIterator<Item = P>,
		P: AsRef<Path>,
	{
		let mut search_path = Self::default();
		search_path.append(dirs);
		search_path
	}

	pub fn dirs(&self) -> &[PathBuf] {
		&self.dirs
	}

	/// Replace every directory.
	pub fn set<I, P>(&mut self, dirs: I)
	where
		I: IntoIterator<Item = P>,
		P: AsRef<Path>,
	{
		self.dirs.clear();
		self.append(dirs);
	}

	/// Add directories in front, keeping their relative order.
	pub fn prepend<I, P>(&mut self, dirs: I)
	where
		I: IntoIterator<Item = P>,
		P: AsRef<Path>,
	{
		let mut front: Vec<PathBuf> = vec![];
		for dir in dirs.into_iter().filter_map(|dir| canonical_dir(dir.as_ref())) {
			if !front.contains(&dir) {
				front.push(dir);
			}
		}

		self.dirs.retain(|dir| !front.contains(dir));
		front.append(&mut self.dirs);
		self.dirs = front;
	}

	/// Add directories at the end. Directories already present keep their
	/// position.
	pub fn append<I, P>(&mut self, dirs: I)
	where
		I: IntoIterator<Item = P>,
		P: AsRef<Path>,
	{
		for dir in dirs.into_iter().filter_map(|dir| canonical_dir(dir.as_ref())) {
			if !self.dirs.contains(&dir) {
				self.dirs.push(dir);
			}
		}
	}

	/// The first directory containing `name`. Names that are absolute or
	/// step out of a directory with `..` never resolve.
	pub fn resolve(&self, name: &str) -> Option<ResolvedTemplate> {
		find_in(&self.dirs, name)
	}

	/// Like [`SearchPath::resolve`] but only looks at directories listed
	/// strictly after `previous_dir`.
	pub fn resolve_parent(&self, previous_dir: &Path, name: &str) -> Option<ResolvedTemplate> {
		let previous_dir = canonical_dir(previous_dir)?;
		let index = self.dirs.iter().position(|dir| *dir == previous_dir)?;

		find_in(&self.dirs[index + 1..], name)
	}
}

fn find_in(dirs: &[PathBuf], name: &str) -> Option<ResolvedTemplate> {
	if !is_contained_name(name) {
		tracing::trace!(name, "rejected template name outside the search path");
		return None;
	}

	dirs.iter().find_map(|dir| {
		let candidate = dir.join(name);
		if !candidate.is_file() {
			return None;
		}

		tracing::trace!(name, dir = %dir.display(), "resolved template");
		let path = candidate.canonicalize().unwrap_or(candidate);

		Some(ResolvedTemplate {
			name: name.to_string(),
			dir: dir.clone(),
			path,
		})
	})
}

/// Whether `name` only names entries below a directory it is joined to.
fn is_contained_name(name: &str) -> bool {
	let mut components = Path::new(name).components().peekable();
	components.peek().is_some()
		&& components.all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn canonical_dir(dir: &Path) -> Option<PathBuf> {
	let dir = dir.canonicalize().ok()?;
	dir.is_dir().then_some(dir)
}
