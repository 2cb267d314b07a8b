use std::fs::{self, create_dir_all, File};
use std::io::{self, ErrorKind};
use std::path::Path;

pub fn ensure_dir_exists(p: &Path) -> io::Result<()> {
    if p.exists() {
        return Ok(());
    }

    create_dir_all(p)
}

/// Check to see if the given pathlike type has the given extension
pub fn path_has_ext<P: AsRef<Path> + ?Sized>(p: &P, ext: &str) -> bool {
    let path = p.as_ref();
    path.extension().map_or(false, |it| it == ext)
}

/// Calls `to_str` on the path and returns the string, panicking if that fails
pub fn path_must_str(path: &Path) -> &str {
    path.to_str().expect("valid paths")
}

/// Returns the filename of the path and panics if that fails
pub fn path_must_name(path: &Path) -> &str {
    path.file_name()
        .expect("valid paths")
        .to_str()
        .expect("valid paths")
}

pub fn open_file(path: &Path) -> crate::Result<File> {
    match File::open(path) {
        Ok(v) => Ok(v),
        Err(e) => match e.kind() {
            ErrorKind::NotFound => Err(crate::Error::MissingFile(path_must_str(path).into())),
            _ => Err(e.into()),
        },
    }
}

pub fn read_file(path: &Path) -> crate::Result<String> {
    match fs::read_to_string(path) {
        Ok(v) => Ok(v),
        Err(e) => match e.kind() {
            ErrorKind::NotFound => Err(crate::Error::MissingFile(path_must_str(path).into())),
            _ => Err(e.into()),
        },
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    use rstest::*;

    #[rstest]
    fn test_path_has_ext() {
        let path = PathBuf::from("path").join("to").join("test.perfetto-trace");
        assert!(path_has_ext(&path, "perfetto-trace"));
        let path = "/path/to/golden.json";
        assert!(path_has_ext(path, "json"));
        assert!(!path_has_ext(path, "toml"));
    }
}
