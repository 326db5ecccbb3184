use std::path::{Path, PathBuf};

/// Output path for `input` when none is given: the last extension is
/// replaced by `.mp4`, or `.mp4` is appended. An input that already ends in
/// `.mp4` gets a `-transcoded` suffix so it is never overwritten.
pub fn derive(input: &Path) -> PathBuf {
    let candidate = input.with_extension("mp4");
    if candidate != input {
        return candidate;
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}-transcoded.mp4", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_last_extension() {
        assert_eq!(derive(Path::new("movie.avi")), PathBuf::from("movie.mp4"));
        assert_eq!(
            derive(Path::new("/data/clip.2024.mkv")),
            PathBuf::from("/data/clip.2024.mp4")
        );
    }

    #[test]
    fn test_appends_when_no_extension() {
        assert_eq!(derive(Path::new("dir/raw")), PathBuf::from("dir/raw.mp4"));
    }

    #[test]
    fn test_mp4_input_is_not_overwritten() {
        assert_eq!(
            derive(Path::new("dir/clip.mp4")),
            PathBuf::from("dir/clip-transcoded.mp4")
        );
    }
}
