//! Deterministic filename generation
//!
//! Stored files are named after the entry they belong to:
//! `{publisher}_{range}_{name}_{suffix}{ext}`, with each component reduced to a
//! camelCase token. The first image of an entry uses the fixed `initial` suffix,
//! everything else gets eight hex characters from a fresh v4 UUID so multiple files
//! with identical metadata never collide.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::models::FileKind;

/// Token used when a field has no usable characters
pub const UNKNOWN_TOKEN: &str = "unknown";

/// Suffix marking the first image of an entry
pub const INITIAL_SUFFIX: &str = "_initial";

/// Storage directory for entry images
pub const IMAGE_DIR: &str = "uploaded_images";

/// Extension assumed when a stored path carries none
pub const DEFAULT_IMAGE_EXTENSION: &str = ".jpg";

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static regex"));
static SLUG_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_\s-]").expect("static regex"));
static SLUG_COLLAPSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-\s]+").expect("static regex"));

/// Convert free text into a separator-free camelCase token.
///
/// The first word is lowercased. Later words only get their first character
/// uppercased; the rest of each word is kept as typed. Empty input, or input with no
/// ASCII alphanumerics, yields [`UNKNOWN_TOKEN`].
pub fn to_camel_case(text: Option<&str>) -> String {
    let Some(text) = text else {
        return UNKNOWN_TOKEN.to_string();
    };

    let mut words = NON_ALNUM.split(text.trim()).filter(|w| !w.is_empty());
    let Some(first) = words.next() else {
        return UNKNOWN_TOKEN.to_string();
    };

    let mut camel = first.to_ascii_lowercase();
    for word in words {
        let mut chars = word.chars();
        if let Some(head) = chars.next() {
            camel.push(head.to_ascii_uppercase());
            camel.push_str(chars.as_str());
        }
    }
    camel
}

/// Web-style slug: lowercase ASCII, runs of whitespace or hyphens become one `-`.
pub fn slugify(text: Option<&str>) -> String {
    let lowered = text.unwrap_or_default().to_lowercase();
    let stripped = SLUG_STRIP.replace_all(&lowered, "");
    let collapsed = SLUG_COLLAPSE.replace_all(&stripped, "-");
    let slug = collapsed.trim_matches(|c| c == '-' || c == '_');
    if slug.is_empty() {
        UNKNOWN_TOKEN.to_string()
    } else {
        slug.to_string()
    }
}

/// The metadata a filename is derived from.
///
/// Entries, images and files all carry a copy of these three fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata<'a> {
    pub name: &'a str,
    pub publisher: Option<&'a str>,
    pub range: Option<&'a str>,
}

impl<'a> FileMetadata<'a> {
    pub fn new(name: &'a str, publisher: Option<&'a str>, range: Option<&'a str>) -> Self {
        Self {
            name,
            publisher,
            range,
        }
    }

    /// `{publisher}_{range}_{name}` in camelCase tokens
    pub fn stem(&self) -> String {
        format!(
            "{}_{}_{}",
            to_camel_case(self.publisher),
            to_camel_case(self.range),
            to_camel_case(Some(self.name))
        )
    }

    /// Filename for the first image uploaded with a new entry
    pub fn initial_filename(&self, ext: &str) -> String {
        format!("{}{}{}", self.stem(), INITIAL_SUFFIX, ext)
    }

    /// Filename with a random eight character suffix
    pub fn unique_filename(&self, ext: &str) -> String {
        format!("{}_{}{}", self.stem(), unique_suffix(), ext)
    }

    /// Directory an entry-level file of `kind` is stored under
    pub fn file_dir(&self, kind: FileKind) -> String {
        match kind {
            FileKind::Stl => format!(
                "stlFiles/{}/{}/{}",
                slugify(self.publisher),
                slugify(self.range),
                slugify(Some(self.name))
            ),
            FileKind::Print => "print_files".to_string(),
            FileKind::UserPrint => "user_prints".to_string(),
        }
    }

    /// Fresh storage key for an entry-level file of `kind`
    pub fn file_key(&self, kind: FileKind, ext: &str) -> String {
        format!("{}/{}", self.file_dir(kind), self.unique_filename(ext))
    }
}

/// First eight hex characters of a v4 UUID
pub fn unique_suffix() -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(8);
    hex
}

/// Storage key for an image file name
pub fn image_key(filename: &str) -> String {
    format!("{}/{}", IMAGE_DIR, filename)
}

/// Final path component of a storage key
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Directory part of a storage key, empty for top-level keys
pub fn parent_dir(key: &str) -> &str {
    key.rfind('/').map(|idx| &key[..idx]).unwrap_or("")
}

/// Split a file name into stem and extension.
///
/// Leading dots do not start an extension, so `.hidden` has none.
fn split_extension(name: &str) -> (&str, &str) {
    let leading_dots = name.len() - name.trim_start_matches('.').len();
    match name[leading_dots..].rfind('.') {
        Some(idx) => name.split_at(leading_dots + idx),
        None => (name, ""),
    }
}

/// Lowercased extension including the leading dot, or an empty string
pub fn extension_of(name: &str) -> String {
    split_extension(file_name(name)).1.to_lowercase()
}

/// Whether a stored file already follows the `_initial` naming scheme
pub fn is_new_format(name: &str) -> bool {
    split_extension(file_name(name)).0.ends_with(INITIAL_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_basic() {
        assert_eq!(to_camel_case(Some("Games Workshop")), "gamesWorkshop");
        assert_eq!(to_camel_case(Some("Space Marine")), "spaceMarine");
        assert_eq!(to_camel_case(Some("40K")), "40k");
        assert_eq!(to_camel_case(Some("GW")), "gw");
    }

    #[test]
    fn test_camel_case_keeps_tail_casing() {
        assert_eq!(to_camel_case(Some("ork BOYZ mob")), "orkBOYZMob");
        assert_eq!(to_camel_case(Some("the iPhone case")), "theIPhoneCase");
    }

    #[test]
    fn test_camel_case_separators() {
        assert_eq!(to_camel_case(Some("  one--two__three!!four ")), "oneTwoThreeFour");
        assert_eq!(to_camel_case(Some("Café Noir")), "cafNoir");
    }

    #[test]
    fn test_camel_case_placeholder() {
        assert_eq!(to_camel_case(None), "unknown");
        assert_eq!(to_camel_case(Some("")), "unknown");
        assert_eq!(to_camel_case(Some("   ")), "unknown");
        assert_eq!(to_camel_case(Some("!!!---")), "unknown");
    }

    #[test]
    fn test_camel_case_settles_after_one_reapplication() {
        let inputs = [
            "",
            "Games Workshop",
            "  mixed CASE input--here ",
            "über-Größe",
            "a",
            "42 is the Answer",
        ];
        for input in inputs {
            let once = to_camel_case(Some(input));
            let twice = to_camel_case(Some(&once));
            let thrice = to_camel_case(Some(&twice));
            assert_eq!(twice, thrice, "input {:?}", input);
            assert!(once.chars().all(|c| c.is_ascii_alphanumeric()));
            assert!(!once.is_empty());
        }
    }

    #[test]
    fn test_initial_filename() {
        let meta = FileMetadata::new("Space Marine", Some("Games Workshop"), Some("40K"));
        assert_eq!(
            meta.initial_filename(".png"),
            "gamesWorkshop_40k_spaceMarine_initial.png"
        );
    }

    #[test]
    fn test_unique_filename_shape() {
        let meta = FileMetadata::new("Ork Boy", None, Some(""));
        let first = meta.unique_filename(".jpg");
        let second = meta.unique_filename(".jpg");
        assert!(first.starts_with("unknown_unknown_orkBoy_"));
        assert!(first.ends_with(".jpg"));
        let suffix = &first["unknown_unknown_orkBoy_".len()..first.len() - 4];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.JPG"), ".jpg");
        assert_eq!(extension_of("uploaded_images/a.b.png"), ".png");
        assert_eq!(extension_of("noext"), "");
        assert_eq!(extension_of(".hidden"), "");
        assert_eq!(extension_of("dir.v2/noext"), "");
    }

    #[test]
    fn test_is_new_format() {
        assert!(is_new_format("uploaded_images/gw_40k_orkBoy_initial.jpg"));
        assert!(is_new_format("gw_40k_orkBoy_initial"));
        assert!(!is_new_format("uploaded_images/gw_40k_orkBoy_1a2b3c4d.jpg"));
        assert!(!is_new_format("initial_photo.jpg"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify(Some("Test Publisher")), "test-publisher");
        assert_eq!(slugify(Some("  Hello -- World! ")), "hello-world");
        assert_eq!(slugify(Some("snake_case name")), "snake_case-name");
        assert_eq!(slugify(None), "unknown");
        assert_eq!(slugify(Some("???")), "unknown");
    }

    #[test]
    fn test_stl_file_key_layout() {
        let meta = FileMetadata::new("Test Model", Some("Test Publisher"), Some("Test Range"));
        let key = meta.file_key(FileKind::Stl, ".zip");
        assert!(key.starts_with("stlFiles/test-publisher/test-range/test-model/"));
        assert!(key.contains("testPublisher_testRange_testModel_"));
        assert!(key.ends_with(".zip"));
    }

    #[test]
    fn test_key_helpers() {
        assert_eq!(image_key("a.jpg"), "uploaded_images/a.jpg");
        assert_eq!(file_name("uploaded_images/a.jpg"), "a.jpg");
        assert_eq!(parent_dir("uploaded_images/a.jpg"), "uploaded_images");
        assert_eq!(parent_dir("a.jpg"), "");
    }
}
