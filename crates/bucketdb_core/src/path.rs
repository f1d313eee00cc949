//! Bucket path resolution.
//!
//! A bucket's full name is never stored. It is rebuilt on demand by walking
//! parent links up to a top-level bucket and writing the names back out root
//! first, separated by `/`.

use crate::bucket::Bucket;
use std::fmt;

/// Separator between path segments.
const SEPARATOR: char = '/';

/// Writes the full path of `bucket` into `out`.
///
/// Names that are not valid UTF-8 are written lossily.
pub fn write_full_name<W: fmt::Write + ?Sized>(out: &mut W, bucket: Bucket<'_>) -> fmt::Result {
    if let Some(parent) = bucket.parent() {
        write_full_name(out, parent)?;
        out.write_char(SEPARATOR)?;
    }
    out.write_str(&String::from_utf8_lossy(bucket.name()))
}

/// Returns the full path of `bucket`, e.g. `a/b/c`.
#[must_use]
pub fn full_name(bucket: Bucket<'_>) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_full_name(&mut out, bucket);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::Tree;

    #[test]
    fn top_level_has_no_leading_separator() {
        let mut tree = Tree::default();
        let a = tree.insert(None, b"widgets").unwrap();
        assert_eq!(full_name(tree.view(a).unwrap()), "widgets");
    }

    #[test]
    fn three_levels() {
        let mut tree = Tree::default();
        let a = tree.insert(None, b"a").unwrap();
        let b = tree.insert(Some(a), b"b").unwrap();
        let c = tree.insert(Some(b), b"c").unwrap();
        assert_eq!(full_name(tree.view(c).unwrap()), "a/b/c");
        assert_eq!(tree.view(c).unwrap().to_string(), "a/b/c");
    }

    #[test]
    fn follows_relink() {
        let mut tree = Tree::default();
        let a = tree.insert(None, b"a").unwrap();
        let x = tree.insert(None, b"x").unwrap();
        let b = tree.insert(Some(a), b"b").unwrap();
        tree.relink(b, Some(a), Some(x)).unwrap();
        assert_eq!(full_name(tree.view(b).unwrap()), "x/b");
        tree.relink(b, Some(x), None).unwrap();
        assert_eq!(full_name(tree.view(b).unwrap()), "b");
    }

    #[test]
    fn invalid_utf8_is_lossy() {
        let mut tree = Tree::default();
        let a = tree.insert(None, b"\xffa").unwrap();
        assert_eq!(full_name(tree.view(a).unwrap()), "\u{fffd}a");
    }
}
