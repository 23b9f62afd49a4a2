//! Tree rendering of archive listings
//!
//! Reconstructs an indented hierarchy from the flat member list the
//! archiver prints. Pure: performs no I/O and never reorders its input;
//! the caller guarantees ascending lexicographic order.

const BRANCH: &str = "├── ";
const BRANCH_LAST: &str = "└── ";
const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    /// normalized path, no leading "./", no trailing separator
    path: String,
    is_dir: bool,
}

fn normalize(raw: &str) -> Option<Entry> {
    let mut path = raw.strip_prefix("./").unwrap_or(raw);
    let is_dir = path.ends_with('/');
    if is_dir {
        path = &path[..path.len() - 1];
    }
    if path.is_empty() || path == "." {
        return None;
    }
    Some(Entry {
        path: path.to_string(),
        is_dir,
    })
}

/// All segments but the last.
fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[..pos],
        None => "",
    }
}

fn last_segment(path: &str) -> &str {
    match path.rfind('/') {
        Some(pos) => &path[pos + 1..],
        None => path,
    }
}

/// Render a sorted sequence of archive member paths as an indented tree.
///
/// Directory entries are detected by their trailing separator and keep it
/// in the rendered line. Entries that normalize to empty are skipped.
pub fn render<I, S>(members: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let entries: Vec<Entry> = members
        .into_iter()
        .filter_map(|member| normalize(member.as_ref()))
        .collect();
    let mut out = String::new();
    for (index, entry) in entries.iter().enumerate() {
        let depth = entry.path.matches('/').count();
        let next_parent = entries.get(index + 1).map(|next| parent(&next.path));
        let last_child = next_parent != Some(parent(&entry.path));
        let mut line = String::new();
        if depth == 0 {
            line.push_str(&entry.path);
        } else {
            for _ in 0..depth - 1 {
                line.push_str(INDENT);
            }
            line.push_str(if last_child { BRANCH_LAST } else { BRANCH });
            line.push_str(last_segment(&entry.path));
        }
        if entry.is_dir {
            line.push('/');
        }
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_line_with_continuing_and_terminal_children() {
        let rendered = render(["a/", "a/b", "a/c"]);
        assert_eq!(rendered, "a/\n├── b\n└── c\n");
    }

    #[test]
    fn leading_dot_marker_is_stripped() {
        let rendered = render(["./etc/", "./etc/hosts"]);
        assert_eq!(rendered, "etc/\n└── hosts\n");
    }

    #[test]
    fn empty_and_dot_entries_are_skipped() {
        let rendered = render(["./", "", ".", "top.txt"]);
        assert_eq!(rendered, "top.txt\n");
    }

    #[test]
    fn indentation_grows_with_depth() {
        // a directory followed by its own children compares against a
        // deeper parent prefix, so it closes its sibling run
        let rendered = render(["a/", "a/b/", "a/b/deep.txt", "a/last"]);
        assert_eq!(rendered, "a/\n└── b/\n    └── deep.txt\n└── last\n");
    }

    #[test]
    fn sibling_files_share_a_continuing_run() {
        let rendered = render(["srv/", "srv/a.conf", "srv/b.conf", "srv/c.conf"]);
        assert_eq!(
            rendered,
            "srv/\n├── a.conf\n├── b.conf\n└── c.conf\n"
        );
    }

    #[test]
    fn renderer_never_reorders_input() {
        // caller owns the sort; identical input order must be preserved
        let rendered = render(["z", "a"]);
        assert_eq!(rendered, "z\na\n");
    }
}
