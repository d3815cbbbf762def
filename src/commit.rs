use std::fmt;

use crate::errors::ParseError;
use crate::object::{digest_from_hex, Digest};

/// Author or committer identity with timestamp and UTC offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Seconds since the UNIX epoch.
    pub timestamp: i64,
    /// Seconds east of UTC.
    pub tz_offset_secs: i32,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp,
            format_tz(self.tz_offset_secs)
        )
    }
}

/// Renders an offset as the fixed five-character `±HHMM` field.
fn format_tz(offset_secs: i32) -> String {
    let sign = if offset_secs < 0 { '-' } else { '+' };
    let secs = offset_secs.unsigned_abs();
    format!("{sign}{:02}{:02}", secs / 3600, secs % 3600 / 60)
}

/// A parsed commit payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub tree: Digest,
    pub parents: Vec<Digest>,
    pub author: Signature,
    pub committer: Signature,
    /// Everything after the blank line, verbatim.
    pub message: String,
}

/// Produces the textual commit payload. The message is normalized to
/// end with exactly one newline.
pub fn format_commit(
    tree: &Digest,
    parents: &[Digest],
    author: &Signature,
    committer: &Signature,
    message: &str,
) -> Vec<u8> {
    let mut payload = format!("tree {}\n", hex::encode(tree));
    for parent in parents {
        payload.push_str(&format!("parent {}\n", hex::encode(parent)));
    }
    payload.push_str(&format!("author {author}\n"));
    payload.push_str(&format!("committer {committer}\n"));
    payload.push('\n');
    payload.push_str(message);
    if !message.ends_with('\n') {
        payload.push('\n');
    }
    payload.into_bytes()
}

/// Parses a commit payload: header lines up to the first blank line,
/// then the message verbatim. Unknown header lines are tolerated.
pub fn parse_commit(payload: &[u8]) -> Result<Commit, ParseError> {
    let text = std::str::from_utf8(payload)
        .map_err(|_| ParseError::commit("payload is not valid UTF-8"))?;
    let (headers, message) = text
        .split_once("\n\n")
        .ok_or_else(|| ParseError::commit("no blank line before the message"))?;

    let mut tree = None;
    let mut parents = Vec::new();
    let mut author = None;
    let mut committer = None;

    for line in headers.lines() {
        let (key, value) = line
            .split_once(' ')
            .ok_or_else(|| ParseError::commit(format!("header line without a value: {line:?}")))?;

        match key {
            "tree" => {
                if tree.is_some() {
                    return Err(ParseError::commit("more than one tree header"));
                }
                tree = Some(parse_hex_field(value, "tree")?);
            }
            "parent" => parents.push(parse_hex_field(value, "parent")?),
            "author" => author = Some(parse_signature(value)?),
            "committer" => committer = Some(parse_signature(value)?),
            // gpgsig, encoding and friends pass through unharmed
            _ => {}
        }
    }

    Ok(Commit {
        tree: tree.ok_or_else(|| ParseError::commit("missing tree header"))?,
        parents,
        author: author.ok_or_else(|| ParseError::commit("missing author header"))?,
        committer: committer.ok_or_else(|| ParseError::commit("missing committer header"))?,
        message: message.to_owned(),
    })
}

fn parse_hex_field(value: &str, what: &str) -> Result<Digest, ParseError> {
    digest_from_hex(value)
        .ok_or_else(|| ParseError::commit(format!("{what} header is not a 40-hex digest: {value:?}")))
}

fn parse_signature(value: &str) -> Result<Signature, ParseError> {
    let bad = || ParseError::commit(format!("bad signature line: {value:?}"));

    let (name, rest) = value.split_once(" <").ok_or_else(bad)?;
    let (email, rest) = rest.split_once("> ").ok_or_else(bad)?;
    let (timestamp, tz) = rest.split_once(' ').ok_or_else(bad)?;

    Ok(Signature {
        name: name.to_owned(),
        email: email.to_owned(),
        timestamp: timestamp.parse().map_err(|_| bad())?,
        tz_offset_secs: parse_tz(tz).ok_or_else(bad)?,
    })
}

fn parse_tz(tz: &str) -> Option<i32> {
    if tz.len() != 5 || !tz.is_ascii() {
        return None;
    }
    let sign = match &tz[..1] {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };
    let hours: i32 = tz[1..3].parse().ok()?;
    let minutes: i32 = tz[3..5].parse().ok()?;
    Some(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::hash_object;
    use crate::object::ObjectKind;

    fn sig(name: &str, offset: i32) -> Signature {
        Signature {
            name: name.to_owned(),
            email: format!("{name}@example.com"),
            timestamp: 1714000000,
            tz_offset_secs: offset,
        }
    }

    #[test]
    fn formats_the_exact_payload() {
        let tree = hash_object(ObjectKind::Tree, b"");
        let parent = hash_object(ObjectKind::Commit, b"fake");

        let payload = format_commit(&tree, &[parent], &sig("ann", 0), &sig("bob", 0), "subject");
        let expected = format!(
            "tree {}\nparent {}\nauthor ann <ann@example.com> 1714000000 +0000\ncommitter bob <bob@example.com> 1714000000 +0000\n\nsubject\n",
            hex::encode(tree),
            hex::encode(parent),
        );
        assert_eq!(payload, expected.into_bytes());
    }

    #[test]
    fn timezone_field_is_five_characters() {
        assert_eq!(format_tz(0), "+0000");
        assert_eq!(format_tz(3600), "+0100");
        assert_eq!(format_tz(-12600), "-0330");
        assert_eq!(format_tz(19800), "+0530");
    }

    #[test]
    fn message_gains_exactly_one_trailing_newline() {
        let tree = hash_object(ObjectKind::Tree, b"");
        let a = sig("a", 0);

        let bare = format_commit(&tree, &[], &a, &a, "msg");
        let newline = format_commit(&tree, &[], &a, &a, "msg\n");
        assert_eq!(bare, newline);
        assert!(bare.ends_with(b"\n\nmsg\n"));

        // already-terminated multi-line messages are left alone
        let multi = format_commit(&tree, &[], &a, &a, "subject\n\nbody\n");
        assert!(multi.ends_with(b"\n\nsubject\n\nbody\n"));
    }

    #[test]
    fn parse_round_trips_format() {
        let tree = hash_object(ObjectKind::Tree, b"");
        let p1 = hash_object(ObjectKind::Commit, b"one");
        let p2 = hash_object(ObjectKind::Commit, b"two");
        let author = sig("ann", -12600);
        let committer = sig("bob", 3600);

        let payload = format_commit(&tree, &[p1, p2], &author, &committer, "subject\n\nbody\n");
        let commit = parse_commit(&payload).unwrap();

        assert_eq!(commit.tree, tree);
        assert_eq!(commit.parents, vec![p1, p2]);
        assert_eq!(commit.author, author);
        assert_eq!(commit.committer, committer);
        assert_eq!(commit.message, "subject\n\nbody\n");
    }

    #[test]
    fn rejects_malformed_commits() {
        // no blank line
        assert!(parse_commit(b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n").is_err());
        // missing author/committer
        assert!(parse_commit(b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\nmsg\n").is_err());
        // bad tree digest
        assert!(parse_commit(b"tree nothex\nauthor a <a@a> 0 +0000\ncommitter a <a@a> 0 +0000\n\nm\n").is_err());
        // broken signature
        assert!(parse_commit(b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\nauthor broken\ncommitter a <a@a> 0 +0000\n\nm\n").is_err());
        // not UTF-8
        assert!(parse_commit(&[0xff, 0xfe, b'\n', b'\n']).is_err());
    }

    #[test]
    fn message_is_kept_verbatim() {
        let payload = b"tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\nauthor a <a@a> 0 +0000\ncommitter a <a@a> 0 +0000\n\nline one\n\nline two\n\n\n";
        let commit = parse_commit(payload).unwrap();
        assert_eq!(commit.message, "line one\n\nline two\n\n\n");
    }

    #[test]
    fn names_may_contain_spaces() {
        let line = "Ada Lovelace <ada@example.com> 123 +0200";
        let signature = parse_signature(line).unwrap();
        assert_eq!(signature.name, "Ada Lovelace");
        assert_eq!(signature.email, "ada@example.com");
        assert_eq!(signature.timestamp, 123);
        assert_eq!(signature.tz_offset_secs, 7200);
    }
}
