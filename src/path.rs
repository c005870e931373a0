//! Lexical helpers for joining paths.

use crate::expand::HOME_DIRECTORY;
use crate::wchar::prelude::*;

/// Resolve `path` against `working_directory` unless it is absolute or starts with an unexpanded
/// home directory. One leading `./` and any slashes after it are dropped first. Works on
/// unescaped paths, so a `~` here is a literal tilde.
pub fn path_apply_working_directory(path: &wstr, working_directory: &wstr) -> WString {
    let absolute = matches!(path.as_char_slice().first(), Some(&('/' | HOME_DIRECTORY)));
    if path.is_empty() || working_directory.is_empty() || absolute {
        return path.to_owned();
    }
    let relative = path.strip_prefix("./").unwrap_or(path);
    let skip = relative.chars().take_while(|&c| c == '/').count();
    let mut joined = working_directory.to_owned();
    append_path_component(&mut joined, relative.slice_from(skip));
    joined
}

/// Append `component` with exactly one slash between it and `path`. An empty side gets no
/// slash at all.
pub fn append_path_component(path: &mut WString, component: &wstr) {
    if !path.is_empty() && !component.is_empty() {
        match (path.ends_with('/'), component.starts_with('/')) {
            (false, false) => path.push('/'),
            (true, true) => {
                path.pop();
            }
            _ => (),
        }
    }
    path.push_utfstr(component);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_working_directory() {
        assert_eq!(
            path_apply_working_directory(L!("foo"), L!("/home/")),
            "/home/foo"
        );
        assert_eq!(
            path_apply_working_directory(L!("./foo"), L!("/home")),
            "/home/foo"
        );
        assert_eq!(
            path_apply_working_directory(L!(".//foo"), L!("/home")),
            "/home/foo"
        );
        assert_eq!(path_apply_working_directory(L!("/foo"), L!("/home")), "/foo");
        assert_eq!(path_apply_working_directory(L!("."), L!("/home/")), "/home/.");
        assert_eq!(path_apply_working_directory(L!("foo"), L!("")), "foo");
        assert_eq!(path_apply_working_directory(L!(""), L!("/home")), "");
        let home: WString = [HOME_DIRECTORY, '/', 'x'].into_iter().collect();
        assert_eq!(path_apply_working_directory(&home, L!("/home")), home);
    }

    #[test]
    fn test_append_path_component() {
        let mut path = L!("/usr/").to_owned();
        append_path_component(&mut path, L!("/bin"));
        assert_eq!(path, "/usr/bin");
        append_path_component(&mut path, L!("fish"));
        assert_eq!(path, "/usr/bin/fish");
        append_path_component(&mut path, L!("/"));
        assert_eq!(path, "/usr/bin/fish/");
        append_path_component(&mut path, L!(""));
        assert_eq!(path, "/usr/bin/fish/");
        let mut empty = WString::new();
        append_path_component(&mut empty, L!("x"));
        assert_eq!(empty, "x");
    }
}
