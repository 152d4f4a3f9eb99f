use std::sync::Arc;

/// One file of a fixture.
#[derive(Debug, Clone)]
pub struct FixtureFile {
    pub path: Arc<str>,
    pub text: Arc<str>,
    pub primary: bool,
}

/// A parsed fixture: files in section order.
#[derive(Debug, Clone, Default)]
pub struct Fixture {
    pub files: Vec<FixtureFile>,
}

impl Fixture {
    /// Paths marked with `*`, in section order. Empty means every file is
    /// of interest.
    pub fn primary(&self) -> Vec<Arc<str>> {
        self.files
            .iter()
            .filter(|f| f.primary)
            .map(|f| f.path.clone())
            .collect()
    }
}

/// Parse the section convention:
///
/// ```text
/// //- A.h
/// template <typename T> struct A {};
/// //- test.cpp *
/// #include "A.h"
/// ```
///
/// Text before the first `//-` line is ignored.
pub fn parse_fixture(text: &str) -> Fixture {
    let mut fixture = Fixture::default();
    let mut current: Option<(Arc<str>, bool, String)> = None;

    for line in text.lines() {
        if let Some(rest) = line.trim_start().strip_prefix("//-") {
            if let Some((path, primary, body)) = current.take() {
                fixture.files.push(FixtureFile {
                    path,
                    text: body.into(),
                    primary,
                });
            }
            let rest = rest.trim();
            let (path, primary) = match rest.strip_suffix('*') {
                Some(stripped) => (stripped.trim(), true),
                None => (rest, false),
            };
            current = Some((path.into(), primary, String::new()));
        } else if let Some((_, _, body)) = &mut current {
            body.push_str(line);
            body.push('\n');
        }
    }
    if let Some((path, primary, body)) = current {
        fixture.files.push(FixtureFile {
            path,
            text: body.into(),
            primary,
        });
    }
    fixture
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_split_files() {
        let fixture = parse_fixture(
            "//- a.h\nclass A {};\n//- b.cpp *\n#include \"a.h\"\nA* a;\n",
        );
        assert_eq!(fixture.files.len(), 2);
        assert_eq!(fixture.files[0].path.as_ref(), "a.h");
        assert!(!fixture.files[0].primary);
        assert_eq!(fixture.files[1].path.as_ref(), "b.cpp");
        assert!(fixture.files[1].primary);
        assert_eq!(fixture.files[1].text.as_ref(), "#include \"a.h\"\nA* a;\n");
        assert_eq!(fixture.primary(), vec![Arc::from("b.cpp")]);
    }

    #[test]
    fn test_leading_prose_is_ignored() {
        let fixture = parse_fixture("some prose\n//- only.cpp\nclass C {};\n");
        assert_eq!(fixture.files.len(), 1);
        assert_eq!(fixture.files[0].text.as_ref(), "class C {};\n");
    }
}
