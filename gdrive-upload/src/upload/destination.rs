/// Destination string meaning "the top of the container".
pub const ROOT_MARKER: &str = "/";

/// A destination split into folder segments (root to leaf) and the file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationPath {
    pub segments: Vec<String>,
    pub leaf: String,
}

impl DestinationPath {
    /// Parses a raw destination. A trailing separator (or the bare root
    /// marker) means "keep the source file's name". In the folder part, empty
    /// and `.` segments are dropped and `..` removes the segment before it
    /// (at the root it is dropped too). The leaf is taken literally.
    pub fn parse(raw: &str, source_name: &str) -> Self {
        if raw == ROOT_MARKER {
            return Self {
                segments: Vec::new(),
                leaf: source_name.to_string(),
            };
        }

        let (dir, trailing) = match raw.rsplit_once('/') {
            Some((dir, trailing)) => (dir, trailing),
            None => ("", raw),
        };
        let leaf = if trailing.is_empty() {
            source_name
        } else {
            trailing
        };
        let mut segments: Vec<String> = Vec::new();
        for segment in dir.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                name => segments.push(name.to_string()),
            }
        }

        Self {
            segments,
            leaf: leaf.to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// `/`-anchored form of the parsed path.
    pub fn normalized(&self) -> String {
        let mut path = String::from(ROOT_MARKER);
        for segment in &self.segments {
            path.push_str(segment);
            path.push('/');
        }
        path.push_str(&self.leaf);
        path
    }
}
