//! Binary test argument file written by the test harness.
//!
//! The file is a protobuf-encoded `TestArguments` message: an ordered list of
//! name/value pairs. Names may repeat; lookups take the first match.

use prost::Message;
use std::io;
use std::path::Path;

/// A single harness argument.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct TestArgument {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

/// The argument list as stored on disk.
#[derive(Clone, PartialEq, Eq, Message)]
pub struct TestArguments {
    #[prost(message, repeated, tag = "1")]
    pub arg: Vec<TestArgument>,
}

impl TestArguments {
    /// Builds an argument list from name/value pairs, preserving order.
    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        Self {
            arg: pairs
                .into_iter()
                .map(|(name, value)| TestArgument {
                    name: name.into(),
                    value: value.into(),
                })
                .collect(),
        }
    }

    /// Reads and decodes the argument file.
    ///
    /// Decode failures are reported as [`io::ErrorKind::InvalidData`] so that
    /// callers see a single I/O error for "the file is unusable".
    pub fn read_from(path: &Path) -> io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(bytes.as_slice()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Encodes and writes the argument file.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.encode_to_vec())
    }

    /// Value of the first argument with the given name.
    pub fn find(&self, name: &str) -> Option<&str> {
        self.arg
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| arg.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_wins() {
        let args = TestArguments::from_pairs([
            ("class", "com.example.LoginTest"),
            ("diagnosticsServerPort", "5005"),
            ("diagnosticsServerPort", "6006"),
        ]);

        assert_eq!(args.find("diagnosticsServerPort"), Some("5005"));
        assert_eq!(args.find("missing"), None);
    }

    #[test]
    fn test_file_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_args.dat");
        let args = TestArguments::from_pairs([("b", "2"), ("a", "1"), ("b", "3")]);

        args.write_to(&path).unwrap();
        let read = TestArguments::read_from(&path).unwrap();

        assert_eq!(read, args);
    }

    #[test]
    fn test_garbage_is_invalid_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_args.dat");
        // Field 1, length-delimited, claims 100 bytes but provides 2.
        std::fs::write(&path, [0x0a, 100, 0x01, 0x02]).unwrap();

        let err = TestArguments::read_from(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
