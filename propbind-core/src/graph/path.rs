//! Dotted property paths.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::error::{BindingError, Result};

/// A parsed property path such as `Class.Teacher.Name`.
///
/// The empty path has zero segments and denotes the data context itself.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: SmallVec<[Rc<str>; 4]>,
}

impl PropertyPath {
    /// The zero-segment path.
    pub fn root() -> Self {
        Self {
            segments: SmallVec::new(),
        }
    }

    /// Parse a dot-separated path.
    ///
    /// Segments must be non-empty and contain no whitespace; names are
    /// case-sensitive.
    pub fn parse(path: &str) -> Result<Self> {
        if path.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = SmallVec::new();
        for segment in path.split('.') {
            if segment.is_empty() {
                return Err(BindingError::InvalidPath {
                    path: path.to_string(),
                    reason: "empty segment",
                });
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(BindingError::InvalidPath {
                    path: path.to_string(),
                    reason: "whitespace in segment",
                });
            }
            segments.push(Rc::from(segment));
        }
        Ok(Self { segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the zero-segment path.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Rc<str>] {
        &self.segments
    }

    /// The leading segments and the final one.
    pub fn split_last(&self) -> Option<(&Rc<str>, &[Rc<str>])> {
        self.segments.split_last()
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({self})")
    }
}

impl std::str::FromStr for PropertyPath {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
