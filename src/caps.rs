//! Pad capabilities.
//!
//! Caps describe which media types a pad can carry. Linking two pads requires
//! their caps to intersect; the actual format negotiation is left to the
//! elements, the graph only needs the compatibility predicate.
//!
//! ```rust
//! use ghostline::caps::Caps;
//!
//! let raw = Caps::new(["video/x-raw", "video/x-bayer"]);
//! let any = Caps::Any;
//!
//! assert!(raw.can_intersect(&any));
//! assert_eq!(raw.intersect(&Caps::new(["video/x-raw"])), Some(Caps::new(["video/x-raw"])));
//! assert!(!raw.can_intersect(&Caps::new(["audio/x-raw"])));
//! ```

use smallvec::SmallVec;
use std::fmt;

/// Set of media types a pad accepts or produces.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Caps {
    /// Any media type (unconstrained).
    #[default]
    Any,
    /// One of the listed media types, ordered by preference.
    Media(SmallVec<[String; 2]>),
}

impl Caps {
    /// Create caps from a list of media type names.
    pub fn new<I, S>(media_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Media(media_types.into_iter().map(Into::into).collect())
    }

    /// Create caps accepting a single media type.
    pub fn simple(media_type: impl Into<String>) -> Self {
        Self::new([media_type])
    }

    /// Whether these caps accept anything.
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Whether these caps accept nothing.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Media(types) if types.is_empty())
    }

    /// Check if a media type is accepted.
    pub fn accepts(&self, media_type: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Media(types) => types.iter().any(|t| t == media_type),
        }
    }

    /// Intersect two caps, keeping the preference order of `self`.
    ///
    /// Returns `None` if there is no overlap.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        match (self, other) {
            (Self::Any, other) => Some(other.clone()),
            (this, Self::Any) => Some(this.clone()),
            (Self::Media(a), Self::Media(b)) => {
                let common: SmallVec<[String; 2]> =
                    a.iter().filter(|t| b.contains(t)).cloned().collect();
                if common.is_empty() {
                    None
                } else {
                    Some(Self::Media(common))
                }
            }
        }
    }

    /// Compatibility predicate used when linking pads.
    pub fn can_intersect(&self, other: &Self) -> bool {
        self.intersect(other).is_some()
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "ANY"),
            Self::Media(types) if types.is_empty() => write!(f, "EMPTY"),
            Self::Media(types) => write!(f, "{}", types.join("; ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_intersects_everything() {
        let video = Caps::simple("video/x-raw");
        assert_eq!(Caps::Any.intersect(&video), Some(video.clone()));
        assert_eq!(video.intersect(&Caps::Any), Some(video));
        assert!(Caps::Any.can_intersect(&Caps::Any));
    }

    #[test]
    fn test_intersection_keeps_preference_order() {
        let a = Caps::new(["b", "a", "c"]);
        let b = Caps::new(["c", "b"]);
        assert_eq!(a.intersect(&b), Some(Caps::new(["b", "c"])));
    }

    #[test]
    fn test_disjoint_caps() {
        let audio = Caps::simple("audio/x-raw");
        let video = Caps::simple("video/x-raw");
        assert!(!audio.can_intersect(&video));
        assert!(Caps::new(Vec::<String>::new()).is_empty());
        assert_eq!(Caps::new(Vec::<String>::new()).to_string(), "EMPTY");
    }
}
