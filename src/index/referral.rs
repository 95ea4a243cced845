//! Referrals to other index documents.

use crate::index::ParseError;

/// Pointer from one index document to another with its declared crawl depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Referral {
    pub url: String,
    pub depth: u32,
}

impl Referral {
    pub fn new(url: impl Into<String>, depth: u32) -> Self {
        Self {
            url: url.into(),
            depth,
        }
    }
}

/// Absent or empty depth means 0.
pub(crate) fn parse_depth(raw: Option<&str>) -> Result<u32, ParseError> {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(0);
    };
    value.parse().map_err(|_| ParseError::InvalidDepth {
        value: value.to_string(),
    })
}

/// Depth bookkeeping for one parser instance.
///
/// `max` stays `None` on a root parser until the first referral closes. A
/// ceiling of 0 counts as unset, so the next referral with a non-zero depth
/// replaces it; any other ceiling never changes. Child parsers are created
/// with the ceiling already set.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct DepthState {
    pub current: u32,
    pub max: Option<u32>,
}

impl DepthState {
    pub fn root() -> Self {
        Self {
            current: 0,
            max: None,
        }
    }

    pub fn inherited(max: u32, current: u32) -> Self {
        Self {
            current,
            max: Some(max),
        }
    }

    /// Ceiling to report for `referral`, latching it on first use.
    pub fn ceiling_for(&mut self, referral: &Referral) -> u32 {
        match self.max {
            Some(max) if max != 0 => max,
            _ => {
                self.max = Some(referral.depth);
                referral.depth
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_defaults_to_zero() {
        assert_eq!(parse_depth(None).unwrap(), 0);
        assert_eq!(parse_depth(Some("")).unwrap(), 0);
        assert_eq!(parse_depth(Some(" 3 ")).unwrap(), 3);
    }

    #[test]
    fn depth_rejects_garbage() {
        assert!(matches!(
            parse_depth(Some("-1")),
            Err(ParseError::InvalidDepth { value }) if value == "-1"
        ));
        assert!(parse_depth(Some("two")).is_err());
    }

    #[test]
    fn ceiling_latches_once() {
        let mut depth = DepthState::root();
        assert_eq!(depth.ceiling_for(&Referral::new("a", 2)), 2);
        assert_eq!(depth.ceiling_for(&Referral::new("b", 5)), 2);
        assert_eq!(depth.max, Some(2));

        let mut child = DepthState::inherited(2, 1);
        assert_eq!(child.ceiling_for(&Referral::new("c", 9)), 2);
    }

    #[test]
    fn zero_ceiling_is_replaced_by_next_referral() {
        let mut depth = DepthState::root();
        assert_eq!(depth.ceiling_for(&Referral::new("a", 0)), 0);
        assert_eq!(depth.max, Some(0));
        assert_eq!(depth.ceiling_for(&Referral::new("b", 3)), 3);
        assert_eq!(depth.ceiling_for(&Referral::new("c", 0)), 3);
        assert_eq!(depth.ceiling_for(&Referral::new("d", 8)), 3);
    }
}
