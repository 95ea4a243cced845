//! Consumer side of the parser.

use crate::index::referral::Referral;
use crate::model::Resource;
use std::ops::ControlFlow;

/// Receives each finished resource and referral.
///
/// Returning `ControlFlow::Break(())` from `process_resource` stops the parse
/// right after that resource; nothing later in the document is delivered.
pub trait RepositoryListener {
    fn process_resource(&mut self, resource: Resource) -> ControlFlow<()>;

    /// Called when a referral element closes. `max_depth` is the crawl-wide
    /// ceiling and `next_depth` the depth the referred document would be
    /// parsed at; following it is the listener's decision.
    fn process_referral(
        &mut self,
        base_url: &str,
        referral: Referral,
        max_depth: u32,
        next_depth: u32,
    ) {
        let _ = (base_url, max_depth, next_depth);
        tracing::debug!(url = %referral.url, "ignoring referral");
    }
}

impl<L: RepositoryListener + ?Sized> RepositoryListener for &mut L {
    fn process_resource(&mut self, resource: Resource) -> ControlFlow<()> {
        (**self).process_resource(resource)
    }

    fn process_referral(
        &mut self,
        base_url: &str,
        referral: Referral,
        max_depth: u32,
        next_depth: u32,
    ) {
        (**self).process_referral(base_url, referral, max_depth, next_depth)
    }
}

/// Referral as reported to a listener, with the depth bookkeeping attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportedReferral {
    pub base_url: String,
    pub referral: Referral,
    pub max_depth: u32,
    pub next_depth: u32,
}

/// Listener that keeps everything it is given, optionally stopping after
/// `limit` resources.
#[derive(Debug, Default)]
pub struct ResourceCollector {
    pub resources: Vec<Resource>,
    pub referrals: Vec<ReportedReferral>,
    limit: Option<usize>,
}

impl ResourceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }
}

impl RepositoryListener for ResourceCollector {
    fn process_resource(&mut self, resource: Resource) -> ControlFlow<()> {
        self.resources.push(resource);
        match self.limit {
            Some(limit) if self.resources.len() >= limit => ControlFlow::Break(()),
            _ => ControlFlow::Continue(()),
        }
    }

    fn process_referral(
        &mut self,
        base_url: &str,
        referral: Referral,
        max_depth: u32,
        next_depth: u32,
    ) {
        self.referrals.push(ReportedReferral {
            base_url: base_url.to_string(),
            referral,
            max_depth,
            next_depth,
        });
    }
}
