//! Expansion of configured names or prefixes into concrete log groups.

use harvester_core::Result;
use log_source::LogSource;
use std::collections::BTreeSet;
use tracing::debug;

/// Resolves the set of groups to poll.
#[derive(Debug, Clone)]
pub struct GroupResolver {
    names: Vec<String>,
    prefix_mode: bool,
}

impl GroupResolver {
    /// Creates a resolver; blank names are ignored.
    pub fn new(names: Vec<String>, prefix_mode: bool) -> Self {
        let names = names
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names, prefix_mode }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn prefix_mode(&self) -> bool {
        self.prefix_mode
    }

    /// Resolves the current group set.
    ///
    /// Without prefix mode the configured names are returned verbatim and the
    /// source is never called. With it, every prefix is paginated from the
    /// first page until the service stops returning a token.
    pub async fn resolve(&self, source: &dyn LogSource) -> Result<BTreeSet<String>> {
        if !self.prefix_mode {
            return Ok(self.names.iter().cloned().collect());
        }

        let mut groups = BTreeSet::new();

        for prefix in &self.names {
            let mut next_token = None;
            let mut pages = 0usize;

            loop {
                let page = source.describe_log_groups(prefix, next_token).await?;
                pages += 1;
                groups.extend(page.log_group_names);

                match page.next_token {
                    Some(token) => next_token = Some(token),
                    None => break,
                }
            }

            debug!(prefix = %prefix, pages = pages, "Expanded log group prefix");
        }

        Ok(groups)
    }
}
