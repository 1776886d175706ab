//! Fairness ordering across groups.
//!
//! Groups that completed a pass recently go to the back, so a group that
//! was cut short by a rate limit gets served first next cycle.

/// Groups in the order they last completed a poll pass, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityList {
    groups: Vec<String>,
}

impl PriorityList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the group, or -1 when it has never completed a pass.
    pub fn priority_of(&self, group: &str) -> i64 {
        self.groups
            .iter()
            .position(|g| g == group)
            .map(|p| p as i64)
            .unwrap_or(-1)
    }

    /// Moves the group to the tail.
    pub fn mark_serviced(&mut self, group: &str) {
        self.groups.retain(|g| g != group);
        self.groups.push(group.to_string());
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }
}

/// Orders groups by ascending priority; ties keep their input order.
pub fn order<I>(groups: I, priority: &PriorityList) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut ordered: Vec<String> = groups.into_iter().collect();
    ordered.sort_by_key(|g| priority.priority_of(g));
    ordered
}
