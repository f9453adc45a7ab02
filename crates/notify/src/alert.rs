use std::fmt;
use std::sync::Arc;

use stupid_core::Record;
use uuid::Uuid;

use crate::traits::Channel;

/// One triggered rule cycle, addressed to every channel of the rule.
#[derive(Clone)]
pub struct Alert {
    pub id: Uuid,
    pub rule_name: String,
    pub records: Vec<Record>,
    pub channels: Vec<Arc<dyn Channel>>,
}

impl Alert {
    pub fn new(
        rule_name: impl Into<String>,
        records: Vec<Record>,
        channels: Vec<Arc<dyn Channel>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_name: rule_name.into(),
            records,
            channels,
        }
    }

    /// Key under which the delivery to channel `index` is tracked.
    pub fn delivery_id(&self, index: usize) -> String {
        format!("{}|{}", index, self.id)
    }
}

impl fmt::Debug for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Alert")
            .field("id", &self.id)
            .field("rule_name", &self.rule_name)
            .field("records", &self.records.len())
            .field(
                "channels",
                &self.channels.iter().map(|c| c.channel_name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
