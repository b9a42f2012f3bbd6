use anyhow::{anyhow, Result};
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::{Filter, Instance, Reservation, Tag};
use std::fmt;

pub const NAME_TAG: &str = "Name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagInfo {
    pub key: Option<String>,
    pub value: Option<String>,
}

#[cfg(test)]
impl TagInfo {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
        }
    }
}

impl From<&Tag> for TagInfo {
    fn from(tag: &Tag) -> Self {
        Self {
            key: tag.key().map(str::to_string),
            value: tag.value().map(str::to_string),
        }
    }
}

/// Canonical tag text that filter terms are matched against, e.g.
/// `{Key: "Name", Value: "my-app"}`. Unset fields are left out.
impl fmt::Display for TagInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fields = Vec::with_capacity(2);
        if let Some(key) = &self.key {
            fields.push(format!("Key: {:?}", key));
        }
        if let Some(value) = &self.value {
            fields.push(format!("Value: {:?}", value));
        }
        write!(f, "{{{}}}", fields.join(", "))
    }
}

/// A running instance as seen by a single invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub instance_id: String,
    pub private_ip: Option<String>,
    pub tags: Vec<TagInfo>,
}

impl InstanceInfo {
    /// Value of the first tag with the given key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|tag| tag.key.as_deref() == Some(key))
            .map(|tag| tag.value.as_deref().unwrap_or(""))
    }

    /// Display name from the `Name` tag, empty when the tag is missing.
    pub fn name(&self) -> &str {
        self.tag(NAME_TAG).unwrap_or("")
    }

    /// Private address to dispatch to.
    pub fn address(&self) -> Result<&str> {
        self.private_ip.as_deref().ok_or_else(|| {
            anyhow!(
                "instance {} ({}) has no private IP address",
                self.instance_id,
                self.name()
            )
        })
    }
}

impl From<&Instance> for InstanceInfo {
    fn from(instance: &Instance) -> Self {
        Self {
            instance_id: instance.instance_id().unwrap_or("Unknown").to_string(),
            private_ip: instance.private_ip_address().map(|ip| ip.to_string()),
            tags: instance.tags().iter().map(TagInfo::from).collect(),
        }
    }
}

/// Flatten reservations into instances, keeping API order.
pub fn instances_from_reservations(reservations: &[Reservation]) -> Vec<InstanceInfo> {
    reservations
        .iter()
        .flat_map(|reservation| reservation.instances())
        .map(InstanceInfo::from)
        .collect()
}

/// Every instance currently in the `running` state, across all pages.
pub async fn fetch_running_instances(
    ec2_client: &aws_sdk_ec2::Client,
    verbose: bool,
) -> Result<Vec<InstanceInfo>> {
    crate::output::print_debug("Listing running instances...", verbose);

    let state_filter = Filter::builder()
        .name("instance-state-name")
        .values("running")
        .build();

    let pages = ec2_client
        .describe_instances()
        .filters(state_filter)
        .into_paginator()
        .send()
        .try_collect()
        .await
        .map_err(|e| anyhow!("{}", DisplayErrorContext(e)))?;

    let instances: Vec<InstanceInfo> = pages
        .iter()
        .flat_map(|page| instances_from_reservations(page.reservations()))
        .collect();

    crate::output::print_debug(
        &format!(
            "Fetched {} running instances over {} page(s)",
            instances.len(),
            pages.len()
        ),
        verbose,
    );

    Ok(instances)
}
