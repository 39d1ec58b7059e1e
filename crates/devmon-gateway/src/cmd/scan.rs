//! scan / tags / info

use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use devmon_core::tag::{is_id_tag, namespace_of, DEFAULT_NAMESPACE};
use devmon_core::{Device, DeviceDetail, DeviceSummary, GatewayError, GatewayResult};
use tracing::debug;

use super::normalize_groups;
use crate::Gateway;

/// Device field usable as a scan sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Id,
    Alias,
    Info,
    Type,
    Plugin,
    SortIndex,
}

impl SortKey {
    /// Sort applied when the caller gives none
    pub const DEFAULT: &'static str = "plugin,sort_index,id";

    /// Parse a comma-separated key list; blank input yields the default order
    pub fn parse_list(keys: &str) -> GatewayResult<Vec<SortKey>> {
        let parsed = keys
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(SortKey::from_str)
            .collect::<GatewayResult<Vec<_>>>()?;

        if parsed.is_empty() {
            return Self::parse_list(Self::DEFAULT);
        }
        Ok(parsed)
    }

    fn compare(self, a: &Device, b: &Device) -> Ordering {
        match self {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Alias => a.alias.cmp(&b.alias),
            SortKey::Info => a.info.cmp(&b.info),
            SortKey::Type => a.device_type.cmp(&b.device_type),
            SortKey::Plugin => a.plugin.cmp(&b.plugin),
            SortKey::SortIndex => a.sort_index.cmp(&b.sort_index),
        }
    }
}

impl FromStr for SortKey {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortKey::Id),
            "alias" => Ok(SortKey::Alias),
            "info" => Ok(SortKey::Info),
            "type" => Ok(SortKey::Type),
            "plugin" => Ok(SortKey::Plugin),
            "sort_index" => Ok(SortKey::SortIndex),
            other => Err(GatewayError::invalid_usage(format!(
                "invalid sort key: {}",
                other
            ))
            .with_context("sort keys: id, alias, info, type, plugin, sort_index")),
        }
    }
}

impl Gateway {
    /// List devices matching any of the tag groups.
    ///
    /// Tags within a group are ANDed, groups are ORed. With no groups,
    /// every cached device is returned. `force` rebuilds the device cache
    /// first.
    pub async fn scan(
        &self,
        ns: Option<&str>,
        groups: &[Vec<String>],
        sort: Option<&str>,
        force: bool,
    ) -> GatewayResult<Vec<DeviceSummary>> {
        let keys = SortKey::parse_list(sort.unwrap_or(SortKey::DEFAULT))?;
        let groups = normalize_groups(ns, groups)?;
        debug!(?groups, force, "Scanning devices");

        if force {
            self.device_cache().rebuild(self.plugin_manager()).await?;
        }

        let mut devices = if groups.is_empty() {
            self.device_cache().lookup_devices(&[]).await
        } else {
            let mut seen = HashSet::new();
            let mut union = Vec::new();
            for group in &groups {
                for device in self.device_cache().lookup_devices(group).await {
                    if seen.insert(device.id.clone()) {
                        union.push(device);
                    }
                }
            }
            union
        };

        devices.sort_by(|a, b| {
            keys.iter()
                .fold(Ordering::Equal, |ord, key| ord.then_with(|| key.compare(a, b)))
        });

        Ok(devices.iter().map(|d| d.summary()).collect())
    }

    /// Cached tags in the given namespaces, sorted.
    ///
    /// No namespaces means `default`. Identity tags are left out unless
    /// `with_id_tags` is set.
    pub async fn tags(&self, namespaces: &[String], with_id_tags: bool) -> Vec<String> {
        let default = [DEFAULT_NAMESPACE.to_string()];
        let namespaces = if namespaces.is_empty() {
            &default[..]
        } else {
            namespaces
        };

        let mut tags: Vec<String> = self
            .device_cache()
            .tags()
            .await
            .into_iter()
            .filter(|tag| with_id_tags || !is_id_tag(tag))
            .filter(|tag| namespaces.iter().any(|ns| ns == namespace_of(tag)))
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    /// Full detail of a device by ID or alias
    pub async fn info(&self, device_id: &str) -> GatewayResult<DeviceDetail> {
        self.device_cache()
            .lookup_device(device_id)
            .await
            .map(|d| d.detail())
            .ok_or_else(|| GatewayError::not_found(format!("device not found: {}", device_id)))
    }
}
